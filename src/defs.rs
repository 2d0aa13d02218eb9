/// Extra records requested on top of the marker-derived size.
///
/// The engine keeps writing between the marker-position query and the data
/// fetch, so a marker read asks for this many more records than it expects
/// and trusts the size the engine reports back.
pub const MARKER_MARGIN_OF_SAFETY: usize = 100;

/// Default per-stream capacity of a newly created block.
pub const DEFAULT_BLOCK_SIZE: usize = 1000;

/// Default engine timeout (in milliseconds) passed through at block creation.
///
/// The value governs the engine's own blocking behavior; the accessor never
/// waits on it directly.
pub const DEFAULT_TIMEOUT_MSEC: u64 = 2000;

/// Maximum length (in bytes, including the terminating NUL) of any
/// item, topic, block name or text value crossing the native boundary.
pub const MAX_STR_SZ: usize = 40;

/// Largest per-stream capacity the simulated engine accepts.
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Default number of blocks the simulated engine allows at once.
pub const DEFAULT_BLOCK_LIMIT: usize = 10;

/// Price volatility coefficient used by the simulated quote generator.
pub const VOLATILITY: f64 = 0.000082;

/// Simulated feed update period in milliseconds.
///
/// Every tick the feed moves all quotes and publishes them into the engine.
pub const FEED_TICK_PERIOD_MSEC: u64 = 200;
