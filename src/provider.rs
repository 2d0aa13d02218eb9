//! The engine capability consumed by [`Block`](crate::block::Block).
//!
//! Everything the accessor needs from the engine goes through
//! [`RemoteProvider`]. Implementations: [`SimulatedProvider`](crate::sim::SimulatedProvider)
//! (in-process) and, with the `native` feature, `ffi::NativeProvider`.

use crate::errors::ErrorCode;
use crate::value::{DataType, Sample};

use std::collections::BTreeSet;

/// Result of a single engine call.
pub type ProviderResult<T> = Result<T, ErrorCode>;

/// Address of one stream inside the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamRef<'a> {
    /// Block name.
    pub block: &'a str,
    /// Item symbol.
    pub item: &'a str,
    /// Topic name.
    pub topic: &'a str,
}

impl<'a> StreamRef<'a> {
    /// Bundles a block name with an (item, topic) pair.
    pub fn new(block: &'a str, item: &'a str, topic: &'a str) -> Self {
        Self { block, item, topic }
    }
}

/// Data returned by a marker read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerFetch {
    /// Fetched records, ascending by logical position (most recent last).
    pub samples: Vec<Sample>,
    /// Authoritative record count; negative when data was lost during the fetch.
    pub size_got: i64,
}

/// Narrow, synchronous view of the quote-streaming engine.
///
/// Every call may block on the engine's own IPC. Indices are absolute
/// (already normalized); `0` is the most recent slot.
pub trait RemoteProvider: Send + Sync {
    /// Whether the engine is loaded and connected.
    fn is_connected(&self) -> bool;

    /// Creates a block and returns its engine-assigned name.
    fn create_block(&self, size: usize, uses_timestamp: bool, timeout_ms: u64)
    -> ProviderResult<String>;

    /// Releases a block and its streams.
    fn close_block(&self, block: &str) -> ProviderResult<()>;

    /// Current per-stream capacity of a block.
    fn block_size(&self, block: &str) -> ProviderResult<usize>;

    /// Resizes every stream of a block.
    fn set_block_size(&self, block: &str, size: usize) -> ProviderResult<()>;

    /// Number of data points currently held by a stream.
    fn stream_occupancy(&self, stream: StreamRef<'_>) -> ProviderResult<usize>;

    /// Items with live streams.
    fn items(&self, block: &str) -> ProviderResult<BTreeSet<String>>;

    /// Topics with live streams.
    fn topics(&self, block: &str) -> ProviderResult<BTreeSet<String>>;

    /// Items configured while the block has no topics.
    fn pre_cached_items(&self, block: &str) -> ProviderResult<BTreeSet<String>>;

    /// Topics configured while the block has no items.
    fn pre_cached_topics(&self, block: &str) -> ProviderResult<BTreeSet<String>>;

    /// Adds an item to a block.
    fn add_item(&self, block: &str, item: &str) -> ProviderResult<()>;

    /// Adds a topic to a block.
    fn add_topic(&self, block: &str, topic: &str) -> ProviderResult<()>;

    /// Removes an item from a block.
    fn remove_item(&self, block: &str, item: &str) -> ProviderResult<()>;

    /// Removes a topic from a block.
    fn remove_topic(&self, block: &str, topic: &str) -> ProviderResult<()>;

    /// Native storage type of a topic.
    fn topic_type(&self, topic: &str) -> ProviderResult<DataType>;

    /// Reads a single slot as `ty`.
    fn get_value(
        &self,
        stream: StreamRef<'_>,
        index: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Sample>;

    /// Reads slots `beg..=end`, most recent first.
    fn get_snapshot(
        &self,
        stream: StreamRef<'_>,
        beg: usize,
        end: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<Sample>>;

    /// Whether unread data behind the marker was overwritten.
    fn is_marker_dirty(&self, stream: StreamRef<'_>) -> ProviderResult<bool>;

    /// Current marker position; `-1` when nothing is pending.
    fn marker_position(&self, stream: StreamRef<'_>) -> ProviderResult<i64>;

    /// Reads pending data between `beg` and the marker into a buffer of
    /// `buffer_len` records and advances the marker.
    fn get_snapshot_from_marker(
        &self,
        stream: StreamRef<'_>,
        beg: usize,
        buffer_len: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<MarkerFetch>;

    /// Most recent value of `topic` for every item, as `(item, sample)`.
    fn item_frame(
        &self,
        block: &str,
        topic: &str,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>>;

    /// Most recent value of every topic for `item`, as text.
    fn topic_frame(
        &self,
        block: &str,
        item: &str,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>>;

    /// Maximum number of concurrent blocks.
    fn block_limit(&self) -> usize;

    /// Changes the block limit; returns the new limit.
    fn set_block_limit(&self, limit: usize) -> usize;

    /// Number of open blocks.
    fn block_count(&self) -> usize;

    /// Names of open blocks.
    fn block_names(&self) -> ProviderResult<Vec<String>>;
}
