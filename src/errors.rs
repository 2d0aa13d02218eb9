use rand_distr::NormalError;
use std::fmt;
use thiserror::Error;

/// Raw status code returned by every engine call.
///
/// `0` is success; negative values come from a fixed table of engine errors.
/// Codes below the table (down to [`ErrorCode::FLOOR`]) are named as an
/// offset from its last entry, anything else is unrecognized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Call succeeded.
    pub const SUCCESS: ErrorCode = ErrorCode(0);
    /// An argument was rejected by the engine.
    pub const BAD_INPUT: ErrorCode = ErrorCode(-1);
    /// A destination buffer was too small or malformed.
    pub const BAD_INPUT_BUFFER: ErrorCode = ErrorCode(-2);
    /// The engine is not loaded or not connected to the platform.
    pub const NOT_CONNECTED: ErrorCode = ErrorCode(-3);
    /// The engine did not answer within the block timeout.
    pub const TIMEOUT: ErrorCode = ErrorCode(-4);
    /// A block with this name already exists.
    pub const BLOCK_ALREADY_EXISTS: ErrorCode = ErrorCode(-5);
    /// No block with this name exists.
    pub const BLOCK_DOESNT_EXIST: ErrorCode = ErrorCode(-6);
    /// The engine failed to create the block.
    pub const BLOCK_CREATION: ErrorCode = ErrorCode(-7);
    /// Requested block size is zero or too large.
    pub const BLOCK_SIZE: ErrorCode = ErrorCode(-8);
    /// Creating the block would exceed the engine's block limit.
    pub const BLOCK_LIMIT: ErrorCode = ErrorCode(-9);
    /// Topic is not a member of the block.
    pub const TOPIC_DOESNT_EXIST: ErrorCode = ErrorCode(-10);
    /// Item is not a member of the block.
    pub const ITEM_DOESNT_EXIST: ErrorCode = ErrorCode(-11);
    /// Stream index or range outside the stream.
    pub const STREAM_SIZE: ErrorCode = ErrorCode(-12);
    /// Stream cannot be read as the requested type.
    pub const DATA_TYPE: ErrorCode = ErrorCode(-13);
    /// Inter-process channel failure.
    pub const IPC: ErrorCode = ErrorCode(-14);
    /// Engine-side lock acquisition failed.
    pub const CONCURRENCY: ErrorCode = ErrorCode(-15);
    /// The engine does not know this topic.
    pub const ENGINE_NO_TOPIC: ErrorCode = ErrorCode(-16);
    /// The engine does not know this item.
    pub const ENGINE_NO_ITEM: ErrorCode = ErrorCode(-17);
    /// Engine service failure.
    pub const SERVICE: ErrorCode = ErrorCode(-18);
    /// Failed to read stream data.
    pub const GET_DATA: ErrorCode = ErrorCode(-19);
    /// Failed to read engine state.
    pub const GET_STATE: ErrorCode = ErrorCode(-20);
    /// Failed to change engine state.
    pub const SET_STATE: ErrorCode = ErrorCode(-21);
    /// Unclassified engine failure.
    pub const UNKNOWN: ErrorCode = ErrorCode(-22);

    /// Lowest code still named relative to [`ErrorCode::UNKNOWN`].
    pub const FLOOR: i32 = -1000;

    const NAMES: [&'static str; 22] = [
        "BAD_INPUT",
        "BAD_INPUT_BUFFER",
        "NOT_CONNECTED",
        "TIMEOUT",
        "BLOCK_ALREADY_EXISTS",
        "BLOCK_DOESNT_EXIST",
        "BLOCK_CREATION",
        "BLOCK_SIZE",
        "BLOCK_LIMIT",
        "TOPIC_DOESNT_EXIST",
        "ITEM_DOESNT_EXIST",
        "STREAM_SIZE",
        "DATA_TYPE",
        "IPC",
        "CONCURRENCY",
        "ENGINE_NO_TOPIC",
        "ENGINE_NO_ITEM",
        "SERVICE",
        "GET_DATA",
        "GET_STATE",
        "SET_STATE",
        "UNKNOWN",
    ];

    /// Maps a raw status to `Ok(())` or the error code.
    pub fn check(raw: i32) -> Result<(), ErrorCode> {
        if raw == 0 {
            Ok(())
        } else {
            Err(ErrorCode(raw))
        }
    }

    /// Human-readable name of the code.
    pub fn name(&self) -> String {
        let lowest = Self::UNKNOWN.0;
        match self.0 {
            0 => "SUCCESS".to_string(),
            c if (lowest..0).contains(&c) => Self::NAMES[(-c - 1) as usize].to_string(),
            c if (Self::FLOOR..lowest).contains(&c) => format!("UNKNOWN-{}", lowest - c),
            c => format!("unrecognized error code ({})", c),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// Errors returned by [`Block`](crate::block::Block) operations.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The engine is not loaded or not connected.
    #[error("Engine not connected")]
    NotConnected,

    /// An engine call returned a non-zero status.
    #[error("Engine call failed: {0}")]
    RemoteCallFailed(ErrorCode),

    /// Item is not a member of the block.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Topic is not a member of the block.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Index (or normalized range) falls outside `[0, capacity)`.
    #[error("Index {index} out of range for capacity {capacity}")]
    IndexOutOfRange {
        /// Index as supplied by the caller.
        index: i64,
        /// Block capacity used for the check.
        capacity: usize,
    },

    /// Data behind the read marker was overwritten before it could be read.
    #[error("Dirty marker for ({item}, {topic}): data lost before read")]
    DirtyMarker {
        /// Item of the stream.
        item: String,
        /// Topic of the stream.
        topic: String,
    },

    /// Cached membership or size no longer matches the engine.
    #[error("Cached state diverged from engine: {0}")]
    InternalInconsistency(String),

    /// The provider answered with a value of a type other than requested.
    #[error("Engine returned {found} value, expected {expected}")]
    TypeMismatch {
        /// Type requested.
        expected: crate::value::DataType,
        /// Type received.
        found: crate::value::DataType,
    },

    /// The block was already closed.
    #[error("Block {0} is closed")]
    Closed(String),

    /// Block configuration rejected before contacting the engine.
    #[error("Invalid block config: {0}")]
    InvalidConfig(String),
}

impl From<ErrorCode> for StreamError {
    fn from(code: ErrorCode) -> Self {
        if code == ErrorCode::NOT_CONNECTED {
            StreamError::NotConnected
        } else {
            StreamError::RemoteCallFailed(code)
        }
    }
}

/// Errors while loading a watchlist file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File missing or unreadable.
    #[error("Failed to read watchlist: {0}")]
    Io(#[from] std::io::Error),

    /// File contained no item symbols.
    #[error("Watchlist {0} contains no items")]
    Empty(String),
}

/// Errors that may occur inside the [`QuoteGenerator`](crate::quote_generator::QuoteGenerator).
///
/// These errors represent failures in randomness generation, invalid inputs,
/// or system time retrieval issues that affect quote computation.
#[derive(Debug)]
pub enum QuoteGeneratorError {
    /// Supplied volatility parameter is outside the allowed numeric range.
    ///
    /// Volatility must be within `(0.0, 1.0]`.
    InvalidVolatility(f64),

    /// Error constructing the internal log-normal distribution used for
    /// generating price movements.
    DistributionError(NormalError),
}

impl From<NormalError> for QuoteGeneratorError {
    fn from(err: NormalError) -> Self {
        QuoteGeneratorError::DistributionError(err)
    }
}

impl fmt::Display for QuoteGeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteGeneratorError::InvalidVolatility(v) => write!(f, "Invalid volatility: {}", v),
            QuoteGeneratorError::DistributionError(e) => write!(f, "Distribution error: {}", e),
        }
    }
}

/// Errors returned from the simulated [`QuoteFeed`](crate::feed::QuoteFeed).
#[derive(Error, Debug)]
pub enum FeedError {
    /// Critical failure during feed initialization.
    #[error("Failed to initialize quote feed: {0}")]
    InitializationError(String),

    /// Failure while updating or publishing quotes inside the feed loop.
    #[error("Failed to update quotes: {0}")]
    UpdateQuoteError(String),
}

/// High-level errors returned by the demo binary.
///
/// Used at the application entry point for formatting user-facing error
/// messages and wrapping lower-level failures.
#[derive(Error, Debug)]
pub enum CliError {
    /// General wrapper around any textual failure.
    #[error("Cli failed with error: {0}")]
    GeneralError(String),
}

impl From<StreamError> for CliError {
    fn from(err: StreamError) -> Self {
        CliError::GeneralError(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::GeneralError(err.to_string())
    }
}

impl From<FeedError> for CliError {
    fn from(err: FeedError) -> Self {
        CliError::GeneralError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_are_named() {
        assert_eq!(ErrorCode::SUCCESS.name(), "SUCCESS");
        assert_eq!(ErrorCode::BAD_INPUT.name(), "BAD_INPUT");
        assert_eq!(ErrorCode::BLOCK_SIZE.name(), "BLOCK_SIZE");
        assert_eq!(ErrorCode::UNKNOWN.name(), "UNKNOWN");
    }

    #[test]
    fn test_codes_below_table_are_offsets() {
        assert_eq!(ErrorCode(-25).name(), "UNKNOWN-3");
        assert_eq!(ErrorCode(ErrorCode::FLOOR).name(), "UNKNOWN-978");
    }

    #[test]
    fn test_codes_outside_range_are_unrecognized() {
        assert_eq!(ErrorCode(5).name(), "unrecognized error code (5)");
        assert_eq!(
            ErrorCode(ErrorCode::FLOOR - 1).name(),
            "unrecognized error code (-1001)"
        );
    }

    #[test]
    fn test_check_and_conversion() {
        assert!(ErrorCode::check(0).is_ok());
        assert_eq!(ErrorCode::check(-4), Err(ErrorCode::TIMEOUT));

        assert!(matches!(
            StreamError::from(ErrorCode::NOT_CONNECTED),
            StreamError::NotConnected
        ));
        assert!(matches!(
            StreamError::from(ErrorCode::TIMEOUT),
            StreamError::RemoteCallFailed(ErrorCode::TIMEOUT)
        ));
    }

    #[test]
    fn test_display_includes_raw_code() {
        assert_eq!(ErrorCode::IPC.to_string(), "IPC (-14)");
    }
}
