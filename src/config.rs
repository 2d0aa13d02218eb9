use crate::defs::{DEFAULT_BLOCK_SIZE, DEFAULT_TIMEOUT_MSEC, MARKER_MARGIN_OF_SAFETY};
use crate::errors::{ConfigError, StreamError};

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Creation parameters of a [`Block`](crate::block::Block).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockConfig {
    /// Per-stream capacity.
    pub size: usize,
    /// Whether streams record a timestamp with every value. Fixed at creation.
    pub uses_timestamp: bool,
    /// Engine timeout in milliseconds. Fixed at creation.
    pub timeout_ms: u64,
    /// Extra records requested by marker reads.
    pub marker_margin: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_BLOCK_SIZE,
            uses_timestamp: false,
            timeout_ms: DEFAULT_TIMEOUT_MSEC,
            marker_margin: MARKER_MARGIN_OF_SAFETY,
        }
    }
}

impl BlockConfig {
    /// Default config with the given capacity.
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Enables or disables timestamps.
    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.uses_timestamp = enabled;
        self
    }

    /// Sets the engine timeout.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the marker read margin.
    pub fn marker_margin(mut self, margin: usize) -> Self {
        self.marker_margin = margin;
        self
    }

    /// Rejects configs the engine would refuse anyway.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.size == 0 {
            return Err(StreamError::InvalidConfig("size must be positive".into()));
        }
        Ok(())
    }
}

/// Item symbols to stream, loaded from a text file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Watchlist {
    /// Upper-cased symbols in file order, without duplicates.
    pub items: Vec<String>,
}

impl Watchlist {
    /// Loads symbols one per line. Blank lines and `#` comments are skipped.
    pub fn from_config<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        log::info!("Loading watchlist from: {:?}", path.as_ref());
        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut seen = BTreeSet::new();
        let mut items = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let symbol = line.trim();
            if symbol.is_empty() || symbol.starts_with('#') {
                continue;
            }
            let symbol = symbol.to_uppercase();
            if seen.insert(symbol.clone()) {
                items.push(symbol);
            }
        }

        if items.is_empty() {
            return Err(ConfigError::Empty(path.as_ref().display().to_string()));
        }

        log::info!("Loaded {} items from watchlist", items.len());
        Ok(Self { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = BlockConfig::default();
        assert_eq!(config.size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.marker_margin, MARKER_MARGIN_OF_SAFETY);
        assert!(!config.uses_timestamp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = BlockConfig::with_size(50).timestamps(true).timeout_ms(10);
        assert_eq!(config.size, 50);
        assert!(config.uses_timestamp);
        assert_eq!(config.timeout_ms, 10);

        assert!(matches!(
            BlockConfig::with_size(0).validate(),
            Err(StreamError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_watchlist_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "spy\n# index funds\n\n QQQ \nSPY\nxlf").unwrap();

        let list = Watchlist::from_config(file.path()).unwrap();
        assert_eq!(list.items, vec!["SPY", "QQQ", "XLF"]);
    }

    #[test]
    fn test_watchlist_missing_file() {
        let res = Watchlist::from_config("nonexistent_watchlist.txt");
        assert!(matches!(res, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_watchlist_empty_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        assert!(matches!(
            Watchlist::from_config(file.path()),
            Err(ConfigError::Empty(_))
        ));
    }
}
