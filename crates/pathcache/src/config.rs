//! Cache configuration

use serde::{Deserialize, Serialize};

use pathtree::{Error, Result};

/// Default number of live entries before eviction starts
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Construction-time settings shared by both cache types
///
/// Fixed once the cache is built. Deserializable so a host can embed it in
/// its own configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of values held at once
    pub max_entries: usize,

    /// Whether a successful `get` counts as an access for eviction order
    pub refresh_on_read: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            refresh_on_read: false,
        }
    }
}

impl CacheConfig {
    /// Default configuration with the given capacity
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    /// Set the capacity
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set whether reads refresh recency
    pub fn with_refresh_on_read(mut self, refresh_on_read: bool) -> Self {
        self.refresh_on_read = refresh_on_read;
        self
    }

    /// Reject settings no cache can run with
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::InvalidConfig(
                "max_entries must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
