//! Wall writer configuration.

use recon_core::{Error, Result};
use recon_format::{get_serializer, DEFAULT_SERIALIZER};

/// Configuration for [`WallWriter`](crate::WallWriter) and
/// [`WallReader`](crate::WallReader).
#[derive(Debug, Clone, PartialEq)]
pub struct WallConfig {
    /// Serializer id for header and journal records (default: "msgpack").
    pub serializer: String,

    /// Flush automatically once this many records are buffered
    /// (default: None, flush only on request).
    pub auto_flush_rows: Option<usize>,

    /// fsync the sink after every flush (default: false).
    pub sync_on_flush: bool,
}

impl Default for WallConfig {
    fn default() -> Self {
        WallConfig {
            serializer: DEFAULT_SERIALIZER.to_string(),
            auto_flush_rows: None,
            sync_on_flush: false,
        }
    }
}

impl WallConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set serializer id (builder pattern).
    pub fn with_serializer(mut self, id: impl Into<String>) -> Self {
        self.serializer = id.into();
        self
    }

    /// Set auto flush threshold (builder pattern).
    pub fn with_auto_flush_rows(mut self, rows: usize) -> Self {
        self.auto_flush_rows = Some(rows);
        self
    }

    /// Set fsync-on-flush (builder pattern).
    pub fn with_sync_on_flush(mut self, sync: bool) -> Self {
        self.sync_on_flush = sync;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        get_serializer(&self.serializer)?;
        if self.auto_flush_rows == Some(0) {
            return Err(Error::Config(
                "auto flush threshold must be at least 1 record".to_string(),
            ));
        }
        Ok(())
    }
}
