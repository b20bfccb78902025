//! Meld writer configuration.

use recon_core::{Error, Result};
use recon_format::{get_serializer, DEFAULT_SERIALIZER, DEFAULT_ZSTD_LEVEL, MAX_RECORD_SIZE};

/// Configuration for [`MeldWriter`](crate::MeldWriter) and
/// [`MeldReader`](crate::MeldReader).
#[derive(Debug, Clone, PartialEq)]
pub struct MeldConfig {
    /// Compress every data block (default: false).
    ///
    /// Recorded in the header; readers follow the flag, not their config.
    pub compression: bool,

    /// zstd level used when compression is on (default: 3).
    pub compression_level: i32,

    /// Serializer id for header and blocks (default: "msgpack").
    pub serializer: String,

    /// fsync the sink when the writer closes (default: true).
    pub sync_on_close: bool,

    /// Store signal floats as 32-bit (default: false).
    ///
    /// Lossy: halves float storage, and values read back are the nearest
    /// f32. Object data and the header keep full precision.
    pub single_precision: bool,

    /// Largest encoded block the writer appends (default: 256 MiB).
    ///
    /// Readers refuse blocks above 256 MiB, so larger values are rejected.
    pub max_block_size: usize,
}

impl Default for MeldConfig {
    fn default() -> Self {
        MeldConfig {
            compression: false,
            compression_level: DEFAULT_ZSTD_LEVEL,
            serializer: DEFAULT_SERIALIZER.to_string(),
            sync_on_close: true,
            single_precision: false,
            max_block_size: MAX_RECORD_SIZE,
        }
    }
}

impl MeldConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable block compression (builder pattern).
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Set zstd level (builder pattern).
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Set serializer id (builder pattern).
    pub fn with_serializer(mut self, id: impl Into<String>) -> Self {
        self.serializer = id.into();
        self
    }

    /// Set fsync-on-close (builder pattern).
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Store signal floats as f32 (builder pattern).
    pub fn with_single_precision(mut self, single: bool) -> Self {
        self.single_precision = single;
        self
    }

    /// Set the block size limit (builder pattern).
    pub fn with_max_block_size(mut self, bytes: usize) -> Self {
        self.max_block_size = bytes;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        get_serializer(&self.serializer)?;
        if !(1..=22).contains(&self.compression_level) {
            return Err(Error::Config(format!(
                "compression level must be in 1..=22, got {}",
                self.compression_level
            )));
        }
        if self.max_block_size == 0 || self.max_block_size > MAX_RECORD_SIZE {
            return Err(Error::Config(format!(
                "max block size must be in 1..={}, got {}",
                MAX_RECORD_SIZE, self.max_block_size
            )));
        }
        Ok(())
    }

    /// Configuration for tests: no fsync.
    pub fn for_testing() -> Self {
        MeldConfig {
            sync_on_close: false,
            ..Self::default()
        }
    }
}
