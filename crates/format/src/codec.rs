//! Storage codec definitions.
//!
//! The codec is the compression stage applied to data blocks after
//! serialization. Headers never pass through it.

use recon_core::{Error, Result};

/// Default zstd compression level
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Storage codec trait.
///
/// All data block bytes pass through the codec on their way to and from
/// disk. A container records only whether compression is enabled; the codec
/// implementation is fixed by that flag.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    ///
    /// For IdentityCodec, this is a copy.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decode bytes from storage.
    ///
    /// Reverses the encode operation. Fails with `MalformedData` if the
    /// data cannot be decoded.
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}

/// Pass-through codec used for uncompressed containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StorageCodec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn codec_id(&self) -> &str {
        "identity"
    }
}

/// zstd compression codec.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    /// Create a codec compressing at `level`
    pub fn new(level: i32) -> Self {
        ZstdCodec { level }
    }

    /// Compression level
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl StorageCodec for ZstdCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(data, self.level)
            .map_err(|e| Error::Serialization(format!("zstd encode: {}", e)))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| {
            Error::malformed(format!("zstd decode ({} bytes): {}", data.len(), e))
        })
    }

    fn codec_id(&self) -> &str {
        "zstd"
    }
}

/// Look up a codec by identifier.
pub fn get_codec(id: &str, level: i32) -> Result<Box<dyn StorageCodec>> {
    match id {
        "identity" => Ok(Box::new(IdentityCodec)),
        "zstd" => Ok(Box::new(ZstdCodec::new(level))),
        other => Err(Error::Config(format!("unknown codec: {}", other))),
    }
}
