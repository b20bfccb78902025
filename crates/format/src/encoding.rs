//! Header and block encoding contract.
//!
//! `BlockEncoding` pairs a [`Serializer`] with a [`StorageCodec`]:
//! headers are serialized only, data blocks are serialized and then passed
//! through the codec (compressed iff the container's flag is set).

use crate::codec::{get_codec, IdentityCodec, StorageCodec, ZstdCodec};
use crate::serializer::{get_serializer, MsgPackSerializer, Serializer};
use recon_core::{Result, Value};

/// Encoder/decoder for container headers and data blocks
pub struct BlockEncoding {
    serializer: Box<dyn Serializer>,
    codec: Box<dyn StorageCodec>,
}

impl BlockEncoding {
    /// Combine a serializer and a compression stage
    pub fn new(serializer: Box<dyn Serializer>, codec: Box<dyn StorageCodec>) -> Self {
        BlockEncoding { serializer, codec }
    }

    /// Msgpack with compression fixed by `compressed`
    pub fn msgpack(compressed: bool, level: i32) -> Self {
        let codec: Box<dyn StorageCodec> = if compressed {
            Box::new(ZstdCodec::new(level))
        } else {
            Box::new(IdentityCodec)
        };
        BlockEncoding::new(Box::new(MsgPackSerializer), codec)
    }

    /// Look up the serializer by id and pick the codec from the compression flag
    pub fn for_container(serializer_id: &str, compressed: bool, level: i32) -> Result<Self> {
        let codec_id = if compressed { "zstd" } else { "identity" };
        Ok(BlockEncoding::new(
            get_serializer(serializer_id)?,
            get_codec(codec_id, level)?,
        ))
    }

    /// Whether data blocks are compressed
    pub fn is_compressed(&self) -> bool {
        self.codec.codec_id() != "identity"
    }

    /// Identifier of the underlying serializer
    pub fn serializer_id(&self) -> &str {
        self.serializer.serializer_id()
    }

    /// Encode a header. Headers are never compressed.
    pub fn encode_header(&self, header: &Value) -> Result<Vec<u8>> {
        self.serializer.encode(header)
    }

    /// Decode a header blob
    pub fn decode_header(&self, data: &[u8]) -> Result<Value> {
        self.serializer.decode(data)
    }

    /// Encode a data block (signal vector, object field map or journal record)
    pub fn encode_block(&self, value: &Value) -> Result<Vec<u8>> {
        let raw = self.serializer.encode(value)?;
        self.codec.encode(&raw)
    }

    /// Encode a data block with floats narrowed to 32 bits
    pub fn encode_block_single(&self, value: &Value) -> Result<Vec<u8>> {
        let raw = self.serializer.encode_single(value)?;
        self.codec.encode(&raw)
    }

    /// Decode a data block
    pub fn decode_block(&self, data: &[u8]) -> Result<Value> {
        let raw = self.codec.decode(data)?;
        self.serializer.decode(&raw)
    }
}

impl std::fmt::Debug for BlockEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockEncoding")
            .field("serializer", &self.serializer.serializer_id())
            .field("codec", &self.codec.codec_id())
            .finish()
    }
}
