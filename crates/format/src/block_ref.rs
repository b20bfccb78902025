//! Fixed-width block references.
//!
//! A Meld header records where each data block lives as an `(offset, length)`
//! pair. The pair is stored as one 16-byte binary value so that patching it
//! after a write never changes the encoded header length.
//!
//! # Binary Format (16 bytes)
//!
//! ```text
//! offset: u64 (8 bytes, BE) + length: u64 (8 bytes, BE)
//! ```
//!
//! The all-zero pattern is the "unwritten" sentinel. Offset 0 is never a
//! legitimate block position because the magic identifier occupies it.

use byteorder::{BigEndian, ByteOrder};
use recon_core::{Error, Result, Value};

/// Encoded size of a block reference
pub const BLOCK_REF_SIZE: usize = 16;

/// Location of a data block within a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRef {
    /// Absolute file offset of the first byte
    pub offset: u64,
    /// Number of encoded bytes
    pub length: u64,
}

impl BlockRef {
    /// Sentinel for a block that has not been written yet
    pub const UNWRITTEN: BlockRef = BlockRef {
        offset: 0,
        length: 0,
    };

    /// Create a reference to a written block
    pub fn new(offset: u64, length: u64) -> Self {
        BlockRef { offset, length }
    }

    /// Whether this reference points at data
    pub fn is_written(&self) -> bool {
        *self != Self::UNWRITTEN
    }

    /// Serialize to the fixed 16-byte form
    pub fn to_bytes(&self) -> [u8; BLOCK_REF_SIZE] {
        let mut buf = [0u8; BLOCK_REF_SIZE];
        BigEndian::write_u64(&mut buf[0..8], self.offset);
        BigEndian::write_u64(&mut buf[8..16], self.length);
        buf
    }

    /// Parse the fixed 16-byte form
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != BLOCK_REF_SIZE {
            return Err(Error::malformed(format!(
                "block reference must be {} bytes, got {}",
                BLOCK_REF_SIZE,
                data.len()
            )));
        }
        Ok(BlockRef {
            offset: BigEndian::read_u64(&data[0..8]),
            length: BigEndian::read_u64(&data[8..16]),
        })
    }

    /// Header representation
    pub fn to_value(&self) -> Value {
        Value::Bytes(self.to_bytes().to_vec())
    }

    /// Parse the header representation
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Self::from_bytes(b),
            other => Err(Error::malformed(format!(
                "block reference must be Bytes, got {}",
                other.type_name()
            ))),
        }
    }
}
