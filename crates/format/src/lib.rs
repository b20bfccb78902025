//! On-disk encoding for Recon containers
//!
//! This crate handles everything between a [`Value`](recon_core::Value) and
//! the bytes of a file:
//!
//! - Serializer: pluggable value encoder (msgpack by default)
//! - Codec: optional compression stage for data blocks (identity, zstd)
//! - BlockEncoding: the header/block encode-decode contract built from both
//! - BlockRef: fixed-width offset/length slots patched in place in headers
//! - Framing: magic identifiers and 4-byte length prefixes
//! - Fields: typed access to decoded header maps
//! - Durable: fsync hook for file-backed sinks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block_ref;
pub mod codec;
pub mod encoding;
pub mod fields;
pub mod framing;
pub mod serializer;
pub mod sink;

pub use block_ref::{BlockRef, BLOCK_REF_SIZE};
pub use codec::{get_codec, IdentityCodec, StorageCodec, ZstdCodec, DEFAULT_ZSTD_LEVEL};
pub use encoding::BlockEncoding;
pub use framing::{
    read_exact_vec, read_len, read_len_or_eof, read_magic, write_len, LEN_PREFIX_SIZE,
    MAX_RECORD_SIZE,
};
pub use serializer::{get_serializer, MsgPackSerializer, Serializer, DEFAULT_SERIALIZER};
pub use sink::Durable;
