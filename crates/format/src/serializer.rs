//! Serializer trait definitions.

use recon_core::{Error, Result, Value};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::Serialize;

/// Identifier of the serializer used when none is configured
pub const DEFAULT_SERIALIZER: &str = "msgpack";

/// Value serializer trait.
///
/// Every header, data block and journal record passes through a serializer.
/// This provides a seam for alternative encodings without touching the
/// container protocols.
///
/// # Length stability
///
/// Implementations must encode equal-length inputs of the same shape to
/// equal-length outputs: fixed-width byte strings stay fixed-width, map
/// keys are emitted in a stable order. Meld header rewrites depend on it.
pub trait Serializer: Send + Sync {
    /// Encode a value to bytes.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decode bytes produced by [`Serializer::encode`].
    ///
    /// Fails with `MalformedData` if the input is truncated or its framing
    /// is inconsistent.
    fn decode(&self, data: &[u8]) -> Result<Value>;

    /// Encode a value with every `Float` narrowed to 32 bits.
    ///
    /// Lossy. Serializers without a narrow float encoding keep full
    /// precision.
    fn encode_single(&self, value: &Value) -> Result<Vec<u8>> {
        self.encode(value)
    }

    /// Unique serializer identifier.
    fn serializer_id(&self) -> &str;
}

/// MessagePack serializer backed by `rmp-serde`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl Serializer for MsgPackSerializer {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        rmp_serde::to_vec(value).map_err(|e| Error::Serialization(format!("msgpack encode: {}", e)))
    }

    fn decode(&self, data: &[u8]) -> Result<Value> {
        rmp_serde::from_slice(data).map_err(|e| {
            Error::malformed(format!("msgpack decode ({} bytes): {}", data.len(), e))
        })
    }

    fn encode_single(&self, value: &Value) -> Result<Vec<u8>> {
        rmp_serde::to_vec(&SingleFloat(value))
            .map_err(|e| Error::Serialization(format!("msgpack encode: {}", e)))
    }

    fn serializer_id(&self) -> &str {
        DEFAULT_SERIALIZER
    }
}

/// Serializes a value like `Value` does, but floats as f32
struct SingleFloat<'a>(&'a Value);

impl Serialize for SingleFloat<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.0 {
            Value::Float(f) => serializer.serialize_f32(*f as f32),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&SingleFloat(item))?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, &SingleFloat(v))?;
                }
                map.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// Look up a serializer by identifier.
pub fn get_serializer(id: &str) -> Result<Box<dyn Serializer>> {
    match id {
        DEFAULT_SERIALIZER => Ok(Box::new(MsgPackSerializer)),
        other => Err(Error::Config(format!("unknown serializer: {}", other))),
    }
}
