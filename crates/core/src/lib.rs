//! Core types for Recon containers
//!
//! This crate defines the foundational types shared by the Meld and Wall formats:
//! - Value: Uniform tagged value for signal data, object fields and metadata
//! - Error: Error taxonomy for every container operation
//! - Transform: Alias transform algebra (affine, inverse)
//! - Schema: Builder-side table/object definition model

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod schema;
pub mod transform;
pub mod value;

pub use error::{Error, Result};
pub use schema::{AliasDef, ObjectDef, Schema, SignalDef, TableBuilder, TableDef};
pub use transform::{apply_optional, Transform};
pub use value::{Map, Value, ValueType};
