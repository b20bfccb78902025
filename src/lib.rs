//! Recon - self-describing binary containers for signal tables and objects
//!
//! Recon stores named tables of equal-length signals (with transformed
//! aliases) and named metadata objects in two file formats:
//!
//! - Meld: random access. The header holds a block reference for every
//!   signal and object, so a single read fetches exactly one column.
//! - Wall: journaled. Rows and object fields are appended as records and
//!   recovered by scanning the file.
//!
//! # Quick Start
//!
//! ```ignore
//! use recon::{MeldConfig, MeldReader, MeldWriter, Value};
//!
//! let mut w = MeldWriter::create("run.mld", MeldConfig::default())?;
//! w.add_table("T1", None)?
//!     .add_signal("time")?
//!     .add_signal("x")?
//!     .add_alias("nx", "x", Some("inv"))?;
//! w.finalize()?;
//! w.write_signal("T1", "time", Value::from_iter([0.0, 1.0, 2.0]))?;
//! w.write_signal("T1", "x", Value::from_iter([1.0, 0.0, 1.0]))?;
//! w.close()?;
//!
//! let r = MeldReader::open_path("run.mld")?;
//! let nx = r.read_table("T1")?.data("nx")?;
//! ```
//!
//! This crate also carries the converters that sit on top of both formats:
//! [`wall_to_meld`], [`import_blocks`] and the JSON export functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod convert;
pub mod export;
pub mod import;

pub use convert::{wall_file_to_meld_file, wall_to_meld};
pub use export::{meld_to_json, wall_to_json};
pub use import::{import_blocks, Abscissa, BlockSource, BlockVariable, ImportSummary};

pub use recon_core::{Error, Map, Result, Schema, TableDef, Transform, Value, ValueType};
pub use recon_format::{BlockEncoding, BlockRef, Durable, StorageCodec};
pub use recon_meld::{
    MeldConfig, MeldHeader, MeldReader, MeldWriter, ObjectView, TableBuilder, TableView,
    TableWriter, WriterState,
};
pub use recon_wall::{
    Row, WallConfig, WallHeader, WallObjectView, WallReader, WallTableView, WallWriter,
};
