//! Wall: the journaled Recon container.
//!
//! Same table/object/alias model as Meld, but data is an append-only journal
//! of small length-prefixed records. Tables accumulate rows; objects are
//! property bags where the last journaled value of a field wins.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod header;
pub mod reader;
pub mod record;
pub mod writer;

pub use config::WallConfig;
pub use header::{WallAlias, WallHeader, WallTable, WALL_MAGIC};
pub use reader::{WallObjectView, WallReader, WallTableView};
pub use record::{Record, Row};
pub use writer::{WallObjectWriter, WallTableWriter, WallWriter};
