//! Meld: a self-describing, random-access container for signal tables and
//! metadata objects.
//!
//! A Meld file is a magic identifier, a 4-byte header length, the header,
//! and a sequence of independently encoded data blocks located only through
//! the header. See [`MeldWriter`] for the write protocol and [`MeldReader`]
//! for random access reads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod header;
pub mod reader;
pub mod writer;

pub use config::MeldConfig;
pub use header::{AliasEntry, MeldHeader, ObjectEntry, TableEntry, MELD_MAGIC};
pub use reader::{MeldReader, ObjectView, TableView};
pub use recon_core::TableBuilder;
pub use writer::{MeldWriter, TableWriter, WriterState};
