//! Meld writer
//!
//! Drives the two-phase protocol:
//!
//! 1. **Defining**: tables, signals, aliases and objects are registered.
//! 2. **Finalized**: the header is written with every block reference set
//!    to the unwritten sentinel, and its encoded length becomes the ceiling
//!    for every later rewrite. Each signal and object may then be written
//!    exactly once; the block is appended at the end of the file and the
//!    header is patched in place.
//! 3. **Closed**: every declared signal and object has data.
//!
//! A crash between a block append and the header rewrite leaves the block
//! in the file but unreferenced, so readers never see a half-written block.

use crate::config::MeldConfig;
use crate::header::{MeldHeader, MELD_MAGIC};
use recon_core::{Error, Map, Result, Schema, TableBuilder, Value};
use recon_format::{write_len, BlockEncoding, BlockRef, Durable, LEN_PREFIX_SIZE};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

/// Writer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Structure may still change
    Defining,
    /// Header written; data may be appended
    Finalized,
    /// Every block written; no further writes
    Closed,
}

/// Writer for Meld containers
pub struct MeldWriter<W: Write + Seek + Durable> {
    sink: W,
    config: MeldConfig,
    encoding: BlockEncoding,
    schema: Schema,
    state: WriterState,
    header: MeldHeader,
    /// Encoded header length recorded at finalize
    ceiling: usize,
    /// Offset one past the last appended block
    end: u64,
}

impl MeldWriter<BufWriter<File>> {
    /// Create (or truncate) a Meld file at `path`
    pub fn create(path: impl AsRef<Path>, config: MeldConfig) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        MeldWriter::new(BufWriter::new(file), config)
    }
}

impl<W: Write + Seek + Durable> MeldWriter<W> {
    /// Create a writer over an empty sink
    pub fn new(sink: W, config: MeldConfig) -> Result<Self> {
        config.validate()?;
        let encoding = BlockEncoding::for_container(
            &config.serializer,
            config.compression,
            config.compression_level,
        )?;
        Ok(MeldWriter {
            sink,
            config,
            encoding,
            schema: Schema::new(Map::new()),
            state: WriterState::Defining,
            header: MeldHeader::default(),
            ceiling: 0,
            end: 0,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Whether `finalize` has run
    pub fn is_finalized(&self) -> bool {
        self.state != WriterState::Defining
    }

    /// Whether `close` has succeeded
    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// Writer configuration
    pub fn config(&self) -> &MeldConfig {
        &self.config
    }

    /// Borrow the underlying sink
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Container metadata, editable until finalize
    pub fn metadata_mut(&mut self) -> Result<&mut Map> {
        self.schema.metadata_mut()
    }

    /// Register a table and return a builder for its signals and aliases
    pub fn add_table(&mut self, name: &str, metadata: Option<Map>) -> Result<TableBuilder<'_>> {
        let def = self.schema.add_table(name, metadata)?;
        Ok(TableBuilder::new(def))
    }

    /// Reopen the builder of an already registered table (definition phase only)
    pub fn define_table(&mut self, name: &str) -> Result<TableBuilder<'_>> {
        let def = self.schema.table_mut(name)?;
        Ok(TableBuilder::new(def))
    }

    /// Register an object
    pub fn add_object(&mut self, name: &str, metadata: Option<Map>) -> Result<()> {
        self.schema.add_object(name, metadata)?;
        Ok(())
    }

    /// Freeze the structure and write the header.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state != WriterState::Defining {
            return Err(Error::AlreadyFinalized);
        }
        self.schema.freeze();
        self.header = MeldHeader::from_schema(&self.schema, self.config.compression);
        self.header.single_precision = self.config.single_precision;

        let bytes = self.encoding.encode_header(&self.header.to_value())?;
        self.sink.seek(SeekFrom::Start(0))?;
        self.sink.write_all(MELD_MAGIC)?;
        write_len(&mut self.sink, bytes.len())?;
        self.sink.write_all(&bytes)?;

        self.ceiling = bytes.len();
        self.end = (MELD_MAGIC.len() + LEN_PREFIX_SIZE + bytes.len()) as u64;
        self.state = WriterState::Finalized;

        info!(
            target: "recon::meld",
            tables = self.header.tables.len(),
            objects = self.header.objects.len(),
            header_len = self.ceiling,
            compressed = self.config.compression,
            single_precision = self.config.single_precision,
            "Finalized meld header"
        );
        Ok(())
    }

    /// Data write handle for a table
    pub fn table(&mut self, name: &str) -> Result<TableWriter<'_, W>> {
        self.schema.table(name)?;
        Ok(TableWriter {
            writer: self,
            table: name.to_string(),
        })
    }

    /// Write the data of one signal.
    ///
    /// `values` must be an `Array`; if the signal declared a type, every
    /// element must have exactly that type. Fails with `BlockTooLarge`,
    /// leaving the signal unwritten, if the encoded block exceeds
    /// `max_block_size`.
    pub fn write_signal(&mut self, table: &str, signal: &str, values: impl Into<Value>) -> Result<()> {
        self.ensure_writable()?;
        let def = self.schema.table(table)?;
        let sig = def
            .signal(signal)
            .ok_or_else(|| Error::unknown_signal(table, signal))?;

        let entry = self.header.table(table)?;
        if entry.indices.get(signal).map(BlockRef::is_written).unwrap_or(false) {
            return Err(Error::AlreadyWritten(format!("signal {}.{}", table, signal)));
        }

        let values = values.into();
        let elements = values.as_array().ok_or_else(|| {
            Error::ShapeMismatch(format!(
                "data for signal {}.{} must be an Array, got {}",
                table,
                signal,
                values.type_name()
            ))
        })?;
        sig.check_values(elements)?;

        let block = self.append_block(&values, self.config.single_precision)?;
        let mut header = self.header.clone();
        header.set_signal_block(table, signal, block)?;
        self.commit_header(header)?;

        debug!(
            target: "recon::meld",
            table,
            signal,
            offset = block.offset,
            length = block.length,
            count = elements.len(),
            "Wrote signal block"
        );
        Ok(())
    }

    /// Write the field map of one object
    pub fn write_object(&mut self, name: &str, fields: impl Into<Value>) -> Result<()> {
        self.ensure_writable()?;
        let entry = self.header.object(name)?;
        if entry.block.is_written() {
            return Err(Error::AlreadyWritten(format!("object {}", name)));
        }

        let fields = fields.into();
        if fields.as_object().is_none() {
            return Err(Error::ShapeMismatch(format!(
                "data for object {} must be an Object, got {}",
                name,
                fields.type_name()
            )));
        }

        let block = self.append_block(&fields, false)?;
        let mut header = self.header.clone();
        header.set_object_block(name, block)?;
        self.commit_header(header)?;

        debug!(
            target: "recon::meld",
            object = name,
            offset = block.offset,
            length = block.length,
            "Wrote object block"
        );
        Ok(())
    }

    /// Check completeness and close.
    ///
    /// A writer still in the definition phase is finalized first. Fails with
    /// `MissingData` naming every unwritten signal (`table.signal`) and
    /// object; the writer stays open so the missing data can still be
    /// written. Closing a closed writer is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            WriterState::Closed => return Ok(()),
            WriterState::Defining => self.finalize()?,
            WriterState::Finalized => {}
        }

        let missing = self.header.unwritten();
        if !missing.is_empty() {
            return Err(Error::MissingData(missing));
        }

        self.sink.flush()?;
        if self.config.sync_on_close {
            self.sink.sync()?;
        }
        self.state = WriterState::Closed;

        info!(target: "recon::meld", bytes = self.end, "Closed meld writer");
        Ok(())
    }

    /// Close and return the underlying sink
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        Ok(self.sink)
    }

    fn ensure_writable(&self) -> Result<()> {
        match self.state {
            WriterState::Defining => Err(Error::NotFinalized),
            WriterState::Closed => Err(Error::AlreadyClosed),
            WriterState::Finalized => Ok(()),
        }
    }

    fn append_block(&mut self, value: &Value, single_precision: bool) -> Result<BlockRef> {
        let bytes = if single_precision {
            self.encoding.encode_block_single(value)?
        } else {
            self.encoding.encode_block(value)?
        };
        if bytes.len() > self.config.max_block_size {
            return Err(Error::BlockTooLarge {
                limit: self.config.max_block_size,
                actual: bytes.len(),
            });
        }
        let offset = self.end;
        self.sink.seek(SeekFrom::Start(offset))?;
        self.sink.write_all(&bytes)?;
        self.end += bytes.len() as u64;
        Ok(BlockRef::new(offset, bytes.len() as u64))
    }

    /// Rewrite the header in place and adopt it once the bytes are down.
    ///
    /// On failure the in-memory header keeps its previous block references,
    /// so the affected signal or object can be written again.
    fn commit_header(&mut self, header: MeldHeader) -> Result<()> {
        let mut bytes = self.encoding.encode_header(&header.to_value())?;
        if bytes.len() > self.ceiling {
            return Err(Error::HeaderOverflow {
                ceiling: self.ceiling,
                actual: bytes.len(),
            });
        }
        bytes.resize(self.ceiling, 0);

        self.sink
            .seek(SeekFrom::Start((MELD_MAGIC.len() + LEN_PREFIX_SIZE) as u64))?;
        self.sink.write_all(&bytes)?;
        self.sink.seek(SeekFrom::Start(self.end))?;
        self.header = header;

        debug!(target: "recon::meld", header_len = bytes.len(), "Rewrote meld header");
        Ok(())
    }
}

/// Data-phase handle for one table
pub struct TableWriter<'a, W: Write + Seek + Durable> {
    writer: &'a mut MeldWriter<W>,
    table: String,
}

impl<'a, W: Write + Seek + Durable> TableWriter<'a, W> {
    /// Table name
    pub fn name(&self) -> &str {
        &self.table
    }

    /// Write the data of one signal of this table
    pub fn write(&mut self, signal: &str, values: impl Into<Value>) -> Result<()> {
        self.writer.write_signal(&self.table, signal, values)
    }
}
