//! Wall writer
//!
//! Structure is defined and frozen exactly as for Meld, but data is
//! journaled: each row or field batch becomes one length-prefixed record.
//! Records are buffered in call order and reach the sink on [`WallWriter::flush`].

use crate::config::WallConfig;
use crate::header::{WallHeader, WALL_MAGIC};
use crate::record::{Record, Row};
use recon_core::{Error, Map, Result, Schema, TableBuilder, Value};
use recon_format::{write_len, BlockEncoding, Durable, DEFAULT_ZSTD_LEVEL, MAX_RECORD_SIZE};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Writer for Wall journals
pub struct WallWriter<W: Write + Durable> {
    sink: W,
    config: WallConfig,
    encoding: BlockEncoding,
    schema: Schema,
    header: Option<WallHeader>,
    buffer: Vec<Record>,
    records_written: u64,
    closed: bool,
}

impl WallWriter<BufWriter<File>> {
    /// Create (or truncate) a Wall file at `path`
    pub fn create(path: impl AsRef<Path>, config: WallConfig) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        WallWriter::new(BufWriter::new(file), config)
    }
}

impl<W: Write + Durable> WallWriter<W> {
    /// Create a writer over an empty sink
    pub fn new(sink: W, config: WallConfig) -> Result<Self> {
        config.validate()?;
        let encoding = BlockEncoding::for_container(&config.serializer, false, DEFAULT_ZSTD_LEVEL)?;
        Ok(WallWriter {
            sink,
            config,
            encoding,
            schema: Schema::new(Map::new()),
            header: None,
            buffer: Vec::new(),
            records_written: 0,
            closed: false,
        })
    }

    /// Whether `finalize` has run
    pub fn is_finalized(&self) -> bool {
        self.header.is_some()
    }

    /// Number of records waiting for `flush`
    pub fn pending(&self) -> usize {
        self.buffer.len()
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
        if self.header.is_some() {
            return Err(Error::AlreadyFinalized);
        }
        self.schema.freeze();
        let header = WallHeader::from_schema(&self.schema);
        let bytes = self.encoding.encode_header(&header.to_value())?;
        self.sink.write_all(WALL_MAGIC)?;
        write_len(&mut self.sink, bytes.len())?;
        self.sink.write_all(&bytes)?;

        info!(
            target: "recon::wall",
            tables = header.tables.len(),
            objects = header.objects.len(),
            header_len = bytes.len(),
            "Finalized wall header"
        );
        self.header = Some(header);
        Ok(())
    }

    /// Append a row to a table
    pub fn add_row(&mut self, table: &str, row: Row) -> Result<()> {
        let header = self.writable()?;
        let entry = header.table(table)?;
        let values = row.resolve(table, entry)?;
        self.push(Record::new(table, Value::Array(values)))
    }

    /// Journal a batch of object fields; later values win on read
    pub fn add_fields(&mut self, object: &str, fields: Map) -> Result<()> {
        let header = self.writable()?;
        if !header.objects.contains_key(object) {
            return Err(Error::UnknownName(format!("no object named {}", object)));
        }
        self.push(Record::new(object, Value::Object(fields)))
    }

    /// Journal a single object field
    pub fn add_field(&mut self, object: &str, name: &str, value: impl Into<Value>) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(name.to_string(), value.into());
        self.add_fields(object, fields)
    }

    /// Row handle for a table
    pub fn table(&mut self, name: &str) -> Result<WallTableWriter<'_, W>> {
        self.schema.table(name)?;
        Ok(WallTableWriter {
            writer: self,
            table: name.to_string(),
        })
    }

    /// Field handle for an object
    pub fn object(&mut self, name: &str) -> Result<WallObjectWriter<'_, W>> {
        self.schema.object(name)?;
        Ok(WallObjectWriter {
            writer: self,
            object: name.to_string(),
        })
    }

    /// Write every buffered record to the sink.
    ///
    /// The whole batch is encoded before the sink is touched and records
    /// leave the buffer only once the sink accepted them, so a failed flush
    /// can be retried. A sink that fails after taking part of the batch may
    /// hold a torn final record, which readers report as `MalformedData`.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            let mut batch = Vec::new();
            for record in &self.buffer {
                let data = self.encoding.encode_block(&record.to_value())?;
                if data.len() > MAX_RECORD_SIZE {
                    return Err(Error::BlockTooLarge {
                        limit: MAX_RECORD_SIZE,
                        actual: data.len(),
                    });
                }
                write_len(&mut batch, data.len())?;
                batch.extend_from_slice(&data);
            }
            self.sink.write_all(&batch)?;

            let count = self.buffer.len();
            self.buffer.clear();
            self.records_written += count as u64;
            debug!(
                target: "recon::wall",
                records = count,
                bytes = batch.len(),
                total_records = self.records_written,
                "Flushed journal records"
            );
        }
        self.sink.flush()?;
        if self.config.sync_on_flush {
            self.sink.sync()?;
        }
        Ok(())
    }

    /// Flush remaining records and stop accepting data.
    ///
    /// A writer still in the definition phase is finalized first so the
    /// file is always a valid Wall. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.header.is_none() {
            self.finalize()?;
        }
        self.flush()?;
        self.sink.flush()?;
        self.closed = true;
        info!(target: "recon::wall", records = self.records_written, "Closed wall writer");
        Ok(())
    }

    /// Close and return the underlying sink
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        Ok(self.sink)
    }

    fn writable(&self) -> Result<&WallHeader> {
        if self.closed {
            return Err(Error::AlreadyClosed);
        }
        self.header.as_ref().ok_or(Error::NotFinalized)
    }

    fn push(&mut self, record: Record) -> Result<()> {
        self.buffer.push(record);
        if let Some(threshold) = self.config.auto_flush_rows {
            if self.buffer.len() >= threshold {
                self.flush()?;
            }
        }
        Ok(())
    }
}

/// Row handle for one table
pub struct WallTableWriter<'a, W: Write + Durable> {
    writer: &'a mut WallWriter<W>,
    table: String,
}

impl<'a, W: Write + Durable> WallTableWriter<'a, W> {
    /// Append a row
    pub fn add_row(&mut self, row: Row) -> Result<()> {
        self.writer.add_row(&self.table, row)
    }
}

/// Field handle for one object
pub struct WallObjectWriter<'a, W: Write + Durable> {
    writer: &'a mut WallWriter<W>,
    object: String,
}

impl<'a, W: Write + Durable> WallObjectWriter<'a, W> {
    /// Journal a batch of fields
    pub fn add_fields(&mut self, fields: Map) -> Result<()> {
        self.writer.add_fields(&self.object, fields)
    }

    /// Journal one field
    pub fn add_field(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.writer.add_field(&self.object, name, value)
    }
}
