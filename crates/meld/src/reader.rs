//! Meld reader
//!
//! Parses the magic identifier and header once at open, then serves random
//! access reads: every signal or object read is a single seek plus decode of
//! exactly the recorded number of bytes. Alias reads decode the target
//! signal's block and apply the alias transform.

use crate::config::MeldConfig;
use crate::header::{MeldHeader, ObjectEntry, TableEntry, MELD_MAGIC};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use recon_core::{Error, Map, Result, Transform, Value, ValueType};
use recon_format::{read_exact_vec, read_len, read_magic, BlockEncoding, BlockRef};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

/// Reader for Meld containers
pub struct MeldReader<R: Read + Seek> {
    source: Mutex<R>,
    header: MeldHeader,
    header_len: usize,
    encoding: BlockEncoding,
}

impl MeldReader<BufReader<File>> {
    /// Open a Meld file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        MeldReader::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> MeldReader<R> {
    /// Open with the default serializer
    pub fn open(source: R) -> Result<Self> {
        Self::open_with_config(source, &MeldConfig::default())
    }

    /// Open with the serializer named in `config`.
    ///
    /// Compression follows the flag stored in the header.
    pub fn open_with_config(mut source: R, config: &MeldConfig) -> Result<Self> {
        config.validate()?;
        source.seek(SeekFrom::Start(0))?;
        read_magic(&mut source, MELD_MAGIC)?;
        let header_len = read_len(&mut source)?;
        let bytes = read_exact_vec(&mut source, header_len)?;

        let plain = BlockEncoding::for_container(&config.serializer, false, config.compression_level)?;
        let header = MeldHeader::from_value(&plain.decode_header(&bytes)?)?;
        let encoding = BlockEncoding::for_container(
            &config.serializer,
            header.compressed,
            config.compression_level,
        )?;

        info!(
            target: "recon::meld",
            header_len,
            tables = header.tables.len(),
            objects = header.objects.len(),
            compressed = header.compressed,
            "Opened meld file"
        );

        Ok(MeldReader {
            source: Mutex::new(source),
            header,
            header_len,
            encoding,
        })
    }

    /// Table names
    pub fn tables(&self) -> Vec<&str> {
        self.header.tables.keys().map(String::as_str).collect()
    }

    /// Object names
    pub fn objects(&self) -> Vec<&str> {
        self.header.objects.keys().map(String::as_str).collect()
    }

    /// Container metadata
    pub fn metadata(&self) -> &Map {
        &self.header.metadata
    }

    /// Whether data blocks are compressed
    pub fn is_compressed(&self) -> bool {
        self.header.compressed
    }

    /// Whether signal floats were stored as f32
    pub fn is_single_precision(&self) -> bool {
        self.header.single_precision
    }

    /// Length of the encoded header in bytes
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Decoded header
    pub fn header(&self) -> &MeldHeader {
        &self.header
    }

    /// View of one table
    pub fn read_table(&self, name: &str) -> Result<TableView<'_, R>> {
        let entry = self.header.table(name)?;
        Ok(TableView {
            reader: self,
            name: name.to_string(),
            entry,
        })
    }

    /// View of one object
    pub fn read_object(&self, name: &str) -> Result<ObjectView<'_, R>> {
        let entry = self.header.object(name)?;
        Ok(ObjectView {
            reader: self,
            name: name.to_string(),
            entry,
            data: OnceCell::new(),
        })
    }

    fn read_block(&self, block: BlockRef) -> Result<Value> {
        let bytes = {
            let mut source = self.source.lock();
            source.seek(SeekFrom::Start(block.offset))?;
            read_exact_vec(&mut *source, block.length as usize)?
        };
        debug!(
            target: "recon::meld",
            offset = block.offset,
            length = block.length,
            "Read block"
        );
        self.encoding.decode_block(&bytes)
    }
}

/// Read access to one table
pub struct TableView<'a, R: Read + Seek> {
    reader: &'a MeldReader<R>,
    name: String,
    entry: &'a TableEntry,
}

impl<'a, R: Read + Seek> TableView<'a, R> {
    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All variables (signals then aliases) in declaration order
    pub fn signals(&self) -> &[String] {
        &self.entry.variables
    }

    /// Alias names
    pub fn aliases(&self) -> Vec<&str> {
        self.entry.aliases.keys().map(String::as_str).collect()
    }

    /// Target signal of an alias
    pub fn alias_of(&self, alias: &str) -> Option<&str> {
        self.entry.aliases.get(alias).map(|a| a.of.as_str())
    }

    /// Parsed transform of an alias; `None` is the identity
    pub fn alias_transform(&self, alias: &str) -> Option<Transform> {
        self.entry
            .aliases
            .get(alias)
            .and_then(|a| a.transform.as_deref())
            .and_then(Transform::parse)
    }

    /// Declared element type of a signal
    pub fn declared_type(&self, signal: &str) -> Option<ValueType> {
        self.entry.types.get(signal).copied()
    }

    /// Table metadata
    pub fn metadata(&self) -> &Map {
        &self.entry.metadata
    }

    /// Metadata of a signal or alias
    pub fn var_metadata(&self, name: &str) -> Option<&Map> {
        self.entry.var_metadata.get(name)
    }

    /// Values of a signal, or of an alias after its transform
    pub fn data(&self, name: &str) -> Result<Vec<Value>> {
        let (target, transform) = match self.entry.aliases.get(name) {
            Some(alias) => (
                alias.of.as_str(),
                alias.transform.as_deref().and_then(Transform::parse),
            ),
            None if self.entry.indices.contains_key(name) => (name, None),
            None => return Err(Error::unknown_signal(self.name.clone(), name)),
        };

        let block = self
            .entry
            .indices
            .get(target)
            .copied()
            .ok_or_else(|| Error::malformed(format!("no index for {}.{}", self.name, target)))?;
        if !block.is_written() {
            return Err(Error::MissingData(vec![format!("{}.{}", self.name, target)]));
        }

        let values = self.reader.read_block(block)?;
        let type_name = values.type_name();
        let values = values.into_array().ok_or_else(|| {
            Error::malformed(format!(
                "block of {}.{} is {}, not Array",
                self.name, target, type_name
            ))
        })?;
        recon_core::apply_optional(transform.as_ref(), values)
    }
}

/// Read access to one object
pub struct ObjectView<'a, R: Read + Seek> {
    reader: &'a MeldReader<R>,
    name: String,
    entry: &'a ObjectEntry,
    data: OnceCell<Map>,
}

impl<'a, R: Read + Seek> ObjectView<'a, R> {
    /// Object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object metadata, resident from the header
    pub fn metadata(&self) -> &Map {
        &self.entry.metadata
    }

    /// Field map, decoded on first access
    pub fn data(&self) -> Result<&Map> {
        self.data.get_or_try_init(|| {
            if !self.entry.block.is_written() {
                return Err(Error::MissingData(vec![self.name.clone()]));
            }
            let value = self.reader.read_block(self.entry.block)?;
            let type_name = value.type_name();
            value.into_object().ok_or_else(|| {
                Error::malformed(format!(
                    "block of object {} is {}, not Object",
                    self.name, type_name
                ))
            })
        })
    }
}
