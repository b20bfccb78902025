//! Wall reader
//!
//! Nothing in a Wall file is indexed. Every table or object read scans the
//! journal from the end of the header to end-of-file and keeps the records
//! tagged with the requested name:
//!
//! - tables accumulate: each record is one more row
//! - objects merge: later fields overwrite earlier ones

use crate::config::WallConfig;
use crate::header::{WallHeader, WallTable, WALL_MAGIC};
use crate::record::Record;
use parking_lot::Mutex;
use recon_core::{apply_optional, Error, Map, Result, Transform, Value, ValueType};
use recon_format::{
    read_exact_vec, read_len, read_len_or_eof, read_magic, BlockEncoding, DEFAULT_ZSTD_LEVEL,
};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

/// Reader for Wall journals
pub struct WallReader<R: Read + Seek> {
    source: Mutex<R>,
    header: WallHeader,
    header_len: usize,
    /// Offset of the first journal record
    start: u64,
    encoding: BlockEncoding,
}

impl WallReader<BufReader<File>> {
    /// Open a Wall file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        WallReader::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> WallReader<R> {
    /// Open with the default serializer
    pub fn open(source: R) -> Result<Self> {
        Self::open_with_config(source, &WallConfig::default())
    }

    /// Open with the serializer named in `config`
    pub fn open_with_config(mut source: R, config: &WallConfig) -> Result<Self> {
        config.validate()?;
        let encoding = BlockEncoding::for_container(&config.serializer, false, DEFAULT_ZSTD_LEVEL)?;

        source.seek(SeekFrom::Start(0))?;
        read_magic(&mut source, WALL_MAGIC)?;
        let header_len = read_len(&mut source)?;
        let bytes = read_exact_vec(&mut source, header_len)?;
        let header = WallHeader::from_value(&encoding.decode_header(&bytes)?)?;
        let start = source.stream_position()?;

        info!(
            target: "recon::wall",
            header_len,
            tables = header.tables.len(),
            objects = header.objects.len(),
            "Opened wall file"
        );

        Ok(WallReader {
            source: Mutex::new(source),
            header,
            header_len,
            start,
            encoding,
        })
    }

    /// Container metadata
    pub fn metadata(&self) -> &Map {
        &self.header.metadata
    }

    /// Table names
    pub fn tables(&self) -> Vec<&str> {
        self.header.tables.keys().map(String::as_str).collect()
    }

    /// Object names
    pub fn objects(&self) -> Vec<&str> {
        self.header.objects.keys().map(String::as_str).collect()
    }

    /// Decoded header
    pub fn header(&self) -> &WallHeader {
        &self.header
    }

    /// Length of the encoded header in bytes
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// View of one table
    pub fn read_table(&self, name: &str) -> Result<WallTableView<'_, R>> {
        let entry = self.header.tables.get(name).ok_or_else(|| {
            Error::UnknownName(format!(
                "no table named {}, options are: {}",
                name,
                self.tables().join(", ")
            ))
        })?;
        Ok(WallTableView {
            reader: self,
            name: name.to_string(),
            entry,
        })
    }

    /// Rebuild one object by merging its journaled fields in file order
    pub fn read_object(&self, name: &str) -> Result<WallObjectView> {
        let metadata = self.header.objects.get(name).ok_or_else(|| {
            Error::UnknownName(format!(
                "no object named {}, options are: {}",
                name,
                self.objects().join(", ")
            ))
        })?;

        let mut data = Map::new();
        for payload in self.entries(name)? {
            let type_name = payload.type_name();
            let fields = payload.into_object().ok_or_else(|| {
                Error::malformed(format!(
                    "record for object {} is {}, not Object",
                    name, type_name
                ))
            })?;
            data.extend(fields);
        }

        Ok(WallObjectView {
            name: name.to_string(),
            metadata: metadata.clone(),
            data,
        })
    }

    /// Every journal record in file order
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        self.scan(|record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    /// Payloads of the records tagged `name`, in file order
    fn entries(&self, name: &str) -> Result<Vec<Value>> {
        let mut matched = Vec::new();
        let mut skipped = 0usize;
        self.scan(|record| {
            if record.name == name {
                matched.push(record.payload);
            } else {
                skipped += 1;
            }
            Ok(())
        })?;
        debug!(
            target: "recon::wall",
            name,
            matched = matched.len(),
            skipped,
            "Scanned journal"
        );
        Ok(matched)
    }

    fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<()>,
    {
        let mut source = self.source.lock();
        source.seek(SeekFrom::Start(self.start))?;
        while let Some(len) = read_len_or_eof(&mut *source)? {
            let bytes = read_exact_vec(&mut *source, len)?;
            let record = Record::from_value(self.encoding.decode_block(&bytes)?)?;
            visit(record)?;
        }
        Ok(())
    }
}

/// Read access to one Wall table
pub struct WallTableView<'a, R: Read + Seek> {
    reader: &'a WallReader<R>,
    name: String,
    entry: &'a WallTable,
}

impl<'a, R: Read + Seek> WallTableView<'a, R> {
    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored signals in row order
    pub fn signals(&self) -> &[String] {
        &self.entry.signals
    }

    /// Alias names
    pub fn aliases(&self) -> Vec<&str> {
        self.entry.aliases.keys().map(String::as_str).collect()
    }

    /// Signals followed by aliases
    pub fn variables(&self) -> Vec<&str> {
        self.entry
            .signals
            .iter()
            .map(String::as_str)
            .chain(self.aliases())
            .collect()
    }

    /// Target signal of an alias
    pub fn alias_of(&self, alias: &str) -> Option<&str> {
        self.entry.aliases.get(alias).map(|a| a.of.as_str())
    }

    /// Parsed transform of an alias; `None` is the identity
    pub fn alias_transform(&self, alias: &str) -> Option<Transform> {
        self.alias_transform_string(alias).and_then(Transform::parse)
    }

    /// Raw transform descriptor of an alias
    pub fn alias_transform_string(&self, alias: &str) -> Option<&str> {
        self.entry
            .aliases
            .get(alias)
            .and_then(|a| a.transform.as_deref())
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

    /// Every row of the table in file order
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        let width = self.entry.signals.len();
        self.reader
            .entries(&self.name)?
            .into_iter()
            .map(|payload| {
                let type_name = payload.type_name();
                let row = payload.into_array().ok_or_else(|| {
                    Error::malformed(format!(
                        "row of table {} is {}, not Array",
                        self.name, type_name
                    ))
                })?;
                if row.len() != width {
                    return Err(Error::malformed(format!(
                        "row of table {} has {} values, expected {}",
                        self.name,
                        row.len(),
                        width
                    )));
                }
                Ok(row)
            })
            .collect()
    }

    /// Column of a signal, or of an alias after its transform
    pub fn data(&self, name: &str) -> Result<Vec<Value>> {
        let (signal, transform) = if self.entry.signals.iter().any(|s| s == name) {
            (name, None)
        } else if let Some(alias) = self.entry.aliases.get(name) {
            (alias.of.as_str(), self.alias_transform(name))
        } else {
            return Err(Error::unknown_signal(self.name.clone(), name));
        };
        let index = self
            .entry
            .signals
            .iter()
            .position(|s| s == signal)
            .ok_or_else(|| Error::unknown_signal(self.name.clone(), signal))?;

        let column = self
            .rows()?
            .into_iter()
            .map(|mut row| row.swap_remove(index))
            .collect();
        apply_optional(transform.as_ref(), column)
    }
}

/// A Wall object rebuilt from its journal records
#[derive(Debug, Clone, PartialEq)]
pub struct WallObjectView {
    name: String,
    metadata: Map,
    data: Map,
}

impl WallObjectView {
    /// Object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object metadata from the header
    pub fn metadata(&self) -> &Map {
        &self.metadata
    }

    /// Merged field map
    pub fn data(&self) -> &Map {
        &self.data
    }
}
