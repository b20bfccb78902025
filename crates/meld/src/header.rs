//! Meld header model
//!
//! The header is the only structural information in a Meld file. It is built
//! from a frozen [`Schema`] at finalize, patched in place as blocks are
//! appended, and decoded once when a reader opens the file.
//!
//! # Layout
//!
//! ```text
//! {
//!   "metadata": { .. },
//!   "tables": {
//!     <table>: {
//!       "v": [signals.., aliases..],
//!       "indices": { <variable>: BlockRef },
//!       "aliases": { <alias>: { "of": <signal>, "t": <descriptor>? } },
//!       "metadata": { .. },
//!       "var_metadata": { <variable>: { .. } },
//!       "types": { <signal>: <type name> }
//!     }
//!   },
//!   "objects": { <object>: { "ref": BlockRef, "metadata": { .. } } },
//!   "comp": bool,
//!   "single": bool
//! }
//! ```
//!
//! Every `BlockRef` has a fixed encoded width, so the encoded header length
//! depends only on the structure, never on which blocks have been written.

use recon_core::{Error, Map, Result, Schema, Value, ValueType};
use recon_format::fields::{
    bool_field, expect_map, field, map_field, map_field_or_empty, nested_maps, opt_bool_field,
    opt_string_field, string_field, string_list_field,
};
use recon_format::BlockRef;
use std::collections::BTreeMap;

/// Identifier every Meld file starts with
pub const MELD_MAGIC: &[u8] = b"recon:meld:v2";

const METADATA: &str = "metadata";
const TABLES: &str = "tables";
const OBJECTS: &str = "objects";
const COMP: &str = "comp";
const SINGLE: &str = "single";

const VARIABLES: &str = "v";
const INDICES: &str = "indices";
const ALIASES: &str = "aliases";
const VAR_METADATA: &str = "var_metadata";
const TYPES: &str = "types";

const OF: &str = "of";
const TRANSFORM: &str = "t";

const REF: &str = "ref";

/// Header entry of an alias
#[derive(Debug, Clone, PartialEq)]
pub struct AliasEntry {
    /// Target signal
    pub of: String,
    /// Transform descriptor, if any
    pub transform: Option<String>,
}

/// Header entry of a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableEntry {
    /// Signals then aliases, each in declaration order
    pub variables: Vec<String>,
    /// Block location of every variable; aliases share their target's
    pub indices: BTreeMap<String, BlockRef>,
    /// Alias definitions
    pub aliases: BTreeMap<String, AliasEntry>,
    /// Table metadata
    pub metadata: Map,
    /// Per-variable metadata
    pub var_metadata: BTreeMap<String, Map>,
    /// Declared signal types
    pub types: BTreeMap<String, ValueType>,
}

impl TableEntry {
    /// Whether `name` is an alias
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Stored signals in declaration order
    pub fn signals(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables
            .iter()
            .map(String::as_str)
            .filter(move |v| !self.aliases.contains_key(*v))
    }
}

/// Header entry of an object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectEntry {
    /// Block location of the field map
    pub block: BlockRef,
    /// Object metadata
    pub metadata: Map,
}

/// Decoded Meld header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeldHeader {
    /// Container metadata
    pub metadata: Map,
    /// Tables by name
    pub tables: BTreeMap<String, TableEntry>,
    /// Objects by name
    pub objects: BTreeMap<String, ObjectEntry>,
    /// Whether data blocks are compressed
    pub compressed: bool,
    /// Whether signal floats were stored as f32
    pub single_precision: bool,
}

impl MeldHeader {
    /// Build the header for a finalized schema; every block is unwritten.
    pub fn from_schema(schema: &Schema, compressed: bool) -> Self {
        let tables = schema
            .tables()
            .iter()
            .map(|(name, def)| {
                let variables = def.variables();
                let indices = variables
                    .iter()
                    .map(|v| (v.clone(), BlockRef::UNWRITTEN))
                    .collect();
                let aliases = def
                    .aliases()
                    .iter()
                    .map(|a| {
                        (
                            a.name.clone(),
                            AliasEntry {
                                of: a.of.clone(),
                                transform: a.transform.map(|t| t.descriptor()),
                            },
                        )
                    })
                    .collect();
                let types = def
                    .signals()
                    .iter()
                    .filter_map(|s| s.value_type.map(|t| (s.name.clone(), t)))
                    .collect();
                let entry = TableEntry {
                    variables,
                    indices,
                    aliases,
                    metadata: def.metadata().clone(),
                    var_metadata: def.var_metadata().clone(),
                    types,
                };
                (name.clone(), entry)
            })
            .collect();

        let objects = schema
            .objects()
            .iter()
            .map(|(name, def)| {
                let entry = ObjectEntry {
                    block: BlockRef::UNWRITTEN,
                    metadata: def.metadata.clone(),
                };
                (name.clone(), entry)
            })
            .collect();

        MeldHeader {
            metadata: schema.metadata().clone(),
            tables,
            objects,
            compressed,
            single_precision: false,
        }
    }

    /// Look up a table
    pub fn table(&self, name: &str) -> Result<&TableEntry> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownName(format!("no table named {}", name)))
    }

    /// Look up an object
    pub fn object(&self, name: &str) -> Result<&ObjectEntry> {
        self.objects
            .get(name)
            .ok_or_else(|| Error::UnknownName(format!("no object named {}", name)))
    }

    /// Record the block of `signal` and every alias of it
    pub fn set_signal_block(&mut self, table: &str, signal: &str, block: BlockRef) -> Result<()> {
        let entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownName(format!("no table named {}", table)))?;
        let targets: Vec<String> = std::iter::once(signal.to_string())
            .chain(
                entry
                    .aliases
                    .iter()
                    .filter(|(_, a)| a.of == signal)
                    .map(|(name, _)| name.clone()),
            )
            .collect();
        for name in targets {
            entry.indices.insert(name, block);
        }
        Ok(())
    }

    /// Record the block of an object
    pub fn set_object_block(&mut self, object: &str, block: BlockRef) -> Result<()> {
        let entry = self
            .objects
            .get_mut(object)
            .ok_or_else(|| Error::UnknownName(format!("no object named {}", object)))?;
        entry.block = block;
        Ok(())
    }

    /// Signals and objects whose block is still the sentinel, as
    /// `table.signal` and `object` names
    pub fn unwritten(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for (tname, table) in &self.tables {
            for signal in table.signals() {
                let written = table
                    .indices
                    .get(signal)
                    .map(BlockRef::is_written)
                    .unwrap_or(false);
                if !written {
                    missing.push(format!("{}.{}", tname, signal));
                }
            }
        }
        for (oname, object) in &self.objects {
            if !object.block.is_written() {
                missing.push(oname.clone());
            }
        }
        missing
    }

    /// Generic value form handed to the serializer
    pub fn to_value(&self) -> Value {
        let tables: Map = self
            .tables
            .iter()
            .map(|(name, t)| (name.clone(), table_to_value(t)))
            .collect();
        let objects: Map = self
            .objects
            .iter()
            .map(|(name, o)| {
                let mut m = Map::new();
                m.insert(REF.into(), o.block.to_value());
                m.insert(METADATA.into(), Value::Object(o.metadata.clone()));
                (name.clone(), Value::Object(m))
            })
            .collect();

        let mut root = Map::new();
        root.insert(METADATA.into(), Value::Object(self.metadata.clone()));
        root.insert(TABLES.into(), Value::Object(tables));
        root.insert(OBJECTS.into(), Value::Object(objects));
        root.insert(COMP.into(), Value::Bool(self.compressed));
        root.insert(SINGLE.into(), Value::Bool(self.single_precision));
        Value::Object(root)
    }

    /// Parse a decoded header
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = expect_map(value, "header")?;

        let mut tables = BTreeMap::new();
        for (name, v) in map_field(root, TABLES)? {
            tables.insert(name.clone(), table_from_value(name, v)?);
        }

        let mut objects = BTreeMap::new();
        for (name, v) in map_field(root, OBJECTS)? {
            let m = expect_map(v, name)?;
            let entry = ObjectEntry {
                block: BlockRef::from_value(field(m, REF)?)?,
                metadata: map_field_or_empty(m, METADATA)?,
            };
            objects.insert(name.clone(), entry);
        }

        Ok(MeldHeader {
            metadata: map_field_or_empty(root, METADATA)?,
            tables,
            objects,
            compressed: bool_field(root, COMP)?,
            single_precision: opt_bool_field(root, SINGLE)?,
        })
    }
}

fn table_to_value(t: &TableEntry) -> Value {
    let variables: Value = t.variables.iter().map(String::as_str).collect();
    let indices: Map = t
        .indices
        .iter()
        .map(|(name, r)| (name.clone(), r.to_value()))
        .collect();
    let aliases: Map = t
        .aliases
        .iter()
        .map(|(name, a)| {
            let mut m = Map::new();
            m.insert(OF.into(), Value::from(a.of.as_str()));
            if let Some(t) = &a.transform {
                m.insert(TRANSFORM.into(), Value::from(t.as_str()));
            }
            (name.clone(), Value::Object(m))
        })
        .collect();
    let var_metadata: Map = t
        .var_metadata
        .iter()
        .map(|(name, md)| (name.clone(), Value::Object(md.clone())))
        .collect();
    let types: Map = t
        .types
        .iter()
        .map(|(name, ty)| (name.clone(), Value::from(ty.name())))
        .collect();

    let mut m = Map::new();
    m.insert(VARIABLES.into(), variables);
    m.insert(INDICES.into(), Value::Object(indices));
    m.insert(ALIASES.into(), Value::Object(aliases));
    m.insert(METADATA.into(), Value::Object(t.metadata.clone()));
    m.insert(VAR_METADATA.into(), Value::Object(var_metadata));
    m.insert(TYPES.into(), Value::Object(types));
    Value::Object(m)
}

fn table_from_value(name: &str, value: &Value) -> Result<TableEntry> {
    let m = expect_map(value, name)?;

    let mut indices = BTreeMap::new();
    for (var, r) in map_field(m, INDICES)? {
        indices.insert(var.clone(), BlockRef::from_value(r)?);
    }

    let mut aliases = BTreeMap::new();
    for (alias, a) in map_field_or_empty(m, ALIASES)? {
        let am = expect_map(&a, &alias)?;
        let entry = AliasEntry {
            of: string_field(am, OF)?,
            transform: opt_string_field(am, TRANSFORM)?,
        };
        aliases.insert(alias, entry);
    }

    let mut types = BTreeMap::new();
    for (signal, t) in map_field_or_empty(m, TYPES)? {
        let ty = t
            .as_str()
            .and_then(ValueType::from_name)
            .ok_or_else(|| Error::malformed(format!("bad type for signal {}", signal)))?;
        types.insert(signal, ty);
    }

    Ok(TableEntry {
        variables: string_list_field(m, VARIABLES)?,
        indices,
        aliases,
        metadata: map_field_or_empty(m, METADATA)?,
        var_metadata: nested_maps(m, VAR_METADATA)?.into_iter().collect(),
        types,
    })
}
