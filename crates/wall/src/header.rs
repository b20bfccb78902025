//! Wall header model
//!
//! Unlike a Meld header, a Wall header carries no block locations: data is
//! found only by scanning the journal.
//!
//! ```text
//! {
//!   "fmeta": { .. },
//!   "tabs": {
//!     <table>: {
//!       "sigs": [signal..],
//!       "als": { <alias>: { "s": <signal>, "t": <descriptor>? } },
//!       "tmeta": { .. },
//!       "vmeta": { <variable>: { .. } },
//!       "types": { <signal>: <type name> }
//!     }
//!   },
//!   "objs": { <object>: { ..metadata.. } }
//! }
//! ```

use recon_core::{Error, Map, Result, Schema, Value, ValueType};
use recon_format::fields::{
    expect_map, into_map, map_field, map_field_or_empty, nested_maps, opt_string_field,
    string_field, string_list_field,
};
use std::collections::BTreeMap;

/// Identifier every Wall file starts with
pub const WALL_MAGIC: &[u8] = b"recon:wall:v01";

const H_METADATA: &str = "fmeta";
const H_TABLES: &str = "tabs";
const H_OBJECTS: &str = "objs";

const T_SIGNALS: &str = "sigs";
const T_ALIASES: &str = "als";
const T_METADATA: &str = "tmeta";
const T_VMETADATA: &str = "vmeta";
const T_TYPES: &str = "types";

const A_OF: &str = "s";
const A_TRANSFORM: &str = "t";

/// Alias entry of a Wall table
#[derive(Debug, Clone, PartialEq)]
pub struct WallAlias {
    /// Target signal
    pub of: String,
    /// Transform descriptor
    pub transform: Option<String>,
}

/// Table entry of a Wall header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WallTable {
    /// Stored signals; row values follow this order
    pub signals: Vec<String>,
    /// Aliases by name
    pub aliases: BTreeMap<String, WallAlias>,
    /// Table metadata
    pub metadata: Map,
    /// Per-variable metadata
    pub var_metadata: BTreeMap<String, Map>,
    /// Declared signal types
    pub types: BTreeMap<String, ValueType>,
}

/// Decoded Wall header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WallHeader {
    /// Container metadata
    pub metadata: Map,
    /// Tables by name
    pub tables: BTreeMap<String, WallTable>,
    /// Object metadata by object name
    pub objects: BTreeMap<String, Map>,
}

impl WallHeader {
    /// Build from a frozen schema
    pub fn from_schema(schema: &Schema) -> Self {
        let tables = schema
            .tables()
            .iter()
            .map(|(name, def)| {
                let table = WallTable {
                    signals: def.signals().iter().map(|s| s.name.clone()).collect(),
                    aliases: def
                        .aliases()
                        .iter()
                        .map(|a| {
                            let alias = WallAlias {
                                of: a.of.clone(),
                                transform: a.transform.map(|t| t.descriptor()),
                            };
                            (a.name.clone(), alias)
                        })
                        .collect(),
                    metadata: def.metadata().clone(),
                    var_metadata: def.var_metadata().clone(),
                    types: def
                        .signals()
                        .iter()
                        .filter_map(|s| s.value_type.map(|t| (s.name.clone(), t)))
                        .collect(),
                };
                (name.clone(), table)
            })
            .collect();
        let objects = schema
            .objects()
            .iter()
            .map(|(name, def)| (name.clone(), def.metadata.clone()))
            .collect();
        WallHeader {
            metadata: schema.metadata().clone(),
            tables,
            objects,
        }
    }

    /// Look up a table
    pub fn table(&self, name: &str) -> Result<&WallTable> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownName(format!("no table named {}", name)))
    }

    /// Value form handed to the serializer
    pub fn to_value(&self) -> Value {
        let tables: Map = self
            .tables
            .iter()
            .map(|(name, t)| {
                let aliases: Map = t
                    .aliases
                    .iter()
                    .map(|(alias, a)| {
                        let mut m = Map::new();
                        m.insert(A_OF.into(), Value::from(a.of.as_str()));
                        if let Some(tr) = &a.transform {
                            m.insert(A_TRANSFORM.into(), Value::from(tr.as_str()));
                        }
                        (alias.clone(), Value::Object(m))
                    })
                    .collect();
                let vmeta: Map = t
                    .var_metadata
                    .iter()
                    .map(|(v, md)| (v.clone(), Value::Object(md.clone())))
                    .collect();
                let types: Map = t
                    .types
                    .iter()
                    .map(|(s, ty)| (s.clone(), Value::from(ty.name())))
                    .collect();

                let mut m = Map::new();
                m.insert(T_SIGNALS.into(), t.signals.iter().map(String::as_str).collect());
                m.insert(T_ALIASES.into(), Value::Object(aliases));
                m.insert(T_METADATA.into(), Value::Object(t.metadata.clone()));
                m.insert(T_VMETADATA.into(), Value::Object(vmeta));
                m.insert(T_TYPES.into(), Value::Object(types));
                (name.clone(), Value::Object(m))
            })
            .collect();
        let objects: Map = self
            .objects
            .iter()
            .map(|(name, md)| (name.clone(), Value::Object(md.clone())))
            .collect();

        let mut root = Map::new();
        root.insert(H_METADATA.into(), Value::Object(self.metadata.clone()));
        root.insert(H_TABLES.into(), Value::Object(tables));
        root.insert(H_OBJECTS.into(), Value::Object(objects));
        Value::Object(root)
    }

    /// Parse a decoded header.
    ///
    /// Missing metadata sections read as empty, as older writers omitted them.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = expect_map(value, "header")?;

        let mut tables = BTreeMap::new();
        for (name, v) in map_field(root, H_TABLES)? {
            let m = expect_map(v, name)?;

            let mut aliases = BTreeMap::new();
            for (alias, a) in map_field_or_empty(m, T_ALIASES)? {
                let am = into_map(a, &alias)?;
                let entry = WallAlias {
                    of: string_field(&am, A_OF)?,
                    transform: opt_string_field(&am, A_TRANSFORM)?,
                };
                aliases.insert(alias, entry);
            }

            let mut types = BTreeMap::new();
            for (signal, t) in map_field_or_empty(m, T_TYPES)? {
                let ty = t
                    .as_str()
                    .and_then(ValueType::from_name)
                    .ok_or_else(|| Error::malformed(format!("bad type for signal {}", signal)))?;
                types.insert(signal, ty);
            }

            let table = WallTable {
                signals: string_list_field(m, T_SIGNALS)?,
                aliases,
                metadata: map_field_or_empty(m, T_METADATA)?,
                var_metadata: nested_maps(m, T_VMETADATA)?.into_iter().collect(),
                types,
            };
            tables.insert(name.clone(), table);
        }

        Ok(WallHeader {
            metadata: map_field_or_empty(root, H_METADATA)?,
            tables,
            objects: nested_maps(root, H_OBJECTS)?.into_iter().collect(),
        })
    }
}
