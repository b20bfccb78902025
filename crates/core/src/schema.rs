//! Table and object definition model
//!
//! The builder-side description of a container: tables (ordered signals,
//! aliases, table and per-variable metadata) and objects (metadata only).
//! A [`Schema`] exists only during the definition phase of a writer; once
//! frozen it rejects every structural change with `AlreadyFinalized`.
//!
//! Tables and aliases are addressed by name, never by reference, so the
//! writer, its handles and the header can all point at the same definition
//! without shared ownership.

use crate::error::{Error, Result};
use crate::transform::Transform;
use crate::value::{Map, Value, ValueType};
use std::collections::BTreeMap;

/// A stored column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDef {
    /// Signal name, unique among the table's signals and aliases
    pub name: String,
    /// Declared element type, if any
    pub value_type: Option<ValueType>,
}

impl SignalDef {
    /// Check that every element matches the declared type exactly
    pub fn check_values(&self, values: &[Value]) -> Result<()> {
        if let Some(expected) = self.value_type {
            for value in values {
                self.check_value_as(expected, value)?;
            }
        }
        Ok(())
    }

    fn check_value_as(&self, expected: ValueType, value: &Value) -> Result<()> {
        if value.value_type() != expected {
            return Err(Error::type_mismatch(
                format!("{} for signal '{}'", expected, self.name),
                value.type_name(),
            ));
        }
        Ok(())
    }
}

/// A read-time view of a signal
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDef {
    /// Alias name
    pub name: String,
    /// Target signal (never another alias)
    pub of: String,
    /// Transform applied to the target's values; `None` is the identity
    pub transform: Option<Transform>,
}

/// Definition of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    name: String,
    signals: Vec<SignalDef>,
    aliases: Vec<AliasDef>,
    metadata: Map,
    var_metadata: BTreeMap<String, Map>,
}

impl TableDef {
    /// Create an empty table definition
    pub fn new(name: impl Into<String>, metadata: Option<Map>) -> Self {
        TableDef {
            name: name.into(),
            signals: Vec::new(),
            aliases: Vec::new(),
            metadata: metadata.unwrap_or_default(),
            var_metadata: BTreeMap::new(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals in declaration order
    pub fn signals(&self) -> &[SignalDef] {
        &self.signals
    }

    /// Aliases in declaration order
    pub fn aliases(&self) -> &[AliasDef] {
        &self.aliases
    }

    /// Table-level metadata
    pub fn metadata(&self) -> &Map {
        &self.metadata
    }

    /// Per-variable metadata (signals and aliases)
    pub fn var_metadata(&self) -> &BTreeMap<String, Map> {
        &self.var_metadata
    }

    /// Look up a signal
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Position of a signal among the table's signals
    pub fn signal_index(&self, name: &str) -> Option<usize> {
        self.signals.iter().position(|s| s.name == name)
    }

    /// Look up an alias
    pub fn alias(&self, name: &str) -> Option<&AliasDef> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// Whether `name` is a signal or an alias of this table
    pub fn contains(&self, name: &str) -> bool {
        self.signal(name).is_some() || self.alias(name).is_some()
    }

    /// All variable names: signals, then aliases, each in declaration order
    pub fn variables(&self) -> Vec<String> {
        self.signals
            .iter()
            .map(|s| s.name.clone())
            .chain(self.aliases.iter().map(|a| a.name.clone()))
            .collect()
    }

    /// Aliases whose target is `signal`
    pub fn aliases_of<'a>(&'a self, signal: &'a str) -> impl Iterator<Item = &'a AliasDef> + 'a {
        self.aliases.iter().filter(move |a| a.of == signal)
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if self.signal(name).is_some() {
            return Err(Error::DuplicateName(format!(
                "'{}' is already the name of a signal in table {}",
                name, self.name
            )));
        }
        if self.alias(name).is_some() {
            return Err(Error::DuplicateName(format!(
                "'{}' is already the name of an alias in table {}",
                name, self.name
            )));
        }
        Ok(())
    }

    /// Add a signal
    pub fn add_signal(
        &mut self,
        name: impl Into<String>,
        metadata: Option<Map>,
        value_type: Option<ValueType>,
    ) -> Result<()> {
        let name = name.into();
        self.check_name(&name)?;
        if let Some(md) = metadata {
            self.var_metadata.insert(name.clone(), md);
        }
        self.signals.push(SignalDef { name, value_type });
        Ok(())
    }

    /// Add an alias of a previously added signal
    pub fn add_alias(
        &mut self,
        name: impl Into<String>,
        of: &str,
        transform: Option<&str>,
        metadata: Option<Map>,
    ) -> Result<()> {
        let name = name.into();
        self.check_name(&name)?;
        if self.signal(of).is_none() {
            return Err(Error::unknown_signal(self.name.clone(), of));
        }
        let transform = transform.map(Transform::parse_strict).transpose()?;
        if let Some(md) = metadata {
            self.var_metadata.insert(name.clone(), md);
        }
        self.aliases.push(AliasDef {
            name,
            of: of.to_string(),
            transform,
        });
        Ok(())
    }

    /// Merge entries into the metadata of a signal or alias
    pub fn set_var_metadata(&mut self, name: &str, metadata: Map) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::unknown_signal(self.name.clone(), name));
        }
        self.var_metadata
            .entry(name.to_string())
            .or_default()
            .extend(metadata);
        Ok(())
    }

    /// Mutable table-level metadata
    pub fn metadata_mut(&mut self) -> &mut Map {
        &mut self.metadata
    }
}

/// Definition-phase handle for one table.
///
/// Returned by both container writers; each method forwards to the
/// underlying [`TableDef`] and returns the builder for chaining.
pub struct TableBuilder<'a> {
    def: &'a mut TableDef,
}

impl<'a> TableBuilder<'a> {
    /// Wrap a table definition
    pub fn new(def: &'a mut TableDef) -> Self {
        TableBuilder { def }
    }

    /// Table name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Add a signal
    pub fn add_signal(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        self.def.add_signal(name, None, None)?;
        Ok(self)
    }

    /// Add a signal with metadata and/or a declared element type
    pub fn add_signal_with(
        &mut self,
        name: impl Into<String>,
        metadata: Option<Map>,
        value_type: Option<ValueType>,
    ) -> Result<&mut Self> {
        self.def.add_signal(name, metadata, value_type)?;
        Ok(self)
    }

    /// Add an alias of a signal of this table
    pub fn add_alias(
        &mut self,
        name: impl Into<String>,
        of: &str,
        transform: Option<&str>,
    ) -> Result<&mut Self> {
        self.def.add_alias(name, of, transform, None)?;
        Ok(self)
    }

    /// Add an alias with metadata
    pub fn add_alias_with(
        &mut self,
        name: impl Into<String>,
        of: &str,
        transform: Option<&str>,
        metadata: Option<Map>,
    ) -> Result<&mut Self> {
        self.def.add_alias(name, of, transform, metadata)?;
        Ok(self)
    }

    /// Replace the table metadata
    pub fn set_metadata(&mut self, metadata: Map) -> &mut Self {
        *self.def.metadata_mut() = metadata;
        self
    }

    /// Merge entries into a variable's metadata
    pub fn set_var_metadata(&mut self, name: &str, metadata: Map) -> Result<&mut Self> {
        self.def.set_var_metadata(name, metadata)?;
        Ok(self)
    }
}

/// Definition of one object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    /// Object name
    pub name: String,
    /// Object-level metadata
    pub metadata: Map,
}

/// Everything a writer knows before finalize
#[derive(Debug, Clone, Default)]
pub struct Schema {
    metadata: Map,
    tables: BTreeMap<String, TableDef>,
    objects: BTreeMap<String, ObjectDef>,
    frozen: bool,
}

impl Schema {
    /// Create an empty, unfrozen schema
    pub fn new(metadata: Map) -> Self {
        Schema {
            metadata,
            ..Default::default()
        }
    }

    /// Reject further structural changes
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether [`Schema::freeze`] was called
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_open(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::AlreadyFinalized);
        }
        Ok(())
    }

    /// Table and object names share one namespace
    fn check_name(&self, name: &str) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::DuplicateName(format!(
                "container already contains a table named {}",
                name
            )));
        }
        if self.objects.contains_key(name) {
            return Err(Error::DuplicateName(format!(
                "container already contains an object named {}",
                name
            )));
        }
        Ok(())
    }

    /// Register a table
    pub fn add_table(&mut self, name: &str, metadata: Option<Map>) -> Result<&mut TableDef> {
        self.ensure_open()?;
        self.check_name(name)?;
        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| TableDef::new(name, metadata)))
    }

    /// Register an object
    pub fn add_object(&mut self, name: &str, metadata: Option<Map>) -> Result<&mut ObjectDef> {
        self.ensure_open()?;
        self.check_name(name)?;
        Ok(self
            .objects
            .entry(name.to_string())
            .or_insert_with(|| ObjectDef {
                name: name.to_string(),
                metadata: metadata.unwrap_or_default(),
            }))
    }

    /// Container metadata
    pub fn metadata(&self) -> &Map {
        &self.metadata
    }

    /// Mutable container metadata (definition phase only)
    pub fn metadata_mut(&mut self) -> Result<&mut Map> {
        self.ensure_open()?;
        Ok(&mut self.metadata)
    }

    /// All tables, ordered by name
    pub fn tables(&self) -> &BTreeMap<String, TableDef> {
        &self.tables
    }

    /// All objects, ordered by name
    pub fn objects(&self) -> &BTreeMap<String, ObjectDef> {
        &self.objects
    }

    /// Look up a table
    pub fn table(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownName(format!("no table named {}", name)))
    }

    /// Mutable table definition (definition phase only)
    pub fn table_mut(&mut self, name: &str) -> Result<&mut TableDef> {
        self.ensure_open()?;
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::UnknownName(format!("no table named {}", name)))
    }

    /// Look up an object
    pub fn object(&self, name: &str) -> Result<&ObjectDef> {
        self.objects
            .get(name)
            .ok_or_else(|| Error::UnknownName(format!("no object named {}", name)))
    }
}
