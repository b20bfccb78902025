//! Journal records and row arguments.
//!
//! Every journal record is a single-key map `{name: payload}`:
//! a table row (`Array` of values in signal order) or a batch of object
//! fields (`Object`).

use crate::header::WallTable;
use recon_core::{Error, Map, Result, Value};

/// One decoded journal record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Table or object the record belongs to
    pub name: String,
    /// Row values or object fields
    pub payload: Value,
}

impl Record {
    /// Create a record
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Record {
            name: name.into(),
            payload,
        }
    }

    /// Encoded form: `{name: payload}`
    pub fn to_value(&self) -> Value {
        let mut m = Map::new();
        m.insert(self.name.clone(), self.payload.clone());
        Value::Object(m)
    }

    /// Parse a decoded record
    pub fn from_value(value: Value) -> Result<Self> {
        let type_name = value.type_name();
        let map = value.into_object().ok_or_else(|| {
            Error::malformed(format!("journal record must be Object, got {}", type_name))
        })?;
        if map.len() != 1 {
            return Err(Error::malformed(format!(
                "journal record must have exactly one key, found {}",
                map.len()
            )));
        }
        let (name, payload) = map
            .into_iter()
            .next()
            .ok_or_else(|| Error::malformed("empty journal record"))?;
        Ok(Record { name, payload })
    }
}

/// Arguments of one `add_row` call.
///
/// Either positional (values in signal order) or keyed (one value per
/// signal name); supplying both is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    positional: Vec<Value>,
    keyed: Map,
}

impl Row {
    /// Build from raw parts
    pub fn new(positional: Vec<Value>, keyed: Map) -> Self {
        Row { positional, keyed }
    }

    /// Values in signal order
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Row {
            positional: values.into_iter().map(Into::into).collect(),
            keyed: Map::new(),
        }
    }

    /// Values keyed by signal name
    pub fn keyed<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Row {
            positional: Vec::new(),
            keyed: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add one keyed value (builder pattern)
    pub fn with(mut self, signal: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyed.insert(signal.into(), value.into());
        self
    }

    /// Order and validate the values against a table's signals.
    pub fn resolve(self, table_name: &str, table: &WallTable) -> Result<Vec<Value>> {
        if !self.positional.is_empty() && !self.keyed.is_empty() {
            return Err(Error::InvalidArguments(
                "add_row takes either positional or keyed values, not both".to_string(),
            ));
        }

        let values = if self.keyed.is_empty() {
            if self.positional.len() != table.signals.len() {
                return Err(Error::ShapeMismatch(format!(
                    "table {} expects {} values, got {}",
                    table_name,
                    table.signals.len(),
                    self.positional.len()
                )));
            }
            self.positional
        } else {
            let extra: Vec<&str> = self
                .keyed
                .keys()
                .filter(|k| !table.signals.contains(*k))
                .map(String::as_str)
                .collect();
            if !extra.is_empty() {
                return Err(Error::ShapeMismatch(format!(
                    "values provided for undefined columns of {}: {}",
                    table_name,
                    extra.join(", ")
                )));
            }
            let missing: Vec<&str> = table
                .signals
                .iter()
                .filter(|s| !self.keyed.contains_key(*s))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(Error::ShapeMismatch(format!(
                    "missing values for columns of {}: {}",
                    table_name,
                    missing.join(", ")
                )));
            }
            let mut keyed = self.keyed;
            table
                .signals
                .iter()
                .map(|s| keyed.remove(s).unwrap_or(Value::Null))
                .collect()
        };

        for (signal, value) in table.signals.iter().zip(&values) {
            if let Some(expected) = table.types.get(signal) {
                if value.value_type() != *expected {
                    return Err(Error::type_mismatch(
                        format!("{} for signal '{}'", expected, signal),
                        value.type_name(),
                    ));
                }
            }
        }
        Ok(values)
    }
}
