//! Alias transform algebra
//!
//! A transform maps the decoded values of a signal to the values of an alias
//! of that signal. Transforms are applied at read time and never materialized
//! on disk; the header stores only their compact descriptor string.
//!
//! ## Descriptor grammar
//!
//! ```text
//! descriptor := "inv" | "aff(" number "," number ")"
//! ```
//!
//! Whitespace around tokens is ignored. `aff(s,o)` maps `v` to `v*s+o`,
//! `inv` negates numbers and logically negates booleans.

use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;

/// Executable form of an alias transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// `v * scale + offset` for numeric values
    Affine {
        /// Multiplier
        scale: f64,
        /// Additive offset
        offset: f64,
    },
    /// Arithmetic negation for numbers, logical not for booleans
    Inverse,
}

impl Transform {
    /// Create an affine transform
    pub fn affine(scale: f64, offset: f64) -> Self {
        Transform::Affine { scale, offset }
    }

    /// Parse a descriptor.
    ///
    /// Returns `None` for absent or unparsable descriptors; callers treat
    /// `None` as the identity.
    pub fn parse(descriptor: &str) -> Option<Transform> {
        let text = descriptor.trim();
        if text == "inv" {
            return Some(Transform::Inverse);
        }
        let args = text.strip_prefix("aff")?.trim_start();
        let args = args.strip_prefix('(')?.strip_suffix(')')?;
        let (scale, offset) = args.split_once(',')?;
        let scale = scale.trim().parse::<f64>().ok()?;
        let offset = offset.trim().parse::<f64>().ok()?;
        Some(Transform::Affine { scale, offset })
    }

    /// Parse a descriptor, failing with `InvalidTransform` instead of `None`
    pub fn parse_strict(descriptor: &str) -> Result<Transform> {
        Self::parse(descriptor).ok_or_else(|| Error::InvalidTransform(descriptor.to_string()))
    }

    /// Compact descriptor stored in container headers
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Apply to a single value
    pub fn apply_value(&self, value: &Value) -> Result<Value> {
        match self {
            Transform::Affine { scale, offset } => match value {
                Value::Int(i) => Ok(Value::Float(*i as f64 * scale + offset)),
                Value::Float(f) => Ok(Value::Float(f * scale + offset)),
                other => Err(Error::type_mismatch("Int or Float", other.type_name())),
            },
            Transform::Inverse => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                Value::Int(i) => Ok(i
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or(Value::Float(-(*i as f64)))),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(Error::type_mismatch("Bool, Int or Float", other.type_name())),
            },
        }
    }

    /// Apply element-wise to a sequence
    pub fn apply(&self, values: &[Value]) -> Result<Vec<Value>> {
        values.iter().map(|v| self.apply_value(v)).collect()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Affine { scale, offset } => write!(f, "aff({:?},{:?})", scale, offset),
            Transform::Inverse => f.write_str("inv"),
        }
    }
}

/// Apply an optional transform; `None` is the identity
pub fn apply_optional(transform: Option<&Transform>, values: Vec<Value>) -> Result<Vec<Value>> {
    match transform {
        Some(t) => t.apply(&values),
        None => Ok(values),
    }
}
