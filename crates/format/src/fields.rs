//! Typed access to fields of decoded headers.
//!
//! Headers are decoded into generic [`Value`] maps. These helpers pull typed
//! fields out of them and turn any structural surprise into `MalformedData`
//! naming the offending key.

use recon_core::{Error, Map, Result, Value};

/// Interpret a value as a map
pub fn expect_map<'a>(value: &'a Value, context: &str) -> Result<&'a Map> {
    value.as_object().ok_or_else(|| {
        Error::malformed(format!(
            "{}: expected Object, got {}",
            context,
            value.type_name()
        ))
    })
}

/// Take ownership of a map value
pub fn into_map(value: Value, context: &str) -> Result<Map> {
    let type_name = value.type_name();
    value
        .into_object()
        .ok_or_else(|| Error::malformed(format!("{}: expected Object, got {}", context, type_name)))
}

/// Required field
pub fn field<'a>(map: &'a Map, key: &str) -> Result<&'a Value> {
    map.get(key)
        .ok_or_else(|| Error::malformed(format!("missing header field '{}'", key)))
}

/// Required map field
pub fn map_field<'a>(map: &'a Map, key: &str) -> Result<&'a Map> {
    expect_map(field(map, key)?, key)
}

/// Optional map field; absent yields an empty map
pub fn map_field_or_empty(map: &Map, key: &str) -> Result<Map> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(v) => expect_map(v, key).cloned(),
    }
}

/// Required boolean field
pub fn bool_field(map: &Map, key: &str) -> Result<bool> {
    let v = field(map, key)?;
    v.as_bool().ok_or_else(|| {
        Error::malformed(format!("'{}': expected Bool, got {}", key, v.type_name()))
    })
}

/// Optional boolean field; absent or `Null` reads as `false`
pub fn opt_bool_field(map: &Map, key: &str) -> Result<bool> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(_) => bool_field(map, key),
    }
}

/// Required list-of-strings field
pub fn string_list_field(map: &Map, key: &str) -> Result<Vec<String>> {
    let v = field(map, key)?;
    let items = v.as_array().ok_or_else(|| {
        Error::malformed(format!("'{}': expected Array, got {}", key, v.type_name()))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                Error::malformed(format!(
                    "'{}': expected String element, got {}",
                    key,
                    item.type_name()
                ))
            })
        })
        .collect()
}

/// Optional string field; `Null` counts as absent
pub fn opt_string_field(map: &Map, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::malformed(format!(
            "'{}': expected String, got {}",
            key,
            other.type_name()
        ))),
    }
}

/// Required string field
pub fn string_field(map: &Map, key: &str) -> Result<String> {
    opt_string_field(map, key)?
        .ok_or_else(|| Error::malformed(format!("missing header field '{}'", key)))
}

/// Map of maps, e.g. per-variable metadata
pub fn nested_maps(map: &Map, key: &str) -> Result<Vec<(String, Map)>> {
    map_field_or_empty(map, key)?
        .into_iter()
        .map(|(name, v)| {
            let inner = into_map(v, &format!("{}.{}", key, name))?;
            Ok((name, inner))
        })
        .collect()
}
