//! JSON export
//!
//! Renders a whole container as one JSON document:
//!
//! ```text
//! {
//!   "header": { ..decoded header.. },
//!   "tables": [ { "name", "metadata", "vmetadata", "signals": { <var>: [..] } } ],
//!   "objects": [ { "name", "fields", "metadata" } ]
//! }
//! ```
//!
//! Aliases appear under `signals` with their transform applied. Byte values
//! (including Meld block references in the header) are rendered as base64
//! strings.

use recon_core::{Map, Result, Value};
use recon_meld::MeldReader;
use recon_wall::WallReader;
use serde_json::{json, Value as Json};
use std::io::{Read, Seek};
use tracing::debug;

fn map_json(map: &Map) -> Json {
    Json::from(Value::Object(map.clone()))
}

fn vmetadata_json<'a>(entries: impl Iterator<Item = (&'a String, &'a Map)>) -> Json {
    Json::Object(
        entries
            .map(|(name, md)| (name.clone(), map_json(md)))
            .collect(),
    )
}

fn signals_json(columns: Vec<(String, Vec<Value>)>) -> Json {
    Json::Object(
        columns
            .into_iter()
            .map(|(name, values)| (name, Json::from(Value::Array(values))))
            .collect(),
    )
}

fn object_json(name: &str, fields: &Map, metadata: &Map) -> Json {
    json!({
        "name": name,
        "fields": map_json(fields),
        "metadata": map_json(metadata),
    })
}

/// Render a Meld file. Fails with `MissingData` if any block is unwritten.
pub fn meld_to_json<R: Read + Seek>(meld: &MeldReader<R>) -> Result<Json> {
    let mut tables = Vec::new();
    for name in meld.tables() {
        let table = meld.read_table(name)?;
        let columns = table
            .signals()
            .iter()
            .map(|var| Ok((var.clone(), table.data(var)?)))
            .collect::<Result<Vec<_>>>()?;
        let entry = meld.header().table(name)?;
        tables.push(json!({
            "name": name,
            "metadata": map_json(table.metadata()),
            "vmetadata": vmetadata_json(entry.var_metadata.iter()),
            "signals": signals_json(columns),
        }));
    }

    let mut objects = Vec::new();
    for name in meld.objects() {
        let object = meld.read_object(name)?;
        objects.push(object_json(name, object.data()?, object.metadata()));
    }

    debug!(
        target: "recon::export",
        tables = tables.len(),
        objects = objects.len(),
        "Rendered meld as json"
    );
    Ok(json!({
        "header": Json::from(meld.header().to_value()),
        "tables": tables,
        "objects": objects,
    }))
}

/// Render a Wall file, resolving journaled object fields
pub fn wall_to_json<R: Read + Seek>(wall: &WallReader<R>) -> Result<Json> {
    let mut tables = Vec::new();
    for name in wall.tables() {
        let table = wall.read_table(name)?;
        let columns = table
            .variables()
            .into_iter()
            .map(|var| Ok((var.to_string(), table.data(var)?)))
            .collect::<Result<Vec<_>>>()?;
        let entry = wall.header().table(name)?;
        tables.push(json!({
            "name": name,
            "metadata": map_json(table.metadata()),
            "vmetadata": vmetadata_json(entry.var_metadata.iter()),
            "signals": signals_json(columns),
        }));
    }

    let mut objects = Vec::new();
    for name in wall.objects() {
        let object = wall.read_object(name)?;
        objects.push(object_json(name, object.data(), object.metadata()));
    }

    debug!(
        target: "recon::export",
        tables = tables.len(),
        objects = objects.len(),
        "Rendered wall as json"
    );
    Ok(json!({
        "header": Json::from(wall.header().to_value()),
        "tables": tables,
        "objects": objects,
    }))
}
