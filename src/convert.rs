//! Wall to Meld conversion
//!
//! Copies the full structure of a Wall journal into a Meld writer, finalizes
//! it, then writes every object and signal exactly once. The journal is
//! scanned once per object and once per table; table rows are transposed
//! into columns in memory.

use recon_core::{Map, Result, Value};
use recon_format::Durable;
use recon_meld::{MeldConfig, MeldWriter};
use recon_wall::WallReader;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::{debug, info};

/// Convert an open Wall journal into a Meld file and close the writer.
///
/// The writer must still be in its definition phase. Alias transforms that
/// the Wall reader cannot parse are copied as identity aliases.
pub fn wall_to_meld<R, W>(wall: &WallReader<R>, meld: &mut MeldWriter<W>) -> Result<()>
where
    R: Read + Seek,
    W: Write + Seek + Durable,
{
    meld.metadata_mut()?.extend(wall.metadata().clone());

    for (name, metadata) in &wall.header().objects {
        meld.add_object(name, Some(metadata.clone()))?;
    }

    for name in wall.tables() {
        let table = wall.read_table(name)?;
        let mut builder = meld.add_table(name, Some(table.metadata().clone()))?;
        for signal in table.signals() {
            builder.add_signal_with(
                signal,
                table.var_metadata(signal).cloned(),
                table.declared_type(signal),
            )?;
        }
        for alias in table.aliases() {
            let of = table.alias_of(alias).unwrap_or_default();
            let transform = table.alias_transform(alias).map(|t| t.descriptor());
            builder.add_alias_with(
                alias,
                of,
                transform.as_deref(),
                table.var_metadata(alias).cloned(),
            )?;
        }
    }

    meld.finalize()?;

    for name in wall.objects() {
        let fields: Map = wall.read_object(name)?.data().clone();
        meld.write_object(name, Value::Object(fields))?;
    }

    let mut values_copied = 0usize;
    for name in wall.tables() {
        let table = wall.read_table(name)?;
        let rows = table.rows()?;
        let mut columns: Vec<Vec<Value>> = table
            .signals()
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in rows {
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        for (signal, column) in table.signals().iter().zip(columns) {
            values_copied += column.len();
            meld.write_signal(name, signal, Value::Array(column))?;
        }
        debug!(
            target: "recon::convert",
            table = name,
            signals = table.signals().len(),
            "Copied table"
        );
    }

    meld.close()?;
    info!(
        target: "recon::convert",
        tables = wall.tables().len(),
        objects = wall.objects().len(),
        values = values_copied,
        "Converted wall to meld"
    );
    Ok(())
}

/// Convert the Wall file at `wall_path` into a new Meld file at `meld_path`
pub fn wall_file_to_meld_file(
    wall_path: impl AsRef<Path>,
    meld_path: impl AsRef<Path>,
    config: MeldConfig,
) -> Result<()> {
    let wall = WallReader::open_path(wall_path)?;
    let mut meld = MeldWriter::create(meld_path, config)?;
    wall_to_meld(&wall, &mut meld)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_meld::MeldReader;
    use recon_wall::{Row, WallConfig, WallWriter};
    use std::io::Cursor;

    #[test]
    fn test_identity_alias_copied() {
        let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
        let mut t = w.add_table("T1", None).unwrap();
        t.add_signal("x").unwrap();
        t.add_alias("y", "x", None).unwrap();
        w.finalize().unwrap();
        w.add_row("T1", Row::positional([2.0])).unwrap();
        let wall = WallReader::open(Cursor::new(w.into_inner().unwrap())).unwrap();

        let mut meld = MeldWriter::new(Cursor::new(Vec::new()), MeldConfig::for_testing()).unwrap();
        wall_to_meld(&wall, &mut meld).unwrap();
        let bytes = meld.into_inner().unwrap().into_inner();

        let r = MeldReader::open(Cursor::new(bytes)).unwrap();
        let t = r.read_table("T1").unwrap();
        assert_eq!(t.alias_of("y"), Some("x"));
        assert_eq!(t.data("y").unwrap(), vec![Value::Float(2.0)]);
    }

    #[test]
    fn test_requires_definition_phase() {
        let w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
        let wall = WallReader::open(Cursor::new(w.into_inner().unwrap())).unwrap();

        let mut meld = MeldWriter::new(Cursor::new(Vec::new()), MeldConfig::for_testing()).unwrap();
        meld.finalize().unwrap();
        assert!(matches!(
            wall_to_meld(&wall, &mut meld),
            Err(recon_core::Error::AlreadyFinalized)
        ));
    }
}
