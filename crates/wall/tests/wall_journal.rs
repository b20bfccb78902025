//! Wall journal tests
//!
//! Write -> flush -> scan cycles, including journaled object overwrites and
//! damaged trailing records.

use recon_core::{Error, Map, Value, ValueType};
use recon_wall::{Row, WallConfig, WallReader, WallWriter};
use std::io::Cursor;
use tempfile::tempdir;

fn md(pairs: &[(&str, &str)]) -> Map {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn floats(v: &[f64]) -> Vec<Value> {
    v.iter().copied().map(Value::Float).collect()
}

fn define(w: &mut WallWriter<impl std::io::Write + recon_format::Durable>) {
    let mut t = w.add_table("T1", None).unwrap();
    for s in ["time", "x", "y"] {
        t.add_signal(s).unwrap();
    }
    t.add_alias("a", "x", Some("aff(1.0,1.0)")).unwrap();
    t.add_alias("b", "y", Some("inv")).unwrap();
    w.add_object("obj1", None).unwrap();
    w.add_object("obj2", None).unwrap();
}

fn sample() -> Vec<u8> {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    define(&mut w);
    w.finalize().unwrap();

    let mut t = w.table("T1").unwrap();
    t.add_row(Row::keyed([("time", 0.0), ("x", 1.0), ("y", 2.0)])).unwrap();
    w.flush().unwrap();
    w.add_row("T1", Row::keyed([("time", 1.0), ("x", 0.0), ("y", 3.0)]))
        .unwrap();
    w.flush().unwrap();
    w.add_row("T1", Row::positional([2.0, 1.0, 3.0])).unwrap();
    w.flush().unwrap();

    w.add_field("obj1", "name", "Mike").unwrap();
    w.add_field("obj2", "name", "Pete").unwrap();
    w.flush().unwrap();
    w.object("obj1").unwrap().add_field("nationality", "American").unwrap();
    w.object("obj2").unwrap().add_field("nationality", "UKLander").unwrap();
    w.flush().unwrap();
    w.add_field("obj2", "nationality", "GreatBritisher").unwrap();
    w.into_inner().unwrap()
}

#[test]
fn test_valid_file() {
    let r = WallReader::open(Cursor::new(sample())).unwrap();
    assert_eq!(r.tables(), vec!["T1"]);
    assert_eq!(r.objects(), vec!["obj1", "obj2"]);

    let t = r.read_table("T1").unwrap();
    assert_eq!(t.signals(), &["time", "x", "y"]);
    assert_eq!(t.variables(), vec!["time", "x", "y", "a", "b"]);
    assert_eq!(t.data("time").unwrap(), floats(&[0.0, 1.0, 2.0]));
    assert_eq!(t.data("x").unwrap(), floats(&[1.0, 0.0, 1.0]));
    assert_eq!(t.data("a").unwrap(), floats(&[2.0, 1.0, 2.0]));
    assert_eq!(t.data("b").unwrap(), floats(&[-2.0, -3.0, -3.0]));
    assert_eq!(t.alias_of("b"), Some("y"));
    assert_eq!(t.alias_transform_string("a"), Some("aff(1.0,1.0)"));
}

#[test]
fn test_journaled_overwrite() {
    let r = WallReader::open(Cursor::new(sample())).unwrap();
    let obj1 = r.read_object("obj1").unwrap();
    assert_eq!(
        obj1.data(),
        &md(&[("name", "Mike"), ("nationality", "American")])
    );
    let obj2 = r.read_object("obj2").unwrap();
    assert_eq!(
        obj2.data(),
        &md(&[("name", "Pete"), ("nationality", "GreatBritisher")])
    );
}

#[test]
fn test_records_in_file_order() {
    let r = WallReader::open(Cursor::new(sample())).unwrap();
    let names: Vec<String> = r.records().unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec!["T1", "T1", "T1", "obj1", "obj2", "obj1", "obj2", "obj2"]
    );
}

#[test]
fn test_duplicates() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    w.add_table("T1", None).unwrap();
    assert!(matches!(w.add_table("T1", None), Err(Error::DuplicateName(_))));
    assert!(matches!(w.add_object("T1", None), Err(Error::DuplicateName(_))));

    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    w.add_object("T1", None).unwrap();
    assert!(matches!(w.add_table("T1", None), Err(Error::DuplicateName(_))));
    assert!(matches!(w.add_object("T1", None), Err(Error::DuplicateName(_))));

    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    let mut t = w.add_table("T1", None).unwrap();
    t.add_signal("time").unwrap();
    t.add_signal("x").unwrap();
    assert!(matches!(
        t.add_alias("time", "x", None),
        Err(Error::DuplicateName(_))
    ));
}

#[test]
fn test_structure_frozen_after_finalize() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    w.add_object("T1", None).unwrap();
    w.add_table("T0", None).unwrap();
    w.finalize().unwrap();
    assert!(matches!(w.add_object("T2", None), Err(Error::AlreadyFinalized)));
    assert!(matches!(w.add_table("T2", None), Err(Error::AlreadyFinalized)));
    assert!(matches!(w.define_table("T0"), Err(Error::AlreadyFinalized)));
    assert!(matches!(w.finalize(), Err(Error::AlreadyFinalized)));
}

#[test]
fn test_empty_table() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    define(&mut w);
    w.finalize().unwrap();
    let r = WallReader::open(Cursor::new(w.into_inner().unwrap())).unwrap();
    assert!(r.read_table("T1").unwrap().data("x").unwrap().is_empty());
    assert!(r.read_object("obj1").unwrap().data().is_empty());
}

#[test]
fn test_missing_signal_and_table() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    define(&mut w);
    w.finalize().unwrap();
    w.add_row("T1", Row::keyed([("time", 0.0), ("x", 1.0), ("y", 2.0)]))
        .unwrap();
    let r = WallReader::open(Cursor::new(w.into_inner().unwrap())).unwrap();
    let t = r.read_table("T1").unwrap();
    assert!(matches!(t.data("z"), Err(Error::UnknownSignal { .. })));
    let err = r.read_table("T2").err().unwrap();
    assert!(matches!(err, Error::UnknownName(_)));
    assert!(err.to_string().contains("T1"));
    assert!(matches!(r.read_object("obj9"), Err(Error::UnknownName(_))));
}

#[test]
fn test_bad_args() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    define(&mut w);
    w.finalize().unwrap();
    w.add_row("T1", Row::keyed([("time", 0.0), ("x", 1.0), ("y", 2.0)]))
        .unwrap();
    w.add_row("T1", Row::positional([0.0, 1.0, 2.0])).unwrap();
    let err = w
        .add_row("T1", Row::positional([0.0, 1.0]).with("y", 2.0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArguments(_)));
    // Rejected rows are never journaled
    assert_eq!(w.pending(), 2);
}

#[test]
fn test_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.wll");
    {
        let mut w = WallWriter::create(&path, WallConfig::default()).unwrap();
        w.metadata_mut().unwrap().insert("a".into(), Value::from("bar"));
        let mut t = w.add_table("T1", None).unwrap();
        for s in ["time", "x", "y"] {
            t.add_signal(s).unwrap();
        }
        t.set_metadata(md(&[("b", "foo")]));
        t.set_var_metadata("time", md(&[("units", "s")])).unwrap();
        assert!(matches!(
            t.set_var_metadata("z", md(&[("units", "m")])),
            Err(Error::UnknownSignal { .. })
        ));
        w.finalize().unwrap();
        w.add_row("T1", Row::keyed([("time", 0.0), ("x", 1.0), ("y", 2.0)]))
            .unwrap();
        w.close().unwrap();
    }

    let r = WallReader::open_path(&path).unwrap();
    assert_eq!(r.metadata(), &md(&[("a", "bar")]));
    let t = r.read_table("T1").unwrap();
    assert_eq!(t.metadata(), &md(&[("b", "foo")]));
    assert_eq!(t.var_metadata("time"), Some(&md(&[("units", "s")])));
}

#[test]
fn test_declared_types() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    let mut t = w.add_table("T1", None).unwrap();
    t.add_signal_with("n", None, Some(ValueType::Int)).unwrap();
    t.add_signal_with("ok", None, Some(ValueType::Bool)).unwrap();
    t.add_alias("nok", "ok", Some("inv")).unwrap();
    w.finalize().unwrap();

    let bad = Row::new(vec![Value::Float(1.0), Value::Bool(true)], Map::new());
    assert!(matches!(w.add_row("T1", bad), Err(Error::TypeMismatch { .. })));
    w.add_row(
        "T1",
        Row::new(vec![Value::Int(1), Value::Bool(true)], Map::new()),
    )
    .unwrap();

    let r = WallReader::open(Cursor::new(w.into_inner().unwrap())).unwrap();
    let t = r.read_table("T1").unwrap();
    assert_eq!(t.declared_type("n"), Some(ValueType::Int));
    assert_eq!(t.data("nok").unwrap(), vec![Value::Bool(false)]);
}

#[test]
fn test_truncated_trailing_record() {
    let mut bytes = sample();
    bytes.truncate(bytes.len() - 3);
    let r = WallReader::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(r.read_object("obj2"), Err(Error::MalformedData(_))));
    assert!(matches!(r.records(), Err(Error::MalformedData(_))));
}

#[test]
fn test_not_a_wall_file() {
    let mut w = WallWriter::new(Vec::new(), WallConfig::default()).unwrap();
    w.finalize().unwrap();
    let mut bytes = w.into_inner().unwrap();
    bytes[6] = b'M';
    assert!(matches!(
        WallReader::open(Cursor::new(bytes)),
        Err(Error::Format(_))
    ));
}
