//! Meld container tests
//!
//! End-to-end write -> close -> open -> read cycles over real files and
//! in-memory cursors.

use proptest::prelude::*;
use recon_core::{Error, Map, Value, ValueType};
use recon_meld::{MeldConfig, MeldReader, MeldWriter};
use std::io::Cursor;
use tempfile::tempdir;

fn floats(v: &[f64]) -> Value {
    v.iter().copied().collect()
}

fn md(pairs: &[(&str, &str)]) -> Map {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn config(compression: bool) -> MeldConfig {
    MeldConfig::for_testing().with_compression(compression)
}

/// T1 {time, x, y, a = aff(1,1) of x, b = inv of y} plus obj1
fn write_sample(path: &std::path::Path, compression: bool) {
    let mut w = MeldWriter::create(path, config(compression)).unwrap();
    w.metadata_mut().unwrap().insert("source".into(), Value::from("test"));
    {
        let mut t = w.add_table("T1", Some(md(&[("model", "sim")]))).unwrap();
        t.add_signal("time")
            .unwrap()
            .add_signal("x")
            .unwrap()
            .add_signal("y")
            .unwrap()
            .add_alias("a", "x", Some("aff(1.0,1.0)"))
            .unwrap()
            .add_alias("b", "y", Some("inv"))
            .unwrap();
        t.set_var_metadata("x", md(&[("units", "m")])).unwrap();
    }
    w.add_object("obj1", Some(md(&[("a", "bar")]))).unwrap();
    w.finalize().unwrap();

    {
        let mut t = w.table("T1").unwrap();
        t.write("time", floats(&[0.0, 1.0, 2.0])).unwrap();
        t.write("x", floats(&[1.0, 0.0, 1.0])).unwrap();
        t.write("y", floats(&[2.0, 3.0, 3.0])).unwrap();
    }
    w.write_object("obj1", md(&[("name", "Mike")])).unwrap();
    w.close().unwrap();
}

fn check_sample(path: &std::path::Path, compression: bool) {
    let r = MeldReader::open_path(path).unwrap();
    assert_eq!(r.is_compressed(), compression);
    assert_eq!(r.metadata()["source"], Value::from("test"));
    assert_eq!(r.tables(), vec!["T1"]);
    assert_eq!(r.objects(), vec!["obj1"]);

    let t = r.read_table("T1").unwrap();
    assert_eq!(t.signals(), &["time", "x", "y", "a", "b"]);
    assert_eq!(t.metadata(), &md(&[("model", "sim")]));
    assert_eq!(t.var_metadata("x"), Some(&md(&[("units", "m")])));
    assert_eq!(t.data("time").unwrap(), floats(&[0.0, 1.0, 2.0]).into_array().unwrap());
    assert_eq!(t.data("x").unwrap(), floats(&[1.0, 0.0, 1.0]).into_array().unwrap());
    assert_eq!(t.data("a").unwrap(), floats(&[2.0, 1.0, 2.0]).into_array().unwrap());
    assert_eq!(t.data("b").unwrap(), floats(&[-2.0, -3.0, -3.0]).into_array().unwrap());

    let o = r.read_object("obj1").unwrap();
    assert_eq!(o.metadata(), &md(&[("a", "bar")]));
    assert_eq!(o.data().unwrap(), &md(&[("name", "Mike")]));
}

#[test]
fn test_roundtrip_uncompressed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.mld");
    write_sample(&path, false);
    check_sample(&path, false);
}

#[test]
fn test_roundtrip_compressed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample_comp.mld");
    write_sample(&path, true);
    check_sample(&path, true);
}

fn ints(v: &[i64]) -> Value {
    v.iter().copied().collect()
}

#[test]
fn test_integer_columns() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None)
        .unwrap()
        .add_signal("time")
        .unwrap()
        .add_signal("x")
        .unwrap()
        .add_signal("y")
        .unwrap()
        .add_alias("a", "x", Some("aff(1.0,1.0)"))
        .unwrap()
        .add_alias("b", "y", Some("inv"))
        .unwrap();
    w.finalize().unwrap();
    w.write_signal("T1", "time", ints(&[0, 1, 2])).unwrap();
    w.write_signal("T1", "x", ints(&[1, 0, 1])).unwrap();
    w.write_signal("T1", "y", ints(&[2, 3, 3])).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();

    let r = MeldReader::open(Cursor::new(bytes)).unwrap();
    let t = r.read_table("T1").unwrap();
    assert_eq!(t.data("x").unwrap(), ints(&[1, 0, 1]).into_array().unwrap());
    // Affine always yields floats; inverse keeps the stored type
    assert_eq!(t.data("a").unwrap(), floats(&[2.0, 1.0, 2.0]).into_array().unwrap());
    assert_eq!(t.data("b").unwrap(), ints(&[-2, -3, -3]).into_array().unwrap());
    assert_ne!(t.data("b").unwrap(), floats(&[-2.0, -3.0, -3.0]).into_array().unwrap());
}

#[test]
fn test_single_precision_roundtrip() {
    let samples = [0.1, 1.0 / 3.0, -2.5e-7, 123456.789];
    let narrowed: Vec<f64> = samples.iter().map(|v| *v as f32 as f64).collect();

    let write = |single: bool| {
        let config = config(false).with_single_precision(single);
        let mut w = MeldWriter::new(Cursor::new(Vec::new()), config).unwrap();
        w.add_table("T1", None)
            .unwrap()
            .add_signal("x")
            .unwrap()
            .add_signal("n")
            .unwrap()
            .add_alias("nx", "x", Some("inv"))
            .unwrap();
        w.add_object("o", None).unwrap();
        w.finalize().unwrap();
        w.write_signal("T1", "x", floats(&samples)).unwrap();
        w.write_signal("T1", "n", ints(&[i64::MAX, -1])).unwrap();
        let mut fields = Map::new();
        fields.insert("gain".into(), Value::Float(0.1));
        w.write_object("o", fields).unwrap();
        w.into_inner().unwrap().into_inner()
    };

    let full = write(false);
    let single = write(true);
    assert!(single.len() < full.len());

    let r = MeldReader::open(Cursor::new(single)).unwrap();
    assert!(r.is_single_precision());
    let t = r.read_table("T1").unwrap();
    assert_eq!(t.data("x").unwrap(), floats(&narrowed).into_array().unwrap());
    let negated: Vec<f64> = narrowed.iter().map(|v| -v).collect();
    assert_eq!(t.data("nx").unwrap(), floats(&negated).into_array().unwrap());
    assert_eq!(t.data("n").unwrap(), ints(&[i64::MAX, -1]).into_array().unwrap());
    // Object data keeps full precision
    assert_eq!(r.read_object("o").unwrap().data().unwrap()["gain"], Value::Float(0.1));

    let r = MeldReader::open(Cursor::new(full)).unwrap();
    assert!(!r.is_single_precision());
    assert_eq!(
        r.read_table("T1").unwrap().data("x").unwrap(),
        floats(&samples).into_array().unwrap()
    );
}

#[test]
fn test_out_of_order_writes() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None)
        .unwrap()
        .add_signal("x")
        .unwrap()
        .add_signal("y")
        .unwrap();
    w.add_table("T2", None).unwrap().add_signal("z").unwrap();
    w.add_object("o", None).unwrap();
    w.finalize().unwrap();

    w.write_signal("T2", "z", floats(&[9.0])).unwrap();
    w.write_signal("T1", "y", floats(&[2.0])).unwrap();
    w.write_object("o", Map::new()).unwrap();
    w.write_signal("T1", "x", floats(&[1.0])).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();

    let r = MeldReader::open(Cursor::new(bytes)).unwrap();
    let t1 = r.read_table("T1").unwrap();
    assert_eq!(t1.data("x").unwrap(), vec![Value::Float(1.0)]);
    assert_eq!(t1.data("y").unwrap(), vec![Value::Float(2.0)]);
    assert_eq!(r.read_table("T2").unwrap().data("z").unwrap(), vec![Value::Float(9.0)]);
}

#[test]
fn test_mixed_value_types_roundtrip() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(true)).unwrap();
    w.add_table("T", None)
        .unwrap()
        .add_signal_with("flag", None, Some(ValueType::Bool))
        .unwrap()
        .add_signal("label")
        .unwrap()
        .add_alias("nflag", "flag", Some("inv"))
        .unwrap();
    w.add_object("o", None).unwrap();
    w.finalize().unwrap();

    let flags = Value::from(vec![Value::Bool(true), Value::Bool(false)]);
    let labels = Value::from(vec![Value::from("a"), Value::Null, Value::Bytes(vec![0, 1])]);
    w.write_signal("T", "flag", flags.clone()).unwrap();
    w.write_signal("T", "label", labels.clone()).unwrap();

    let mut fields = Map::new();
    fields.insert("n".into(), Value::Int(i64::MIN));
    fields.insert("nested".into(), Value::Object(md(&[("k", "v")])));
    fields.insert("list".into(), floats(&[1.5]));
    w.write_object("o", fields.clone()).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();

    let r = MeldReader::open(Cursor::new(bytes)).unwrap();
    let t = r.read_table("T").unwrap();
    assert_eq!(t.declared_type("flag"), Some(ValueType::Bool));
    assert_eq!(t.data("flag").unwrap(), flags.into_array().unwrap());
    assert_eq!(t.data("nflag").unwrap(), vec![Value::Bool(false), Value::Bool(true)]);
    assert_eq!(t.data("label").unwrap(), labels.into_array().unwrap());
    assert_eq!(r.read_object("o").unwrap().data().unwrap(), &fields);
}

#[test]
fn test_write_once_enforced() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None).unwrap().add_signal("x").unwrap();
    w.add_object("obj1", Some(md(&[("a", "bar")]))).unwrap();
    w.finalize().unwrap();

    w.write_signal("T1", "x", floats(&[1.0])).unwrap();
    let err = w.write_signal("T1", "x", floats(&[1.0])).unwrap_err();
    assert!(matches!(err, Error::AlreadyWritten(_)));

    w.write_object("obj1", md(&[("name", "Mike")])).unwrap();
    let err = w.write_object("obj1", md(&[("name", "Other")])).unwrap_err();
    assert!(matches!(err, Error::AlreadyWritten(_)));
    assert!(err.to_string().contains("obj1"));

    // The rejected writes leave the original data in place
    let bytes = w.into_inner().unwrap().into_inner();
    let r = MeldReader::open(Cursor::new(bytes)).unwrap();
    assert_eq!(
        r.read_object("obj1").unwrap().data().unwrap(),
        &md(&[("name", "Mike")])
    );
}

#[test]
fn test_missing_data_names_exactly_the_unwritten() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None)
        .unwrap()
        .add_signal("x")
        .unwrap()
        .add_signal("y")
        .unwrap()
        .add_alias("a", "y", None)
        .unwrap();
    w.add_object("obj1", None).unwrap();
    w.add_object("obj2", None).unwrap();
    w.finalize().unwrap();
    w.write_signal("T1", "x", floats(&[1.0])).unwrap();
    w.write_object("obj2", Map::new()).unwrap();

    match w.close() {
        Err(Error::MissingData(missing)) => assert_eq!(missing, vec!["T1.y", "obj1"]),
        other => panic!("expected MissingData, got {:?}", other),
    }
}

#[test]
fn test_name_uniqueness() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None).unwrap();
    assert!(matches!(w.add_table("T1", None), Err(Error::DuplicateName(_))));
    assert!(matches!(w.add_object("T1", None), Err(Error::DuplicateName(_))));
    w.add_object("obj1", None).unwrap();
    assert!(matches!(w.add_table("obj1", None), Err(Error::DuplicateName(_))));

    let mut t = w.define_table("T1").unwrap();
    t.add_signal("x").unwrap();
    assert!(matches!(t.add_signal("x"), Err(Error::DuplicateName(_))));
    t.add_alias("a", "x", None).unwrap();
    assert!(matches!(t.add_alias("a", "x", None), Err(Error::DuplicateName(_))));
    assert!(matches!(t.add_signal("a"), Err(Error::DuplicateName(_))));
    assert!(matches!(t.add_alias("b", "a", None), Err(Error::UnknownSignal { .. })));
    assert!(matches!(
        t.add_alias("c", "x", Some("sqrt")),
        Err(Error::InvalidTransform(_))
    ));
    assert!(matches!(
        t.set_var_metadata("nope", Map::new()),
        Err(Error::UnknownSignal { .. })
    ));

    w.finalize().unwrap();
    assert!(matches!(w.add_table("T9", None), Err(Error::AlreadyFinalized)));
    assert!(matches!(w.add_table("T1", None), Err(Error::AlreadyFinalized)));
}

#[test]
fn test_unknown_table_and_signal() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None).unwrap().add_signal("x").unwrap();
    w.finalize().unwrap();
    assert!(matches!(w.table("T2"), Err(Error::UnknownName(_))));
    assert!(matches!(
        w.write_signal("T1", "z", floats(&[0.0])),
        Err(Error::UnknownSignal { .. })
    ));
    assert!(matches!(
        w.write_object("T1", Map::new()),
        Err(Error::UnknownName(_))
    ));
    w.write_signal("T1", "x", floats(&[0.0])).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();

    let r = MeldReader::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(r.read_table("T2"), Err(Error::UnknownName(_))));
    let err = r.read_table("T1").unwrap().data("z").unwrap_err();
    assert!(matches!(err, Error::UnknownSignal { .. }));
    assert!(err.to_string().contains("'z'"));
}

#[test]
fn test_not_a_meld_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bogus.mld");
    std::fs::write(&path, b"definitely not meld data").unwrap();
    assert!(matches!(MeldReader::open_path(&path), Err(Error::Format(_))));

    std::fs::write(&path, b"").unwrap();
    assert!(matches!(MeldReader::open_path(&path), Err(Error::Format(_))));
}

#[test]
fn test_truncated_block_is_malformed() {
    let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(false)).unwrap();
    w.add_table("T1", None).unwrap().add_signal("x").unwrap();
    w.finalize().unwrap();
    w.write_signal("T1", "x", floats(&[1.0, 2.0, 3.0, 4.0])).unwrap();
    let mut bytes = w.into_inner().unwrap().into_inner();
    bytes.truncate(bytes.len() - 5);

    let r = MeldReader::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(
        r.read_table("T1").unwrap().data("x"),
        Err(Error::MalformedData(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The header never changes length no matter how many blocks are written
    #[test]
    fn prop_header_length_stable(
        columns in prop::collection::vec(prop::collection::vec(-1e9f64..1e9, 0..50), 1..8),
        compression in any::<bool>(),
    ) {
        let mut w = MeldWriter::new(Cursor::new(Vec::new()), config(compression)).unwrap();
        {
            let mut t = w.add_table("T", None).unwrap();
            for i in 0..columns.len() {
                t.add_signal(&format!("s{}", i)).unwrap();
                t.add_alias(&format!("n{}", i), &format!("s{}", i), Some("inv")).unwrap();
            }
        }
        w.finalize().unwrap();
        let initial = MeldReader::open(Cursor::new(w.get_ref().get_ref().clone()))
            .unwrap()
            .header_len();

        for (i, column) in columns.iter().enumerate() {
            w.write_signal("T", &format!("s{}", i), floats(column)).unwrap();
            let now = MeldReader::open(Cursor::new(w.get_ref().get_ref().clone()))
                .unwrap()
                .header_len();
            prop_assert_eq!(now, initial);
        }

        let bytes = w.into_inner().unwrap().into_inner();
        let r = MeldReader::open(Cursor::new(bytes)).unwrap();
        let t = r.read_table("T").unwrap();
        for (i, column) in columns.iter().enumerate() {
            let expected: Vec<Value> = column.iter().map(|v| Value::Float(-v)).collect();
            prop_assert_eq!(t.data(&format!("n{}", i)).unwrap(), expected);
        }
    }
}
