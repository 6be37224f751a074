use std::sync::Arc;

use json_node::{Document, ErrorKind, JsonType, SchemaRegistry};

const SCHEMA: &str = include_str!("data/test_schema.json");

fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.load("thrift", SCHEMA).unwrap();
    Arc::new(registry)
}

#[test]
fn fixtures_round_trip_in_both_modes() {
    let fixtures = [
        include_str!("data/simple.json"),
        include_str!("data/nested.json"),
        include_str!("data/extended.json"),
        include_str!("data/unicode.json"),
    ];
    for text in fixtures {
        let doc = Document::parse(text).unwrap();
        let dense = Document::parse(&doc.dump(true)).unwrap();
        let pretty = Document::parse(&doc.dump(false)).unwrap();
        assert_eq!(dense, doc, "dense round trip of {text}");
        assert_eq!(pretty, doc, "pretty round trip of {text}");
        assert_eq!(dense.dump(true), doc.dump(true));
    }
}

#[test]
fn comments_and_tilde_read_as_null() {
    let doc = Document::parse(include_str!("data/extended.json")).unwrap();
    assert_eq!(
        doc.dump(true),
        r#"{"missing":null,"text":"tab\there \"quoted\" é😀","list":[1,2.5,"three",null]}"#
    );
    assert!(doc.field("list[3]").unwrap().is_null());
}

#[test]
fn dense_output_is_byte_identical() {
    let text = r#"{"vbool":true,"vint":-100,"vdouble":5.2,"vlist":[1.7,2.7,3.7,5.7]}"#;
    let doc = Document::parse(text).unwrap();
    assert_eq!(doc.dump(true), text);

    let mut values: Vec<f64> = Vec::new();
    assert!(doc.field("vlist").unwrap().get_to(&mut values));
    assert_eq!(values, vec![1.7, 2.7, 3.7, 5.7]);
}

#[test]
fn schema_parse_keeps_declared_order() {
    let registry = registry();
    let text = r#"{"vbool":true,"vint":-100,"vdouble":5.2,"vlist":[1.7,2.7,3.7,5.7]}"#;
    let doc = Document::parse_with_schema(&registry, "SimpleSchemaTest", text).unwrap();
    assert!(doc.is_schema_bound());
    assert_eq!(doc.dump(true), text);
    assert_eq!(doc.root().value_via_path::<Vec<f64>>("vlist"), Some(vec![1.7, 2.7, 3.7, 5.7]));
    assert_eq!(doc.root().fields_not_used(), vec!["vstring".to_string(), "vmap".to_string()]);

    let reordered = r#"{"vlist":[1],"vbool":false}"#;
    let doc = Document::parse_with_schema(&registry, "SimpleSchemaTest", reordered).unwrap();
    assert_eq!(doc.dump(true), r#"{"vbool":false,"vlist":[1.0]}"#);
}

#[test]
fn schema_parse_rejects_bad_input() {
    let registry = registry();
    let err = Document::parse_with_schema(&registry, "SimpleSchemaTest", r#"{"nope": 1}"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Missing);
    assert!(err.offset.is_some());

    let err = Document::parse_with_schema(&registry, "SimpleSchemaTest", r#"{"vstring": 12}"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);

    let err = Document::parse_with_schema(&registry, "Limits", r#"{"value": 0.5}"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfRange);

    let err = Document::parse_with_schema(&registry, "Nothing", "{}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::SchemaLookup);
}

#[test]
fn optional_only_struct_is_empty() {
    let doc = Document::with_schema(&registry(), "SimpleSchemaTest").unwrap();
    assert_eq!(doc.dump(true), "{}");
    assert_eq!(doc.dump(false), "{}\n");
}

#[test]
fn defaults_and_required_fields_materialize() {
    let doc = Document::with_schema(&registry(), "Limits").unwrap();
    assert_eq!(doc.root().value_via_path::<f64>("value"), Some(100000.0));
    assert_eq!(doc.dump(true), r#"{"value":100000.0,"name":""}"#);
    assert_eq!(doc.root().struct_def().map(|def| def.name.as_str()), Some("Limits"));
}

#[test]
fn clear_restores_the_fresh_state() {
    let registry = registry();
    let fresh = Document::with_schema(&registry, "Limits").unwrap();
    let mut doc = Document::with_schema(&registry, "Limits").unwrap();
    doc.root_mut().set_value_via_path("value", 42.0).unwrap();
    doc.root_mut().set_value_via_path("inner.vint", 3).unwrap();
    assert_ne!(doc.dump(true), fresh.dump(true));

    doc.root_mut().clear().unwrap();
    let once = doc.dump(true);
    doc.root_mut().clear().unwrap();
    assert_eq!(doc.dump(true), once);
    assert_eq!(once, fresh.dump(true));

    let mut free = Document::parse(r#"{"a": [1, 2]}"#).unwrap();
    free.root_mut().clear().unwrap();
    free.root_mut().clear().unwrap();
    assert_eq!(free.dump(true), "{}");
}

#[test]
fn every_path_spelling_reaches_the_same_node() {
    let doc = Document::parse(r#"{"a": {"b": [0, 1, 2, {"c": true}]}}"#).unwrap();
    let expected = doc.field("a.b.3.c").unwrap().id();
    for path in ["a.b[3].c", "/a/b[3]/c", r#"["a"]["b"][3]["c"]"#, "a/b/3/c", "a[b][3][c]"] {
        assert_eq!(doc.field(path).map(|node| node.id()), Some(expected), "path {path}");
    }
    assert_eq!(doc.field(r#"["a"]["b"][3]["c"]"#).unwrap().get_path(), "a.b.3.c");
    assert!(doc.field("a.b[4]").is_none());
}

#[test]
fn numbers_coerce_into_double_fields() {
    let mut doc = Document::with_schema(&registry(), "SimpleSchemaTest").unwrap();
    doc.field_add("vdouble").unwrap().set_literal("7").unwrap();
    let node = doc.field("vdouble").unwrap();
    assert_eq!(node.json_type(), JsonType::Double);
    assert_eq!(node.value::<f64>(), Some(7.0));
    assert_eq!(node.value::<i64>(), Some(7));

    doc.field_add("vdouble").unwrap().set_literal("7.9").unwrap();
    assert_eq!(doc.root().value_via_path::<i64>("vdouble"), Some(7));
    assert_eq!(doc.root().value_via_path::<f64>("vdouble"), Some(7.9));
}

#[test]
fn string_fields_reject_other_types() {
    let mut doc = Document::with_schema(&registry(), "SimpleSchemaTest").unwrap();
    let mut field = doc.field_add("vstring").unwrap();
    assert_eq!(field.set_from(5).unwrap_err().kind, ErrorKind::TypeMismatch);
    assert_eq!(field.set_from(true).unwrap_err().kind, ErrorKind::TypeMismatch);
    field.set_from("text").unwrap();
    field.set_null().unwrap();
    assert_eq!(doc.dump(true), r#"{"vstring":null}"#);
}

#[test]
fn limits_and_integer_widths_are_enforced() {
    let mut doc = Document::with_schema(&registry(), "Limits").unwrap();
    let err = doc.root_mut().set_value_via_path("value", 0.5).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfRange);
    assert_eq!(doc.root().value_via_path::<f64>("value"), Some(100000.0));

    let err = doc.root_mut().set_value_via_path("inner.vint", 1i64 << 40).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfRange);
    doc.root_mut().set_value_via_path("inner.vint", 12).unwrap();
    assert_eq!(doc.root().value_via_path::<i32>("inner.vint"), Some(12));

    let err = doc.root_mut().set_value_via_path("inner.nope", 1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Missing);
}

#[test]
fn enums_accept_member_names() {
    let mut doc = Document::with_schema(&registry(), "Limits").unwrap();
    doc.field_add("color").unwrap().set_literal("BLUE").unwrap();
    let color = doc.field("color").unwrap();
    assert_eq!(color.value::<i64>(), Some(2));
    assert_eq!(color.enum_name(), Some("BLUE"));

    let err = doc.field_add("color").unwrap().set_from("PURPLE").unwrap_err();
    assert_eq!(err.kind, ErrorKind::SchemaLookup);
}

#[test]
fn union_members_are_flagged() {
    let mut doc = Document::with_schema(&registry(), "Shape").unwrap();
    doc.field_add("circle").unwrap().set_from(1.5).unwrap();
    assert!(doc.field("circle").unwrap().is_union());
    assert!(!doc.root().is_union());
    assert_eq!(doc.dump(true), r#"{"circle":1.5}"#);
}

#[test]
fn nested_struct_gets_a_timestamp() {
    let mut doc = Document::with_schema(&registry(), "Limits").unwrap();
    let stamp = doc.field_add("stamp").unwrap().into_ref();
    assert_eq!(stamp.fields_used(), vec!["year", "month", "day", "hour", "minute", "second"]);
    assert!(stamp.value_via_path::<i64>("year").is_some_and(|year| year >= 2000));
}

#[test]
fn arrays_resize_both_ways() {
    let mut doc = Document::parse("[1, 2, 3, 4]").unwrap();
    doc.root_mut().array_resize(2, "").unwrap();
    assert_eq!(doc.dump(true), "[1,2]");
    doc.root_mut().array_resize(6, "0").unwrap();
    assert_eq!(doc.dump(true), "[1,2,0,0,0,0]");

    let mut doc = Document::parse(r#"[{"x": [1]}]"#).unwrap();
    doc.root_mut().array_resize(3, "").unwrap();
    assert_eq!(doc.dump(true), r#"[{"x":[1]},{"x":[1]},{"x":[1]}]"#);
}

#[test]
fn schema_arrays_resize_with_typed_elements() {
    let mut doc = Document::with_schema(&registry(), "Limits").unwrap();
    let mut grid = doc.field_add("grid").unwrap();
    grid.array_resize(2, "").unwrap();
    grid.at_index(0).unwrap().array_resize(2, "1").unwrap();
    assert_eq!(doc.dump(true), r#"{"value":100000.0,"name":"","grid":[[1.0,1.0],[]]}"#);
    assert_eq!(doc.field("grid[0][1]").unwrap().field_type().map(|ty| ty.to_string()), Some("double".to_string()));

    let mut grid = doc.field_mut("grid").unwrap();
    let err = grid.at_index(1).unwrap().array_resize(1, "yes").unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn copies_stay_within_one_registry() {
    let first = registry();
    let second = registry();
    let mut source = Document::with_schema(&first, "Limits").unwrap();
    source.root_mut().set_value_via_path("name", "sensor").unwrap();

    let mut same = Document::with_schema(&first, "Limits").unwrap();
    same.root_mut().copy_from(source.root()).unwrap();
    assert_eq!(same.root().value_via_path::<String>("name").as_deref(), Some("sensor"));

    let mut other = Document::with_schema(&second, "Limits").unwrap();
    let err = other.root_mut().copy_from(source.root()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Assignment);

    let free = Document::parse(r#"{"name": "loose", "value": 5}"#).unwrap();
    other.root_mut().copy_from(free.root()).unwrap();
    assert_eq!(other.dump(true), r#"{"value":5.0,"name":"loose"}"#);
}

#[test]
fn builders_fill_schema_documents() {
    let mut doc = Document::with_schema(&registry(), "SimpleSchemaTest").unwrap();
    {
        let mut root = doc.root_mut();
        let mut builder = root.object_builder().unwrap();
        builder.add_bool("vbool", true).unwrap().add_int("vint", -3).unwrap();
        builder.add_vector("vlist", &[1, 2]).unwrap();
        builder.add_map_key("vmap", [("k", "v")]).unwrap();
        assert_eq!(builder.add_int("missing", 1).unwrap_err().kind, ErrorKind::Missing);
    }
    assert_eq!(doc.dump(true), r#"{"vbool":true,"vint":-3,"vlist":[1.0,2.0],"vmap":{"k":"v"}}"#);
}

#[test]
fn serde_json_agrees_on_strict_fixtures() {
    for text in [include_str!("data/simple.json"), include_str!("data/nested.json"), include_str!("data/unicode.json")] {
        let doc = Document::parse(text).unwrap();
        let ours: serde_json::Value = serde_json::from_str(&doc.dump(true)).unwrap();
        let theirs: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(ours, theirs);
        assert_eq!(serde_json::to_value(&doc).unwrap(), theirs);
    }
}
