//! The Thrift-like schema dialect: the JSON layout written by Thrift's JSON generator.
//!
//! ```json
//! {"name": "test",
//!  "enums": [{"name": "Color", "members": [{"name": "RED", "value": 0}]}],
//!  "structs": [{"name": "S", "isUnion": false, "fields": [
//!     {"key": 1, "name": "vlist", "typeId": "list",
//!      "type": {"typeId": "list", "elemTypeId": "double"},
//!      "required": "optional", "default": [1.0], "minval": 0, "maxval": 10}]}]}
//! ```
use serde::Deserialize;
use ordered_float::OrderedFloat;
use tracing::*;

use crate::error::{Error, ErrorKind, Result};
use super::registry::SchemaSet;
use super::types::{EnumDef, FieldDef, FieldType, Requiredness, StructDef};

// ————————————————————————————————————————————————————————————————————————————
// SOURCE LAYOUT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Deserialize, Debug)]
struct ThriftDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    enums: Vec<ThriftEnum>,
    #[serde(default)]
    structs: Vec<ThriftStruct>,
}

#[derive(Deserialize, Debug)]
struct ThriftEnum {
    name: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    members: Vec<ThriftEnumMember>,
}

#[derive(Deserialize, Debug)]
struct ThriftEnumMember {
    name: String,
    value: i64,
    #[serde(default)]
    doc: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ThriftStruct {
    name: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    is_union: bool,
    #[serde(default)]
    fields: Vec<ThriftField>,
    #[serde(default, rename = "to_select")]
    to_select: Vec<String>,
    #[serde(default, rename = "to_key")]
    to_key: Vec<String>,
    #[serde(default)]
    unique: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ThriftField {
    key: i32,
    name: String,
    type_id: String,
    #[serde(rename = "type")]
    ty: Option<ThriftType>,
    #[serde(default)]
    required: String,
    #[serde(default)]
    doc: String,
    default: Option<serde_json::Value>,
    #[serde(alias = "minval")]
    min: Option<f64>,
    #[serde(alias = "maxval")]
    max: Option<f64>,
}

/// A `keyType` description is ignored: map keys are plain scalars, so an
/// enum key is stored as its integer.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ThriftType {
    #[allow(unused)]
    type_id: Option<String>,
    class: Option<String>,
    elem_type_id: Option<String>,
    elem_type: Option<Box<ThriftType>>,
    key_type_id: Option<String>,
    value_type_id: Option<String>,
    value_type: Option<Box<ThriftType>>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSION
// ————————————————————————————————————————————————————————————————————————————

/// Parse function registered under the `"thrift"` format name.
pub fn parse_thrift(text: &str) -> Result<SchemaSet> {
    let de = &mut serde_json::Deserializer::from_str(text);
    let doc: ThriftDocument = serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        source_error(format!("at JSON path {path} → {}", err.into_inner()))
    })?;
    debug!(schema = %doc.name, structs = doc.structs.len(), enums = doc.enums.len(), "parsed thrift schema");

    let mut set = SchemaSet::default();
    for en in doc.enums {
        let mut def = EnumDef::new(en.name, en.doc);
        for member in en.members {
            def.add_member(member.name, member.value, member.doc);
        }
        set.enums.push(def);
    }
    for st in doc.structs {
        let mut def = StructDef::new(st.name, st.doc, st.is_union);
        def.to_select = st.to_select;
        def.to_key = st.to_key;
        def.unique = st.unique;
        for field in st.fields {
            let field = convert_field(&def.name, field)?;
            def.add_field(field)?;
        }
        set.structs.push(def);
    }
    Ok(set)
}

fn convert_field(owner: &str, field: ThriftField) -> Result<FieldDef> {
    let mut type_chain = Vec::new();
    let mut class_name = String::new();
    flatten_type(&field.type_id, field.ty.as_ref(), &mut type_chain, &mut class_name)
        .map_err(|err| source_error(format!("{owner}.{}: {}", field.name, err.message)))?;

    let required = Requiredness::from_code(&field.required).ok_or_else(|| {
        source_error(format!("{owner}.{}: unknown requiredness `{}`", field.name, field.required))
    })?;

    let default = match field.default {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(value.to_string()),
    };

    Ok(FieldDef {
        id: field.key,
        name: field.name,
        doc: field.doc,
        required,
        type_chain,
        class_name,
        default,
        min: field.min.map(OrderedFloat),
        max: field.max.map(OrderedFloat),
    })
}

/// Appends the codes for `type_id` (and its nested element types) to `chain`.
fn flatten_type(
    type_id: &str,
    ty: Option<&ThriftType>,
    chain: &mut Vec<FieldType>,
    class_name: &mut String,
) -> Result<()> {
    let code = FieldType::from_code(type_id)
        .ok_or_else(|| source_error(format!("unknown type id `{type_id}`")))?;
    let class = ty.and_then(|t| t.class.clone());

    match code {
        FieldType::List | FieldType::Set => {
            chain.push(code);
            let ty = ty.ok_or_else(|| source_error(format!("`{type_id}` needs a `type` description")))?;
            let elem = ty
                .elem_type_id
                .as_deref()
                .ok_or_else(|| source_error(format!("`{type_id}` without `elemTypeId`")))?;
            flatten_type(elem, ty.elem_type.as_deref(), chain, class_name)
        }
        FieldType::Map => {
            chain.push(code);
            let ty = ty.ok_or_else(|| source_error("`map` needs a `type` description"))?;
            let key = ty
                .key_type_id
                .as_deref()
                .ok_or_else(|| source_error("`map` without `keyTypeId`"))?;
            let key_code = FieldType::from_code(key)
                .ok_or_else(|| source_error(format!("unknown map key type `{key}`")))?;
            if key_code.json_type().is_structured() {
                return Err(source_error(format!("map keys must be scalar, found `{key}`")));
            }
            chain.push(key_code);
            let value = ty
                .value_type_id
                .as_deref()
                .ok_or_else(|| source_error("`map` without `valueTypeId`"))?;
            flatten_type(value, ty.value_type.as_deref(), chain, class_name)
        }
        FieldType::Struct | FieldType::Enum => {
            chain.push(code);
            *class_name = class.ok_or_else(|| source_error(format!("`{type_id}` without `class`")))?;
            Ok(())
        }
        // Thrift writes enums as i32 carrying a class name.
        _ if code.is_integer() && class.is_some() => {
            chain.push(FieldType::Enum);
            *class_name = class.unwrap_or_default();
            Ok(())
        }
        _ => {
            chain.push(code);
            Ok(())
        }
    }
}

fn source_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::SchemaSource, "registry", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"{
        "name": "unit",
        "enums": [{"name": "Level", "members": [{"name": "LOW", "value": 1}, {"name": "HIGH", "value": 9, "doc": "max"}]}],
        "structs": [{
            "name": "Sensor", "isUnion": false, "to_key": ["id"],
            "fields": [
                {"key": 1, "name": "id", "typeId": "string", "required": "required"},
                {"key": 2, "name": "grid", "typeId": "list",
                 "type": {"typeId": "list", "elemTypeId": "list", "elemType": {"typeId": "list", "elemTypeId": "double"}},
                 "required": "optional"},
                {"key": 3, "name": "tags", "typeId": "map",
                 "type": {"typeId": "map", "keyTypeId": "string", "valueTypeId": "struct", "valueType": {"typeId": "struct", "class": "Tag"}}},
                {"key": 4, "name": "level", "typeId": "i32", "type": {"typeId": "i32", "class": "Level"}, "default": 1},
                {"key": 5, "name": "value", "typeId": "double", "default": 100000, "minval": 1, "maxval": 1e10}
            ]
        }]
    }"#;

    #[test]
    fn nested_types_flatten_into_chains() {
        let set = parse_thrift(SOURCE).unwrap();
        let sensor = &set.structs[0];
        assert_eq!(sensor.to_key, vec!["id".to_string()]);

        let grid = sensor.field_by_name("grid").unwrap();
        assert_eq!(grid.type_chain, vec![FieldType::List, FieldType::List, FieldType::Double]);

        let tags = sensor.field_by_name("tags").unwrap();
        assert_eq!(tags.type_chain, vec![FieldType::Map, FieldType::String, FieldType::Struct]);
        assert_eq!(tags.class_name, "Tag");
        assert_eq!(tags.required, Requiredness::Default);
    }

    #[test]
    fn integer_with_class_is_an_enum() {
        let set = parse_thrift(SOURCE).unwrap();
        let level = set.structs[0].field_by_name("level").unwrap();
        assert_eq!(level.type_chain, vec![FieldType::Enum]);
        assert_eq!(level.class_name, "Level");
        assert_eq!(set.enums[0].value_of("HIGH"), Some(9));
    }

    #[test]
    fn enum_keyed_maps_keep_the_value_class() {
        let set = parse_thrift(
            r#"{"structs": [{"name": "S", "fields": [{"key": 1, "name": "by_level", "typeId": "map",
                "type": {"typeId": "map", "keyTypeId": "i32", "keyType": {"typeId": "i32", "class": "Level"},
                         "valueTypeId": "struct", "valueType": {"typeId": "struct", "class": "Tag"}}}]}]}"#,
        )
        .unwrap();
        let field = set.structs[0].field_by_name("by_level").unwrap();
        assert_eq!(field.type_chain, vec![FieldType::Map, FieldType::I32, FieldType::Struct]);
        assert_eq!(field.class_name, "Tag");
    }

    #[test]
    fn defaults_and_limits_are_kept() {
        let set = parse_thrift(SOURCE).unwrap();
        let value = set.structs[0].field_by_name("value").unwrap();
        assert_eq!(value.default.as_deref(), Some("100000"));
        assert_eq!(value.min, Some(OrderedFloat(1.0)));
        assert_eq!(value.max, Some(OrderedFloat(1e10)));
    }

    #[test]
    fn errors_point_at_the_offending_path() {
        let err = parse_thrift(r#"{"structs": [{"name": "S", "fields": [{"key": "x"}]}]}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaSource);
        assert!(err.message.contains("structs[0].fields[0].key"), "{}", err.message);
    }

    #[test]
    fn unknown_type_ids_are_rejected() {
        let err = parse_thrift(r#"{"structs": [{"name": "S", "fields": [{"key": 1, "name": "a", "typeId": "decimal"}]}]}"#)
            .unwrap_err();
        assert!(err.message.contains("decimal"));
    }
}
