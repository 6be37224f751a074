//! Struct, field and enum descriptors.
//!
//! Descriptors are built once by a schema dialect and never mutated afterwards;
//! nodes hold them through `Arc`.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::error::{Error, ErrorKind, Result};
use crate::types::JsonType;

/// One entry of a field's type chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Float,
    String,
    Binary,
    Struct,
    Map,
    Set,
    List,
    Enum,
}

impl FieldType {
    pub fn from_code(code: &str) -> Option<Self> {
        let ty = match code {
            "bool" => FieldType::Bool,
            "byte" | "i8" => FieldType::Byte,
            "i16" => FieldType::I16,
            "i32" => FieldType::I32,
            "i64" => FieldType::I64,
            "double" => FieldType::Double,
            "float" => FieldType::Float,
            "string" => FieldType::String,
            "binary" => FieldType::Binary,
            "struct" | "union" | "exception" => FieldType::Struct,
            "map" => FieldType::Map,
            "set" => FieldType::Set,
            "list" => FieldType::List,
            "enum" => FieldType::Enum,
            _ => return None,
        };
        Some(ty)
    }

    pub fn code(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Byte => "byte",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Binary => "binary",
            FieldType::Struct => "struct",
            FieldType::Map => "map",
            FieldType::Set => "set",
            FieldType::List => "list",
            FieldType::Enum => "enum",
        }
    }

    /// The JSON type a node of this schema type holds.
    pub fn json_type(self) -> JsonType {
        match self {
            FieldType::Bool => JsonType::Bool,
            FieldType::Byte | FieldType::I16 | FieldType::I32 | FieldType::I64 | FieldType::Enum => {
                JsonType::Int
            }
            FieldType::Double | FieldType::Float => JsonType::Double,
            FieldType::String | FieldType::Binary => JsonType::String,
            FieldType::Struct | FieldType::Map => JsonType::Object,
            FieldType::List | FieldType::Set => JsonType::Array,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FieldType::Byte | FieldType::I16 | FieldType::I32 | FieldType::I64 | FieldType::Enum)
    }

    /// Inclusive range an integer type can hold.
    pub fn integer_bounds(self) -> Option<(i64, i64)> {
        match self {
            FieldType::Byte => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldType::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldType::I32 | FieldType::Enum => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldType::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requiredness {
    Required,
    Optional,
    /// Thrift's default requiredness (`req_out`).
    Default,
}

impl Requiredness {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "required" => Some(Requiredness::Required),
            "optional" => Some(Requiredness::Optional),
            "req_out" | "default" | "" => Some(Requiredness::Default),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub id: i32,
    pub name: String,
    pub doc: String,
    pub required: Requiredness,
    /// `[container, key?, elem, ...]`, e.g. `list<list<double>>` is `[list, list, double]`.
    pub type_chain: Vec<FieldType>,
    /// Struct or enum name for the innermost struct/enum element.
    pub class_name: String,
    /// Default value as JSON text.
    pub default: Option<String>,
    pub min: Option<OrderedFloat<f64>>,
    pub max: Option<OrderedFloat<f64>>,
}

impl FieldDef {
    pub fn type_at(&self, level: usize) -> Option<FieldType> {
        self.type_chain.get(level).copied()
    }

    /// Level of the elements held by a container at `level`. Map keys occupy
    /// `level + 1`, so map values sit one further down.
    pub fn child_level(&self, level: usize) -> Option<usize> {
        let child = match self.type_at(level)? {
            FieldType::List | FieldType::Set => level + 1,
            FieldType::Map => level + 2,
            _ => return None,
        };
        (child < self.type_chain.len()).then_some(child)
    }

    /// Materialised on construction of the owning struct.
    pub fn is_prepopulated(&self) -> bool {
        self.required == Requiredness::Required || self.default.is_some()
    }

    pub fn within_limits(&self, value: f64) -> bool {
        let above_min = self.min.map_or(true, |min| value >= min.0);
        let below_max = self.max.map_or(true, |max| value <= max.0);
        above_min && below_max
    }

    /// Thrift-style spelling of the type chain, e.g. `map<string,list<i32>>`.
    pub fn type_name(&self) -> String {
        fn render(chain: &[FieldType], level: usize) -> String {
            match chain.get(level) {
                None => "?".to_string(),
                Some(FieldType::List) | Some(FieldType::Set) => {
                    format!("{}<{}>", chain[level], render(chain, level + 1))
                }
                Some(FieldType::Map) => {
                    format!("map<{},{}>", render(chain, level + 1), render(chain, level + 2))
                }
                Some(other) => other.to_string(),
            }
        }
        render(&self.type_chain, 0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub doc: String,
    pub is_union: bool,
    fields: IndexMap<String, Arc<FieldDef>>,
    ids: HashMap<i32, usize>,
    pub to_select: Vec<String>,
    pub to_key: Vec<String>,
    pub unique: Vec<String>,
}

impl StructDef {
    pub fn new(name: impl Into<String>, doc: impl Into<String>, is_union: bool) -> Self {
        StructDef {
            name: name.into(),
            doc: doc.into(),
            is_union,
            fields: IndexMap::new(),
            ids: HashMap::new(),
            to_select: Vec::new(),
            to_key: Vec::new(),
            unique: Vec::new(),
        }
    }

    pub fn add_field(&mut self, field: FieldDef) -> Result<()> {
        if self.fields.contains_key(&field.name) || self.ids.contains_key(&field.id) {
            return Err(Error::new(
                ErrorKind::SchemaSource,
                "registry",
                format!("struct `{}` declares field `{}` (id {}) twice", self.name, field.name, field.id),
            ));
        }
        self.ids.insert(field.id, self.fields.len());
        self.fields.insert(field.name.clone(), Arc::new(field));
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = &Arc<FieldDef>> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<FieldDef>> {
        self.fields.get(name)
    }

    pub fn field_by_id(&self, id: i32) -> Option<&Arc<FieldDef>> {
        let index = *self.ids.get(&id)?;
        self.fields.get_index(index).map(|(_, field)| field)
    }

    /// Declaration position of a field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub doc: String,
    values: IndexMap<String, i64>,
    names: BTreeMap<i64, String>,
    docs: HashMap<String, String>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Self {
        EnumDef { name: name.into(), doc: doc.into(), ..EnumDef::default() }
    }

    pub fn add_member(&mut self, name: impl Into<String>, value: i64, doc: impl Into<String>) {
        let name = name.into();
        self.names.insert(value, name.clone());
        self.docs.insert(name.clone(), doc.into());
        self.values.insert(name, value);
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.names.get(&value).map(String::as_str)
    }

    pub fn doc_of(&self, name: &str) -> Option<&str> {
        self.docs.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, id: i32, chain: Vec<FieldType>) -> FieldDef {
        FieldDef {
            id,
            name: name.to_string(),
            doc: String::new(),
            required: Requiredness::Optional,
            type_chain: chain,
            class_name: String::new(),
            default: None,
            min: None,
            max: None,
        }
    }

    #[test]
    fn child_levels_skip_map_keys() {
        let nested = field("m", 1, vec![FieldType::Map, FieldType::String, FieldType::List, FieldType::I32]);
        assert_eq!(nested.child_level(0), Some(2));
        assert_eq!(nested.child_level(2), Some(3));
        assert_eq!(nested.child_level(3), None);
        assert_eq!(nested.type_name(), "map<string,list<i32>>");
    }

    #[test]
    fn struct_lookup_by_name_and_id() {
        let mut def = StructDef::new("S", "", false);
        def.add_field(field("a", 10, vec![FieldType::I32])).unwrap();
        def.add_field(field("b", 20, vec![FieldType::String])).unwrap();
        assert_eq!(def.field_by_id(20).unwrap().name, "b");
        assert_eq!(def.field_index("b"), Some(1));
        assert!(def.add_field(field("a", 30, vec![FieldType::I32])).is_err());
    }

    #[test]
    fn enum_maps_both_ways() {
        let mut colors = EnumDef::new("Color", "");
        colors.add_member("RED", 0, "warm");
        colors.add_member("BLUE", 2, "");
        assert_eq!(colors.value_of("BLUE"), Some(2));
        assert_eq!(colors.name_of(0), Some("RED"));
        assert_eq!(colors.doc_of("RED"), Some("warm"));
        assert_eq!(colors.names().collect::<Vec<_>>(), vec!["RED", "BLUE"]);
    }

    #[test]
    fn limits_are_inclusive() {
        let mut f = field("v", 1, vec![FieldType::Double]);
        f.min = Some(OrderedFloat(1.0));
        f.max = Some(OrderedFloat(1e10));
        assert!(f.within_limits(1.0));
        assert!(f.within_limits(100000.0));
        assert!(!f.within_limits(0.5));
    }
}
