//! Typed conversion between nodes and native values.
//!
//! Reading ([`FromNode`]) is lenient: numbers convert into each other, a
//! string holding a literal converts into the literal's type, null reads as an
//! empty container, and unconvertible elements of a list or map are skipped.
//! Writing ([`IntoNode`]) goes through the node's kind, so schema-bound targets
//! check every value.
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;

use crate::error::Result;
use crate::node::{NodeMut, NodeRef};
use crate::scalar;
use crate::types::{JsonType, Scalar};

pub trait FromNode: Sized {
    fn from_node(node: NodeRef<'_>) -> Option<Self>;
}

pub trait IntoNode {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()>;
}

// ————————————————————————————————————————————————————————————————————————————
// READING
// ————————————————————————————————————————————————————————————————————————————

/// Scalar content, reinterpreting string content as a literal.
fn read_scalar(node: NodeRef<'_>) -> Option<Scalar> {
    match node.scalar()? {
        Scalar::String(text) => scalar::infer(text, false).ok(),
        other => Some(other.clone()),
    }
}

impl FromNode for bool {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        match read_scalar(node)? {
            Scalar::Bool(value) => Some(value),
            Scalar::Int(value) => Some(value != 0),
            _ => None,
        }
    }
}

impl FromNode for i64 {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        match read_scalar(node)? {
            Scalar::Int(value) => Some(value),
            Scalar::Double(value) if value.is_finite() => Some(value.trunc() as i64),
            Scalar::Bool(value) => Some(value as i64),
            _ => None,
        }
    }
}

macro_rules! from_node_integer {
    ($($ty:ty),*) => {$(
        impl FromNode for $ty {
            fn from_node(node: NodeRef<'_>) -> Option<Self> {
                <$ty>::try_from(i64::from_node(node)?).ok()
            }
        }
    )*};
}

from_node_integer!(i8, i16, i32, isize, u8, u16, u32, u64, usize);

impl FromNode for f64 {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        match read_scalar(node)? {
            Scalar::Double(value) => Some(value),
            Scalar::Int(value) => Some(value as f64),
            _ => None,
        }
    }
}

impl FromNode for f32 {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        f64::from_node(node).map(|value| value as f32)
    }
}

/// Strings read their text as is; other scalars read their canonical form and
/// containers read their dense JSON. Null has no string form.
impl FromNode for String {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        match node.scalar() {
            Some(Scalar::String(text)) => Some(text.clone()),
            Some(Scalar::Null) => None,
            Some(other) => Some(other.canonical()),
            None => Some(node.dump(true)),
        }
    }
}

impl<T: FromNode> FromNode for Option<T> {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        if node.is_null() { Some(None) } else { T::from_node(node).map(Some) }
    }
}

impl<T: FromNode> FromNode for Vec<T> {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        match node.json_type() {
            JsonType::Null => Some(Vec::new()),
            JsonType::Array | JsonType::Object => Some(node.children().filter_map(T::from_node).collect()),
            _ => None,
        }
    }
}

fn read_entries<T: FromNode>(node: NodeRef<'_>) -> Option<Vec<(String, T)>> {
    match node.json_type() {
        JsonType::Null => Some(Vec::new()),
        JsonType::Array | JsonType::Object => Some(
            node.children()
                .filter_map(|child| Some((child.key().to_string(), T::from_node(child)?)))
                .collect(),
        ),
        _ => None,
    }
}

impl<T: FromNode> FromNode for BTreeMap<String, T> {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        read_entries(node).map(|entries| entries.into_iter().collect())
    }
}

impl<T: FromNode, S: BuildHasher + Default> FromNode for HashMap<String, T, S> {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        read_entries(node).map(|entries| entries.into_iter().collect())
    }
}

impl<T: FromNode> FromNode for IndexMap<String, T> {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        read_entries(node).map(|entries| entries.into_iter().collect())
    }
}

impl FromNode for Scalar {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        node.scalar().cloned()
    }
}

impl FromNode for serde_json::Value {
    fn from_node(node: NodeRef<'_>) -> Option<Self> {
        use serde_json::Value;
        Some(match node.scalar() {
            Some(Scalar::Null) => Value::Null,
            Some(Scalar::Bool(value)) => Value::Bool(*value),
            Some(Scalar::Int(value)) => Value::from(*value),
            Some(Scalar::Double(value)) => serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number),
            Some(Scalar::String(text)) => Value::String(text.clone()),
            None if node.is_array() => Value::Array(node.children().filter_map(Value::from_node).collect()),
            None => Value::Object(
                node.children()
                    .filter_map(|child| Some((child.key().to_string(), Value::from_node(child)?)))
                    .collect(),
            ),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// WRITING
// ————————————————————————————————————————————————————————————————————————————

impl<T: IntoNode + ?Sized> IntoNode for &T {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        (**self).write_to(node)
    }
}

impl IntoNode for Scalar {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        node.set_scalar(self.clone())
    }
}

impl IntoNode for bool {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        node.set_scalar(Scalar::Bool(*self))
    }
}

macro_rules! into_node_integer {
    ($($ty:ty),*) => {$(
        impl IntoNode for $ty {
            fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
                node.set_scalar(Scalar::Int(i64::from(*self)))
            }
        }
    )*};
}

into_node_integer!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! into_node_wide_integer {
    ($($ty:ty),*) => {$(
        impl IntoNode for $ty {
            fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
                let scalar = match i64::try_from(*self) {
                    Ok(value) => Scalar::Int(value),
                    Err(_) => Scalar::Double(*self as f64),
                };
                node.set_scalar(scalar)
            }
        }
    )*};
}

into_node_wide_integer!(u64, usize, isize);

impl IntoNode for f64 {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        node.set_scalar(Scalar::Double(*self))
    }
}

/// Goes through the shortest decimal form so `1.7f32` is stored as `1.7`.
impl IntoNode for f32 {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        let value = format!("{self:?}").parse::<f64>().unwrap_or(*self as f64);
        node.set_scalar(Scalar::Double(value))
    }
}

impl IntoNode for str {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        node.set_scalar(Scalar::String(self.to_string()))
    }
}

impl IntoNode for String {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        self.as_str().write_to(node)
    }
}

impl<T: IntoNode> IntoNode for Option<T> {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        match self {
            Some(value) => value.write_to(node),
            None => node.set_null(),
        }
    }
}

fn write_items<'i, T: IntoNode + 'i>(node: &mut NodeMut<'_>, items: impl Iterator<Item = &'i T>) -> Result<()> {
    let (doc, id) = node.parts();
    doc.make_container(id, JsonType::Array)?;
    for (index, item) in items.enumerate() {
        let child = doc.append_node(id, &index.to_string())?;
        item.write_to(&mut NodeMut::new(doc, child))?;
    }
    Ok(())
}

fn write_entries<'i, T: IntoNode + 'i>(
    node: &mut NodeMut<'_>,
    entries: impl Iterator<Item = (&'i String, &'i T)>,
) -> Result<()> {
    let (doc, id) = node.parts();
    doc.make_container(id, JsonType::Object)?;
    for (key, value) in entries {
        let child = doc.append_node(id, key)?;
        value.write_to(&mut NodeMut::new(doc, child))?;
    }
    Ok(())
}

impl<T: IntoNode> IntoNode for [T] {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        write_items(node, self.iter())
    }
}

impl<T: IntoNode> IntoNode for Vec<T> {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        write_items(node, self.iter())
    }
}

impl<T: IntoNode, const N: usize> IntoNode for [T; N] {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        write_items(node, self.iter())
    }
}

impl<T: IntoNode> IntoNode for BTreeMap<String, T> {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        write_entries(node, self.iter())
    }
}

impl<T: IntoNode, S: BuildHasher> IntoNode for HashMap<String, T, S> {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        write_entries(node, self.iter())
    }
}

impl<T: IntoNode> IntoNode for IndexMap<String, T> {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        write_entries(node, self.iter())
    }
}

impl IntoNode for serde_json::Value {
    fn write_to(&self, node: &mut NodeMut<'_>) -> Result<()> {
        use serde_json::Value;
        match self {
            Value::Null => node.set_null(),
            Value::Bool(value) => value.write_to(node),
            Value::Number(number) => match number.as_i64() {
                Some(value) => value.write_to(node),
                None => number.as_f64().unwrap_or(f64::NAN).write_to(node),
            },
            Value::String(text) => text.write_to(node),
            Value::Array(items) => write_items(node, items.iter()),
            Value::Object(map) => write_entries(node, map.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Document;

    #[test]
    fn numbers_convert_into_each_other() {
        let doc = Document::parse(r#"{"i": 3, "d": 2.9, "s": "42", "b": true, "big": 300}"#).unwrap();
        assert_eq!(doc.field("i").unwrap().value::<f64>(), Some(3.0));
        assert_eq!(doc.field("d").unwrap().value::<i32>(), Some(2));
        assert_eq!(doc.field("s").unwrap().value::<i64>(), Some(42));
        assert_eq!(doc.field("b").unwrap().value::<bool>(), Some(true));
        assert_eq!(doc.field("big").unwrap().value::<u8>(), None);
        assert_eq!(doc.field("b").unwrap().value::<String>(), Some("true".to_string()));
    }

    #[test]
    fn get_to_leaves_output_alone_on_failure() {
        let doc = Document::parse(r#"{"word": "abc"}"#).unwrap();
        let mut out = 7i64;
        assert!(!doc.field("word").unwrap().get_to(&mut out));
        assert_eq!(out, 7);
    }

    #[test]
    fn null_reads_as_empty_containers() {
        let doc = Document::parse(r#"{"n": null, "x": 5}"#).unwrap();
        assert_eq!(doc.field("n").unwrap().value::<Vec<i64>>(), Some(vec![]));
        assert_eq!(doc.field("n").unwrap().value::<BTreeMap<String, i64>>(), Some(BTreeMap::new()));
        assert_eq!(doc.field("n").unwrap().value::<i64>(), None);
        assert_eq!(doc.field("x").unwrap().value::<Vec<i64>>(), None);
    }

    #[test]
    fn null_does_not_read_as_text() {
        let doc = Document::parse(r#"{"n": null, "l": [null, "a"]}"#).unwrap();
        let mut out = "kept".to_string();
        assert!(!doc.field("n").unwrap().get_to(&mut out));
        assert_eq!(out, "kept");
        assert_eq!(doc.field("n").unwrap().value::<Option<String>>(), Some(None));
        assert_eq!(doc.field("l").unwrap().value::<Vec<String>>(), Some(vec!["a".to_string()]));
    }

    #[test]
    fn bad_elements_are_skipped() {
        let doc = Document::parse(r#"{"l": [1, "two", 3, {}], "m": {"a": 1, "b": []}}"#).unwrap();
        assert_eq!(doc.field("l").unwrap().value::<Vec<i64>>(), Some(vec![1, 3]));
        let map: HashMap<String, i64> = doc.field("m").unwrap().value().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn containers_read_as_dense_text() {
        let doc = Document::parse(r#"{"o": {"k": [1, 2]}}"#).unwrap();
        assert_eq!(doc.field("o").unwrap().value::<String>().unwrap(), r#"{"k":[1,2]}"#);
    }

    #[test]
    fn writes_build_structure() {
        let mut doc = Document::object();
        let mut root = doc.root_mut();
        root.at_key("v").unwrap().set_from(vec![1.5, 2.5]).unwrap();
        let mut map = BTreeMap::new();
        map.insert("x".to_string(), vec!["a", "b"]);
        root.at_key("m").unwrap().set_from(&map).unwrap();
        root.at_key("f").unwrap().set_from(1.7f32).unwrap();
        root.at_key("n").unwrap().set_from(None::<i32>).unwrap();
        assert_eq!(doc.dump(true), r#"{"v":[1.5,2.5],"m":{"x":["a","b"]},"f":1.7,"n":null}"#);
    }

    #[test]
    fn serde_json_values_cross_over() {
        let value = serde_json::json!({"a": [1, 2.5, "x", null, {"b": false}]});
        let mut doc = Document::object();
        doc.root_mut().set_from(&value).unwrap();
        assert_eq!(doc.root().value::<serde_json::Value>(), Some(value));
    }
}
