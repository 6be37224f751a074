//! Fluent construction of objects and arrays.
//!
//! A builder is opened over an existing node, which it first clears into an
//! empty container. Each `add_*` call appends one child and returns the
//! builder again, so calls chain with `?`:
//!
//! ```
//! use json_node::Document;
//!
//! let mut doc = Document::object();
//! let mut root = doc.root_mut();
//! let mut obj = root.object_builder()?;
//! obj.add_int("a", 1)?.add_string("b", "x")?;
//! obj.add_array("c")?.add_double(1.5)?.add_null()?;
//! assert_eq!(doc.dump(true), r#"{"a":1,"b":"x","c":[1.5,null]}"#);
//! # Ok::<(), json_node::Error>(())
//! ```
use indextree::NodeId;

use crate::convert::IntoNode;
use crate::error::{Error, Result};
use crate::node::{Document, NodeMut};
use crate::scalar;
use crate::types::{JsonType, Scalar};

const COMPONENT: &str = "builder";

// ————————————————————————————————————————————————————————————————————————————
// SHARED
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
struct Base<'a> {
    doc: &'a mut Document,
    id: NodeId,
}

impl<'a> Base<'a> {
    fn open(doc: &'a mut Document, id: NodeId, ty: JsonType) -> Result<Self> {
        doc.make_container(id, ty)?;
        Ok(Base { doc, id })
    }

    /// Fetches or creates the child under `key` and runs `write` on it. A
    /// child created here is removed again when `write` fails.
    fn fill(&mut self, key: &str, write: impl FnOnce(&mut Document, NodeId) -> Result<()>) -> Result<NodeId> {
        let created = self.doc.find_child(self.id, key).is_none();
        let child = self.doc.append_node(self.id, key)?;
        if let Err(err) = write(&mut *self.doc, child) {
            if created {
                self.doc.remove(child)?;
            }
            return Err(err);
        }
        Ok(child)
    }

    fn scalar(&mut self, key: &str, scalar: Scalar) -> Result<()> {
        self.fill(key, |doc, child| doc.assign_scalar(child, scalar))?;
        Ok(())
    }

    fn value<T: IntoNode>(&mut self, key: &str, value: T) -> Result<()> {
        self.fill(key, |doc, child| value.write_to(&mut NodeMut::new(doc, child)))?;
        Ok(())
    }

    fn object(&mut self, key: &str) -> Result<ObjectBuilder<'_>> {
        let child = self.fill(key, |doc, child| doc.make_container(child, JsonType::Object))?;
        Ok(ObjectBuilder { base: Base { doc: &mut *self.doc, id: child } })
    }

    fn array(&mut self, key: &str) -> Result<ArrayBuilder<'_>> {
        let child = self.fill(key, |doc, child| doc.make_container(child, JsonType::Array))?;
        Ok(ArrayBuilder { base: Base { doc: &mut *self.doc, id: child }, next: 0 })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OBJECTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct ObjectBuilder<'a> {
    base: Base<'a>,
}

impl<'a> ObjectBuilder<'a> {
    pub(crate) fn over(doc: &'a mut Document, id: NodeId) -> Result<Self> {
        Ok(ObjectBuilder { base: Base::open(doc, id, JsonType::Object)? })
    }

    pub fn new(node: NodeMut<'a>) -> Result<Self> {
        let id = node.id();
        Self::over(node.into_document(), id)
    }

    pub fn id(&self) -> NodeId {
        self.base.id
    }

    pub fn add_null(&mut self, key: &str) -> Result<&mut Self> {
        self.base.scalar(key, Scalar::Null)?;
        Ok(self)
    }

    pub fn add_bool(&mut self, key: &str, value: bool) -> Result<&mut Self> {
        self.base.scalar(key, Scalar::Bool(value))?;
        Ok(self)
    }

    pub fn add_int(&mut self, key: &str, value: i64) -> Result<&mut Self> {
        self.base.scalar(key, Scalar::Int(value))?;
        Ok(self)
    }

    pub fn add_double(&mut self, key: &str, value: f64) -> Result<&mut Self> {
        self.base.scalar(key, Scalar::Double(value))?;
        Ok(self)
    }

    pub fn add_string(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        self.base.scalar(key, Scalar::String(value.to_string()))?;
        Ok(self)
    }

    pub fn add_scalar_value(&mut self, key: &str, value: Scalar) -> Result<&mut Self> {
        self.base.scalar(key, value)?;
        Ok(self)
    }

    /// Adds a literal, typed by inference; unrecognised text is a string.
    pub fn add_scalar(&mut self, key: &str, literal: &str) -> Result<&mut Self> {
        self.base.scalar(key, scalar::infer(literal, true)?)?;
        Ok(self)
    }

    pub fn add_value<T: IntoNode>(&mut self, key: &str, value: T) -> Result<&mut Self> {
        self.base.value(key, value)?;
        Ok(self)
    }

    pub fn add_vector<T: IntoNode>(&mut self, key: &str, values: &[T]) -> Result<&mut Self> {
        self.base.value(key, values)?;
        Ok(self)
    }

    /// Adds an object holding every `(key, value)` entry.
    pub fn add_map_key<K, V, I>(&mut self, key: &str, entries: I) -> Result<&mut Self>
    where
        K: AsRef<str>,
        V: IntoNode,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut child = self.base.object(key)?;
        for (name, value) in entries {
            child.add_value(name.as_ref(), value)?;
        }
        Ok(self)
    }

    pub fn add_object(&mut self, key: &str) -> Result<ObjectBuilder<'_>> {
        self.base.object(key)
    }

    pub fn add_array(&mut self, key: &str) -> Result<ArrayBuilder<'_>> {
        self.base.array(key)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ARRAYS
// ————————————————————————————————————————————————————————————————————————————

/// Appends elements under consecutive decimal keys.
#[derive(Debug)]
pub struct ArrayBuilder<'a> {
    base: Base<'a>,
    next: usize,
}

impl<'a> ArrayBuilder<'a> {
    pub(crate) fn over(doc: &'a mut Document, id: NodeId) -> Result<Self> {
        Ok(ArrayBuilder { base: Base::open(doc, id, JsonType::Array)?, next: 0 })
    }

    pub fn new(node: NodeMut<'a>) -> Result<Self> {
        let id = node.id();
        Self::over(node.into_document(), id)
    }

    pub fn id(&self) -> NodeId {
        self.base.id
    }

    /// Number of elements added so far.
    pub fn len(&self) -> usize {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    fn next_key(&mut self) -> String {
        let key = self.next.to_string();
        self.next += 1;
        key
    }

    /// Accepts an explicit key only when it names the next position.
    fn check_key(&self, key: &str) -> Result<()> {
        if key == self.next.to_string() {
            Ok(())
        } else {
            Err(Error::missing(
                COMPONENT,
                format!("array key `{key}` is out of sequence, expected `{}`", self.next),
            ))
        }
    }

    fn push(&mut self, scalar: Scalar) -> Result<&mut Self> {
        let key = self.next_key();
        if let Err(err) = self.base.scalar(&key, scalar) {
            self.next -= 1;
            return Err(err);
        }
        Ok(self)
    }

    pub fn add_null(&mut self) -> Result<&mut Self> {
        self.push(Scalar::Null)
    }

    pub fn add_bool(&mut self, value: bool) -> Result<&mut Self> {
        self.push(Scalar::Bool(value))
    }

    pub fn add_int(&mut self, value: i64) -> Result<&mut Self> {
        self.push(Scalar::Int(value))
    }

    pub fn add_double(&mut self, value: f64) -> Result<&mut Self> {
        self.push(Scalar::Double(value))
    }

    pub fn add_string(&mut self, value: &str) -> Result<&mut Self> {
        self.push(Scalar::String(value.to_string()))
    }

    pub fn add_scalar_value(&mut self, value: Scalar) -> Result<&mut Self> {
        self.push(value)
    }

    pub fn add_scalar(&mut self, literal: &str) -> Result<&mut Self> {
        self.push(scalar::infer(literal, true)?)
    }

    /// Keyed form of [`add_scalar`](Self::add_scalar), for callers that track
    /// positions themselves.
    pub fn add_scalar_at(&mut self, key: &str, literal: &str) -> Result<&mut Self> {
        self.check_key(key)?;
        self.add_scalar(literal)
    }

    pub fn add_value<T: IntoNode>(&mut self, value: T) -> Result<&mut Self> {
        let key = self.next_key();
        if let Err(err) = self.base.value(&key, value) {
            self.next -= 1;
            return Err(err);
        }
        Ok(self)
    }

    pub fn add_value_at<T: IntoNode>(&mut self, key: &str, value: T) -> Result<&mut Self> {
        self.check_key(key)?;
        self.add_value(value)
    }

    pub fn add_vector<T: IntoNode>(&mut self, values: &[T]) -> Result<&mut Self> {
        self.add_value(values)
    }

    pub fn add_map_key<K, V, I>(&mut self, entries: I) -> Result<&mut Self>
    where
        K: AsRef<str>,
        V: IntoNode,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut child = self.add_object()?;
        for (name, value) in entries {
            child.add_value(name.as_ref(), value)?;
        }
        Ok(self)
    }

    pub fn add_object(&mut self) -> Result<ObjectBuilder<'_>> {
        let key = self.next_key();
        match self.base.object(&key) {
            Ok(child) => Ok(child),
            Err(err) => {
                self.next -= 1;
                Err(err)
            }
        }
    }

    pub fn add_array(&mut self) -> Result<ArrayBuilder<'_>> {
        let key = self.next_key();
        match self.base.array(&key) {
            Ok(child) => Ok(child),
            Err(err) => {
                self.next -= 1;
                Err(err)
            }
        }
    }

    pub fn add_object_at(&mut self, key: &str) -> Result<ObjectBuilder<'_>> {
        self.check_key(key)?;
        self.add_object()
    }

    pub fn add_array_at(&mut self, key: &str) -> Result<ArrayBuilder<'_>> {
        self.check_key(key)?;
        self.add_array()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::SchemaRegistry;

    #[test]
    fn nested_builders() {
        let mut doc = Document::object();
        let mut root = doc.root_mut();
        let mut obj = root.object_builder().unwrap();
        obj.add_bool("flag", true).unwrap().add_scalar("guess", "12").unwrap();
        {
            let mut rows = obj.add_array("rows").unwrap();
            rows.add_vector(&[1, 2]).unwrap();
            rows.add_object().unwrap().add_string("name", "x").unwrap();
        }
        obj.add_map_key("m", [("k", 1.5)]).unwrap();
        assert_eq!(
            doc.dump(true),
            r#"{"flag":true,"guess":12,"rows":[[1,2],{"name":"x"}],"m":{"k":1.5}}"#
        );
    }

    #[test]
    fn opening_a_builder_clears_the_node() {
        let mut doc = Document::parse(r#"{"old": 1}"#).unwrap();
        doc.root_mut().array_builder().unwrap().add_int(5).unwrap();
        assert_eq!(doc.dump(true), "[5]");
    }

    #[test]
    fn array_keys_must_be_sequential() {
        let mut doc = Document::array();
        let mut root = doc.root_mut();
        let mut arr = root.array_builder().unwrap();
        arr.add_scalar_at("0", "a").unwrap();
        assert_eq!(arr.add_scalar_at("5", "b").unwrap_err().kind, ErrorKind::Missing);
        arr.add_value_at("1", "c").unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(doc.dump(true), r#"["a","c"]"#);
    }

    #[test]
    fn schema_targets_reject_wrong_types() {
        let mut registry = SchemaRegistry::new();
        registry
            .load(
                "thrift",
                r#"{"structs": [{"name": "P", "fields": [
                    {"key": 1, "name": "n", "typeId": "i32", "required": "optional"},
                    {"key": 2, "name": "l", "typeId": "list", "type": {"typeId": "list", "elemTypeId": "double"}, "required": "optional"}]}]}"#,
            )
            .unwrap();
        let mut doc = Document::with_schema(&Arc::new(registry), "P").unwrap();
        let mut root = doc.root_mut();
        let mut obj = root.object_builder().unwrap();
        assert_eq!(obj.add_string("n", "x").unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(obj.add_object("l").unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(obj.add_int("zzz", 1).unwrap_err().kind, ErrorKind::Missing);
        obj.add_array("l").unwrap().add_int(1).unwrap().add_double(2.5).unwrap();
        let map: BTreeMap<String, i32> = BTreeMap::new();
        assert!(obj.add_map_key("n", &map).is_err());
        assert_eq!(doc.dump(true), r#"{"l":[1.0,2.5]}"#);
    }

    #[test]
    fn rejected_adds_leave_the_tree_unchanged() {
        let mut registry = SchemaRegistry::new();
        registry
            .load(
                "thrift",
                r#"{"structs": [{"name": "P", "fields": [
                    {"key": 1, "name": "l", "typeId": "list", "type": {"typeId": "list", "elemTypeId": "i32"}, "required": "optional"}]}]}"#,
            )
            .unwrap();
        let mut doc = Document::with_schema(&Arc::new(registry), "P").unwrap();
        let mut root = doc.root_mut();
        let mut obj = root.object_builder().unwrap();
        {
            let mut list = obj.add_array("l").unwrap();
            assert_eq!(list.add_object().unwrap_err().kind, ErrorKind::TypeMismatch);
            assert_eq!(list.add_array().unwrap_err().kind, ErrorKind::TypeMismatch);
            assert_eq!(list.len(), 0);
            list.add_int(4).unwrap();
            assert_eq!(list.len(), 1);
        }
        assert_eq!(obj.add_object("l").unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(doc.dump(true), r#"{"l":[4]}"#);
        assert_eq!(doc.len(), 3);
    }
}
