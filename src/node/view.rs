//! Borrowed handles onto one node of a [`Document`].
//!
//! [`NodeRef`] is a shared, `Copy` view for reading; [`NodeMut`] holds the
//! document mutably and carries every operation that changes the tree.
//! Reading through a [`NodeRef`] never creates nodes; key and index access
//! through a free-form [`NodeMut`] does.
use std::fmt;

use indextree::NodeId;

use crate::builder::{ArrayBuilder, ObjectBuilder};
use crate::convert::{FromNode, IntoNode};
use crate::dump::{self, DumpOptions};
use crate::error::{Error, Result};
use crate::parser::{self, ParseOptions};
use crate::path;
use crate::scalar;
use crate::schema::{FieldDef, FieldType, StructDef};
use crate::types::{JsonType, Scalar};

use super::{Content, Document, Node};

// ————————————————————————————————————————————————————————————————————————————
// READ-ONLY VIEW
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        NodeRef { doc, id }
    }

    fn node(self) -> &'a Node {
        self.doc.node(self.id)
    }

    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn document(self) -> &'a Document {
        self.doc
    }

    pub fn json_type(self) -> JsonType {
        self.node().json_type()
    }

    /// Member name, or the decimal index for array elements. Empty at the top.
    pub fn key(self) -> &'a str {
        &self.node().key
    }

    pub fn scalar(self) -> Option<&'a Scalar> {
        match &self.node().content {
            Content::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Canonical text of a scalar; empty for objects and arrays.
    pub fn scalar_value(self) -> String {
        self.scalar().map(Scalar::canonical).unwrap_or_default()
    }

    pub fn is_object(self) -> bool {
        self.json_type() == JsonType::Object
    }

    pub fn is_array(self) -> bool {
        self.json_type() == JsonType::Array
    }

    pub fn is_number(self) -> bool {
        self.json_type().is_number()
    }

    pub fn is_bool(self) -> bool {
        self.json_type() == JsonType::Bool
    }

    pub fn is_null(self) -> bool {
        self.json_type() == JsonType::Null
    }

    pub fn is_string(self) -> bool {
        self.json_type() == JsonType::String
    }

    pub fn is_primitive(self) -> bool {
        self.json_type().is_primitive()
    }

    pub fn is_structured(self) -> bool {
        self.json_type().is_structured()
    }

    pub fn is_top(self) -> bool {
        self.doc.parent_of(self.id).is_none()
    }

    /// Number of children.
    pub fn len(self) -> usize {
        self.node().len()
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn parent(self) -> Option<NodeRef<'a>> {
        self.doc.parent_of(self.id).map(|id| NodeRef::new(self.doc, id))
    }

    pub fn index_in_parent(self) -> Option<usize> {
        self.doc.index_in_parent(self.id)
    }

    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> {
        let doc = self.doc;
        self.doc.child_ids(self.id).into_iter().map(move |id| NodeRef::new(doc, id))
    }

    /// Member `key` of an object, or element `key` of an array.
    pub fn get(self, key: &str) -> Result<NodeRef<'a>> {
        if self.is_primitive() {
            return Err(Error::type_mismatch(
                self.doc.component(self.id),
                format!("a {} node has no member `{key}`", self.json_type()),
            ));
        }
        self.doc
            .find_child(self.id, key)
            .map(|id| NodeRef::new(self.doc, id))
            .ok_or_else(|| Error::missing(self.doc.component(self.id), format!("key `{key}` not found")))
    }

    /// Element `index` of an array, or the `index`-th member of an object.
    pub fn at(self, index: usize) -> Result<NodeRef<'a>> {
        let component = self.doc.component(self.id);
        let child = match &self.node().content {
            Content::Array(items) => items.get(index).copied(),
            Content::Object(map) => map.get_index(index).map(|(_, id)| *id),
            Content::Scalar(scalar) => {
                return Err(Error::type_mismatch(
                    component,
                    format!("a {} node has no element {index}", scalar.json_type()),
                ));
            }
        };
        child
            .map(|id| NodeRef::new(self.doc, id))
            .ok_or_else(|| Error::missing(component, format!("index {index} is out of range (size {})", self.len())))
    }

    /// Resolves a field path (`a.b.0`, `a/b/0`, `a[b][0]`, `a["b"][0]`, ...).
    pub fn field(self, path: &str) -> Option<NodeRef<'a>> {
        path::resolve(self.doc, self.id, path).map(|id| NodeRef::new(self.doc, id))
    }

    /// Dotted path from the top.
    pub fn get_path(self) -> String {
        self.doc.get_path(self.id)
    }

    /// Array lengths down the first-element chain: `[[1,2],[3,4],[5,6]]` is `[3, 2]`.
    pub fn array_sizes(self) -> Vec<usize> {
        self.doc.array_sizes(self.id)
    }

    pub fn dump(self, dense: bool) -> String {
        let options = if dense { DumpOptions::dense() } else { DumpOptions::pretty() };
        dump::dump_node(self, &options)
    }

    pub fn dump_with(self, options: &DumpOptions) -> String {
        dump::dump_node(self, options)
    }

    /// Converts into `out`, leaving it untouched when the conversion fails.
    pub fn get_to<T: FromNode>(self, out: &mut T) -> bool {
        match T::from_node(self) {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    pub fn value<T: FromNode>(self) -> Option<T> {
        T::from_node(self)
    }

    /// Reads the field at `path` into `out`. On a missing field or failed
    /// conversion `out` receives `default` and the result is `false`.
    pub fn get_value_via_path<T: FromNode>(self, path: &str, out: &mut T, default: T) -> bool {
        match self.field(path).and_then(T::from_node) {
            Some(value) => {
                *out = value;
                true
            }
            None => {
                *out = default;
                false
            }
        }
    }

    pub fn value_via_path<T: FromNode>(self, path: &str) -> Option<T> {
        self.field(path).and_then(T::from_node)
    }

    /// Structural equality: types, keys in order, and scalar values.
    pub fn same_as(self, other: NodeRef<'_>) -> bool {
        match (&self.node().content, &other.node().content) {
            (Content::Scalar(a), Content::Scalar(b)) => a == b,
            (Content::Object(a), Content::Object(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, ia), (kb, ib))| {
                        ka == kb && NodeRef::new(self.doc, *ia).same_as(NodeRef::new(other.doc, *ib))
                    })
            }
            (Content::Array(a), Content::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(ia, ib)| NodeRef::new(self.doc, *ia).same_as(NodeRef::new(other.doc, *ib)))
            }
            _ => false,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA INTROSPECTION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> NodeRef<'a> {

    pub fn is_schema_bound(self) -> bool {
        self.doc.is_schema(self.id)
    }

    /// Descriptor of the field this node belongs to. `None` at the top and for
    /// free-form nodes.
    pub fn field_def(self) -> Option<&'a FieldDef> {
        self.node().schema()?.field.as_deref()
    }

    /// Position in the field's type chain.
    pub fn type_level(self) -> usize {
        self.node().schema().map_or(0, |slot| slot.level)
    }

    pub fn field_type(self) -> Option<FieldType> {
        self.node().schema().map(|slot| slot.field_type())
    }

    /// Descriptor of a struct-typed node's members.
    pub fn struct_def(self) -> Option<&'a StructDef> {
        self.node().schema()?.structure.as_deref()
    }

    /// Whether this node is a member of a union struct.
    pub fn is_union(self) -> bool {
        self.parent().and_then(|parent| parent.struct_def()).is_some_and(|def| def.is_union)
    }

    /// Declared members currently present, in order.
    pub fn fields_used(self) -> Vec<String> {
        self.doc.fields_used(self.id)
    }

    /// Declared members not present.
    pub fn fields_not_used(self) -> Vec<String> {
        self.doc.fields_not_used(self.id)
    }

    /// Member name of an enum-typed node's current value.
    pub fn enum_name(self) -> Option<&'a str> {
        let field = self.field_def()?;
        if self.field_type()? != FieldType::Enum {
            return None;
        }
        let Some(Scalar::Int(value)) = self.scalar() else {
            return None;
        };
        self.doc.registry.as_ref()?.get_enum(&field.class_name)?.name_of(*value)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("path", &self.get_path())
            .field("type", &self.json_type())
            .finish()
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump(true))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MUTABLE VIEW
// ————————————————————————————————————————————————————————————————————————————

pub struct NodeMut<'a> {
    doc: &'a mut Document,
    id: NodeId,
}

impl<'a> NodeMut<'a> {
    pub(crate) fn new(doc: &'a mut Document, id: NodeId) -> Self {
        NodeMut { doc, id }
    }

    pub(crate) fn parts(&mut self) -> (&mut Document, NodeId) {
        (&mut *self.doc, self.id)
    }

    pub(crate) fn into_document(self) -> &'a mut Document {
        self.doc
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn as_ref(&self) -> NodeRef<'_> {
        NodeRef::new(self.doc, self.id)
    }

    pub fn into_ref(self) -> NodeRef<'a> {
        NodeRef::new(self.doc, self.id)
    }

    pub fn reborrow(&mut self) -> NodeMut<'_> {
        NodeMut::new(self.doc, self.id)
    }

    pub fn json_type(&self) -> JsonType {
        self.as_ref().json_type()
    }

    pub fn key(&self) -> &str {
        &self.doc.node(self.id).key
    }

    pub fn get_path(&self) -> String {
        self.doc.get_path(self.id)
    }

    pub fn dump(&self, dense: bool) -> String {
        self.as_ref().dump(dense)
    }

    /// Member `key`, created as null when missing. A free-form null node turns
    /// into an object first; schema nodes only accept declared fields and map keys.
    pub fn at_key(&mut self, key: &str) -> Result<NodeMut<'_>> {
        let child = self.doc.vivify_key(self.id, key)?;
        Ok(NodeMut::new(self.doc, child))
    }

    /// Element `index`, created when it is one past the end.
    pub fn at_index(&mut self, index: usize) -> Result<NodeMut<'_>> {
        let child = self.doc.vivify_index(self.id, index)?;
        Ok(NodeMut::new(self.doc, child))
    }

    pub fn into_key(self, key: &str) -> Result<NodeMut<'a>> {
        let child = self.doc.vivify_key(self.id, key)?;
        Ok(NodeMut::new(self.doc, child))
    }

    pub fn into_index(self, index: usize) -> Result<NodeMut<'a>> {
        let child = self.doc.vivify_index(self.id, index)?;
        Ok(NodeMut::new(self.doc, child))
    }

    pub fn field_mut(&mut self, path: &str) -> Option<NodeMut<'_>> {
        let id = path::resolve(self.doc, self.id, path)?;
        Some(NodeMut::new(self.doc, id))
    }

    /// Resolves `path`, creating missing objects along the way. Array slots are
    /// never created by a path.
    pub fn field_add(&mut self, path: &str) -> Result<NodeMut<'_>> {
        let id = path::resolve_add(self.doc, self.id, path)?;
        Ok(NodeMut::new(self.doc, id))
    }

    pub fn set_from<T: IntoNode>(&mut self, value: T) -> Result<()> {
        value.write_to(self)
    }

    pub fn set_scalar(&mut self, scalar: Scalar) -> Result<()> {
        self.doc.assign_scalar(self.id, scalar)
    }

    pub fn set_null(&mut self) -> Result<()> {
        self.set_scalar(Scalar::Null)
    }

    /// Assigns a literal, inferring its type (`~`, `true`, `12`, `1.5`, ...);
    /// anything else is stored as a string.
    pub fn set_literal(&mut self, literal: &str) -> Result<()> {
        let scalar = scalar::infer(literal, true)?;
        self.set_scalar(scalar)
    }

    pub fn set_value_via_path<T: IntoNode>(&mut self, path: &str, value: T) -> Result<()> {
        self.field_add(path)?.set_from(value)
    }

    /// Resets to the type's zero value, then applies any schema default.
    pub fn clear(&mut self) -> Result<()> {
        self.doc.clear(self.id)
    }

    /// Detaches and destroys this node and its subtree.
    pub fn remove(self) -> Result<()> {
        self.doc.remove(self.id)
    }

    /// Grows or shrinks an array. New elements are parsed from `literal`, or
    /// copied from the first element when `literal` is empty.
    pub fn array_resize(&mut self, size: usize, literal: &str) -> Result<()> {
        if self.doc.node(self.id).json_type() == JsonType::Null {
            self.doc.make_container(self.id, JsonType::Array)?;
        }
        let items = match &self.doc.node(self.id).content {
            Content::Array(items) => items.clone(),
            _ => {
                return Err(Error::type_mismatch(
                    self.doc.component(self.id),
                    format!("cannot resize a {} node", self.json_type()),
                ));
            }
        };
        if size <= items.len() {
            for id in items[size..].iter().rev() {
                self.doc.remove(*id)?;
            }
            return Ok(());
        }

        let first = items.first().copied();
        let template = match (literal.is_empty(), first) {
            (true, Some(first)) => Some(self.doc.extract(first)),
            _ => None,
        };
        for index in items.len()..size {
            let child = self.doc.append_node(self.id, &index.to_string())?;
            if let Some(template) = &template {
                self.doc.copy_into(child, template, template.root)?;
            } else if !literal.is_empty() {
                let scalar = scalar::infer(literal, true)?;
                self.doc.assign_scalar(child, scalar)?;
            }
        }
        Ok(())
    }

    /// Replaces the content with `text`, parsed as JSON.
    pub fn loads(&mut self, text: &str) -> Result<()> {
        parser::load_into(self.doc, self.id, text, &ParseOptions::default())
    }

    pub fn loads_with(&mut self, text: &str, options: &ParseOptions) -> Result<()> {
        parser::load_into(self.doc, self.id, text, options)
    }

    /// Clears the node into an empty object and returns a builder over it.
    pub fn object_builder(&mut self) -> Result<ObjectBuilder<'_>> {
        ObjectBuilder::over(self.doc, self.id)
    }

    /// Clears the node into an empty array and returns a builder over it.
    pub fn array_builder(&mut self) -> Result<ArrayBuilder<'_>> {
        ArrayBuilder::over(self.doc, self.id)
    }

    /// Deep-copies `src` onto this node. Schema-bound targets only accept
    /// nodes of the same field from the same registry, or free-form content
    /// that passes their type checks.
    pub fn copy_from(&mut self, src: NodeRef<'_>) -> Result<()> {
        self.doc.copy_into(self.id, src.doc, src.id)
    }

    /// Takes over the content of another document's top node.
    pub fn move_from(&mut self, src: Document) -> Result<()> {
        self.doc.copy_into(self.id, &src, src.root)
    }

    pub fn is_schema_bound(&self) -> bool {
        self.doc.is_schema(self.id)
    }
}

impl fmt::Debug for NodeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_ref(), f)
    }
}

impl<'a> From<NodeMut<'a>> for NodeRef<'a> {
    fn from(node: NodeMut<'a>) -> Self {
        node.into_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn reads_never_create_nodes() {
        let doc = Document::parse(r#"{"a": [1]}"#).unwrap();
        let root = doc.root();
        assert_eq!(root.get("b").unwrap_err().kind, ErrorKind::Missing);
        assert_eq!(root.get("a").unwrap().at(3).unwrap_err().kind, ErrorKind::Missing);
        assert_eq!(root.get("a").unwrap().at(0).unwrap().get("x").unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn chained_writes_vivify() {
        let mut doc = Document::object();
        doc.root_mut().into_key("a").unwrap().into_key("b").unwrap().set_from(1).unwrap();
        doc.root_mut().at_key("list").unwrap().at_index(0).unwrap().set_from("x").unwrap();
        assert_eq!(doc.dump(true), r#"{"a":{"b":1},"list":["x"]}"#);
    }

    #[test]
    fn predicates_and_positions() {
        let doc = Document::parse(r#"{"n": null, "b": false, "s": "x", "d": 1.5, "l": [], "o": {}}"#).unwrap();
        let root = doc.root();
        assert!(root.is_top() && root.is_object() && root.is_structured());
        assert!(root.get("n").unwrap().is_null());
        assert!(root.get("b").unwrap().is_bool());
        assert!(root.get("s").unwrap().is_string());
        assert!(root.get("d").unwrap().is_number());
        assert!(root.get("l").unwrap().is_array());
        assert_eq!(root.get("o").unwrap().index_in_parent(), Some(5));
        assert_eq!(root.get("d").unwrap().scalar_value(), "1.5");
        assert_eq!(root.get("o").unwrap().scalar_value(), "");
        assert_eq!(root.at(2).unwrap().key(), "s");
    }

    #[test]
    fn resize_shrinks_and_grows() {
        let mut doc = Document::parse("[1, 2, 3, 4]").unwrap();
        doc.root_mut().array_resize(2, "").unwrap();
        assert_eq!(doc.dump(true), "[1,2]");
        doc.root_mut().array_resize(4, "7").unwrap();
        assert_eq!(doc.dump(true), "[1,2,7,7]");
    }

    #[test]
    fn resize_replicates_the_first_element() {
        let mut doc = Document::parse(r#"[{"a": [1, 2]}]"#).unwrap();
        doc.root_mut().array_resize(3, "").unwrap();
        assert_eq!(doc.dump(true), r#"[{"a":[1,2]},{"a":[1,2]},{"a":[1,2]}]"#);
        assert_eq!(doc.field("2.a.1").unwrap().get_path(), "2.a.1");
    }

    #[test]
    fn resize_of_an_empty_array_without_literal_adds_nulls() {
        let mut doc = Document::array();
        doc.root_mut().array_resize(2, "").unwrap();
        assert_eq!(doc.dump(true), "[null,null]");
    }

    #[test]
    fn clear_keeps_the_type() {
        let mut doc = Document::parse(r#"{"s": "x", "d": 2.5, "l": [1], "o": {"k": 1}}"#).unwrap();
        for key in ["s", "d", "l", "o"] {
            doc.root_mut().at_key(key).unwrap().clear().unwrap();
        }
        assert_eq!(doc.dump(true), r#"{"s":"","d":0.0,"l":[],"o":{}}"#);
        let once = doc.dump(true);
        doc.root_mut().clear().unwrap();
        doc.root_mut().clear().unwrap();
        assert_eq!(doc.dump(true), "{}");
        assert_ne!(once, doc.dump(true));
    }

    #[test]
    fn copy_from_another_document() {
        let src = Document::parse(r#"{"x": [1, {"y": true}]}"#).unwrap();
        let mut dst = Document::parse(r#"{"slot": 0}"#).unwrap();
        dst.root_mut().at_key("slot").unwrap().copy_from(src.root()).unwrap();
        assert_eq!(dst.dump(true), r#"{"slot":{"x":[1,{"y":true}]}}"#);
        assert_eq!(dst.field("slot.x.1.y").unwrap().get_path(), "slot.x.1.y");
    }

    #[test]
    fn move_from_takes_the_content() {
        let src = Document::parse("[1, 2]").unwrap();
        let mut dst = Document::object();
        dst.root_mut().at_key("moved").unwrap().move_from(src).unwrap();
        assert_eq!(dst.dump(true), r#"{"moved":[1,2]}"#);
    }
}
