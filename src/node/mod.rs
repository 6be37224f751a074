//! Document trees.
//!
//! A [`Document`] owns every node of one tree in an `indextree` arena, which
//! holds the parent links and child order. Containers also keep a key index
//! over their children for direct lookup. Each node is one of two kinds,
//! recorded in its [`Binding`]: free-form (any node may take any type) or
//! schema-bound (the type is fixed by a field descriptor and a level in its
//! type chain).
mod bound;
mod free;
mod view;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use tracing::*;

use crate::error::{Error, ErrorKind, Result};
use crate::schema::{FieldDef, FieldType, SchemaRegistry, StructDef};
use crate::types::{JsonType, Scalar};

pub use bound::test_assign;
pub use view::{NodeMut, NodeRef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub key: String,
    pub content: Content,
    pub binding: Binding,
}

/// Containers index their children by key or position, in the same order as
/// the node's children in the arena.
#[derive(Debug, Clone)]
pub(crate) enum Content {
    Scalar(Scalar),
    Object(IndexMap<String, NodeId>),
    Array(Vec<NodeId>),
}

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Free,
    Schema(SchemaSlot),
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaSlot {
    /// `None` only at the top of the tree.
    pub field: Option<Arc<FieldDef>>,
    pub level: usize,
    /// Descriptor of this node's children when the node itself is struct-typed.
    pub structure: Option<Arc<StructDef>>,
}

impl SchemaSlot {
    pub fn field_type(&self) -> FieldType {
        self.field
            .as_ref()
            .and_then(|field| field.type_at(self.level))
            .unwrap_or(FieldType::Struct)
    }

    pub fn field_name(&self) -> &str {
        self.field.as_ref().map_or("<top>", |field| field.name.as_str())
    }
}

impl Content {
    /// Zero value of a JSON type.
    pub fn empty(ty: JsonType) -> Content {
        match ty {
            JsonType::Null => Content::Scalar(Scalar::Null),
            JsonType::Bool => Content::Scalar(Scalar::Bool(false)),
            JsonType::Int => Content::Scalar(Scalar::Int(0)),
            JsonType::Double => Content::Scalar(Scalar::Double(0.0)),
            JsonType::String => Content::Scalar(Scalar::String(String::new())),
            JsonType::Object => Content::Object(IndexMap::new()),
            JsonType::Array => Content::Array(Vec::new()),
        }
    }
}

impl Node {
    pub fn json_type(&self) -> JsonType {
        match &self.content {
            Content::Scalar(scalar) => scalar.json_type(),
            Content::Object(_) => JsonType::Object,
            Content::Array(_) => JsonType::Array,
        }
    }

    pub fn len(&self) -> usize {
        match &self.content {
            Content::Scalar(_) => 0,
            Content::Object(map) => map.len(),
            Content::Array(items) => items.len(),
        }
    }

    pub fn schema(&self) -> Option<&SchemaSlot> {
        match &self.binding {
            Binding::Free => None,
            Binding::Schema(slot) => Some(slot),
        }
    }
}

/// A JSON tree, either free-form or bound to a struct of a [`SchemaRegistry`].
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) arena: Arena<Node>,
    pub(crate) root: NodeId,
    pub(crate) registry: Option<Arc<SchemaRegistry>>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION & PUBLIC SURFACE
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    fn free(ty: JsonType) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Node {
            key: String::new(),
            content: Content::empty(ty),
            binding: Binding::Free,
        });
        Document { arena, root, registry: None }
    }

    /// Empty free-form object.
    pub fn object() -> Self {
        Self::free(JsonType::Object)
    }

    /// Empty free-form array.
    pub fn array() -> Self {
        Self::free(JsonType::Array)
    }

    /// A schema-bound object of struct `name`, with required and defaulted
    /// fields already in place.
    pub fn with_schema(registry: &Arc<SchemaRegistry>, name: &str) -> Result<Self> {
        let structure = registry.require_struct(name)?;
        let mut arena = Arena::new();
        let root = arena.new_node(Node {
            key: String::new(),
            content: Content::empty(JsonType::Object),
            binding: Binding::Schema(SchemaSlot { field: None, level: 0, structure: Some(structure) }),
        });
        let mut doc = Document { arena, root, registry: Some(Arc::clone(registry)) };
        doc.schema_reset(root)?;
        debug!(schema = name, nodes = doc.len(), "created schema-bound document");
        Ok(doc)
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.root)
    }

    pub fn root_mut(&mut self) -> NodeMut<'_> {
        let root = self.root;
        NodeMut::new(self, root)
    }

    /// Resolves an id, if its node is still part of this document.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.contains(id).then(|| NodeRef::new(self, id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<NodeMut<'_>> {
        if self.contains(id) { Some(NodeMut::new(self, id)) } else { None }
    }

    pub fn field(&self, path: &str) -> Option<NodeRef<'_>> {
        self.root().field(path)
    }

    pub fn field_mut(&mut self, path: &str) -> Option<NodeMut<'_>> {
        let id = crate::path::resolve(self, self.root, path)?;
        Some(NodeMut::new(self, id))
    }

    pub fn field_add(&mut self, path: &str) -> Result<NodeMut<'_>> {
        let id = crate::path::resolve_add(self, self.root, path)?;
        Ok(NodeMut::new(self, id))
    }

    pub fn dump(&self, dense: bool) -> String {
        self.root().dump(dense)
    }

    pub fn loads(&mut self, text: &str) -> Result<()> {
        self.root_mut().loads(text)
    }

    pub fn is_schema_bound(&self) -> bool {
        self.registry.is_some()
    }

    pub fn registry(&self) -> Option<&Arc<SchemaRegistry>> {
        self.registry.as_ref()
    }

    /// Number of live nodes, the top included.
    pub fn len(&self) -> usize {
        self.root.descendants(&self.arena).count()
    }

    pub fn is_empty(&self) -> bool {
        self.node(self.root).len() == 0
    }

    /// Moves the content of `from` onto `to` and removes `from`. Children are
    /// re-parented, not copied.
    pub fn move_node(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        if !self.contains(from) || !self.contains(to) {
            return Err(Error::missing("document", "move between nodes that are not part of this document"));
        }
        if from == to {
            return Ok(());
        }
        if self.is_ancestor(from, to) {
            return Err(Error::new(
                ErrorKind::Assignment,
                self.component(to),
                "cannot move a node into its own subtree",
            ));
        }

        match (self.is_schema(to), self.is_schema(from)) {
            (true, true) => self.check_compatible(to, self, from)?,
            (true, false) => {
                // Re-validate every value against the target's schema.
                let snapshot = self.extract(from);
                self.assign_checked(to, &snapshot, snapshot.root)?;
                return self.remove(from);
            }
            (false, _) => {}
        }

        let children = self.child_ids(from);
        let content = std::mem::replace(&mut self.node_mut(from).content, Content::Scalar(Scalar::Null));
        for child in &children {
            child.detach(&mut self.arena);
        }
        self.remove(from)?;
        self.set_content(to, content);
        let make_free = !self.is_schema(to);
        for child in children {
            to.append(child, &mut self.arena);
            if make_free {
                self.unbind_subtree(child);
            }
        }
        Ok(())
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root().same_as(other.root())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump(true))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL TREE OPERATIONS
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    /// False for removed ids, including ids whose slot was since reused, and
    /// for ids minted by a larger document.
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some() && !id.is_removed(&self.arena)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.arena[id].get()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena[id].get_mut()
    }

    pub(crate) fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub(crate) fn is_schema(&self, id: NodeId) -> bool {
        matches!(self.node(id).binding, Binding::Schema(_))
    }

    pub(crate) fn component(&self, id: NodeId) -> &'static str {
        if self.is_schema(id) { "schema-node" } else { "free-node" }
    }

    /// A new node outside the tree, until [`Document::attach`] links it.
    pub(crate) fn alloc(&mut self, key: String, content: Content, binding: Binding) -> NodeId {
        self.arena.new_node(Node { key, content, binding })
    }

    pub(crate) fn find_child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match &self.node(id).content {
            Content::Object(map) => map.get(key).copied(),
            Content::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index).copied()),
            Content::Scalar(_) => None,
        }
    }

    pub(crate) fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    /// Replaces a node's content, destroying the subtrees it owned.
    pub(crate) fn set_content(&mut self, id: NodeId, content: Content) {
        for child in self.child_ids(id) {
            child.remove_subtree(&mut self.arena);
        }
        self.node_mut(id).content = content;
    }

    /// Links `child` under `parent`. `position` places object members; array
    /// elements are always appended.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) -> Result<()> {
        let key = self.node(child).key.clone();
        let component = self.component(parent);
        let anchor = match &mut self.node_mut(parent).content {
            Content::Object(map) => match position {
                Some(position) if position < map.len() => {
                    let anchor = map.get_index(position).map(|(_, sibling)| *sibling);
                    map.shift_insert(position, key, child);
                    anchor
                }
                _ => {
                    map.insert(key, child);
                    None
                }
            },
            Content::Array(items) => {
                items.push(child);
                None
            }
            Content::Scalar(scalar) => {
                return Err(Error::type_mismatch(
                    component,
                    format!("cannot add `{key}` to a {} node", scalar.json_type()),
                ));
            }
        };
        match anchor {
            Some(sibling) => sibling.insert_before(child, &mut self.arena),
            None => parent.append(child, &mut self.arena),
        }
        Ok(())
    }

    /// Unlinks a node from its parent without destroying it.
    pub(crate) fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.parent_of(id).ok_or_else(|| {
            Error::missing(self.component(id), "the top node has no parent to detach from")
        })?;
        let key = self.node(id).key.clone();
        let mut rekey = Vec::new();
        match &mut self.node_mut(parent).content {
            Content::Object(map) => {
                map.shift_remove(&key);
            }
            Content::Array(items) => {
                if let Some(position) = items.iter().position(|child| *child == id) {
                    items.remove(position);
                    rekey.extend(items[position..].iter().enumerate().map(|(i, child)| (*child, position + i)));
                }
            }
            Content::Scalar(_) => {}
        }
        for (child, index) in rekey {
            self.node_mut(child).key = index.to_string();
        }
        id.detach(&mut self.arena);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        id.remove_subtree(&mut self.arena);
        Ok(())
    }

    pub(crate) fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id);
        match &self.node(self.parent_of(id)?).content {
            Content::Object(map) => map.get_index_of(&node.key),
            Content::Array(items) => items.iter().position(|child| *child == id),
            Content::Scalar(_) => None,
        }
    }

    /// Dotted path from the top (excluded) down to `id`.
    pub(crate) fn get_path(&self, id: NodeId) -> String {
        let mut keys: Vec<&str> = id
            .ancestors(&self.arena)
            .filter(|node| self.parent_of(*node).is_some())
            .map(|node| self.node(node).key.as_str())
            .collect();
        keys.reverse();
        keys.join(".")
    }

    pub(crate) fn depth(&self, id: NodeId) -> usize {
        id.ancestors(&self.arena).count() - 1
    }

    /// True when `ancestor` is `id` or lies on its parent chain.
    pub(crate) fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|node| node == ancestor)
    }

    /// Sizes along the first-element chain of nested arrays.
    pub(crate) fn array_sizes(&self, id: NodeId) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut current = id;
        while self.node(current).json_type() == JsonType::Array {
            sizes.push(current.children(&self.arena).count());
            match self.arena[current].first_child() {
                Some(first) => current = first,
                None => break,
            }
        }
        sizes
    }
}

// ————————————————————————————————————————————————————————————————————————————
// KIND DISPATCH
// ————————————————————————————————————————————————————————————————————————————

impl Document {

    /// Returns the child under `key`, creating it when missing.
    pub(crate) fn append_node(&mut self, parent: NodeId, key: &str) -> Result<NodeId> {
        if let Some(existing) = self.find_child(parent, key) {
            return Ok(existing);
        }
        if self.is_schema(parent) {
            self.schema_append(parent, key)
        } else {
            self.free_append(parent, key)
        }
    }

    pub(crate) fn assign_scalar(&mut self, id: NodeId, scalar: Scalar) -> Result<()> {
        if self.is_schema(id) {
            self.schema_assign(id, scalar)
        } else {
            self.set_content(id, Content::Scalar(scalar));
            Ok(())
        }
    }

    /// Turns a node into an empty object or array (schema structs come back
    /// with their prepopulated fields).
    pub(crate) fn make_container(&mut self, id: NodeId, ty: JsonType) -> Result<()> {
        if self.is_schema(id) {
            self.schema_make_container(id, ty)
        } else {
            self.set_content(id, Content::empty(ty));
            Ok(())
        }
    }

    /// Resets to the zero value of the node's type, then applies any schema default.
    pub(crate) fn clear(&mut self, id: NodeId) -> Result<()> {
        if self.is_schema(id) {
            self.schema_reset(id)?;
            self.apply_default(id)
        } else {
            let ty = self.node(id).json_type();
            self.set_content(id, Content::empty(ty));
            Ok(())
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COPY
// ————————————————————————————————————————————————————————————————————————————

impl Document {

    /// Deep-copies `src` (from any document) onto `dst`. The target keeps its
    /// own key, parent and binding.
    pub(crate) fn copy_into(&mut self, dst: NodeId, src_doc: &Document, src: NodeId) -> Result<()> {
        match (self.is_schema(dst), src_doc.is_schema(src)) {
            (true, true) => {
                self.check_compatible(dst, src_doc, src)?;
                self.copy_subtree(dst, src_doc, src, true);
                Ok(())
            }
            (true, false) => self.assign_checked(dst, src_doc, src),
            (false, _) => {
                self.copy_subtree(dst, src_doc, src, false);
                Ok(())
            }
        }
    }

    fn copy_subtree(&mut self, dst: NodeId, src_doc: &Document, src: NodeId, keep_binding: bool) {
        let source = src_doc.node(src);
        match &source.content {
            Content::Scalar(scalar) => self.set_content(dst, Content::Scalar(scalar.clone())),
            Content::Object(_) | Content::Array(_) => {
                self.set_content(dst, Content::empty(source.json_type()));
                for child in src.children(&src_doc.arena) {
                    let original = src_doc.node(child);
                    let binding = if keep_binding { original.binding.clone() } else { Binding::Free };
                    let copy = self.alloc(original.key.clone(), Content::Scalar(Scalar::Null), binding);
                    // Containers were just emptied, so attaching cannot fail.
                    let _ = self.attach(dst, copy, None);
                    self.copy_subtree(copy, src_doc, child, keep_binding);
                }
            }
        }
    }

    /// Copies a free-form subtree onto a schema-bound node value by value,
    /// checking each against the schema.
    fn assign_checked(&mut self, dst: NodeId, src_doc: &Document, src: NodeId) -> Result<()> {
        match &src_doc.node(src).content {
            Content::Scalar(scalar) => self.assign_scalar(dst, scalar.clone()),
            Content::Object(map) => {
                self.make_container(dst, JsonType::Object)?;
                for (key, child) in map {
                    let target = self.append_node(dst, key)?;
                    self.assign_checked(target, src_doc, *child)?;
                }
                Ok(())
            }
            Content::Array(items) => {
                self.make_container(dst, JsonType::Array)?;
                for (index, child) in items.iter().enumerate() {
                    let target = self.append_node(dst, &index.to_string())?;
                    self.assign_checked(target, src_doc, *child)?;
                }
                Ok(())
            }
        }
    }

    fn check_compatible(&self, dst: NodeId, src_doc: &Document, src: NodeId) -> Result<()> {
        let same_registry = match (&self.registry, &src_doc.registry) {
            (Some(a), Some(b)) => a.id() == b.id(),
            _ => false,
        };
        if !same_registry {
            return Err(Error::new(
                ErrorKind::Assignment,
                "schema-node",
                "source and target were built from different schema registries",
            ));
        }
        let (Some(a), Some(b)) = (self.node(dst).schema(), src_doc.node(src).schema()) else {
            return Err(Error::new(ErrorKind::Assignment, "schema-node", "both nodes must be schema-bound"));
        };
        let same_field = match (&a.field, &b.field) {
            (None, None) => true,
            (Some(x), Some(y)) => Arc::ptr_eq(x, y) || **x == **y,
            _ => false,
        };
        let same_struct = a.structure.as_ref().map(|s| s.name.as_str()) == b.structure.as_ref().map(|s| s.name.as_str());
        if same_field && same_struct && a.level == b.level {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::Assignment,
                "schema-node",
                format!(
                    "cannot assign field `{}` (level {}) to field `{}` (level {})",
                    b.field_name(),
                    b.level,
                    a.field_name(),
                    a.level
                ),
            ))
        }
    }

    /// Free-form copy of a subtree, as a document of its own.
    pub(crate) fn extract(&self, id: NodeId) -> Document {
        let mut out = Document::object();
        let root = out.root;
        out.copy_subtree(root, self, id, false);
        out
    }

    fn unbind_subtree(&mut self, id: NodeId) {
        let subtree: Vec<NodeId> = id.descendants(&self.arena).collect();
        for id in subtree {
            self.node_mut(id).binding = Binding::Free;
        }
    }
}
