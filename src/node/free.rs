//! Free-form node behavior: any node may take any type, and containers are
//! created on demand.
use indextree::NodeId;

use crate::error::{Error, Result};
use crate::types::{JsonType, Scalar};

use super::{Binding, Content, Document};

const COMPONENT: &str = "free-node";

impl Document {
    pub(super) fn free_append(&mut self, parent: NodeId, key: &str) -> Result<NodeId> {
        match self.node(parent).json_type() {
            JsonType::Object => {}
            JsonType::Array => {
                let len = self.node(parent).len();
                if key != len.to_string() {
                    return Err(Error::missing(
                        COMPONENT,
                        format!("index {key} is past the end of the array (size {len})"),
                    ));
                }
            }
            other => {
                return Err(Error::type_mismatch(COMPONENT, format!("cannot add `{key}` to a {other} node")));
            }
        }
        let child = self.alloc(key.to_string(), Content::Scalar(Scalar::Null), Binding::Free);
        self.attach(parent, child, None)?;
        Ok(child)
    }

    /// Child lookup by key that turns a null node into an object first.
    pub(crate) fn vivify_key(&mut self, id: NodeId, key: &str) -> Result<NodeId> {
        if !self.is_schema(id) && self.node(id).json_type() == JsonType::Null {
            self.set_content(id, Content::empty(JsonType::Object));
        }
        self.append_node(id, key)
    }

    /// Child lookup by position. A null free node becomes an array and the slot
    /// one past the end is created; anything further out is missing.
    pub(crate) fn vivify_index(&mut self, id: NodeId, index: usize) -> Result<NodeId> {
        if !self.is_schema(id) && self.node(id).json_type() == JsonType::Null {
            self.set_content(id, Content::empty(JsonType::Array));
        }
        if let Content::Array(items) = &self.node(id).content {
            let len = items.len();
            if let Some(child) = items.get(index) {
                return Ok(*child);
            }
            if index == len {
                return self.append_node(id, &index.to_string());
            }
            return Err(Error::missing(
                self.component(id),
                format!("index {index} is past the end of the array (size {len})"),
            ));
        }
        match &self.node(id).content {
            Content::Object(map) => map.get_index(index).map(|(_, child)| *child).ok_or_else(|| {
                Error::missing(self.component(id), format!("object has no member at position {index}"))
            }),
            Content::Scalar(scalar) => Err(Error::type_mismatch(
                self.component(id),
                format!("a {} node has no element {index}", scalar.json_type()),
            )),
            Content::Array(_) => unreachable!(),
        }
    }
}
