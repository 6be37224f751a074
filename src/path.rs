//! Field paths.
//!
//! `a.b.0`, `a/b/0`, `a[b][0]`, `a["b"][0]` and `/a/b/0` all name the same
//! node: a path is split on `.`, `/`, `[`, `]` and `"`, and empty segments
//! are dropped. Keys containing any of those characters cannot be addressed.
use std::collections::VecDeque;

use indextree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::*;

use crate::error::{Error, Result};
use crate::node::Document;
use crate::types::JsonType;

static DELIMITERS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[./\[\]"]"#).expect("valid path delimiter pattern"));

const COMPONENT: &str = "field-path";

pub fn tokenize(path: &str) -> VecDeque<String> {
    DELIMITERS
        .split(path)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Walks `path` down from `start` without creating anything.
pub(crate) fn resolve(doc: &Document, start: NodeId, path: &str) -> Option<NodeId> {
    tokenize(path)
        .iter()
        .try_fold(start, |current, segment| doc.find_child(current, segment))
}

/// Walks `path` down from `start`, creating missing object members.
pub(crate) fn resolve_add(doc: &mut Document, start: NodeId, path: &str) -> Result<NodeId> {
    let mut segments = tokenize(path);
    let mut current = start;
    while let Some(segment) = segments.pop_front() {
        if let Some(child) = doc.find_child(current, &segment) {
            current = child;
            continue;
        }

        let node = doc.node(current);
        match node.json_type() {
            JsonType::Object => {}
            JsonType::Array => {
                return Err(Error::missing(
                    COMPONENT,
                    format!("`{path}`: array element `{segment}` does not exist"),
                ));
            }
            _ if doc.parent_of(current).is_none() => doc.make_container(current, JsonType::Object)?,
            other => {
                return Err(Error::type_mismatch(
                    COMPONENT,
                    format!("`{path}`: cannot add `{segment}` below a {other} node"),
                ));
            }
        }

        trace!(path, segment = %segment, "creating path segment");
        let child = doc.append_node(current, &segment)?;
        if !segments.is_empty() && !doc.is_schema(child) {
            doc.make_container(child, JsonType::Object)?;
        }
        current = child;
    }
    Ok(current)
}
