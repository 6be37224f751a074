//! JSON text output.
//!
//! Dense output has no whitespace at all. Pretty output puts every member and
//! element on its own line, indented by [`DumpOptions::indent`] spaces per
//! level, with `": "` after keys and a trailing newline after a top-level
//! container. Empty containers print as `{}` and `[]` in both modes.
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::node::{Document, NodeRef};
use crate::scalar::NON_FINITE_LITERAL;
use crate::schema::FieldType;
use crate::types::{JsonType, Scalar, format_double, format_double_precision};

pub type SuppressFn = dyn Fn(NodeRef<'_>) -> bool + Send + Sync;

#[derive(Clone)]
pub struct DumpOptions {
    pub dense: bool,
    pub indent: usize,
    /// Significant digits for doubles; `None` prints the shortest form that
    /// reads back to the same value.
    pub double_precision: Option<usize>,
    /// Significant digits for schema fields declared `float`.
    pub float_precision: Option<usize>,
    /// Text written for NaN and infinities.
    pub non_finite: String,
    suppress: Option<Arc<SuppressFn>>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            dense: false,
            indent: 4,
            double_precision: None,
            float_precision: Some(7),
            non_finite: NON_FINITE_LITERAL.to_string(),
            suppress: None,
        }
    }
}

impl fmt::Debug for DumpOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpOptions")
            .field("dense", &self.dense)
            .field("indent", &self.indent)
            .field("double_precision", &self.double_precision)
            .field("float_precision", &self.float_precision)
            .field("non_finite", &self.non_finite)
            .field("suppress", &self.suppress.is_some())
            .finish()
    }
}

impl DumpOptions {
    pub fn dense() -> Self {
        DumpOptions { dense: true, ..Default::default() }
    }

    pub fn pretty() -> Self {
        DumpOptions::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_double_precision(mut self, precision: Option<usize>) -> Self {
        self.double_precision = precision;
        self
    }

    pub fn with_float_precision(mut self, precision: Option<usize>) -> Self {
        self.float_precision = precision;
        self
    }

    pub fn with_non_finite(mut self, text: impl Into<String>) -> Self {
        self.non_finite = text.into();
        self
    }

    /// Leaves out every member or element for which `predicate` holds,
    /// together with its subtree.
    pub fn suppress<F>(mut self, predicate: F) -> Self
    where
        F: Fn(NodeRef<'_>) -> bool + Send + Sync + 'static,
    {
        self.suppress = Some(Arc::new(predicate));
        self
    }

    /// Leaves out members named in `keys` whose value is null or an empty string.
    pub fn skip_empty_keys(self, keys: &[&str]) -> Self {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        self.suppress(move |node| {
            let empty = match node.scalar() {
                Some(Scalar::Null) => true,
                Some(Scalar::String(text)) => text.is_empty(),
                _ => false,
            };
            empty && keys.iter().any(|key| key == node.key())
        })
    }

    fn is_suppressed(&self, node: NodeRef<'_>) -> bool {
        self.suppress.as_ref().is_some_and(|predicate| predicate(node))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// WRITER
// ————————————————————————————————————————————————————————————————————————————

pub(crate) fn dump_node(node: NodeRef<'_>, options: &DumpOptions) -> String {
    let mut out = String::new();
    write_value(&mut out, node, options, 0);
    if !options.dense && node.is_structured() {
        out.push('\n');
    }
    out
}

fn write_value(out: &mut String, node: NodeRef<'_>, options: &DumpOptions, depth: usize) {
    match node.json_type() {
        JsonType::Object => write_container(out, node, options, depth, ('{', '}'), true),
        JsonType::Array => write_container(out, node, options, depth, ('[', ']'), false),
        _ => write_scalar(out, node, options),
    }
}

fn write_container(
    out: &mut String,
    node: NodeRef<'_>,
    options: &DumpOptions,
    depth: usize,
    (open, close): (char, char),
    keyed: bool,
) {
    let children: Vec<NodeRef<'_>> = node.children().filter(|child| !options.is_suppressed(*child)).collect();
    out.push(open);
    if children.is_empty() {
        out.push(close);
        return;
    }
    for (index, child) in children.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        if !options.dense {
            out.push('\n');
            push_indent(out, options.indent * (depth + 1));
        }
        if keyed {
            write_string(out, child.key());
            out.push(':');
            if !options.dense {
                out.push(' ');
            }
        }
        write_value(out, child, options, depth + 1);
    }
    if !options.dense {
        out.push('\n');
        push_indent(out, options.indent * depth);
    }
    out.push(close);
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat_n(' ', width));
}

fn write_scalar(out: &mut String, node: NodeRef<'_>, options: &DumpOptions) {
    match node.scalar() {
        None | Some(Scalar::Null) => out.push_str("null"),
        Some(Scalar::Bool(value)) => out.push_str(if *value { "true" } else { "false" }),
        Some(Scalar::Int(value)) => out.push_str(&value.to_string()),
        Some(Scalar::Double(value)) if !value.is_finite() => out.push_str(&options.non_finite),
        Some(Scalar::Double(value)) => {
            let precision = if node.field_type() == Some(FieldType::Float) {
                options.float_precision
            } else {
                options.double_precision
            };
            match precision {
                Some(precision) => out.push_str(&format_double_precision(*value, precision)),
                None => out.push_str(&format_double(*value)),
            }
        }
        Some(Scalar::String(text)) => write_string(out, text),
    }
}

/// Writes `text` as a quoted JSON string.
pub fn write_string(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            ch if (ch as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", ch as u32)),
            ch => out.push(ch),
        }
    }
    out.push('"');
}

// ————————————————————————————————————————————————————————————————————————————
// SERDE
// ————————————————————————————————————————————————————————————————————————————

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.json_type() {
            JsonType::Object => {
                let mut map = serializer.serialize_map(Some(self.len()))?;
                for child in self.children() {
                    map.serialize_entry(child.key(), &child)?;
                }
                map.end()
            }
            JsonType::Array => {
                let mut seq = serializer.serialize_seq(Some(self.len()))?;
                for child in self.children() {
                    seq.serialize_element(&child)?;
                }
                seq.end()
            }
            _ => match self.scalar() {
                None | Some(Scalar::Null) => serializer.serialize_unit(),
                Some(Scalar::Bool(value)) => serializer.serialize_bool(*value),
                Some(Scalar::Int(value)) => serializer.serialize_i64(*value),
                Some(Scalar::Double(value)) => serializer.serialize_f64(*value),
                Some(Scalar::String(text)) => serializer.serialize_str(text),
            },
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_layout() {
        let doc = Document::parse(r#"{"a": [1, {}], "b": {"c": "x"}, "e": []}"#).unwrap();
        let expected = "{\n    \"a\": [\n        1,\n        {}\n    ],\n    \"b\": {\n        \"c\": \"x\"\n    },\n    \"e\": []\n}\n";
        assert_eq!(doc.dump(false), expected);
        assert_eq!(doc.root().dump_with(&DumpOptions::pretty().with_indent(1)).lines().nth(1), Some(" \"a\": ["));
    }

    #[test]
    fn matches_serde_json_pretty_output() {
        let text = r#"{"k": [true, null, "s", {"n": -3}], "z": {}}"#;
        let doc = Document::parse(text).unwrap();
        let value: serde_json::Value = serde_json::from_str(text).unwrap();
        let ours = doc.root().dump_with(&DumpOptions::pretty().with_indent(2));
        assert_eq!(ours.trim_end(), serde_json::to_string_pretty(&value).unwrap());
        assert_eq!(doc.dump(true), serde_json::to_string(&value).unwrap());
    }

    #[test]
    fn escaping() {
        let mut out = String::new();
        write_string(&mut out, "q\"b\\n\n\u{1}\u{8}é");
        assert_eq!(out, r#""q\"b\\n\n\u0001\bé""#);
    }

    #[test]
    fn doubles_and_sentinels() {
        let doc = Document::parse("[5.2, 100.0, 0.1, nan, 3]").unwrap();
        assert_eq!(doc.dump(true), "[5.2,100.0,0.1,nan,3]");
        let rounded = DumpOptions::dense().with_double_precision(Some(3)).with_non_finite("null");
        assert_eq!(doc.root().dump_with(&rounded), "[5.2,100.0,0.1,null,3]");
        let reread = Document::parse(&doc.dump(true)).unwrap();
        assert_eq!(reread, doc);
    }

    #[test]
    fn suppressed_members_vanish() {
        let doc = Document::parse(r#"{"_key": "", "_id": null, "name": "", "list": [1, 2, 3]}"#).unwrap();
        let options = DumpOptions::dense().skip_empty_keys(&["_key", "_id"]);
        assert_eq!(doc.root().dump_with(&options), r#"{"name":"","list":[1,2,3]}"#);

        let odd = DumpOptions::dense().suppress(|node| node.value::<i64>().is_some_and(|v| v % 2 == 1));
        assert_eq!(doc.field("list").unwrap().dump_with(&odd), "[2]");
    }

    #[test]
    fn serializes_through_serde() {
        let doc = Document::parse(r#"{"a": [1, 2.5, "x"], "b": null}"#).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"a":[1,2.5,"x"],"b":null}"#);
    }
}
