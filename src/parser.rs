//! Recursive-descent JSON reader that builds straight into a node.
//!
//! Besides strict JSON it accepts `#` line comments, `~` for null and `nan`
//! for a non-finite double. Scalars outside quotes are typed by
//! [`scalar::infer`]. Errors carry the byte offset where reading stopped.
//! Values are written through the builders, so a schema-bound target rejects
//! mismatched input while it is being read.
use indextree::NodeId;
use tracing::*;

use crate::builder::{ArrayBuilder, ObjectBuilder};
use crate::error::{Error, Result};
use crate::node::Document;
use crate::scalar;
use crate::schema::SchemaRegistry;
use crate::types::Scalar;

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of objects and arrays.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { max_depth: 256 }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    /// Reads a free-form document.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &ParseOptions::default())
    }

    pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Self> {
        let mut doc = Document::object();
        let root = doc.root;
        load_into(&mut doc, root, text, options)?;
        debug!(bytes = text.len(), nodes = doc.len(), "parsed document");
        Ok(doc)
    }

    /// Reads a document bound to struct `name`.
    pub fn parse_with_schema(registry: &Arc<SchemaRegistry>, name: &str, text: &str) -> Result<Self> {
        let mut doc = Document::with_schema(registry, name)?;
        let root = doc.root;
        load_into(&mut doc, root, text, &ParseOptions::default())?;
        Ok(doc)
    }
}

/// Replaces the content of `id` with the value read from `text`.
pub(crate) fn load_into(doc: &mut Document, id: NodeId, text: &str, options: &ParseOptions) -> Result<()> {
    let mut reader = Reader::new(text, options);
    reader.skip_blank();
    match reader.peek() {
        Some(b'{') => {
            let mut builder = ObjectBuilder::over(doc, id).map_err(|err| reader.locate(err))?;
            reader.object(&mut builder)?;
        }
        Some(b'[') => {
            let mut builder = ArrayBuilder::over(doc, id).map_err(|err| reader.locate(err))?;
            reader.array(&mut builder)?;
        }
        Some(b'"') => {
            let value = reader.string()?;
            doc.assign_scalar(id, Scalar::String(value)).map_err(|err| reader.locate(err))?;
        }
        Some(_) => {
            let value = reader.bare()?;
            doc.assign_scalar(id, value).map_err(|err| reader.locate(err))?;
        }
        None => return Err(reader.error("expected a value, found end of input")),
    }
    reader.skip_blank();
    if reader.pos < reader.bytes.len() {
        return Err(reader.error("unexpected text after the top-level value"));
    }
    trace!(bytes = text.len(), "loaded JSON text");
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// READER
// ————————————————————————————————————————————————————————————————————————————

struct Reader<'s> {
    text: &'s str,
    bytes: &'s [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'s> Reader<'s> {
    fn new(text: &'s str, options: &ParseOptions) -> Self {
        Reader { text, bytes: text.as_bytes(), pos: 0, depth: 0, max_depth: options.max_depth }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and `#` comments.
    fn skip_blank(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' => self.bump(),
                b'#' => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn error_at(&self, offset: usize, message: impl AsRef<str>) -> Error {
        let mut start = offset.min(self.text.len());
        while !self.text.is_char_boundary(start) {
            start -= 1;
        }
        let excerpt: String = self.text[start..].chars().take(20).collect();
        let near = if excerpt.is_empty() { "end of input".to_string() } else { format!("`{excerpt}`") };
        Error::parse(format!("{} near {near} (offset {start})", message.as_ref()), start)
    }

    fn error(&self, message: impl AsRef<str>) -> Error {
        self.error_at(self.pos, message)
    }

    /// Attaches the current position to errors raised while building.
    fn locate(&self, mut err: Error) -> Error {
        if err.offset.is_none() {
            err.offset = Some(self.pos);
        }
        err
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(format!("nesting deeper than {} levels", self.max_depth)));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONTAINERS
// ————————————————————————————————————————————————————————————————————————————

impl<'s> Reader<'s> {

    fn object(&mut self, builder: &mut ObjectBuilder<'_>) -> Result<()> {
        self.enter()?;
        self.bump();
        self.skip_blank();
        if self.eat(b'}') {
            self.leave();
            return Ok(());
        }
        loop {
            self.skip_blank();
            if self.peek() != Some(b'"') {
                return Err(self.error("expected a quoted member name"));
            }
            let key = self.string()?;
            self.skip_blank();
            if !self.eat(b':') {
                return Err(self.error(format!("expected `:` after member \"{key}\"")));
            }
            self.skip_blank();
            match self.peek() {
                Some(b'{') => {
                    let mut child = builder.add_object(&key).map_err(|err| self.locate(err))?;
                    self.object(&mut child)?;
                }
                Some(b'[') => {
                    let mut child = builder.add_array(&key).map_err(|err| self.locate(err))?;
                    self.array(&mut child)?;
                }
                Some(b'"') => {
                    let value = self.string()?;
                    builder
                        .add_scalar_value(&key, Scalar::String(value))
                        .map_err(|err| self.locate(err))?;
                }
                None | Some(b',') | Some(b'}') => {
                    return Err(self.error(format!("missing value for member \"{key}\"")));
                }
                Some(_) => {
                    let value = self.bare()?;
                    builder.add_scalar_value(&key, value).map_err(|err| self.locate(err))?;
                }
            }
            self.skip_blank();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b'}') => {
                    self.bump();
                    break;
                }
                None => return Err(self.error("unterminated object")),
                Some(_) => return Err(self.error("expected `,` or `}` after object member")),
            }
        }
        self.leave();
        Ok(())
    }

    fn array(&mut self, builder: &mut ArrayBuilder<'_>) -> Result<()> {
        self.enter()?;
        self.bump();
        self.skip_blank();
        if self.eat(b']') {
            self.leave();
            return Ok(());
        }
        loop {
            self.skip_blank();
            match self.peek() {
                Some(b'{') => {
                    let mut child = builder.add_object().map_err(|err| self.locate(err))?;
                    self.object(&mut child)?;
                }
                Some(b'[') => {
                    let mut child = builder.add_array().map_err(|err| self.locate(err))?;
                    self.array(&mut child)?;
                }
                Some(b'"') => {
                    let value = self.string()?;
                    builder.add_scalar_value(Scalar::String(value)).map_err(|err| self.locate(err))?;
                }
                None | Some(b',') | Some(b']') => return Err(self.error("expected an array element")),
                Some(_) => {
                    let value = self.bare()?;
                    builder.add_scalar_value(value).map_err(|err| self.locate(err))?;
                }
            }
            self.skip_blank();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b']') => {
                    self.bump();
                    break;
                }
                None => return Err(self.error("unterminated array")),
                Some(_) => return Err(self.error("expected `,` or `]` after array element")),
            }
        }
        self.leave();
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCALARS
// ————————————————————————————————————————————————————————————————————————————

impl<'s> Reader<'s> {

    /// An unquoted token, typed by inference.
    fn bare(&mut self) -> Result<Scalar> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}' | b'#' | b':') {
                break;
            }
            self.bump();
        }
        let literal = &self.text[start..self.pos];
        if literal.is_empty() {
            return Err(self.error("expected a value"));
        }
        scalar::infer(literal, false).map_err(|_| self.error_at(start, format!("invalid literal `{literal}`")))
    }

    /// A quoted string, with the reader on the opening quote.
    fn string(&mut self) -> Result<String> {
        let open = self.pos;
        self.bump();
        let mut out = String::new();
        let mut run = self.pos;
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.error_at(open, "unterminated string"));
            };
            match byte {
                b'"' => {
                    out.push_str(&self.text[run..self.pos]);
                    self.bump();
                    return Ok(out);
                }
                b'\\' => {
                    out.push_str(&self.text[run..self.pos]);
                    self.bump();
                    self.escape(&mut out)?;
                    run = self.pos;
                }
                0x00..=0x1f => return Err(self.error("control character in string")),
                _ => self.bump(),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let Some(byte) = self.peek() else {
            return Err(self.error("unterminated escape sequence"));
        };
        self.bump();
        match byte {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let first = self.hex4()?;
                let code = match first {
                    0xD800..=0xDBFF => {
                        if !(self.eat(b'\\') && self.eat(b'u')) {
                            return Err(self.error("unpaired high surrogate in \\u escape"));
                        }
                        let second = self.hex4()?;
                        if !(0xDC00..=0xDFFF).contains(&second) {
                            return Err(self.error("invalid low surrogate in \\u escape"));
                        }
                        0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                    }
                    0xDC00..=0xDFFF => return Err(self.error("unpaired low surrogate in \\u escape")),
                    _ => first,
                };
                let ch = char::from_u32(code).ok_or_else(|| self.error("invalid \\u escape"))?;
                out.push(ch);
            }
            other => {
                return Err(self.error_at(self.pos - 1, format!("illegal escape `\\{}`", other as char)));
            }
        }
        Ok(())
    }

    fn hex4(&mut self) -> Result<u32> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("expected four hex digits in \\u escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid \\u escape"))?;
        self.pos += 4;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn comments_and_extended_literals() {
        let text = "# header\n{\n  \"a\": ~, # inline\n  \"b\": nan,\n  \"c\": -12, \"d\": 1e3\n}\n";
        let doc = Document::parse(text).unwrap();
        assert!(doc.field("a").unwrap().is_null());
        assert!(doc.field("b").unwrap().value::<f64>().unwrap().is_nan());
        assert_eq!(doc.field("c").unwrap().value::<i64>(), Some(-12));
        assert_eq!(doc.field("d").unwrap().json_type(), crate::types::JsonType::Double);
    }

    #[test]
    fn escapes_decode() {
        let doc = Document::parse(r#"["a\"b\\c\/d\n\t", "\u00e9\ud83d\ude00"]"#).unwrap();
        assert_eq!(doc.field("0").unwrap().value::<String>().unwrap(), "a\"b\\c/d\n\t");
        assert_eq!(doc.field("1").unwrap().value::<String>().unwrap(), "é😀");
    }

    #[test]
    fn unicode_passes_through() {
        let doc = Document::parse(r#"{"ключ": "значение"}"#).unwrap();
        assert_eq!(doc.field("ключ").unwrap().value::<String>().unwrap(), "значение");
    }

    #[test]
    fn top_level_scalars() {
        assert_eq!(Document::parse(" 42 ").unwrap().root().value::<i64>(), Some(42));
        assert_eq!(Document::parse("\"s\"").unwrap().root().value::<String>().unwrap(), "s");
        assert!(Document::parse("~").unwrap().root().is_null());
    }

    #[test]
    fn malformed_input_reports_offsets() {
        let cases = [
            ("", 0),
            ("{\"a\" 1}", 5),
            ("[1, 2", 5),
            ("{\"a\": 1,}", 8),
            ("[1] x", 4),
            ("[bogus]", 1),
            ("\"abc", 0),
            ("[\"\\q\"]", 3),
            ("{\"a\":}", 5),
        ];
        for (text, offset) in cases {
            let err = Document::parse(text).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Parse, "{text}");
            assert_eq!(err.offset, Some(offset), "{text}: {err}");
        }
    }

    #[test]
    fn control_characters_are_rejected() {
        let err = Document::parse("\"a\u{1}b\"").unwrap_err();
        assert_eq!(err.offset, Some(2));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = "[".repeat(300) + &"]".repeat(300);
        let err = Document::parse(&deep).unwrap_err();
        assert!(err.message.contains("nesting"));
        let options = ParseOptions { max_depth: 400 };
        assert!(Document::parse_with(&deep, &options).is_ok());
        let shallow = ParseOptions { max_depth: 1 };
        assert!(Document::parse_with("[[1]]", &shallow).is_err());
    }

    #[test]
    fn loads_replaces_content() {
        let mut doc = Document::parse(r#"{"a": 1}"#).unwrap();
        doc.root_mut().at_key("a").unwrap().loads("[true, {\"x\": ~}]").unwrap();
        assert_eq!(doc.dump(true), r#"{"a":[true,{"x":null}]}"#);
    }
}
