//! Structured errors raised by every part of the engine.
//!
//! Structural operations never fail silently: they return [`Error`] carrying the
//! emitting component, a numeric code and a message. Only the `get_to` family
//! reports "absent or not convertible" as a plain boolean / `Option`.
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Subscript used with the wrong node category, or schema-incompatible assignment.
    TypeMismatch,
    /// Missing key, index or parent.
    Missing,
    /// Malformed JSON text.
    Parse,
    /// Unknown struct or enum referenced by name.
    SchemaLookup,
    /// Copy or move between incompatible schema-bound nodes.
    Assignment,
    /// Numeric value outside the field's declared limits.
    OutOfRange,
    /// Malformed schema source document.
    SchemaSource,
    Io,
}

impl ErrorKind {
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::TypeMismatch => 1,
            ErrorKind::Missing => 2,
            ErrorKind::Parse => 3,
            ErrorKind::SchemaLookup => 4,
            ErrorKind::Assignment => 5,
            ErrorKind::OutOfRange => 6,
            ErrorKind::SchemaSource => 7,
            ErrorKind::Io => 8,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Missing => "missing data",
            ErrorKind::Parse => "parse error",
            ErrorKind::SchemaLookup => "schema lookup failure",
            ErrorKind::Assignment => "illegal assignment",
            ErrorKind::OutOfRange => "value out of range",
            ErrorKind::SchemaSource => "invalid schema source",
            ErrorKind::Io => "i/o error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{component} [{kind} #{code}]: {message}", code = .kind.code())]
pub struct Error {
    pub kind: ErrorKind,
    pub component: &'static str,
    pub message: String,
    /// Byte offset into the parsed text, for parse errors.
    pub offset: Option<usize>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, component: &'static str, message: impl Into<String>) -> Self {
        Error { kind, component, message: message.into(), offset: None }
    }

    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Error { kind: ErrorKind::Parse, component: "parser", message: message.into(), offset: Some(offset) }
    }

    pub fn type_mismatch(component: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, component, message)
    }

    pub fn missing(component: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Missing, component, message)
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, "io", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_component_and_code() {
        let err = Error::missing("free-node", "key `a` not found");
        assert_eq!(err.code(), 2);
        assert_eq!(err.to_string(), "free-node [missing data #2]: key `a` not found");
    }

    #[test]
    fn parse_errors_keep_offset() {
        let err = Error::parse("unterminated object", 17);
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(err.offset, Some(17));
    }
}
