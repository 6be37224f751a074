//! Scalar-type inference for unquoted literals.
//!
//! A literal is classified by trial, in order: `~`/`null` → Null, `true`/`false`
//! → Bool, integer pattern → Int, floating pattern → Double, the non-finite
//! sentinel → Double(NaN), else String (or an error where strings are not
//! allowed, e.g. unquoted text inside a JSON document).
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, ErrorKind, Result};
use crate::types::Scalar;

static INT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid regex"));

static DOUBLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)([eE][+-]?[0-9]+)?$").expect("valid regex")
});

/// Literal written for NaN and infinities.
pub const NON_FINITE_LITERAL: &str = "nan";

pub fn infer(literal: &str, allow_string: bool) -> Result<Scalar> {
    match literal {
        "~" | "null" => return Ok(Scalar::Null),
        "true" => return Ok(Scalar::Bool(true)),
        "false" => return Ok(Scalar::Bool(false)),
        NON_FINITE_LITERAL => return Ok(Scalar::Double(f64::NAN)),
        _ => {}
    }
    if INT_PATTERN.is_match(literal) {
        // Out-of-range integers degrade to doubles rather than failing.
        return Ok(match literal.parse::<i64>() {
            Ok(i) => Scalar::Int(i),
            Err(_) => Scalar::Double(parse_double(literal)?),
        });
    }
    if DOUBLE_PATTERN.is_match(literal) {
        return Ok(Scalar::Double(parse_double(literal)?));
    }
    if allow_string {
        Ok(Scalar::String(literal.to_string()))
    } else {
        Err(Error::new(
            ErrorKind::Parse,
            "scalar",
            format!("`{literal}` is not a null, bool, or number literal"),
        ))
    }
}

fn parse_double(literal: &str) -> Result<f64> {
    literal.parse::<f64>().map_err(|err| {
        Error::new(ErrorKind::Parse, "scalar", format!("`{literal}` is not a valid number: {err}"))
    })
}
