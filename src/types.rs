//! The value-type tag shared by both node kinds, and typed scalar payloads.
use std::fmt;

/// The JSON type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Null,
    Bool,
    Int,
    Double,
    String,
    Object,
    Array,
}

impl JsonType {
    pub fn is_number(self) -> bool {
        matches!(self, JsonType::Int | JsonType::Double)
    }

    pub fn is_structured(self) -> bool {
        matches!(self, JsonType::Object | JsonType::Array)
    }

    pub fn is_primitive(self) -> bool {
        !self.is_structured()
    }

    pub fn name(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Bool => "bool",
            JsonType::Int => "int",
            JsonType::Double => "double",
            JsonType::String => "string",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive value.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl Scalar {
    pub fn json_type(&self) -> JsonType {
        match self {
            Scalar::Null => JsonType::Null,
            Scalar::Bool(_) => JsonType::Bool,
            Scalar::Int(_) => JsonType::Int,
            Scalar::Double(_) => JsonType::Double,
            Scalar::String(_) => JsonType::String,
        }
    }

    /// Canonical string form (no quoting, no escaping).
    pub fn canonical(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Double(d) => format_double(*d),
            Scalar::String(s) => s.clone(),
        }
    }
}

// NaN is equal to itself here: trees must compare equal after a round trip.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Double(a), Scalar::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

/// Shortest round-trip rendering that always reads back as a double
/// (`100.0`, `1e20`, `5.2`).
pub fn format_double(value: f64) -> String {
    format!("{value:?}")
}

/// `%g`-style rendering with `precision` significant digits. Integral results
/// keep a trailing `.0` so the text still reads back as a double.
pub fn format_double_precision(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return format_double(value);
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0".to_string() } else { "0.0".to_string() };
    }
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return format_double(value),
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = trim_fraction(mantissa);
        format!("{mantissa}e{exponent}")
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{value:.decimals$}");
        let fixed = trim_fraction(&fixed);
        if fixed.contains('.') { fixed } else { format!("{fixed}.0") }
    }
}

fn trim_fraction(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    let trimmed = text.trim_end_matches('0');
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}
