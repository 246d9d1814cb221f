//! Header value parsing and formatting.

use crate::error::{Error, Result};

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// FITS logical value (`T` or `F`).
    Bool(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
}

impl Scalar {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as `f64`, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Integer(n)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(String::from(s))
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

/// Width of the fixed-format field numeric and logical values are
/// right-justified in (card columns 11-30).
pub const FIXED_FIELD_WIDTH: usize = 20;

// ── Parsing ──

/// Split a value region (card bytes 10..80) at the first `/` that lies
/// outside a quoted string.
///
/// Returns `(value_text, comment)`; the comment is trimmed and `None` when
/// empty. Doubled quotes toggle the string state twice and so stay inside it.
pub fn split_value_comment(region: &str) -> (&str, Option<&str>) {
    let mut in_string = false;
    for (i, b) in region.bytes().enumerate() {
        match b {
            b'\'' => in_string = !in_string,
            b'/' if !in_string => {
                let comment = region[i + 1..].trim();
                return (&region[..i], Some(comment).filter(|c| !c.is_empty()));
            }
            _ => {}
        }
    }
    (region, None)
}

/// Parse the value text of a card.
///
/// Empty text yields `None`. Quoted text is a string, text with a decimal
/// point or exponent marker a float, a lone `T`/`F` a logical, anything else
/// an integer.
pub fn parse_scalar(text: &str) -> Result<Option<Scalar>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.starts_with('\'') {
        return Ok(Some(Scalar::String(unquote(text))));
    }
    if text == "T" {
        return Ok(Some(Scalar::Bool(true)));
    }
    if text == "F" {
        return Ok(Some(Scalar::Bool(false)));
    }
    if text.contains(['.', 'E', 'e', 'D', 'd']) {
        let normalized = text.replace(['D', 'd'], "E");
        return normalized
            .parse::<f64>()
            .map(|f| Some(Scalar::Float(f)))
            .map_err(|_| Error::MalformedNumericLiteral(String::from(text)));
    }
    text.parse::<i64>()
        .map(|n| Some(Scalar::Integer(n)))
        .map_err(|_| Error::MalformedNumericLiteral(String::from(text)))
}

/// Extract the content of a quoted string, collapsing `''` into `'`.
///
/// Content is kept verbatim, trailing spaces included. A missing closing
/// quote is tolerated.
fn unquote(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut value = String::with_capacity(bytes.len());
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                value.push('\'');
                i += 2;
                continue;
            }
            break;
        }
        value.push(bytes[i] as char);
        i += 1;
    }
    value
}

// ── Formatting ──

/// Returns `true` if every byte of `s` is printable ASCII (0x20..=0x7E).
pub fn is_card_text(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Double every embedded single quote.
pub fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Format a value for a single card.
///
/// Logicals and numbers are right-justified in the fixed 20-column field;
/// strings are quoted without padding. Strings that need several cards are
/// split by the card encoder instead.
pub fn format_fixed(value: &Scalar) -> Result<String> {
    let text = match value {
        Scalar::Bool(b) => String::from(if *b { "T" } else { "F" }),
        Scalar::Integer(n) => n.to_string(),
        Scalar::Float(f) => format_float(*f)?,
        Scalar::String(s) => return Ok(format!("'{}'", escape_string(s))),
    };
    Ok(format!("{text:>width$}", width = FIXED_FIELD_WIDTH))
}

/// Locale-independent float text that always reads back as a float.
///
/// Uses the shortest representation that round-trips, makes sure a decimal
/// point is present, and writes exponents with `E`.
fn format_float(f: f64) -> Result<String> {
    if !f.is_finite() {
        return Err(Error::MalformedNumericLiteral(f.to_string()));
    }
    let text = format!("{f:?}").replace('e', "E");
    if text.contains('.') {
        return Ok(text);
    }
    Ok(match text.find('E') {
        Some(pos) => format!("{}.0{}", &text[..pos], &text[pos..]),
        None => format!("{text}.0"),
    })
}
