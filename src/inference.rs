//! Column type inference.
//!
//! A column starts out as [`SqlType::Integer`]. Whenever a value does not parse
//! under the current candidate the candidate is widened to the next type and
//! the same value is tried again; a candidate never narrows. Values matching a
//! configured null marker never take part in inference.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column types ordered by widening precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Float,
    String,
}

impl SqlType {
    /// The next less restrictive type, or `None` for `String`.
    pub fn widen(self) -> Option<SqlType> {
        match self {
            SqlType::Integer => Some(SqlType::Float),
            SqlType::Float => Some(SqlType::String),
            SqlType::String => None,
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        match self {
            SqlType::Integer => parse_integer(value).is_some(),
            SqlType::Float => parse_float(value).is_some(),
            SqlType::String => true,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, SqlType::String)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SqlType::Integer => "Integer",
            SqlType::Float => "Float",
            SqlType::String => "String",
        };
        f.write_str(label)
    }
}

fn all_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}

fn strip_sign(value: &str) -> &str {
    value.strip_prefix(['+', '-']).unwrap_or(value)
}

/// Parses an optionally signed decimal integer that fits in an `i64`.
pub fn parse_integer(value: &str) -> Option<i64> {
    let digits = strip_sign(value);
    if digits.is_empty() || !all_digits(digits) {
        return None;
    }
    value.parse().ok()
}

/// Parses a decimal literal such as `-3`, `8.8`, `.5`, `1.` or `6.02e23`.
///
/// Spellings like `inf` or `NaN` are rejected since they cannot be rendered as
/// bare numeric literals.
pub fn parse_float(value: &str) -> Option<f64> {
    let body = strip_sign(value);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }
    if let Some(exponent) = exponent {
        let digits = strip_sign(exponent);
        if digits.is_empty() || !all_digits(digits) {
            return None;
        }
    }
    value.parse().ok()
}

/// Textual tokens that stand for a missing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NullMarkers(Vec<String>);

impl Default for NullMarkers {
    fn default() -> Self {
        Self::new(["NaN", "\\N", "", "nan"])
    }
}

impl NullMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(markers.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self, value: &str) -> bool {
        self.0.iter().any(|marker| marker == value)
    }
}

/// Incremental widening cursor for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInference {
    candidate: SqlType,
}

impl Default for TypeInference {
    fn default() -> Self {
        Self {
            candidate: SqlType::Integer,
        }
    }
}

impl TypeInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(&self) -> SqlType {
        self.candidate
    }

    pub fn is_settled(&self) -> bool {
        self.candidate == SqlType::String
    }

    /// Widens the candidate until `value` parses, returning the new candidate.
    pub fn observe(&mut self, value: &str) -> SqlType {
        while !self.candidate.accepts(value) {
            match self.candidate.widen() {
                Some(next) => self.candidate = next,
                None => break,
            }
        }
        self.candidate
    }
}

/// Returns the narrowest type every value parses as.
///
/// Callers pass non-null values only; an empty column yields `Integer`.
pub fn infer_column_type<'a, I>(values: I) -> SqlType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut inference = TypeInference::new();
    for value in values {
        inference.observe(value);
        if inference.is_settled() {
            break;
        }
    }
    inference.candidate()
}
