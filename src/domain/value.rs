//! Scalar values held by instrument record fields.

use super::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A single field value: text, exact number, or boolean flag.
///
/// Deserializes from plain JSON scalars. Strings stay text even when they
/// look numeric, so codes with leading zeros survive. `null` is not a value
/// and is handled by the record as an absent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(Decimal),
    Text(String),
}

impl FieldValue {
    /// The empty text value used when a field is cleared.
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Empty means blank text. Numbers and booleans always carry a value.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
        }
    }

    /// String-normalized form used for loose comparisons against catalog codes.
    pub fn as_loose_string(&self) -> String {
        match self {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Number(n) => n.to_canonical_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    /// Integral interpretation of the value, accepting numeric text.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => n.to_integer(),
            FieldValue::Text(s) => Decimal::from_str_canonical(s)
                .ok()
                .and_then(|n| n.to_integer()),
            FieldValue::Bool(_) => None,
        }
    }

    /// Loose equality: `7` equals `"7"`, `"CL"` equals `" CL "`.
    pub fn loosely_equals(&self, expected: &str) -> bool {
        self.as_loose_string() == expected.trim()
    }

    /// Flag reading of the value: `true`, non-zero numbers, and `S`/`Y`/`1`/`true` text.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => n.to_integer() != Some(0),
            FieldValue::Text(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "s" | "si" | "y" | "yes" | "1" | "true"
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_loose_string())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::from(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        rust_decimal::Decimal::from_u64(v)
            .map(|d| FieldValue::Number(Decimal::from(d)))
            .ok_or_else(|| E::custom(format!("number out of range: {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
        rust_decimal::Decimal::from_f64(v)
            .map(|d| FieldValue::Number(Decimal::from(d)))
            .ok_or_else(|| E::custom(format!("number out of range: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(v))
    }
}
