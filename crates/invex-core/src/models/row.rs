//! Extracted row model: a dynamically-keyed map of typed field values.

use std::fmt;

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// A single extracted field value.
///
/// The field set of a row is entirely configuration-determined, so values
/// are a small closed variant type rather than a fixed struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Whole number (counts, durations, spot totals).
    Integer(i64),
    /// Decimal number (rates, amounts).
    Real(Decimal),
    /// Free text (names, dates kept verbatim).
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Integer(v) => Some(Decimal::from(*v)),
            FieldValue::Real(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    /// Whether the value participates in arithmetic.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldValue::Text(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A single extracted row.
///
/// Fields are stored as a generic ordered map keyed by the field name from
/// the tenant's field definitions, with values already parsed to their
/// declared type. The acceptance score is carried alongside the map, not
/// as an entry in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedRow {
    #[serde(flatten)]
    fields: IndexMap<String, FieldValue>,
    #[serde(skip)]
    score: i32,
}

impl ExtractedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field. Insertion order is preserved for new
    /// keys; overwriting keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Acceptance score: sum of the weights of every matched field.
    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn add_score(&mut self, weight: i32) {
        self.score += weight;
    }

    pub fn set_score(&mut self, score: i32) {
        self.score = score;
    }

    // Convenience accessors for downstream consumers.

    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        self.fields
            .get(name)
            .and_then(FieldValue::as_decimal)
            .and_then(|d| d.trunc().to_i64())
    }

    pub fn get_real(&self, name: &str) -> Option<Decimal> {
        self.fields.get(name).and_then(FieldValue::as_decimal)
    }
}
