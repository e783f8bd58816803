//! Lenient conversion of captured strings into typed values.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::trace;

use crate::config::FieldType;
use crate::models::FieldValue;

/// Parse a captured string according to its declared field type.
///
/// Numeric types strip every character outside their digit set before
/// parsing, tolerating currency symbols and other OCR noise. Failure is
/// silent: the field is simply omitted from the row.
pub fn parse_value(raw: &str, field_type: FieldType) -> Option<FieldValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match field_type {
        FieldType::Text | FieldType::Date => Some(FieldValue::Text(raw.to_string())),
        FieldType::Integer => {
            let cleaned: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '-')
                .collect();
            match cleaned.parse::<i64>() {
                Ok(value) => Some(FieldValue::Integer(value)),
                Err(_) => {
                    trace!("failed to parse '{}' as integer", raw);
                    None
                }
            }
        }
        FieldType::Real => {
            let cleaned: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            match Decimal::from_str(&cleaned) {
                Ok(value) => Some(FieldValue::Real(value)),
                Err(_) => {
                    trace!("failed to parse '{}' as real", raw);
                    None
                }
            }
        }
    }
}
