//! Extraction result assembly.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;

use super::row::ExtractedRow;

/// Terminal status of an extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Extraction ran to completion.
    Success,
    /// The document contained no extractable text.
    Empty,
    /// Classification or extraction hit an unrecoverable condition.
    Error,
}

/// Result of one extraction call.
///
/// Owned exclusively by the call that produced it; assembled once and not
/// mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Key of the resolved tenant profile.
    pub tenant_key: String,
    /// Display name of the resolved tenant profile.
    pub tenant_name: String,
    /// Extracted rows, grouped by block name.
    pub blocks: IndexMap<String, Vec<ExtractedRow>>,
    /// Summary amount supplied by an external fallback decoder, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_amount: Option<Decimal>,
    /// Completeness percentage over extracted fields.
    pub completeness: f64,
    /// Non-fatal issues encountered during extraction.
    pub warnings: Vec<String>,
    pub status: ExtractionStatus,
}

impl ExtractionResult {
    pub fn new(tenant_key: impl Into<String>, tenant_name: impl Into<String>) -> Self {
        Self {
            tenant_key: tenant_key.into(),
            tenant_name: tenant_name.into(),
            blocks: IndexMap::new(),
            fallback_amount: None,
            completeness: 0.0,
            warnings: Vec::new(),
            status: ExtractionStatus::Success,
        }
    }

    /// Terminating result for a document with no extractable text.
    pub fn empty(reason: impl Into<String>) -> Self {
        let mut result = Self::new("", "");
        result.status = ExtractionStatus::Empty;
        result.warnings.push(reason.into());
        result
    }

    /// Terminating result for an unrecoverable condition.
    pub fn error(reason: impl Into<String>) -> Self {
        let mut result = Self::new("", "");
        result.status = ExtractionStatus::Error;
        result.warnings.push(reason.into());
        result
    }

    /// Total number of extracted rows across all blocks.
    pub fn total_rows(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    /// Recompute the completeness percentage.
    ///
    /// Counts every stored value as both possible and present. Rows never
    /// hold missing entries, so the percentage is 100 whenever anything was
    /// extracted at all; fields that were defined but never matched do not
    /// lower it.
    ///
    /// TODO: decide with the product owner whether this should count
    /// present fields against all *defined* fields for the block instead.
    pub fn calculate_completeness(&mut self) {
        let mut total_fields = 0u32;
        let mut present_fields = 0u32;

        for rows in self.blocks.values() {
            for row in rows {
                for _value in row.iter() {
                    total_fields += 1;
                    present_fields += 1;
                }
            }
        }

        self.completeness = if total_fields == 0 {
            0.0
        } else {
            (present_fields as f64 * 100.0) / total_fields as f64
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::row::FieldValue;

    #[test]
    fn test_empty_result() {
        let result = ExtractionResult::empty("document contains no extractable text");

        assert_eq!(result.status, ExtractionStatus::Empty);
        assert_eq!(result.blocks.len(), 0);
        assert_eq!(result.completeness, 0.0);
        assert_eq!(
            result.warnings,
            vec!["document contains no extractable text".to_string()]
        );
    }

    #[test]
    fn test_completeness_zero_without_fields() {
        let mut result = ExtractionResult::new("TV", "TV Invoice");
        result.blocks.insert("invoice".to_string(), Vec::new());
        result.calculate_completeness();

        assert_eq!(result.completeness, 0.0);
    }

    #[test]
    fn test_completeness_counts_only_present_fields() {
        let mut result = ExtractionResult::new("TV", "TV Invoice");
        let mut row = ExtractedRow::new();
        row.insert("amount", FieldValue::Integer(100));
        result.blocks.insert("invoice".to_string(), vec![row]);
        result.calculate_completeness();

        // Rows never contain missing entries, so any extracted field
        // yields a full score.
        assert_eq!(result.completeness, 100.0);
    }
}
