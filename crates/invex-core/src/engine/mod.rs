//! Rule-driven extraction engine.
//!
//! Runs once per configured block, choosing between flat segmentation and
//! the context-aware scan based on whether the block declares any context
//! fields, then applies the block's derived-field calculations and
//! assembles the result.

mod calc;
mod flat;
mod matcher;
mod patterns;
mod scan;
mod value;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::{FieldDef, TenantProfile};
use crate::models::{ExtractedRow, ExtractionResult, FieldValue};

pub use calc::CalculationEvaluator;
pub use matcher::{normalize_whitespace, FieldMatcher};
pub use value::parse_value;

/// Code-mapping tables, keyed by mapping type then uppercase code.
pub type MappingTables = HashMap<String, HashMap<String, String>>;

/// A field definition with its pattern rules compiled once per block run.
pub(crate) struct CompiledField<'a> {
    pub def: &'a FieldDef,
    pub matcher: FieldMatcher,
}

impl<'a> CompiledField<'a> {
    pub(crate) fn compile(def: &'a FieldDef) -> Self {
        Self {
            matcher: FieldMatcher::compile(&def.field_name, &def.patterns),
            def,
        }
    }
}

/// Configuration-driven extraction over preprocessed document text.
#[derive(Debug, Default)]
pub struct ExtractionEngine;

impl ExtractionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Extract every configured block of the profile from the document.
    pub fn extract(
        &self,
        text: &str,
        profile: &TenantProfile,
        mappings: &MappingTables,
    ) -> ExtractionResult {
        let mut result = ExtractionResult::new(&profile.tenant_key, &profile.display_name);
        let text = preprocess_text(text);

        for block in &profile.block_configs {
            let mut defs: Vec<&FieldDef> = profile
                .field_defs
                .iter()
                .filter(|f| f.block_name == block.block_name)
                .collect();

            if defs.is_empty() {
                continue;
            }
            defs.sort_by_key(|f| f.sort_order);

            let fields: Vec<CompiledField<'_>> =
                defs.into_iter().map(CompiledField::compile).collect();
            let has_context = fields.iter().any(|f| f.def.is_context);

            let mut rows = if has_context {
                scan::extract_with_context(&text, block, &fields, mappings)
            } else {
                flat::extract_flat(&text, block, &fields, mappings)
            };

            let evaluator = CalculationEvaluator::for_block(&profile.calculations, &block.block_name);
            if !evaluator.is_empty() {
                for row in &mut rows {
                    evaluator.apply(row);
                }
            }

            info!(
                "block '{}' extracted {} rows (has_context={})",
                block.block_name,
                rows.len(),
                has_context
            );
            result.blocks.insert(block.block_name.clone(), rows);
        }

        result.calculate_completeness();
        result
    }
}

/// Evaluate every field definition against a span of text and assemble a
/// fresh row, summing matched weights into the score.
pub(crate) fn extract_row(
    text: &str,
    fields: &[&CompiledField<'_>],
    mappings: &MappingTables,
) -> ExtractedRow {
    let mut row = ExtractedRow::new();

    for field in fields {
        let Some(captured) = field.matcher.first_capture(text) else {
            continue;
        };
        let Some(parsed) = parse_value(&captured, field.def.field_type) else {
            continue;
        };

        let value = map_code(&captured, field.def, mappings).unwrap_or(parsed);
        debug!(
            "extracted {}={} (score +{})",
            field.def.field_name, value, field.def.weight
        );
        row.insert(field.def.field_name.clone(), value);
        row.add_score(field.def.weight);
    }

    row
}

/// Resolve a captured code through the field's mapping table, if any.
///
/// Lookup is by uppercase trimmed code; an unmapped code falls through to
/// the plain parsed value.
pub(crate) fn map_code(
    captured: &str,
    def: &FieldDef,
    mappings: &MappingTables,
) -> Option<FieldValue> {
    let table = mappings.get(def.code_mapping.as_deref()?)?;
    let mapped = table.get(&captured.trim().to_uppercase())?;
    Some(FieldValue::Text(mapped.clone()))
}

/// Normalize the raw document text before any block runs.
///
/// Line breaks are unified, invisible characters dropped, horizontal
/// whitespace runs collapsed (vertical structure is preserved for the
/// line scanners) and triple blank lines squeezed.
pub(crate) fn preprocess_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = patterns::ZERO_WIDTH.replace_all(&text, "");
    let text = patterns::SPACE_RUNS.replace_all(&text, " ");
    let text = patterns::BLANK_RUNS.replace_all(&text, "\n\n");
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{
        BlockConfig, BlockMode, CalcKind, FieldCalculation, FieldType, ResultType, TenantStatus,
    };
    use crate::models::ExtractionStatus;

    #[test]
    fn test_preprocess_normalizes_line_breaks_and_spacing() {
        let text = "a\u{200B}b\r\nc\t\td\n\n\n\ne";
        assert_eq!(preprocess_text(text), "ab\nc d\n\ne");
    }

    fn field(
        block: &str,
        name: &str,
        field_type: FieldType,
        pattern: &str,
        weight: i32,
        sort_order: i32,
    ) -> FieldDef {
        FieldDef {
            block_name: block.to_string(),
            field_name: name.to_string(),
            field_type,
            patterns: vec![pattern.to_string()],
            weight,
            required: false,
            optional: true,
            sort_order,
            is_context: false,
            context_reset_on_match: false,
            code_mapping: None,
        }
    }

    fn profile() -> TenantProfile {
        TenantProfile {
            tenant_key: "TV".to_string(),
            display_name: "TV Invoice".to_string(),
            status: TenantStatus::Active,
            identifiers: Vec::new(),
            field_defs: vec![
                field("invoice", "spots", FieldType::Integer, r"Spots:\s*(\d+)", 5, 1),
                field("invoice", "rate", FieldType::Real, r"Rate:\s*([\d,.]+)", 5, 2),
                field("summary", "total", FieldType::Real, r"Net Payable:\s*([\d,.]+)", 10, 1),
            ],
            block_configs: vec![
                BlockConfig {
                    block_name: "invoice".to_string(),
                    mode: BlockMode::Global,
                    start_pattern: None,
                    min_score: 5,
                    fallback_enabled: false,
                },
                BlockConfig {
                    block_name: "summary".to_string(),
                    mode: BlockMode::Global,
                    start_pattern: None,
                    min_score: 10,
                    fallback_enabled: false,
                },
            ],
            calculations: vec![FieldCalculation {
                block_name: "invoice".to_string(),
                target_field: "amount".to_string(),
                kind: CalcKind::Multiply,
                source_fields: vec!["spots".to_string(), "rate".to_string()],
                formula: None,
                result_type: ResultType::Real,
                apply_only_if_missing: true,
                priority: 10,
            }],
        }
    }

    #[test]
    fn test_engine_runs_every_configured_block() {
        let engine = ExtractionEngine::new();
        let text = "Spots: 24 Rate: 73.10\nNet Payable: 1,754.40";

        let result = engine.extract(text, &profile(), &MappingTables::new());

        assert_eq!(result.tenant_key, "TV");
        assert_eq!(result.status, ExtractionStatus::Success);
        assert_eq!(result.blocks.len(), 2);

        let invoice = &result.blocks["invoice"][0];
        assert_eq!(invoice.get_integer("spots"), Some(24));
        // Derived by the block's multiply calculation.
        assert_eq!(invoice.get_real("amount"), Some("1754.40".parse().unwrap()));

        let summary = &result.blocks["summary"][0];
        assert_eq!(summary.get_real("total"), Some("1754.40".parse().unwrap()));

        assert_eq!(result.completeness, 100.0);
    }

    #[test]
    fn test_block_without_field_defs_is_skipped() {
        let mut p = profile();
        p.field_defs.retain(|f| f.block_name != "summary");

        let result = ExtractionEngine::new().extract(
            "Spots: 24 Rate: 73.10",
            &p,
            &MappingTables::new(),
        );

        assert_eq!(result.blocks.len(), 1);
        assert!(result.blocks.contains_key("invoice"));
    }

    #[test]
    fn test_fields_evaluated_in_sort_order() {
        let mut p = profile();
        // Both patterns capture from the same text; sort order decides
        // evaluation order, observable through row field ordering.
        p.field_defs = vec![
            field("invoice", "second", FieldType::Integer, r"(\d+)", 5, 2),
            field("invoice", "first", FieldType::Integer, r"(\d+)", 5, 1),
        ];
        p.block_configs.truncate(1);
        p.calculations.clear();

        let result = ExtractionEngine::new().extract("42", &p, &MappingTables::new());
        let names: Vec<&str> = result.blocks["invoice"][0]
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();

        assert_eq!(names, vec!["first", "second"]);
    }
}
