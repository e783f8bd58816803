//! Context-aware scan strategy for blocks with context fields.
//!
//! A single pass over the lines with two pieces of carried state: the
//! active context (last-seen value per context field) and a buffer for the
//! row currently being built. Context lines update state and are consumed;
//! everything else accumulates into the buffer until a row boundary or the
//! end of input flushes it.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::BlockConfig;
use crate::models::{ExtractedRow, FieldValue};

use super::matcher::compile_start_pattern;
use super::patterns::{is_footer_line, is_header_line, is_total_line};
use super::{extract_row, map_code, CompiledField, MappingTables};

pub(crate) fn extract_with_context(
    text: &str,
    block: &BlockConfig,
    fields: &[CompiledField<'_>],
    mappings: &MappingTables,
) -> Vec<ExtractedRow> {
    let context_fields: Vec<&CompiledField<'_>> =
        fields.iter().filter(|f| f.def.is_context).collect();
    let data_fields: Vec<&CompiledField<'_>> =
        fields.iter().filter(|f| !f.def.is_context).collect();

    debug!(
        "context extraction: {} context fields, {} data fields",
        context_fields.len(),
        data_fields.len()
    );

    let start_pattern = compile_start_pattern(block.start_pattern.as_deref());

    let mut context: IndexMap<String, FieldValue> = IndexMap::new();
    let mut buffer = String::new();
    let mut rows = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_total_line(trimmed) {
            continue;
        }

        // Context check: first matching context field consumes the line.
        let mut consumed = false;
        for cf in &context_fields {
            let Some(captured) = cf.matcher.first_capture(line) else {
                continue;
            };

            // A context-opening field finalizes the pending row under the
            // outgoing context before the scope switches.
            if cf.def.context_reset_on_match && !buffer.is_empty() {
                flush_row(&mut buffer, &mut rows, &data_fields, &context, block.min_score, mappings);
            }

            let value = map_code(&captured, cf.def, mappings)
                .unwrap_or_else(|| FieldValue::Text(captured.clone()));
            trace!("context updated: {}={}", cf.def.field_name, value);
            context.insert(cf.def.field_name.clone(), value);
            consumed = true;
            break;
        }

        if consumed {
            continue;
        }

        // Row boundary: the configured start pattern, or a context-continuing
        // field's pattern showing up mid-stream, begins a new row.
        let is_row_start = start_pattern
            .as_ref()
            .is_some_and(|p| p.is_match(trimmed))
            || context_fields
                .iter()
                .any(|cf| !cf.def.context_reset_on_match && cf.matcher.is_match(trimmed));

        if is_row_start && !buffer.is_empty() {
            flush_row(&mut buffer, &mut rows, &data_fields, &context, block.min_score, mappings);
        }

        // Accumulate: on a row start, as a continuation of a buffered row,
        // or unconditionally when no start pattern is configured.
        if start_pattern.is_none() || is_row_start || !buffer.is_empty() {
            join_line(&mut buffer, trimmed);
        }
    }

    flush_row(&mut buffer, &mut rows, &data_fields, &context, block.min_score, mappings);

    debug!("context extraction complete: {} rows", rows.len());
    rows
}

/// Append a line to the row buffer, inserting a single joining space unless
/// one side already carries whitespace.
fn join_line(buffer: &mut String, line: &str) {
    if let (Some(last), Some(first)) = (buffer.chars().last(), line.chars().next()) {
        if last.is_alphanumeric() && first.is_alphanumeric() {
            buffer.push(' ');
        } else if last != ' ' && first != ' ' {
            buffer.push(' ');
        }
    }
    buffer.push_str(line);
}

/// Finalize the buffered text as a data row under the given context.
fn flush_row(
    buffer: &mut String,
    rows: &mut Vec<ExtractedRow>,
    data_fields: &[&CompiledField<'_>],
    context: &IndexMap<String, FieldValue>,
    min_score: i32,
    mappings: &MappingTables,
) {
    if buffer.is_empty() {
        return;
    }

    let text = buffer.trim().to_string();
    buffer.clear();

    // Obvious non-data lines never become rows.
    if text.chars().count() < 3 || is_header_line(&text) || is_footer_line(&text) {
        trace!("skipped non-data line: {}", text);
        return;
    }

    let mut row = extract_row(&text, data_fields, mappings);
    derive_fct(&mut row);
    let score = row.score();

    // Merge a snapshot of the active context; context carries no score.
    for (name, value) in context {
        row.insert(name.clone(), value.clone());
    }

    let has_data = row.len() > context.len() || row.contains_field("amount");

    if has_data && score >= min_score {
        debug!("extracted row with score {}", score);
        rows.push(row);
    } else {
        trace!(
            "skipped row (score={}, min={}, has_data={}): {}",
            score, min_score, has_data, text
        );
    }
}

/// Built-in derived rule: fct = spots * duration when both are positive
/// and fct itself was not extracted.
fn derive_fct(row: &mut ExtractedRow) {
    if row.contains_field("fct") {
        return;
    }
    let (Some(spots), Some(duration)) = (row.get_integer("spots"), row.get_integer("duration"))
    else {
        return;
    };
    if spots > 0 && duration > 0 {
        trace!("calculated fct = {} * {}", spots, duration);
        row.insert("fct", FieldValue::Integer(spots * duration));
    }
}
