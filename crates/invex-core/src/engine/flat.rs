//! Flat segmentation strategy for blocks without context fields.

use tracing::{debug, trace};

use crate::config::{BlockConfig, BlockMode};
use crate::models::ExtractedRow;

use super::matcher::compile_start_pattern;
use super::{extract_row, CompiledField, MappingTables};

/// Safety limit: a missing start match must not swallow the document.
const MAX_SEGMENT_LINES: usize = 50;

/// Segment the block text, evaluate every field per segment, keep rows
/// that clear the minimum score and carry all required fields.
pub(crate) fn extract_flat(
    text: &str,
    block: &BlockConfig,
    fields: &[CompiledField<'_>],
    mappings: &MappingTables,
) -> Vec<ExtractedRow> {
    let segments = segment_text(text, block);
    let field_refs: Vec<&CompiledField<'_>> = fields.iter().collect();
    let mut rows = Vec::new();

    debug!("flat extraction: {} segments to process", segments.len());

    for segment in &segments {
        let row = extract_row(segment, &field_refs, mappings);
        let score = row.score();

        if score >= block.min_score && passes_required_check(&row, fields) {
            trace!("extracted row with score {}", score);
            rows.push(row);
        }
    }

    rows
}

/// Divide the block's text into segments.
///
/// Global mode (or a missing start pattern) yields the whole text as one
/// segment. LineSplit closes the buffered segment whenever a line matches
/// the start pattern, and force-closes oversized segments.
fn segment_text(text: &str, block: &BlockConfig) -> Vec<String> {
    if block.mode == BlockMode::Global {
        return vec![text.to_string()];
    }

    let Some(start_pattern) = compile_start_pattern(block.start_pattern.as_deref()) else {
        return vec![text.to_string()];
    };

    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut lines_in_segment = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let is_segment_start = start_pattern.is_match(trimmed);

        if is_segment_start && !buffer.is_empty() {
            segments.push(std::mem::take(&mut buffer));
            lines_in_segment = 0;
        }

        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(trimmed);
        lines_in_segment += 1;

        if lines_in_segment >= MAX_SEGMENT_LINES && !is_segment_start {
            segments.push(std::mem::take(&mut buffer));
            lines_in_segment = 0;
        }
    }

    if !buffer.is_empty() {
        segments.push(buffer);
    }

    debug!(
        "segmented text into {} segments using pattern: {:?}",
        segments.len(),
        block.start_pattern
    );

    segments
}

fn passes_required_check(row: &ExtractedRow, fields: &[CompiledField<'_>]) -> bool {
    fields
        .iter()
        .all(|f| !f.def.required || row.contains_field(&f.def.field_name))
}
