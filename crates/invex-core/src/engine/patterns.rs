//! Fixed heuristic patterns shared by the extraction strategies.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Table headers: generic column vocabulary in combination.
    pub static ref HEADER_VOCAB: Regex = Regex::new(
        r"(?i)\b(invoice|date|time|serial|s\.?no|sr\.?no|description)\b.*\b(rate|amount|spots|duration|programme)\b"
    ).unwrap();

    pub static ref HEADER_LEAD: Regex = Regex::new(
        r"(?i)^(date|sr\s*no|time|programme|description|rate|amount|spots|duration)"
    ).unwrap();

    // Footers: pagination or disclaimer boilerplate.
    pub static ref FOOTER_PAGINATION: Regex = Regex::new(
        r"(?i)\bpage\s+\d+\s+of\s+\d+"
    ).unwrap();

    pub static ref FOOTER_BOILERPLATE: Regex = Regex::new(
        r"(?i)^(this|computer|system|generated|authorized|signatory)"
    ).unwrap();

    // Text preprocessing.
    pub static ref SPACE_RUNS: Regex = Regex::new(r"[ \t]+").unwrap();
    pub static ref BLANK_RUNS: Regex = Regex::new(r"\n\s*\n\s*\n").unwrap();
    pub static ref ZERO_WIDTH: Regex = Regex::new(r"[\x{200B}-\x{200D}\x{FEFF}]").unwrap();
}

/// Lines announcing totals never participate in rows or context.
const TOTAL_INDICATORS: &[&str] = &["sub total", "sub-total", "subtotal", "grand total"];

pub(crate) fn is_total_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    TOTAL_INDICATORS.iter().any(|t| lower.contains(t))
}

pub(crate) fn is_header_line(text: &str) -> bool {
    HEADER_VOCAB.is_match(text) || (HEADER_LEAD.is_match(text) && text.chars().count() < 80)
}

pub(crate) fn is_footer_line(text: &str) -> bool {
    FOOTER_PAGINATION.is_match(text)
        || (FOOTER_BOILERPLATE.is_match(text) && text.chars().count() < 100)
}
