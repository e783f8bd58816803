//! Shared pattern matcher over ordered rule lists.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Compiled pattern rules for one field.
///
/// Rules are kept in configuration order; malformed patterns are dropped
/// at compile time with a logged warning so a single bad rule never aborts
/// extraction.
#[derive(Debug)]
pub struct FieldMatcher {
    rules: Vec<Regex>,
}

impl FieldMatcher {
    pub fn compile(field_name: &str, patterns: &[String]) -> Self {
        let mut rules = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            // DOTALL so a capture can span line breaks in multi-line rows.
            match RegexBuilder::new(pattern)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .multi_line(true)
                .build()
            {
                Ok(re) => rules.push(re),
                Err(e) => {
                    warn!("invalid pattern for field '{}': {} ({})", field_name, pattern, e);
                }
            }
        }

        Self { rules }
    }

    /// First non-blank captured value, or `None`.
    ///
    /// The full rule list is tried against the text as given; only once it
    /// is exhausted is the whole list retried against a whitespace-normalized
    /// copy, so layout noise never reorders rule priority.
    pub fn first_capture(&self, text: &str) -> Option<String> {
        let normalized = normalize_whitespace(text);

        for candidate in [text, normalized.as_str()] {
            for re in &self.rules {
                let Some(caps) = re.captures(candidate) else {
                    continue;
                };
                let Some(group) = caps.get(1) else {
                    continue;
                };

                let value = clean_capture(group.as_str());
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }

        None
    }

    /// Whether any rule matches the text at all, captures aside.
    pub fn is_match(&self, text: &str) -> bool {
        self.rules.iter().any(|re| re.is_match(text))
    }
}

/// Compile a block start pattern, or `None` when absent or malformed.
pub(crate) fn compile_start_pattern(pattern: Option<&str>) -> Option<Regex> {
    let pattern = pattern?.trim();
    if pattern.is_empty() {
        return None;
    }

    match RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("invalid start pattern: {} ({})", pattern, e);
            None
        }
    }
}

/// Collapse all whitespace runs to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip embedded thousands separators and normalize spacing in a capture.
fn clean_capture(raw: &str) -> String {
    normalize_whitespace(&raw.replace(',', ""))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn matcher(patterns: &[&str]) -> FieldMatcher {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        FieldMatcher::compile("test", &patterns)
    }

    #[test]
    fn test_first_pattern_in_list_order_wins() {
        let m = matcher(&[r"Rate:\s*(\d+)", r"(\d+)"]);

        // The second pattern would capture "100" from the start of the
        // line, but the first rule takes priority.
        assert_eq!(m.first_capture("100 spots Rate: 73"), Some("73".to_string()));
    }

    #[test]
    fn test_blank_capture_falls_through_to_next_rule() {
        let m = matcher(&[r"Rate:(\s*)", r"Rate:\s*(\d+)"]);

        assert_eq!(m.first_capture("Rate: 73"), Some("73".to_string()));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let m = matcher(&[r"amount:\s*(\d+)"]);

        assert_eq!(m.first_capture("AMOUNT: 500"), Some("500".to_string()));
    }

    #[test]
    fn test_normalized_pass_runs_after_raw_list_is_exhausted() {
        // Single spaces in the pattern only line up after whitespace runs
        // are collapsed.
        let m = matcher(&[r"Grand Total (\d+)"]);

        assert_eq!(
            m.first_capture("Grand   Total\t 4200"),
            Some("4200".to_string())
        );
    }

    #[test]
    fn test_capture_spans_newlines() {
        let m = matcher(&[r"Programme:\s*(.+?)\s*Rate"]);

        assert_eq!(
            m.first_capture("Programme: Morning\nShow Rate 50"),
            Some("Morning Show".to_string())
        );
    }

    #[test]
    fn test_thousands_separators_removed() {
        let m = matcher(&[r"Amount:\s*([\d,]+\.\d{2})"]);

        assert_eq!(
            m.first_capture("Amount: 3,289.50"),
            Some("3289.50".to_string())
        );
    }

    #[test]
    fn test_invalid_rule_is_skipped() {
        let m = matcher(&[r"([", r"Amount:\s*(\d+)"]);

        assert_eq!(m.first_capture("Amount: 42"), Some("42".to_string()));
    }

    #[test]
    fn test_no_match_returns_none() {
        let m = matcher(&[r"Amount:\s*(\d+)"]);

        assert_eq!(m.first_capture("nothing here"), None);
    }

    #[test]
    fn test_is_match_ignores_captures() {
        let m = matcher(&[r"^\d{2}:\d{2}"]);

        assert!(m.is_match("07:00-11:00 30 24"));
        assert!(!m.is_match("MUMBAI"));
    }
}
