//! Tenant classification by weighted identifier scoring.

use regex::RegexBuilder;
use tracing::{debug, info, warn};

use crate::config::TenantProfile;

/// A classified tenant with the score that won it.
#[derive(Debug)]
pub struct TenantMatch<'a> {
    pub profile: &'a TenantProfile,
    pub score: i32,
}

/// Scores every active tenant profile against the document text and picks
/// the best match.
#[derive(Debug, Default)]
pub struct TenantClassifier;

impl TenantClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Returns the highest-scoring tenant, or `None` if no tenant scores
    /// above zero.
    ///
    /// Profiles are evaluated in ascending tenant-key order and a profile
    /// replaces the current best only on a strictly greater score, so ties
    /// deterministically keep the lexicographically first tenant.
    pub fn identify<'a>(
        &self,
        text: &str,
        profiles: &'a [TenantProfile],
    ) -> Option<TenantMatch<'a>> {
        let mut ordered: Vec<&TenantProfile> = profiles.iter().collect();
        ordered.sort_by(|a, b| a.tenant_key.cmp(&b.tenant_key));

        let mut best: Option<TenantMatch<'a>> = None;
        let mut best_score = 0;

        for profile in ordered {
            let score = self.score_profile(text, profile);
            debug!("tenant '{}' scored {} points", profile.tenant_key, score);

            if score > best_score {
                best_score = score;
                best = Some(TenantMatch { profile, score });
            }
        }

        match &best {
            Some(m) => info!(
                "identified tenant: {} (score: {})",
                m.profile.tenant_key, m.score
            ),
            None => warn!("no tenant matched the provided document"),
        }

        best
    }

    fn score_profile(&self, text: &str, profile: &TenantProfile) -> i32 {
        let mut total = 0;

        for identifier in &profile.identifiers {
            match RegexBuilder::new(&identifier.pattern)
                .case_insensitive(true)
                .build()
            {
                Ok(re) => {
                    if re.is_match(text) {
                        total += identifier.weight;
                    }
                }
                Err(e) => {
                    warn!(
                        "invalid identifier pattern for tenant {}: {} ({})",
                        profile.tenant_key, identifier.pattern, e
                    );
                }
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{IdentifierRule, TenantStatus};

    fn tenant(key: &str, rules: Vec<(&str, i32)>) -> TenantProfile {
        TenantProfile {
            tenant_key: key.to_string(),
            display_name: key.to_string(),
            status: TenantStatus::Active,
            identifiers: rules
                .into_iter()
                .map(|(pattern, weight)| IdentifierRule {
                    pattern: pattern.to_string(),
                    weight,
                })
                .collect(),
            field_defs: Vec::new(),
            block_configs: Vec::new(),
            calculations: Vec::new(),
        }
    }

    #[test]
    fn test_highest_score_wins() {
        let profiles = vec![
            tenant("A", vec![("INVOICE", 10)]),
            tenant("B", vec![("RECEIPT", 5)]),
        ];

        let matched = TenantClassifier::new()
            .identify("TAX INVOICE #123", &profiles)
            .unwrap();

        assert_eq!(matched.profile.tenant_key, "A");
        assert_eq!(matched.score, 10);
    }

    #[test]
    fn test_identifier_weights_are_additive() {
        let profiles = vec![
            tenant("A", vec![("INVOICE", 10)]),
            tenant("B", vec![("TAX", 6), ("INVOICE", 6)]),
        ];

        let matched = TenantClassifier::new()
            .identify("TAX INVOICE #123", &profiles)
            .unwrap();

        assert_eq!(matched.profile.tenant_key, "B");
        assert_eq!(matched.score, 12);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let profiles = vec![tenant("A", vec![("mirchi", 10)])];

        let matched = TenantClassifier::new()
            .identify("MUMBAI (MIRCHI 98.3 FM)", &profiles)
            .unwrap();

        assert_eq!(matched.score, 10);
    }

    #[test]
    fn test_zero_score_never_wins() {
        let profiles = vec![tenant("A", vec![("INVOICE", 10)])];

        assert!(TenantClassifier::new()
            .identify("completely unrelated text", &profiles)
            .is_none());
    }

    #[test]
    fn test_tie_keeps_first_tenant_by_key() {
        let profiles = vec![
            tenant("ZULU", vec![("INVOICE", 10)]),
            tenant("ALPHA", vec![("INVOICE", 10)]),
        ];

        let matched = TenantClassifier::new()
            .identify("INVOICE", &profiles)
            .unwrap();

        assert_eq!(matched.profile.tenant_key, "ALPHA");
    }

    #[test]
    fn test_invalid_pattern_contributes_nothing() {
        let profiles = vec![tenant("A", vec![("([", 50), ("INVOICE", 10)])];

        let matched = TenantClassifier::new()
            .identify("INVOICE", &profiles)
            .unwrap();

        assert_eq!(matched.score, 10);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let profiles = vec![
            tenant("A", vec![("INVOICE", 10)]),
            tenant("B", vec![("TAX", 10)]),
        ];
        let classifier = TenantClassifier::new();

        let first = classifier.identify("TAX INVOICE", &profiles).unwrap();
        for _ in 0..10 {
            let again = classifier.identify("TAX INVOICE", &profiles).unwrap();
            assert_eq!(again.profile.tenant_key, first.profile.tenant_key);
            assert_eq!(again.score, first.score);
        }
    }
}
