//! Top-level extraction orchestrator.
//!
//! The only place that wires classification, the engine and the optional
//! summary-amount fallback together. Every terminating condition maps to a
//! result status; no failure escapes as a panic.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::classify::TenantClassifier;
use crate::config::{ConfigCache, TenantProfile};
use crate::engine::{ExtractionEngine, MappingTables};
use crate::error::ExtractionError;
use crate::models::ExtractionResult;

/// Independent machine-readable-code decoder that may supply a single
/// summary amount. It never participates in block or row logic.
pub trait SummaryAmountSource: Send + Sync {
    fn decode_amount(&self, text: &str) -> Option<Decimal>;
}

/// Stateless per-call extraction service over a shared configuration cache.
pub struct ExtractionService {
    config: Arc<ConfigCache>,
    classifier: TenantClassifier,
    engine: ExtractionEngine,
    fallback: Option<Arc<dyn SummaryAmountSource>>,
}

impl ExtractionService {
    pub fn new(config: Arc<ConfigCache>) -> Self {
        Self {
            config,
            classifier: TenantClassifier::new(),
            engine: ExtractionEngine::new(),
            fallback: None,
        }
    }

    /// Attach a summary-amount fallback decoder.
    pub fn with_fallback(mut self, source: Arc<dyn SummaryAmountSource>) -> Self {
        self.fallback = Some(source);
        self
    }

    /// Run one full extraction over already line-oriented document text.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        if text.trim().is_empty() {
            return ExtractionResult::empty(ExtractionError::EmptyDocument.to_string());
        }

        let profiles = match self.config.active_profiles() {
            Ok(profiles) => profiles,
            Err(e) => return ExtractionResult::error(e.to_string()),
        };

        let Some(matched) = self.classifier.identify(text, &profiles) else {
            return ExtractionResult::error(ExtractionError::NoTenantMatch.to_string());
        };

        info!(
            "extracting with tenant {} (score {})",
            matched.profile.tenant_key, matched.score
        );

        let mappings = self.mapping_tables(matched.profile);
        let mut result = self.engine.extract(text, matched.profile, &mappings);

        if matched.profile.block_configs.iter().any(|b| b.fallback_enabled) {
            if let Some(source) = &self.fallback {
                result.fallback_amount = source.decode_amount(text);
            }
        }

        result
    }

    /// Fetch the code-mapping tables for every mapping type the profile's
    /// field definitions reference.
    fn mapping_tables(&self, profile: &TenantProfile) -> MappingTables {
        let mut tables = MappingTables::new();

        for def in &profile.field_defs {
            let Some(mapping_type) = &def.code_mapping else {
                continue;
            };
            if tables.contains_key(mapping_type) {
                continue;
            }

            match self.config.code_mappings(&profile.tenant_key, mapping_type) {
                Ok(table) => {
                    tables.insert(mapping_type.clone(), table);
                }
                Err(e) => warn!(
                    "failed to load '{}' mappings for tenant {}: {}",
                    mapping_type, profile.tenant_key, e
                ),
            }
        }

        tables
    }
}
