//! Core library for configuration-driven invoice extraction.
//!
//! This crate provides:
//! - Tenant classification by weighted identifier-pattern scoring
//! - A rule-driven extraction engine with two strategies: flat
//!   segmentation and a context-aware line scan
//! - Derived-field calculations, including custom arithmetic formulas
//! - Tenant configuration entities with a cached store seam
//!
//! All extraction behavior is driven by live tenant configuration; there
//! is no per-format code.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod service;

pub use classify::{TenantClassifier, TenantMatch};
pub use config::{
    BlockConfig, BlockMode, CalcKind, CodeMapping, ConfigCache, ConfigFile, ConfigStore,
    FieldCalculation, FieldDef, FieldType, IdentifierRule, InMemoryConfigStore, JsonConfigStore,
    ResultType, TenantProfile, TenantStatus,
};
pub use engine::{CalculationEvaluator, ExtractionEngine, MappingTables};
pub use error::{ConfigError, ExtractionError, InvexError, Result};
pub use models::{ExtractedRow, ExtractionResult, ExtractionStatus, FieldValue};
pub use service::{ExtractionService, SummaryAmountSource};
