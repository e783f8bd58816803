//! Tenant profile entities.
//!
//! A tenant profile is the aggregate root for everything the engine needs
//! to classify and extract one invoice format. All of it is plain data:
//! mutated only by an external administration process, read-only during
//! extraction.

use serde::{Deserialize, Serialize};

/// Whether a tenant participates in classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl Default for TenantStatus {
    fn default() -> Self {
        TenantStatus::Active
    }
}

/// One invoice format: identification rules plus extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantProfile {
    /// Stable key, e.g. 'TV', 'RADIO_MIRCHI'.
    pub tenant_key: String,
    /// Human-readable name, e.g. 'TV Invoice'.
    pub display_name: String,
    #[serde(default)]
    pub status: TenantStatus,
    /// Classification rules. Each match contributes its weight additively.
    #[serde(default)]
    pub identifiers: Vec<IdentifierRule>,
    /// Field definitions across all blocks.
    #[serde(default)]
    pub field_defs: Vec<FieldDef>,
    /// Per-block segmentation and acceptance configuration.
    #[serde(default)]
    pub block_configs: Vec<BlockConfig>,
    /// Derived-field calculations across all blocks.
    #[serde(default)]
    pub calculations: Vec<FieldCalculation>,
}

impl TenantProfile {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// A classification rule: pattern found anywhere in the document text adds
/// its weight to the tenant's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierRule {
    pub pattern: String,
    pub weight: i32,
}

/// Declared type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Real,
    /// Dates are kept verbatim as text, without format normalization.
    Date,
}

/// Configuration for one extractable field.
///
/// (block_name, field_name) is unique per tenant. Patterns are evaluated
/// in list order and the first non-blank capture wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Block this field belongs to, e.g. 'invoice', 'summary'.
    pub block_name: String,
    pub field_name: String,
    pub field_type: FieldType,
    /// Ordered list of regex rules, each with one capturing group.
    pub patterns: Vec<String>,
    /// Contribution to the row's acceptance score when matched.
    pub weight: i32,
    /// A row missing this field is discarded.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    /// Controls extraction and row-start-detection priority within a block.
    #[serde(default)]
    pub sort_order: i32,
    /// Context fields persist across rows instead of belonging to one row.
    #[serde(default)]
    pub is_context: bool,
    /// A context-opening field: its detection starts a new scope and forces
    /// any buffered row to be finalized first. Only meaningful when
    /// `is_context` is set.
    #[serde(default)]
    pub context_reset_on_match: bool,
    /// Mapping type to normalize captured codes through, e.g. 'CITY'.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_mapping: Option<String>,
}

/// How a block's text is divided into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMode {
    /// The whole document is one segment.
    Global,
    /// Segments are delimited by the block's start pattern.
    LineSplit,
}

/// Segmentation and acceptance configuration for one block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    pub block_name: String,
    pub mode: BlockMode,
    /// Start-of-segment (or start-of-row) pattern. Optional for Global mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_pattern: Option<String>,
    /// Minimum acceptance score for a row of this block.
    #[serde(default)]
    pub min_score: i32,
    /// Allow an external machine-readable-code decoder to supply a summary
    /// amount for this block.
    #[serde(default)]
    pub fallback_enabled: bool,
}

/// Kind of a derived-field calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcKind {
    /// Product of all source values.
    Multiply,
    /// Sum of all source values.
    Add,
    /// First minus the sum of the rest.
    Subtract,
    /// First divided by each following value, left to right.
    Divide,
    /// First times second, divided by 100.
    Percentage,
    /// Arbitrary formula with `{fieldName}` placeholders.
    Custom,
}

/// Numeric type of a calculation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Integer,
    Real,
}

impl Default for ResultType {
    fn default() -> Self {
        ResultType::Real
    }
}

/// A configured derived-field calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCalculation {
    pub block_name: String,
    pub target_field: String,
    pub kind: CalcKind,
    /// Field names the calculation reads. All must be present and numeric.
    pub source_fields: Vec<String>,
    /// Formula string, only used by [`CalcKind::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub result_type: ResultType,
    /// Leave an already-extracted target field untouched.
    #[serde(default = "default_true")]
    pub apply_only_if_missing: bool,
    /// Lower priority runs first.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    10
}

/// Maps an uppercase code to its canonical display string, per tenant and
/// mapping type (e.g. 'CITY' codes to city names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeMapping {
    pub tenant_key: String,
    pub mapping_type: String,
    pub code: String,
    pub display_name: String,
}
