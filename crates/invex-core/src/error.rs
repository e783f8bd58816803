//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Configuration loading or lookup error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to tenant configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration source.
    #[error("failed to read configuration: {0}")]
    Read(String),

    /// Failed to parse configuration data.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A lookup referenced a tenant that does not exist.
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),
}

/// Errors related to invoice extraction.
///
/// Only terminating conditions live here. Malformed patterns, unparseable
/// values and failed calculations are recovered locally and never surface
/// as errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No tenant profile scored above zero against the document.
    #[error("could not identify invoice type: no tenant matched")]
    NoTenantMatch,

    /// The document contained no extractable text.
    #[error("document contains no extractable text")]
    EmptyDocument,
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
