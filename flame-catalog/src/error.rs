//! Error types for catalog access.

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog error types.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Course not known to the content source
    #[error("Course not found: {0}")]
    NotFound(String),

    /// Authored content could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Content source failed
    #[error("Content source error: {0}")]
    Source(String),
}
