//! Error taxonomy for the item pipeline

/// Failure reported by a stage function
///
/// Either variant maps the item to terminal state `Failed`; the
/// scheduler never retries a failed item, even when it scrolls back
/// into view.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StageError {
    /// Stage 1 could not produce raw content
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Stage 2 could not transform the raw content
    #[error("processing failed: {0}")]
    Transform(String),
}

/// Failure parsing a catalog document
///
/// Catalog-load failure is a collaborator concern: it never reaches
/// the scheduler, which simply ends up with zero item records.
/// Individual malformed entries do not produce this error — they are
/// skipped during parsing.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The document is not valid JSON
    #[error("catalog is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document parsed, but is not an array of entries
    #[error("catalog must be a JSON array of entries")]
    NotAnArray,
}
