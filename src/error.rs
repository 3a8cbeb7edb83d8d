/// Error types for the catalog engine
///
/// Callers need to tell a bad request apart from a store that is temporarily
/// unavailable, so every failure lands in exactly one of those buckets
/// (see [`CatalogError::is_retryable`]). "No results" is never an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed facet set or engagement call, rejected before touching the store
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store could not be reached (poisoned lock, background task lost)
    #[error("Catalog temporarily unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// True for infrastructure failures the caller may retry.
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::Store(_) | CatalogError::Unavailable(_) | CatalogError::Io(_)
        )
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_not_retryable() {
        let err = CatalogError::validation("unknown sort mode 'random'");
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Invalid request: unknown sort mode 'random'");
    }

    #[test]
    fn test_store_failure_is_retryable() {
        let err: CatalogError = rusqlite::Error::InvalidQuery.into();
        assert!(err.is_retryable());
        assert!(CatalogError::Unavailable("lock poisoned".into()).is_retryable());
        assert!(!CatalogError::NotFound("photo 7".into()).is_retryable());
    }
}
