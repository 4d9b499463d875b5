//! Pipeline error types.

use pricelens_core::error::{CatalogError, ErrorKind, ProviderError};
use thiserror::Error;

/// A failure that ends a query without an answer.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("parameter extraction unavailable: {0}")]
    ExtractionUnavailable(#[source] ProviderError),

    #[error("pricing catalog unavailable: {0}")]
    CatalogUnavailable(#[source] CatalogError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtractionUnavailable(_) => ErrorKind::ExtractionUnavailable,
            Self::CatalogUnavailable(_) => ErrorKind::CatalogUnavailable,
        }
    }
}

/// The completion came back in a shape the extractor cannot use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionMalformed {
    #[error("completion did not call {0}")]
    NoToolCall(String),

    #[error("tool arguments are not valid JSON: {0}")]
    InvalidJson(String),

    #[error("tool arguments are not a JSON object: {0}")]
    NotAnObject(String),
}

impl ExtractionMalformed {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExtractionMalformed
    }
}

/// Why a pipeline could not be assembled from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("completion provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("pricing catalog: {0}")]
    Catalog(#[from] CatalogError),
}
