//! Error types for the PriceLens domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each outbound collaborator has its own error enum so a failure can never
//! be mistaken for one coming from the other service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a language-completion provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors from a pricing catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Catalog throttled the request: {0}")]
    Throttled(String),

    #[error("Catalog authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Catalog not configured: {0}")]
    NotConfigured(String),

    #[error("Catalog request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("Catalog repeated continuation token: {0}")]
    PaginationLoop(String),
}

/// The error kinds a query can surface, named the way they appear on the wire.
///
/// Only `ExtractionUnavailable` and `CatalogUnavailable` are fatal for a
/// query. The others are recovered inside the pipeline and show up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExtractionUnavailable,
    ExtractionMalformed,
    NormalizationMiss,
    CatalogUnavailable,
    NoMatch,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractionUnavailable => "extraction_unavailable",
            Self::ExtractionMalformed => "extraction_malformed",
            Self::NormalizationMiss => "normalization_miss",
            Self::CatalogUnavailable => "catalog_unavailable",
            Self::NoMatch => "no_match",
        }
    }

    /// Whether this kind ends the query without an answer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ExtractionUnavailable | Self::CatalogUnavailable)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
