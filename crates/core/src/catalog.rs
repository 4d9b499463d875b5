//! PriceCatalog trait: the abstraction over a paginated price list.
//!
//! A catalog answers one filtered query a page at a time. Each page carries
//! raw price-list entries (untyped JSON, the way the catalog publishes them)
//! and a continuation token while more pages remain. Shaping entries into
//! pricing records is the caller's job.

use crate::error::CatalogError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An exact-match filter on one product attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub field: String,
    pub value: String,
}

impl CatalogFilter {
    pub fn term_match(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A filtered search over one service's price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Catalog service code (e.g. "AmazonEC2")
    pub service_code: String,

    /// Filters derived from the caller's parameters
    pub filters: Vec<CatalogFilter>,

    /// Fixed filters that narrow the search to the product family the caller
    /// prices; sent alongside `filters` but never derived from user input
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<CatalogFilter>,
}

impl CatalogQuery {
    pub fn new(service_code: impl Into<String>, filters: Vec<CatalogFilter>) -> Self {
        Self {
            service_code: service_code.into(),
            filters,
            scope: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: Vec<CatalogFilter>) -> Self {
        self.scope = scope;
        self
    }

    /// Every filter the catalog should apply, user-derived first.
    pub fn all_filters(&self) -> impl Iterator<Item = &CatalogFilter> {
        self.filters.iter().chain(self.scope.iter())
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Raw price-list entries in catalog order
    pub entries: Vec<serde_json::Value>,

    /// Present while more pages remain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// The core PriceCatalog trait.
#[async_trait]
pub trait PriceCatalog: Send + Sync {
    /// A human-readable name for this catalog (e.g., "aws-pricing").
    fn name(&self) -> &str;

    /// Fetch one page. `next_token` is `None` for the first page.
    async fn get_products(
        &self,
        query: &CatalogQuery,
        next_token: Option<&str>,
    ) -> Result<CatalogPage, CatalogError>;

    /// Health check: can we reach the catalog?
    async fn health_check(&self) -> Result<bool, CatalogError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_filters_puts_user_filters_first() {
        let query = CatalogQuery::new(
            "AmazonEC2",
            vec![CatalogFilter::term_match("instanceType", "t2.micro")],
        )
        .with_scope(vec![CatalogFilter::term_match("tenancy", "Shared")]);

        let fields: Vec<&str> = query.all_filters().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["instanceType", "tenancy"]);
    }

    #[test]
    fn page_without_token_is_last() {
        let page: CatalogPage = serde_json::from_str(r#"{"entries":[]}"#).unwrap();
        assert!(page.next_token.is_none());
    }
}
