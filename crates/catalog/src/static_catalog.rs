//! An in-memory catalog serving a fixed set of price-list entries.
//!
//! Applies `TERM_MATCH` filters against each entry's product attributes and
//! pages the matches the way the live API does. Used for offline runs and
//! throughout the test suites.

use async_trait::async_trait;
use pricelens_core::catalog::{CatalogPage, CatalogQuery, PriceCatalog};
use pricelens_core::error::CatalogError;
use std::sync::Mutex;
use std::time::Duration;

const TOKEN_PREFIX: &str = "offset:";

/// A catalog over a fixed list of entries.
pub struct StaticCatalog {
    entries: Vec<serde_json::Value>,
    page_size: usize,
    failure: Option<CatalogError>,
    delay: Option<Duration>,
    looping: bool,
    calls: Mutex<Vec<(CatalogQuery, Option<String>)>>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<serde_json::Value>) -> Self {
        Self {
            entries,
            page_size: 100,
            failure: None,
            delay: None,
            looping: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Load entries from a JSON array file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::NotConfigured(format!("cannot read {}: {e}", path.display()))
        })?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| CatalogError::MalformedResponse(format!("{}: {e}", path.display())))?;
        Ok(Self::new(entries))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: CatalogError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hand back the same continuation token forever.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Every `(query, token)` pair received so far.
    pub fn calls(&self) -> Vec<(CatalogQuery, Option<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn matches(entry: &serde_json::Value, query: &CatalogQuery) -> bool {
        let product = &entry["product"];
        query.all_filters().all(|filter| {
            product["attributes"]
                .get(&filter.field)
                .or_else(|| product.get(&filter.field))
                .and_then(|v| v.as_str())
                .is_some_and(|v| v == filter.value)
        })
    }

    fn offset(next_token: Option<&str>) -> Result<usize, CatalogError> {
        match next_token {
            None => Ok(0),
            Some(token) => token
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| CatalogError::ApiError {
                    status_code: 400,
                    message: format!("invalid NextToken: {token}"),
                }),
        }
    }
}

#[async_trait]
impl PriceCatalog for StaticCatalog {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_products(
        &self,
        query: &CatalogQuery,
        next_token: Option<&str>,
    ) -> Result<CatalogPage, CatalogError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((query.clone(), next_token.map(String::from)));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let matching: Vec<&serde_json::Value> = self
            .entries
            .iter()
            .filter(|entry| Self::matches(entry, query))
            .collect();

        let start = Self::offset(next_token)?.min(matching.len());
        let end = (start + self.page_size).min(matching.len());

        let next_token = if self.looping {
            Some(format!("{TOKEN_PREFIX}{start}"))
        } else if end < matching.len() {
            Some(format!("{TOKEN_PREFIX}{end}"))
        } else {
            None
        };

        Ok(CatalogPage {
            entries: matching[start..end].iter().map(|e| (*e).clone()).collect(),
            next_token,
        })
    }
}
