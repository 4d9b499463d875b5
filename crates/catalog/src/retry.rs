//! Catalog retry: each page fetch runs under a [`RetryPolicy`].

use async_trait::async_trait;
use pricelens_core::catalog::{CatalogPage, CatalogQuery, PriceCatalog};
use pricelens_core::error::CatalogError;
use pricelens_core::retry::RetryPolicy;
use std::sync::Arc;

/// A catalog that retries its inner catalog page by page.
pub struct RetryingCatalog {
    inner: Arc<dyn PriceCatalog>,
    policy: RetryPolicy,
}

impl RetryingCatalog {
    pub fn new(inner: Arc<dyn PriceCatalog>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl PriceCatalog for RetryingCatalog {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_products(
        &self,
        query: &CatalogQuery,
        next_token: Option<&str>,
    ) -> Result<CatalogPage, CatalogError> {
        let label = format!("{} GetProducts", self.inner.name());
        self.policy
            .run(&label, || self.inner.get_products(query, next_token))
            .await
    }

    async fn health_check(&self) -> Result<bool, CatalogError> {
        RetryPolicy::once(self.policy.timeout())
            .run("catalog health check", || self.inner.health_check())
            .await
    }
}
