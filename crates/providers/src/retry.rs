//! Provider retry: bounded re-attempts with per-attempt timeouts.
//!
//! Wraps a single provider. A transient failure (timeout, rate limit,
//! network, 5xx) gets one more attempt after a backoff; anything else is
//! returned on the first failure.

use async_trait::async_trait;
use pricelens_core::error::ProviderError;
use pricelens_core::provider::*;
use pricelens_core::retry::RetryPolicy;
use std::sync::Arc;

/// A provider that retries its inner provider under a [`RetryPolicy`].
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let label = format!("{} completion", self.inner.name());
        self.policy
            .run(&label, || self.inner.complete(request.clone()))
            .await
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        RetryPolicy::once(self.policy.timeout())
            .run("health check", || self.inner.health_check())
            .await
    }
}
