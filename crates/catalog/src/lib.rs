//! Price-list catalog clients for PriceLens.
//!
//! All catalogs implement the `pricelens_core::PriceCatalog` trait.
//! [`build_from_config`] picks the live AWS client or a local fixture and
//! applies the configured retry policy.

pub mod aws;
pub mod retry;
pub mod sigv4;
pub mod static_catalog;

pub use aws::AwsPricingCatalog;
pub use retry::RetryingCatalog;
pub use sigv4::{Credentials, SigV4Signer};
pub use static_catalog::StaticCatalog;

use pricelens_config::CatalogConfig;
use pricelens_core::catalog::PriceCatalog;
use pricelens_core::error::CatalogError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured catalog, wrapped in its retry policy.
pub fn build_from_config(config: &CatalogConfig) -> Result<Arc<dyn PriceCatalog>, CatalogError> {
    let inner: Arc<dyn PriceCatalog> = match &config.fixture_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Serving prices from local fixture");
            Arc::new(StaticCatalog::from_file(path)?.with_page_size(config.page_size as usize))
        }
        None => {
            let (Some(access_key_id), Some(secret_access_key)) =
                (&config.access_key_id, &config.secret_access_key)
            else {
                return Err(CatalogError::NotConfigured(
                    "AWS credentials missing (set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY)"
                        .into(),
                ));
            };

            Arc::new(AwsPricingCatalog::new(
                &config.endpoint_region,
                Credentials {
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                    session_token: config.session_token.clone(),
                },
                config.page_size,
                Duration::from_secs(config.timeout_secs),
            ))
        }
    };

    Ok(Arc::new(RetryingCatalog::new(inner, config.retry_policy())))
}
