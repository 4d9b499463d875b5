//! AWS Price List Query API client.
//!
//! Calls `GetProducts` over the JSON 1.1 protocol with SigV4 signing. The
//! API publishes each product as a JSON document embedded in a string; those
//! are decoded here so callers see plain `serde_json::Value` entries.

use crate::sigv4::{Credentials, SigV4Signer, SignableRequest};
use async_trait::async_trait;
use pricelens_core::catalog::{CatalogPage, CatalogQuery, PriceCatalog};
use pricelens_core::error::CatalogError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const TARGET_PREFIX: &str = "AWSPriceListService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SIGNING_SERVICE: &str = "pricing";

/// Hard cap the API places on `MaxResults`.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A catalog backed by the AWS Price List Query API.
pub struct AwsPricingCatalog {
    endpoint: String,
    host: String,
    signer: SigV4Signer,
    page_size: u32,
    client: reqwest::Client,
}

impl AwsPricingCatalog {
    /// Create a client for the Price List endpoint in `endpoint_region`.
    pub fn new(
        endpoint_region: &str,
        credentials: Credentials,
        page_size: u32,
        timeout: Duration,
    ) -> Self {
        let host = format!("api.pricing.{endpoint_region}.amazonaws.com");
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            endpoint: format!("https://{host}/"),
            host,
            signer: SigV4Signer::new(credentials, endpoint_region, SIGNING_SERVICE),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the `GetProducts` request body.
    fn request_body(
        query: &CatalogQuery,
        next_token: Option<&str>,
        page_size: u32,
    ) -> serde_json::Value {
        let filters: Vec<serde_json::Value> = query
            .all_filters()
            .map(|f| {
                serde_json::json!({
                    "Type": "TERM_MATCH",
                    "Field": f.field,
                    "Value": f.value,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "ServiceCode": query.service_code,
            "Filters": filters,
            "FormatVersion": "aws_v1",
            "MaxResults": page_size,
        });

        if let Some(token) = next_token {
            body["NextToken"] = serde_json::json!(token);
        }

        body
    }

    /// Decode a `GetProducts` response into a page.
    fn parse_page(response: ApiGetProductsResponse) -> Result<CatalogPage, CatalogError> {
        let entries = response
            .price_list
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(doc) => serde_json::from_str(&doc).map_err(|e| {
                    CatalogError::MalformedResponse(format!("price list entry is not JSON: {e}"))
                }),
                other @ serde_json::Value::Object(_) => Ok(other),
                other => Err(CatalogError::MalformedResponse(format!(
                    "unexpected price list entry: {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CatalogPage {
            entries,
            next_token: response.next_token.filter(|t| !t.is_empty()),
        })
    }

    /// Classify a non-200 response.
    fn map_error(status: u16, body: &str) -> CatalogError {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        let (kind, message) = parsed
            .map(|e| {
                let kind = e.kind.rsplit('#').next().unwrap_or_default().to_string();
                (kind, e.message.unwrap_or_default())
            })
            .unwrap_or_else(|| (String::new(), body.to_string()));

        match kind.as_str() {
            "ThrottlingException" | "RequestLimitExceeded" => CatalogError::Throttled(message),
            "UnrecognizedClientException"
            | "InvalidSignatureException"
            | "AccessDeniedException"
            | "ExpiredTokenException"
            | "MissingAuthenticationTokenException" => CatalogError::AuthenticationFailed(message),
            _ if status == 429 => CatalogError::Throttled(message),
            _ if status == 401 || status == 403 => CatalogError::AuthenticationFailed(message),
            _ => CatalogError::ApiError {
                status_code: status,
                message: if kind.is_empty() {
                    message
                } else {
                    format!("{kind}: {message}")
                },
            },
        }
    }

    /// Sign and send one JSON 1.1 call.
    async fn call(&self, operation: &str, body: &serde_json::Value) -> Result<String, CatalogError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| CatalogError::MalformedResponse(format!("request encoding: {e}")))?;
        let target = format!("{TARGET_PREFIX}.{operation}");

        let signed = self.signer.sign(
            &SignableRequest {
                method: "POST",
                path: "/",
                query: "",
                headers: vec![
                    ("content-type", CONTENT_TYPE),
                    ("host", self.host.as_str()),
                    ("x-amz-target", target.as_str()),
                ],
                body: &payload,
            },
            chrono::Utc::now(),
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", &target)
            .header("X-Amz-Date", &signed.amz_date)
            .header("Authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request.body(payload).send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout(e.to_string())
            } else {
                CatalogError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if status != 200 {
            warn!(status, operation, body = %text, "Price list API returned error");
            return Err(Self::map_error(status, &text));
        }

        Ok(text)
    }
}

#[async_trait]
impl PriceCatalog for AwsPricingCatalog {
    fn name(&self) -> &str {
        "aws-pricing"
    }

    async fn get_products(
        &self,
        query: &CatalogQuery,
        next_token: Option<&str>,
    ) -> Result<CatalogPage, CatalogError> {
        debug!(
            service = %query.service_code,
            filters = query.filters.len(),
            continued = next_token.is_some(),
            "GetProducts"
        );

        let body = Self::request_body(query, next_token, self.page_size);
        let text = self.call("GetProducts", &body).await?;
        let response: ApiGetProductsResponse = serde_json::from_str(&text)
            .map_err(|e| CatalogError::MalformedResponse(e.to_string()))?;

        Self::parse_page(response)
    }

    async fn health_check(&self) -> Result<bool, CatalogError> {
        let body = serde_json::json!({
            "ServiceCode": "AmazonEC2",
            "FormatVersion": "aws_v1",
            "MaxResults": 1,
        });
        self.call("DescribeServices", &body).await.map(|_| true)
    }
}

// --- Price List API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiGetProductsResponse {
    #[serde(rename = "PriceList", default)]
    price_list: Vec<serde_json::Value>,
    #[serde(rename = "NextToken", default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}
