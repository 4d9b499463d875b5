//! HTTP query endpoint for PriceLens.
//!
//! Routes:
//! - `POST /api/query` with `{"query": "..."}` answers a pricing question
//! - `GET /health` for liveness checks
//!
//! Built on Axum. Layers applied to every route:
//! - CORS (any origin unless `gateway.allowed_origins` is set)
//! - Request body size limit (1 MB)
//! - In-memory rate limiting per client address
//! - HTTP trace logging

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use pricelens_config::{AppConfig, GatewayConfig};
use pricelens_pipeline::{BuildError, QueryPipeline};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

const BODY_LIMIT: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<QueryPipeline>,
}

type SharedState = Arc<GatewayState>;

/// Gateway startup failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("cannot build query pipeline: {0}")]
    Pipeline(#[from] BuildError),

    #[error("invalid CORS origin '{0}'")]
    InvalidOrigin(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the router with every route and layer.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Result<Router, GatewayError> {
    let cors = cors_layer(&config.allowed_origins)?;
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_per_minute,
        Duration::from_secs(60),
    ));

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route("/api/query", post(query_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http()))
}

/// Any origin when `allowed_origins` is empty, otherwise exactly those.
fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, GatewayError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| GatewayError::InvalidOrigin(o.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Start the gateway HTTP server. Returns after Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let pipeline = Arc::new(QueryPipeline::from_config(&config)?);
    let app = build_router(Arc::new(GatewayState { pipeline }), &config.gateway)?;

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down gateway");
        }
    })
    .await?;

    Ok(())
}

// --- Rate Limiter ---

/// In-memory sliding-window rate limiter keyed by client.
///
/// `std::sync::Mutex` is held only for the bookkeeping, never across an await.
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Record a request and report whether it is within the limit.
    fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Client key: the peer address when known, else the first forwarded
/// address, else "anonymous". `/health` is exempt.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let client_key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .or_else(|| {
            req.headers()
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&client_key) {
        warn!(client = %client_key, "Rate limit exceeded");
        return error_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
    }

    next.run(req).await
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

async fn query_handler(
    State(state): State<SharedState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected query body");
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    let Some(query) = request.query.filter(|q| !q.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "No query provided");
    };

    let outcome = state.pipeline.run(&query).await;
    let status = if outcome.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(outcome)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pricelens_catalog::StaticCatalog;
    use pricelens_core::error::{CatalogError, ProviderError};
    use pricelens_core::message::{Message, MessageToolCall};
    use pricelens_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use tower::ServiceExt;

    struct ArgsProvider(&'static str);

    #[async_trait]
    impl Provider for ArgsProvider {
        fn name(&self) -> &str {
            "args"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let mut message = Message::assistant("");
            message.tool_calls.push(MessageToolCall {
                id: "call_1".into(),
                name: "get_aws_price".into(),
                arguments: self.0.into(),
            });
            Ok(ProviderResponse {
                message,
                usage: None,
                model: "test".into(),
            })
        }
    }

    fn tokyo_entry() -> serde_json::Value {
        serde_json::json!({
            "product": {
                "sku": "SKU1",
                "productFamily": "Compute Instance",
                "attributes": {
                    "instanceType": "t2.micro",
                    "operatingSystem": "Linux",
                    "regionCode": "ap-northeast-1",
                    "tenancy": "Shared",
                    "capacitystatus": "Used",
                    "preInstalledSw": "NA"
                }
            },
            "terms": {"OnDemand": {"o": {"priceDimensions": {"d": {
                "unit": "Hrs",
                "pricePerUnit": {"USD": "0.0152000000"}
            }}}}}
        })
    }

    fn app_with(catalog: StaticCatalog, config: &GatewayConfig) -> Router {
        let pipeline = QueryPipeline::from_parts(
            Arc::new(ArgsProvider(r#"{"region":"Tokyo","os":"linux"}"#)),
            Arc::new(catalog),
            "m",
            false,
        );
        build_router(
            Arc::new(GatewayState {
                pipeline: Arc::new(pipeline),
            }),
            config,
        )
        .unwrap()
    }

    fn app(catalog: StaticCatalog) -> Router {
        app_with(catalog, &GatewayConfig::default())
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app(StaticCatalog::new(vec![])).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn answered_query() {
        let response = app(StaticCatalog::new(vec![tokyo_entry()]))
            .oneshot(post_query(r#"{"query":"Tokyo linux price"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "answered");
        assert_eq!(body["query"], "Tokyo linux price");
        assert_eq!(body["parameters"]["region"], "ap-northeast-1");
        assert_eq!(body["pricing_data"][0]["instanceType"], "t2.micro");
        assert_eq!(body["pricing_data"][0]["unit"], "USD per Hour");
        assert!(body["response"].as_str().unwrap().contains("0.0152"));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        for body in [r#"{"query":"   "}"#, r#"{}"#] {
            let response = app(StaticCatalog::new(vec![]))
                .oneshot(post_query(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "No query provided");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let response = app(StaticCatalog::new(vec![]))
            .oneshot(post_query("not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn catalog_outage_is_503() {
        let catalog =
            StaticCatalog::new(vec![]).failing(CatalogError::Network("connection reset".into()));
        let response = app(catalog)
            .oneshot(post_query(r#"{"query":"Tokyo linux price"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json_body(response).await;
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["error"], "catalog_unavailable");
        assert!(body["pricing_data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limit_applies_to_queries_only() {
        let config = GatewayConfig {
            rate_limit_per_minute: 1,
            ..GatewayConfig::default()
        };
        let app = app_with(StaticCatalog::new(vec![]), &config);

        let first = app
            .clone()
            .oneshot(post_query(r#"{"query":"Tokyo"}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(post_query(r#"{"query":"Tokyo"}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let health = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/query")
            .header("origin", "http://example.com")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query":"Tokyo"}"#))
            .unwrap();
        let response = app(StaticCatalog::new(vec![])).oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[test]
    fn invalid_origin_is_an_error() {
        assert!(cors_layer(&["http://ok.example".into()]).is_ok());
        assert!(matches!(
            cors_layer(&["bad\norigin".into()]),
            Err(GatewayError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn rate_limiter_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }
}
