//! facture-api - HTTP API server for facture
//!
//! One processing route: a multipart document upload comes in, the
//! reconciled invoice record leaves as a single-row CSV. Everything else
//! here is the ambient server plumbing: logging, CORS, request IDs, rate
//! limiting, and body limits.

mod handlers;

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use governor::{Quota, RateLimiter};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use facture_core::{defaults, DescriptionRefinementBackend, DocumentExtractionBackend};
use facture_inference::{GeminiRefinementBackend, GoogleDocAiBackend};

use handlers::invoices::process_invoice;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Global rate limiter type (direct quota, no keyed bucketing — the
/// service fronts a single shared processor quota anyway).
type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// Document understanding backend.
    extraction: Arc<dyn DocumentExtractionBackend>,
    /// Description refinement backend.
    refinement: Arc<dyn DescriptionRefinementBackend>,
    /// Global rate limiter (None if rate limiting is disabled).
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

// =============================================================================
// CORS
// =============================================================================

/// Parse the CORS origin whitelist.
///
/// # Environment Variable
/// `ALLOWED_ORIGINS` - Comma-separated list of allowed origins
///
/// Defaults to the bundled frontend dev server plus a local production
/// build (see `defaults::ALLOWED_ORIGINS`).
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| defaults::ALLOWED_ORIGINS.to_string());

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// ROUTER
// =============================================================================

fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Invoice processing
        .route("/api/v1/invoices/process", post(process_invoice))
        // Rate limiting status endpoint
        .route("/api/v1/rate-limit/status", get(rate_limit_status))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(defaults::CORS_MAX_AGE_SECS))
        })
        .layer(DefaultBodyLimit::max(defaults::MAX_BODY_SIZE_BYTES))
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "facture_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "facture_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("facture-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    // Rate limiting configuration
    // RATE_LIMIT_REQUESTS: requests per period (default: 100)
    // RATE_LIMIT_PERIOD_SECS: period in seconds (default: 60 = 1 minute)
    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_REQUESTS);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_PERIOD_SECS);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    info!(
        "Rate limiting: {} ({} requests per {} seconds)",
        if rate_limit_enabled {
            "enabled"
        } else {
            "disabled"
        },
        rate_limit_requests,
        rate_limit_period_secs
    );

    // Construct the external AI backends; missing credentials abort startup
    let extraction = GoogleDocAiBackend::from_env()?;
    info!(
        processor = extraction.processor_name(),
        "Document understanding backend initialized"
    );

    let refinement = GeminiRefinementBackend::from_env()?;
    info!(
        model = refinement.model_name(),
        "Description refinement backend initialized"
    );

    // Create rate limiter if enabled
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(std::time::Duration::from_secs(rate_limit_period_secs))
            .expect("Rate limit period must be non-zero")
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32).expect("Rate limit must be non-zero"),
            );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        None
    };

    // Create app state
    let state = AppState {
        extraction: Arc::new(extraction),
        refinement: Arc::new(refinement),
        rate_limiter,
    };

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// RATE LIMITING MIDDLEWARE
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    // If rate limiting is disabled, pass through
    if let Some(limiter) = &state.rate_limiter {
        // Check rate limit
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Get rate limiting status.
async fn rate_limit_status(State(state): State<AppState>) -> impl IntoResponse {
    if state.rate_limiter.is_some() {
        Json(serde_json::json!({
            "enabled": true,
            "message": "Rate limiting is active"
        }))
    } else {
        Json(serde_json::json!({
            "enabled": false,
            "message": "Rate limiting is disabled"
        }))
    }
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    /// Failure in an external collaborator or internal processing step.
    Upstream(facture_core::Error),
    BadRequest(String),
    ServiceUnavailable(String),
}

impl From<facture_core::Error> for ApiError {
    fn from(err: facture_core::Error) -> Self {
        match &err {
            facture_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            facture_core::Error::Config(msg) => ApiError::ServiceUnavailable(msg.clone()),
            _ => ApiError::Upstream(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Upstream(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use facture_core::DocumentEntity;
    use facture_inference::{MockExtractionBackend, MockRefinementBackend};

    /// Minimal JPEG header so uploads pass magic-byte validation and MIME
    /// detection.
    fn jpeg_bytes() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(b"JFIF\0 test invoice scan");
        bytes
    }

    fn state_with(
        extraction: MockExtractionBackend,
        refinement: MockRefinementBackend,
    ) -> AppState {
        AppState {
            extraction: Arc::new(extraction),
            refinement: Arc::new(refinement),
            rate_limiter: None,
        }
    }

    async fn spawn_app(state: AppState) -> String {
        let router = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn multipart_upload(data: Vec<u8>) -> reqwest::multipart::Form {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name("invoice.jpg")
            .mime_str("image/jpeg")
            .unwrap();
        reqwest::multipart::Form::new().part("file", part)
    }

    #[tokio::test]
    async fn health_endpoint_reports_healthy() {
        let base = spawn_app(state_with(
            MockExtractionBackend::new(),
            MockRefinementBackend::new(),
        ))
        .await;

        let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn process_returns_single_row_csv() {
        let extraction = MockExtractionBackend::new().with_entities(vec![
            DocumentEntity::new("receiver_name", "Jane Doe"),
            DocumentEntity::new("supplier_name", "ACME GmbH"),
            DocumentEntity::new("invoice_id", "INV-2024-001"),
            DocumentEntity::new("line_item", "2x Widget 20.00")
                .with_property(DocumentEntity::new(
                    "line_item/description",
                    "2x Widget\nSKU 443",
                )),
            DocumentEntity::new("net_amount", "1.000,00"),
            DocumentEntity::new("total_amount", "1.190,00"),
        ]);
        let refinement =
            MockRefinementBackend::new().with_response_mapping("2x Widget\nSKU 443", "Widget");

        let base = spawn_app(state_with(extraction, refinement)).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/invoices/process", base))
            .multipart(multipart_upload(jpeg_bytes()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );
        assert!(resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("output.csv"));

        let body = resp.text().await.unwrap();
        let mut lines = body.lines();
        assert_eq!(
            lines.next(),
            Some("CLIENT,COMPANY,DESCRIPTION,INVOICE_ID,NET_AMOUNT,VAT_AMOUNT,TOTAL_AMOUNT")
        );
        // VAT is derived: 1190 − 1000.
        assert_eq!(
            lines.next(),
            Some("Jane Doe,ACME GmbH,Widget,INV-2024-001,1000,190,1190")
        );
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn refinement_called_once_per_description_entity() {
        let extraction = MockExtractionBackend::new().with_entities(vec![
            DocumentEntity::new("line_item/description", "Widget A"),
            DocumentEntity::new("line_item/description", "Widget B"),
        ]);
        let refinement = MockRefinementBackend::new();
        let refinement_probe = refinement.clone();

        let base = spawn_app(state_with(extraction, refinement)).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/invoices/process", base))
            .multipart(multipart_upload(jpeg_bytes()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body = resp.text().await.unwrap();
        assert!(body.lines().nth(1).unwrap().contains("Widget A, Widget B"));
        assert_eq!(refinement_probe.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_file_field_is_bad_request() {
        let base = spawn_app(state_with(
            MockExtractionBackend::new(),
            MockRefinementBackend::new(),
        ))
        .await;

        let form = reqwest::multipart::Form::new().text("note", "no file here");
        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/invoices/process", base))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Missing file in multipart form"));
    }

    #[tokio::test]
    async fn executable_upload_is_rejected() {
        let base = spawn_app(state_with(
            MockExtractionBackend::new(),
            MockRefinementBackend::new(),
        ))
        .await;

        let elf = vec![0x7F, 0x45, 0x4C, 0x46, 0x02, 0x01, 0x01, 0x00];
        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/invoices/process", base))
            .multipart(multipart_upload(elf))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Executable"));
    }

    #[tokio::test]
    async fn extraction_failure_is_internal_error() {
        let extraction = MockExtractionBackend::new().with_failure("processor quota exhausted");
        let base = spawn_app(state_with(extraction, MockRefinementBackend::new())).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/invoices/process", base))
            .multipart(multipart_upload(jpeg_bytes()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("processor quota exhausted"));
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_burst() {
        let quota = Quota::with_period(std::time::Duration::from_secs(60))
            .unwrap()
            .allow_burst(NonZeroU32::new(1).unwrap());
        let state = AppState {
            extraction: Arc::new(MockExtractionBackend::new()),
            refinement: Arc::new(MockRefinementBackend::new()),
            rate_limiter: Some(Arc::new(RateLimiter::direct(quota))),
        };
        let base = spawn_app(state).await;

        let first = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(first.status(), 200);

        let second = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(second.status(), 429);
        let body: serde_json::Value = second.json().await.unwrap();
        assert_eq!(body["error"], "rate_limit_exceeded");
    }

    #[tokio::test]
    async fn rate_limit_status_reports_disabled() {
        let base = spawn_app(state_with(
            MockExtractionBackend::new(),
            MockRefinementBackend::new(),
        ))
        .await;

        let resp = reqwest::get(format!("{}/api/v1/rate-limit/status", base))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["enabled"], false);
    }

    #[test]
    fn allowed_origins_fall_back_to_defaults() {
        // Guard: parse the compiled-in default list without touching env.
        let origins: Vec<HeaderValue> = defaults::ALLOWED_ORIGINS
            .split(',')
            .map(|o| o.parse().unwrap())
            .collect();
        assert!(origins.contains(&HeaderValue::from_static("http://localhost:5173")));
    }
}
