//! Axum routes for the notification service.

use axum::{
    body::{Body, Bytes},
    extract::{Json, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::{AuthorizationError, SubscriptionError, UnsupportedChannelType, ValidationError};
use crate::pipeline::PendingFinalize;
use crate::types::vocab::expand_iri;
use crate::types::{Credentials, Graph, JsonLdError};

use super::middleware::record_subscription;
use super::state::ServiceState;

/// Media type of every JSON-LD response.
pub const LD_JSON: &str = "application/ld+json";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Service health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of registered channel types.
    pub channel_type_count: usize,
    /// Changes whenever the advertised services change.
    pub registry_fingerprint: String,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Offending field, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for a pipeline error.
pub fn status_for(err: &SubscriptionError) -> StatusCode {
    match err {
        SubscriptionError::UnsupportedChannelType(_) => StatusCode::NOT_FOUND,
        SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
        SubscriptionError::Authorization(AuthorizationError::Unauthenticated(_)) => {
            StatusCode::UNAUTHORIZED
        }
        SubscriptionError::Authorization(AuthorizationError::Forbidden(_)) => StatusCode::FORBIDDEN,
        // Client went away; nobody reads this status.
        SubscriptionError::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
        }
        SubscriptionError::AuthorizationTimeout => StatusCode::SERVICE_UNAVAILABLE,
        SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: SubscriptionError) -> ApiError {
    let mut body = ErrorResponse::new(err.code(), err.to_string());
    if let SubscriptionError::Validation(ValidationError {
        field: Some(field), ..
    }) = &err
    {
        body = body.with_details(field.clone());
    }
    (status_for(&err), Json(body))
}

/// Extract credentials from an `Authorization: WebID <iri>` header.
///
/// Development extractor: the WebID is taken at face value. No header means
/// anonymous credentials.
pub fn credentials_from_headers(headers: &HeaderMap) -> Result<Credentials, SubscriptionError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(Credentials::anonymous());
    };
    let unauthenticated = |reason: &str| {
        SubscriptionError::from(AuthorizationError::Unauthenticated(reason.to_string()))
    };

    let value = value
        .to_str()
        .map_err(|_| unauthenticated("authorization header is not valid ASCII"))?;
    let (scheme, web_id) = value
        .split_once(' ')
        .ok_or_else(|| unauthenticated("malformed authorization header"))?;
    if !scheme.eq_ignore_ascii_case("webid") {
        return Err(unauthenticated("unsupported authorization scheme"));
    }
    let web_id = web_id.trim();
    url::Url::parse(web_id).map_err(|_| unauthenticated("WebID is not an absolute IRI"))?;
    Ok(Credentials::for_agent(web_id))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Storage description listing every subscription service.
async fn description_handler(State(state): State<ServiceState>) -> Response {
    ld_json(StatusCode::OK, &state.storage_description())
}

/// Subscribe to notifications through one channel type.
async fn subscribe_handler(
    State(state): State<ServiceState>,
    Path(type_name): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ApiError> {
    let endpoint_type = expand_iri(&type_name);
    let result = subscribe(&state, &endpoint_type, &headers, &body).await;
    let code = match &result {
        Ok(_) => "OK",
        Err(e) => e.code(),
    };
    record_subscription(metric_label(&endpoint_type, &result), code);
    result.map_err(api_error)
}

/// Channel type label for subscription metrics.
///
/// Unregistered path segments collapse into `unknown`.
fn metric_label<'a, T>(endpoint_type: &'a str, result: &Result<T, SubscriptionError>) -> &'a str {
    match result {
        Err(SubscriptionError::UnsupportedChannelType(_)) => "unknown",
        _ => endpoint_type,
    }
}

async fn subscribe(
    state: &ServiceState,
    endpoint_type: &str,
    headers: &HeaderMap,
    body: &str,
) -> Result<Response, SubscriptionError> {
    let pipeline = state.pipeline();
    if !pipeline.registry().contains(endpoint_type) {
        return Err(UnsupportedChannelType(endpoint_type.to_string()).into());
    }

    let credentials = credentials_from_headers(headers)?;
    let payload = parse_payload(body, &state.config.subscription_endpoint(endpoint_type))?;

    let cancel = state.shutdown_token().child_token();
    let subscription = pipeline
        .subscribe_as(endpoint_type, &payload, &credentials, &cancel)
        .await?;

    let (body, pending) = subscription.into_parts();
    let bytes = serde_json::to_vec(&body).map_err(|e| SubscriptionError::Internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(LD_JSON))],
        Body::from_stream(FinalizeAfterBody::new(bytes, pending)),
    )
        .into_response())
}

/// Parse a request body, resolving relative IRIs against the endpoint URL.
fn parse_payload(body: &str, base: &str) -> Result<Graph, SubscriptionError> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| ValidationError::from(JsonLdError::InvalidJson(e.to_string())))?;
    Graph::from_json_ld_with_base(&document, base).map_err(|e| match e {
        JsonLdError::InvalidBase(reason) => SubscriptionError::Internal(reason),
        other => ValidationError::from(other).into(),
    })
}

/// Health check endpoint.
async fn health_handler(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let registry = state.registry();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        channel_type_count: registry.len(),
        registry_fingerprint: registry.fingerprint().to_string(),
    })
}

/// Liveness probe endpoint.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

fn ld_json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(LD_JSON))],
            bytes,
        )
            .into_response(),
        Err(e) => api_error(SubscriptionError::Internal(e.to_string())).into_response(),
    }
}

// ============================================================================
// Response Bodies
// ============================================================================

/// Single-chunk body that spawns finalize once the chunk has been taken
/// and the end of the stream polled.
///
/// If the body is dropped earlier, e.g. because the client went away,
/// finalize does not run.
struct FinalizeAfterBody {
    chunk: Option<Bytes>,
    pending: Option<PendingFinalize>,
}

impl FinalizeAfterBody {
    fn new(chunk: impl Into<Bytes>, pending: PendingFinalize) -> Self {
        Self {
            chunk: Some(chunk.into()),
            pending: Some(pending),
        }
    }
}

impl Stream for FinalizeAfterBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(chunk) = self.chunk.take() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        if let Some(pending) = self.pending.take() {
            pending.spawn();
        }
        Poll::Ready(None)
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the notification service.
pub fn create_router(state: ServiceState) -> Router {
    Router::new()
        .route("/.notifications/", get(description_handler))
        .route("/.notifications/:type_name/", post(subscribe_handler))
        .route("/.notifications/:type_name", post(subscribe_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(state)
}
