//! Service middleware for request tracking.
//!
//! Request counts and latency go to the `notification_channels::metrics`
//! tracing target, where log-based aggregation picks them up.

use axum::{extract::Request, middleware::Next, response::Response};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

/// Middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    info!(
        target: "notification_channels::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record the outcome of a subscription request.
pub fn record_subscription(channel_type: &str, code: &str) {
    info!(
        target: "notification_channels::metrics",
        metric_type = "subscription",
        channel_type = channel_type,
        code = code,
        "subscription_metric"
    );
}

/// Normalize a path to keep metric cardinality low.
///
/// UUIDs become `:id`.
fn normalize_path(path: &str) -> String {
    static UUID: OnceLock<Option<regex_lite::Regex>> = OnceLock::new();
    let regex = UUID.get_or_init(|| {
        regex_lite::Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .ok()
    });
    match regex {
        Some(regex) => regex.replace_all(path, ":id").into_owned(),
        None => path.to_string(),
    }
}
