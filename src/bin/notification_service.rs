//! Notification Service Binary
//!
//! Runs the subscription pipeline as a REST service:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `NOTIFY_*`: see [`NotificationConfig::from_env`]
//! - `NOTIFY_ACL`: semicolon-separated grants `resource|principal|modes`,
//!   e.g. `https://pod.example/|public|read`. Unset means allow everything.
//! - `PORT`: Service port (default: 3000)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! NOTIFY_BASE_URL=https://pod.example/ cargo run --bin notification_service --features service
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use notification_channels::authorization::{AllowAll, Authorizer, InMemoryAuthorizer, Principal};
use notification_channels::service::{create_router, metrics_middleware, ServiceState};
use notification_channels::{AccessMode, ChannelTypeRegistry, NotificationConfig};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "notification_service=info,notification_channels=info,tower_http=info".into()
    });

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let trace_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "notification_service::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

/// Build the authorizer from `NOTIFY_ACL`.
fn authorizer_from_env() -> Arc<dyn Authorizer> {
    let Ok(acl) = std::env::var("NOTIFY_ACL") else {
        warn!(
            "NOTIFY_ACL not set, every subscription will be allowed. Do not run this in production!"
        );
        return Arc::new(AllowAll);
    };

    let mut authorizer = InMemoryAuthorizer::new();
    for entry in acl.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, '|');
        let (Some(resource), Some(principal), Some(modes)) =
            (parts.next(), parts.next(), parts.next())
        else {
            warn!(entry = entry, "ignoring malformed ACL entry");
            continue;
        };
        let principal = match principal {
            "public" => Principal::Public,
            "authenticated" => Principal::Authenticated,
            web_id => Principal::Agent(web_id.to_string()),
        };
        let modes: Vec<AccessMode> = modes
            .split(',')
            .filter_map(|m| {
                let mode = AccessMode::from_str(m.trim());
                if mode.is_none() {
                    warn!(entry = entry, mode = m, "ignoring unknown access mode");
                }
                mode
            })
            .collect();
        authorizer.grant(resource, principal, modes);
    }
    info!("ACL loaded from NOTIFY_ACL");
    Arc::new(authorizer)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting Notification Service"
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    let config = NotificationConfig::from_env();
    let registry = ChannelTypeRegistry::with_defaults(&config).map_err(|e| {
        error!(error = %e, "Failed to build channel type registry");
        e
    })?;
    info!(
        channel_types = ?registry.channel_types(),
        registry_fingerprint = %registry.fingerprint(),
        "Channel type registry initialized"
    );

    let state = ServiceState::new(registry, authorizer_from_env(), config);
    let shutdown = state.shutdown_token().clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(
        address = %addr,
        version = version,
        "Notification Service listening"
    );

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        }
        shutdown.cancel();
    };

    info!("Ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Notification Service shutdown complete");

    Ok(())
}
