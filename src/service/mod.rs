//! Notification subscription REST service.
//!
//! ## Endpoints
//!
//! - `GET /.notifications/` - Storage description listing every subscription service
//! - `POST /.notifications/{ChannelType}/` - Subscribe with a JSON-LD channel request
//! - `GET /health` - Service health with registry fingerprint
//! - `GET /health/live` - Liveness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_subscription};
pub use routes::{create_router, credentials_from_headers, ErrorResponse};
pub use state::ServiceState;
