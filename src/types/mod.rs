//! Core types for notification channels.

pub mod access;
pub mod channel;
pub mod credentials;
pub mod duration;
pub mod graph;
pub mod service;
pub mod term;
pub mod vocab;

pub use access::{AccessMap, AccessMode};
pub use channel::{ChannelDelivery, ChannelId, NotificationChannel};
pub use credentials::{AgentCredential, ClientCredential, Credentials, IssuerCredential};
pub use duration::{format_duration, parse_duration, DurationError};
pub use graph::{Graph, JsonLdError};
pub use service::{StorageDescription, SubscriptionService};
pub use term::{Quad, Term};
