//! # notification-channels
//!
//! Channel-type dispatch and validation for notification subscriptions.
//!
//! A client asks to be notified about a resource by posting a JSON-LD
//! description of a notification channel. This crate answers one question:
//!
//! > Given that request and the caller's credentials, which channel does the
//! > server commit to, and is the caller allowed to have it?
//!
//! ## Core Contract
//!
//! 1. Route the request to the implementation of its channel type
//! 2. Validate the payload into a typed [`NotificationChannel`]
//! 3. Derive the minimal access the channel needs and ask the [`Authorizer`]
//! 4. Serialize the committed channel as the response body
//! 5. Run the channel type's post-response step exactly once
//!
//! ## Architecture
//!
//! ```text
//! JSON-LD → Graph → SubscriptionPipeline → ChannelTypeRegistry → NotificationChannelType
//!                          │                                         ├─ WebSocketChannel2023
//!                          ▼                                         └─ WebhookChannel2023
//!                      Authorizer                                         │
//!                                                                          ▼
//!                                                                    StateNotifier
//! ```
//!
//! ## Determinism Guarantees
//!
//! - `describe` returns an equal value on every call
//! - Serialized channels reconstruct to the same subscription
//! - Registry fingerprints only change when the advertised services change

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authorization;
pub mod canonical;
pub mod channel_type;
pub mod config;
pub mod error;
pub mod notifier;
pub mod pipeline;
pub mod registry;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use authorization::{AllowAll, AuthorizationDecision, Authorizer, InMemoryAuthorizer, Principal};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use channel_type::{
    BaseChannelType, NotificationChannelType, WebSocketChannel2023, WebhookChannel2023,
};
pub use config::NotificationConfig;
pub use error::{
    AuthorizationError, ChannelMismatch, FinalizeError, SubscriptionError, UnsupportedChannelType,
    ValidationError,
};
pub use notifier::{NotifierError, StateNotifier, TracingNotifier};
pub use pipeline::{PendingFinalize, PipelineStage, Subscription, SubscriptionPipeline};
pub use registry::{ChannelTypeRegistry, RegistryBuilder, RegistryError};
pub use types::{
    AccessMap, AccessMode, ChannelDelivery, ChannelId, Credentials, Graph, NotificationChannel,
    StorageDescription, SubscriptionService, Term,
};

/// Crate version, reported by the service health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
