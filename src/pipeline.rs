//! Subscription pipeline.
//!
//! Routes a subscription request to its channel type and drives it through
//! the lifecycle:
//!
//! ```text
//! Received → TypeResolved → Validated → Authorized → Serialized ┄┄ Finalized
//!     │            │             │            │                       ▲
//!     ▼            ▼             ▼            ▼                       │
//! ValidationError  Unsupported   Validation   Authorization /    (spawned after
//! (no type)        ChannelType   Error        Cancelled / Timeout  the response)
//! ```
//!
//! ## Guarantees
//!
//! - An unsupported type is reported before any field validation.
//! - Authorization never sees an unconstructed channel.
//! - The authorizer call is the only await on external I/O; it races the
//!   caller's cancellation token and the configured timeout.
//! - Finalize runs at most once per channel, outside the request's
//!   cancellation scope, and its failures are logged only.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::authorization::{AuthorizationDecision, Authorizer};
use crate::channel_type::{requested_channel_types, NotificationChannelType};
use crate::config::NotificationConfig;
use crate::error::{SubscriptionError, UnsupportedChannelType, ValidationError};
use crate::registry::ChannelTypeRegistry;
use crate::types::vocab::compact_iri;
use crate::types::{Credentials, Graph, NotificationChannel};

/// Lifecycle state of a subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    /// Request accepted for processing.
    Received,
    /// Channel type found in the registry.
    TypeResolved,
    /// Payload turned into a channel.
    Validated,
    /// Authorizer allowed the access map.
    Authorized,
    /// Response body produced.
    Serialized,
    /// Post-response step done.
    Finalized,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::TypeResolved => write!(f, "type_resolved"),
            Self::Validated => write!(f, "validated"),
            Self::Authorized => write!(f, "authorized"),
            Self::Serialized => write!(f, "serialized"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

/// A committed channel whose finalize step has not run yet.
///
/// Move-only: [`spawn`](Self::spawn) and [`run`](Self::run) consume it, so
/// finalize can run at most once. Dropping it skips finalize.
#[must_use = "finalize only runs when the pending step is spawned or run"]
pub struct PendingFinalize {
    channel: NotificationChannel,
    channel_type: Arc<dyn NotificationChannelType>,
}

impl fmt::Debug for PendingFinalize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFinalize")
            .field("channel_id", &self.channel.id)
            .field("channel_type", &self.channel.channel_type)
            .finish()
    }
}

impl PendingFinalize {
    /// The committed channel.
    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Run finalize on a detached task.
    ///
    /// The task is not tied to any request cancellation; callers do not need
    /// to await the handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run finalize in place, logging any failure.
    pub async fn run(self) {
        let channel_id = self.channel.id.to_string();
        let span = info_span!(
            "finalize",
            channel_id = %channel_id,
            channel_type = %self.channel.channel_type,
        );
        async move {
            match self.channel_type.finalize(&self.channel).await {
                Ok(()) => debug!(stage = %PipelineStage::Finalized, "channel finalized"),
                Err(e) => error!(
                    target: "notification_channels::pipeline",
                    error = %e,
                    "finalize failed; response already sent"
                ),
            }
        }
        .instrument(span)
        .await
    }
}

/// Result of a successful subscription.
#[derive(Debug)]
pub struct Subscription {
    /// Serialized channel; the response body.
    pub body: Value,
    /// Deferred finalize step, to be spawned once the response is out.
    pub pending: PendingFinalize,
}

impl Subscription {
    /// Split into the response body and the deferred finalize step.
    pub fn into_parts(self) -> (Value, PendingFinalize) {
        (self.body, self.pending)
    }
}

/// Orchestrates subscription requests.
///
/// Cheap to clone; holds only shared, read-only state.
#[derive(Clone)]
pub struct SubscriptionPipeline {
    registry: Arc<ChannelTypeRegistry>,
    authorizer: Arc<dyn Authorizer>,
    authorization_timeout: Duration,
}

impl fmt::Debug for SubscriptionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionPipeline")
            .field("registry", &self.registry)
            .field("authorization_timeout", &self.authorization_timeout)
            .finish_non_exhaustive()
    }
}

impl SubscriptionPipeline {
    /// Create a pipeline.
    pub fn new(
        registry: Arc<ChannelTypeRegistry>,
        authorizer: Arc<dyn Authorizer>,
        authorization_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            authorizer,
            authorization_timeout,
        }
    }

    /// Create a pipeline using the configured timeout.
    pub fn from_config(
        registry: Arc<ChannelTypeRegistry>,
        authorizer: Arc<dyn Authorizer>,
        config: &NotificationConfig,
    ) -> Self {
        Self::new(registry, authorizer, config.authorization_timeout())
    }

    /// The registry requests are routed with.
    pub fn registry(&self) -> &Arc<ChannelTypeRegistry> {
        &self.registry
    }

    /// Process one subscription request up to and including serialization.
    ///
    /// The channel is built by the first requested type that is registered.
    /// On success the caller sends `body` and then spawns `pending`.
    pub async fn subscribe(
        &self,
        payload: &Graph,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        self.process(None, payload, credentials, cancel).await
    }

    /// Process a request addressed to one channel type's endpoint.
    ///
    /// The payload must list `channel_type` among its types and is built by
    /// that type, whatever else it lists.
    pub async fn subscribe_as(
        &self,
        channel_type: &str,
        payload: &Graph,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        self.process(Some(channel_type), payload, credentials, cancel).await
    }

    async fn process(
        &self,
        endpoint: Option<&str>,
        payload: &Graph,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        let span = info_span!(
            "subscribe",
            channel_type = tracing::field::Empty,
            channel_id = tracing::field::Empty,
        );
        let started = Instant::now();
        let result = self
            .run_stages(endpoint, payload, credentials, cancel)
            .instrument(span.clone())
            .await;

        let _enter = span.enter();
        match &result {
            Ok(subscription) => debug!(
                target: "notification_channels::pipeline",
                stage = %PipelineStage::Serialized,
                latency_ms = started.elapsed().as_millis() as u64,
                channel_id = %subscription.pending.channel.id,
                "subscription accepted"
            ),
            Err(e) if e.is_client_error() => warn!(
                target: "notification_channels::pipeline",
                code = e.code(),
                error = %e,
                "subscription rejected"
            ),
            Err(e) => error!(
                target: "notification_channels::pipeline",
                code = e.code(),
                error = %e,
                "subscription failed"
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        endpoint: Option<&str>,
        payload: &Graph,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        debug!(stage = %PipelineStage::Received, statements = payload.len());
        let requested = requested_channel_types(payload)?;

        let channel_type = match endpoint {
            Some(endpoint) => self.resolve_endpoint(endpoint, &requested)?,
            None => self.resolve(&requested)?,
        };
        tracing::Span::current().record("channel_type", channel_type.channel_type());
        debug!(stage = %PipelineStage::TypeResolved);

        let channel = channel_type.construct(payload, credentials).await?;
        if channel.channel_type != channel_type.channel_type() {
            return Err(SubscriptionError::Internal(format!(
                "{} produced a channel tagged {}",
                channel_type.channel_type(),
                channel.channel_type
            )));
        }
        tracing::Span::current().record("channel_id", channel.id.as_str());
        debug!(stage = %PipelineStage::Validated);

        let modes = channel_type.extract_modes(&channel);
        let decision = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SubscriptionError::Cancelled),
            decision = tokio::time::timeout(
                self.authorization_timeout,
                self.authorizer.authorize(credentials, &modes),
            ) => decision.map_err(|_| SubscriptionError::AuthorizationTimeout)?,
        };
        if let AuthorizationDecision::Deny(reason) = decision {
            return Err(reason.into());
        }
        debug!(stage = %PipelineStage::Authorized, modes = %modes);

        let body = channel_type.serialize(&channel)?;

        Ok(Subscription {
            body,
            pending: PendingFinalize {
                channel,
                channel_type,
            },
        })
    }

    /// First requested type that is registered.
    fn resolve(
        &self,
        requested: &[String],
    ) -> Result<Arc<dyn NotificationChannelType>, UnsupportedChannelType> {
        requested
            .iter()
            .find_map(|ty| self.registry.resolve(ty).ok())
            .ok_or_else(|| {
                UnsupportedChannelType(requested.first().cloned().unwrap_or_default())
            })
    }

    /// The endpoint's own type, provided the payload requests it.
    fn resolve_endpoint(
        &self,
        endpoint: &str,
        requested: &[String],
    ) -> Result<Arc<dyn NotificationChannelType>, SubscriptionError> {
        let channel_type = self.registry.resolve(endpoint)?;
        if !requested.iter().any(|ty| ty == endpoint) {
            return Err(ValidationError::field(
                "type",
                format!("subscription endpoint only accepts {}", compact_iri(endpoint)),
            )
            .into());
        }
        Ok(channel_type)
    }
}
