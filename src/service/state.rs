//! Service state management.
//!
//! Holds the current channel-type registry and the authorizer shared by
//! every request.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::authorization::Authorizer;
use crate::config::NotificationConfig;
use crate::pipeline::SubscriptionPipeline;
use crate::registry::ChannelTypeRegistry;
use crate::types::StorageDescription;

/// Shared service state.
///
/// The registry is swapped whole on reload; requests take a snapshot and
/// never observe a half-built registry.
#[derive(Clone)]
pub struct ServiceState {
    registry: Arc<RwLock<Arc<ChannelTypeRegistry>>>,
    authorizer: Arc<dyn Authorizer>,
    /// Endpoint and lifetime configuration.
    pub config: Arc<NotificationConfig>,
    shutdown: CancellationToken,
}

impl ServiceState {
    /// Create service state.
    pub fn new(
        registry: ChannelTypeRegistry,
        authorizer: Arc<dyn Authorizer>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Arc::new(registry))),
            authorizer,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> Arc<ChannelTypeRegistry> {
        self.registry.read().clone()
    }

    /// Token cancelled when the server shuts down. Per-request tokens are
    /// children of it, so pending authorizations abort on shutdown.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Swap in a new registry. In-flight requests keep their snapshot.
    pub fn replace_registry(&self, registry: ChannelTypeRegistry) {
        let registry = Arc::new(registry);
        tracing::info!(
            fingerprint = %registry.fingerprint(),
            channel_types = registry.len(),
            "channel type registry replaced"
        );
        *self.registry.write() = registry;
    }

    /// Pipeline over the current registry snapshot.
    pub fn pipeline(&self) -> SubscriptionPipeline {
        SubscriptionPipeline::from_config(
            self.registry(),
            Arc::clone(&self.authorizer),
            &self.config,
        )
    }

    /// Discovery document for the current registry.
    pub fn storage_description(&self) -> StorageDescription {
        StorageDescription::new(
            self.config.description_endpoint(),
            self.registry().descriptions(),
        )
    }
}
