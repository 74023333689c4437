//! Channel-type registry.
//!
//! Maps channel-type IRIs to implementations. Built once at startup and
//! read-only afterwards; a reload builds a new registry and swaps it in whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::canonical::canonical_hash_hex;
use crate::channel_type::{NotificationChannelType, WebSocketChannel2023, WebhookChannel2023};
use crate::config::NotificationConfig;
use crate::error::UnsupportedChannelType;
use crate::notifier::StateNotifier;
use crate::types::SubscriptionService;

/// Error building a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two implementations claim the same channel type.
    #[error("channel type registered twice: {0}")]
    Duplicate(String),
    /// The discovery descriptions could not be hashed.
    #[error("failed to fingerprint registry: {0}")]
    Fingerprint(String),
}

/// Immutable registry of channel types.
///
/// The fingerprint is a hash over the discovery descriptions and changes
/// whenever the set of services changes.
#[derive(Clone)]
pub struct ChannelTypeRegistry {
    types: BTreeMap<String, Arc<dyn NotificationChannelType>>,
    registry_fingerprint: String,
}

impl std::fmt::Debug for ChannelTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTypeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("fingerprint", &self.registry_fingerprint)
            .finish()
    }
}

impl ChannelTypeRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry with the built-in socket and webhook types.
    pub fn with_defaults(config: &NotificationConfig) -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        builder.register(Arc::new(WebSocketChannel2023::new(config)))?;
        builder.register(Arc::new(WebhookChannel2023::new(config)))?;
        builder.build()
    }

    /// Built-in types with a custom state notifier for webhooks.
    pub fn with_notifier(
        config: &NotificationConfig,
        notifier: Arc<dyn StateNotifier>,
    ) -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        builder.register(Arc::new(WebSocketChannel2023::new(config)))?;
        builder.register(Arc::new(WebhookChannel2023::with_notifier(
            config.webhook_type.clone(),
            config,
            notifier,
        )))?;
        builder.build()
    }

    /// Look up the implementation of a channel type.
    pub fn resolve(
        &self,
        channel_type: &str,
    ) -> Result<Arc<dyn NotificationChannelType>, UnsupportedChannelType> {
        self.types
            .get(channel_type)
            .cloned()
            .ok_or_else(|| UnsupportedChannelType(channel_type.to_string()))
    }

    /// Whether a channel type is registered.
    pub fn contains(&self, channel_type: &str) -> bool {
        self.types.contains_key(channel_type)
    }

    /// Registered channel-type IRIs, in order.
    pub fn channel_types(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Discovery descriptions of every type, ordered by channel-type IRI.
    pub fn descriptions(&self) -> Vec<SubscriptionService> {
        self.types.values().map(|t| t.describe()).collect()
    }

    /// Registry fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.registry_fingerprint
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Builder for [`ChannelTypeRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    types: BTreeMap<String, Arc<dyn NotificationChannelType>>,
}

impl RegistryBuilder {
    /// Register a channel type under its own IRI.
    pub fn register(
        &mut self,
        channel_type: Arc<dyn NotificationChannelType>,
    ) -> Result<&mut Self, RegistryError> {
        let key = channel_type.channel_type().to_string();
        if self.types.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }
        self.types.insert(key, channel_type);
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> Result<ChannelTypeRegistry, RegistryError> {
        let descriptions: Vec<SubscriptionService> =
            self.types.values().map(|t| t.describe()).collect();
        let registry_fingerprint = canonical_hash_hex(&descriptions)
            .map_err(|e| RegistryError::Fingerprint(e.to_string()))?;
        Ok(ChannelTypeRegistry {
            registry_fingerprint,
            types: self.types,
        })
    }
}
