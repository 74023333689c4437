//! Subscription service discovery documents.

use serde::{Deserialize, Serialize};

use super::vocab::NOTIFY_CONTEXT;

/// Describes how to subscribe to one channel type.
///
/// Serializes to the discovery shape
/// `{ "@context": [..], "id": .., "channelType": .., "feature": [..] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionService {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Subscription endpoint.
    pub id: String,
    /// Advertised channel type (compact form).
    #[serde(rename = "channelType")]
    pub channel_type: String,
    /// Supported features (compact form).
    pub feature: Vec<String>,
}

impl SubscriptionService {
    /// Create a service description with the notifications context.
    pub fn new(
        id: impl Into<String>,
        channel_type: impl Into<String>,
        features: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            context: vec![NOTIFY_CONTEXT.to_string()],
            id: id.into(),
            channel_type: channel_type.into(),
            feature: features.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the service advertises a feature.
    pub fn supports(&self, feature: &str) -> bool {
        self.feature.iter().any(|f| f == feature)
    }
}

/// Storage-level discovery document listing every subscription service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescription {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Description endpoint.
    pub id: String,
    /// Available subscription services.
    pub subscription: Vec<SubscriptionService>,
}

impl StorageDescription {
    /// Create a description document.
    pub fn new(id: impl Into<String>, subscription: Vec<SubscriptionService>) -> Self {
        Self {
            context: vec![NOTIFY_CONTEXT.to_string()],
            id: id.into(),
            subscription,
        }
    }
}
