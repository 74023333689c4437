//! Notification channel types.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Unique identifier of an established channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery parameters specific to the channel type that produced the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelDelivery {
    /// Client connects to `receive_from` and receives notifications over a socket.
    WebSocket {
        /// Generated socket URL.
        receive_from: String,
    },
    /// Server POSTs notifications to `target`.
    Webhook {
        /// Delivery endpoint supplied by the client.
        target: String,
        /// Agent on whose behalf notifications are sent.
        sender: Option<String>,
    },
}

impl ChannelDelivery {
    /// Short name of the delivery variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WebSocket { .. } => "websocket",
            Self::Webhook { .. } => "webhook",
        }
    }
}

/// A validated notification channel.
///
/// `channel_type` is the IRI of the channel type that produced this value;
/// the pipeline only ever hands the channel back to that same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    /// Generated channel identifier.
    pub id: ChannelId,
    /// IRI of the producing channel type.
    pub channel_type: String,
    /// Watched resource.
    pub topic: String,
    /// Resource state known to the client.
    pub state: Option<String>,
    /// When notifications start.
    pub start_at: Option<DateTime<Utc>>,
    /// When the channel expires.
    pub end_at: Option<DateTime<Utc>>,
    /// Minimum interval between notifications.
    pub rate: Option<Duration>,
    /// Requested notification media type.
    pub accept: Option<String>,
    /// Delivery parameters.
    pub delivery: ChannelDelivery,
}

impl NotificationChannel {
    /// Whether both channels describe the same subscription.
    ///
    /// Compares every field a client can supply; the generated id and the
    /// fields derived from it (`receive_from`) are ignored.
    pub fn same_subscription(&self, other: &Self) -> bool {
        let same_delivery = match (&self.delivery, &other.delivery) {
            (ChannelDelivery::WebSocket { .. }, ChannelDelivery::WebSocket { .. }) => true,
            (
                ChannelDelivery::Webhook { target, sender },
                ChannelDelivery::Webhook {
                    target: other_target,
                    sender: other_sender,
                },
            ) => target == other_target && sender == other_sender,
            _ => false,
        };

        same_delivery
            && self.channel_type == other.channel_type
            && self.topic == other.topic
            && self.state == other.state
            && self.start_at == other.start_at
            && self.end_at == other.end_at
            && self.rate == other.rate
            && self.accept == other.accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(id: &str, target: &str) -> NotificationChannel {
        NotificationChannel {
            id: ChannelId::new(id),
            channel_type: "urn:type:webhook".to_string(),
            topic: "https://pod.example/data/".to_string(),
            state: None,
            start_at: None,
            end_at: None,
            rate: Some(Duration::from_secs(5)),
            accept: None,
            delivery: ChannelDelivery::Webhook {
                target: target.to_string(),
                sender: None,
            },
        }
    }

    #[test]
    fn test_same_subscription_ignores_id() {
        let a = webhook("urn:id:1", "https://hook.example/");
        let b = webhook("urn:id:2", "https://hook.example/");
        assert!(a.same_subscription(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_subscription_compares_delivery() {
        let a = webhook("urn:id:1", "https://hook.example/");
        let b = webhook("urn:id:1", "https://other.example/");
        assert!(!a.same_subscription(&b));

        let mut c = a.clone();
        c.delivery = ChannelDelivery::WebSocket {
            receive_from: "wss://pod.example/ws/1".to_string(),
        };
        assert!(!a.same_subscription(&c));
        assert_eq!(c.delivery.kind(), "websocket");
    }
}
