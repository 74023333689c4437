//! `WebSocketChannel2023`: notifications are pushed over a socket the client
//! opens on the generated `receiveFrom` URL.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::NotificationConfig;
use crate::error::{ChannelMismatch, ValidationError};
use crate::types::{
    AccessMap, ChannelDelivery, Credentials, Graph, NotificationChannel, SubscriptionService,
};

use super::{BaseChannelType, NotificationChannelType};

/// Socket push channel type.
#[derive(Debug, Clone)]
pub struct WebSocketChannel2023 {
    base: BaseChannelType,
    websocket_base: String,
}

impl WebSocketChannel2023 {
    /// Create the channel type from configuration.
    pub fn new(config: &NotificationConfig) -> Self {
        Self::with_type(config.websocket_type.clone(), config)
    }

    /// Create the channel type under a custom channel-type IRI.
    pub fn with_type(channel_type: impl Into<String>, config: &NotificationConfig) -> Self {
        Self {
            base: BaseChannelType::new(channel_type, config),
            websocket_base: config.websocket_base.clone(),
        }
    }
}

#[async_trait]
impl NotificationChannelType for WebSocketChannel2023 {
    fn channel_type(&self) -> &str {
        self.base.channel_type()
    }

    fn describe(&self) -> SubscriptionService {
        self.base.service().clone()
    }

    async fn construct(
        &self,
        data: &Graph,
        _credentials: &Credentials,
    ) -> Result<NotificationChannel, ValidationError> {
        let fields = self.base.parse_common(data, &["receiveFrom"])?;
        let (id, uuid) = self.base.generate_id();

        Ok(NotificationChannel {
            id,
            channel_type: self.base.channel_type().to_string(),
            topic: fields.topic,
            state: fields.state,
            start_at: fields.start_at,
            end_at: fields.end_at,
            rate: fields.rate,
            accept: fields.accept,
            delivery: ChannelDelivery::WebSocket {
                receive_from: format!("{}{}", self.websocket_base, uuid),
            },
        })
    }

    fn serialize(&self, channel: &NotificationChannel) -> Result<Value, ChannelMismatch> {
        self.base.ensure_owned(channel)?;
        let mut doc = self.base.serialize_common(channel);
        if let ChannelDelivery::WebSocket { receive_from } = &channel.delivery {
            doc.insert("receiveFrom".into(), json!(receive_from));
        }
        Ok(Value::Object(doc))
    }

    fn extract_modes(&self, channel: &NotificationChannel) -> AccessMap {
        self.base.extract_modes(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccessMode;
    use serde_json::json;

    fn channel_type() -> WebSocketChannel2023 {
        WebSocketChannel2023::new(&NotificationConfig::with_base_url("https://pod.example/"))
    }

    #[tokio::test]
    async fn test_construct_generates_socket_url() {
        let ty = channel_type();
        let graph = Graph::from_json_ld(&json!({
            "type": "WebSocketChannel2023",
            "topic": "https://pod.example/data/",
        }))
        .unwrap();

        let channel = ty.construct(&graph, &Credentials::anonymous()).await.unwrap();
        let ChannelDelivery::WebSocket { receive_from } = &channel.delivery else {
            panic!("expected a socket channel");
        };
        assert!(receive_from.starts_with("wss://pod.example/.notifications/WebSocketChannel2023/"));
        assert!(channel
            .id
            .as_str()
            .starts_with("https://pod.example/.notifications/WebSocketChannel2023/"));

        let modes = ty.extract_modes(&channel);
        assert_eq!(modes.len(), 1);
        assert!(modes.requires("https://pod.example/data/", AccessMode::Read));
        assert!(!modes.requires("https://pod.example/data/", AccessMode::Write));
    }

    #[tokio::test]
    async fn test_serialize_includes_receive_from() {
        let ty = channel_type();
        let graph = Graph::from_json_ld(&json!({
            "type": "WebSocketChannel2023",
            "topic": "https://pod.example/data/",
            "state": "etag-7",
        }))
        .unwrap();
        let channel = ty.construct(&graph, &Credentials::anonymous()).await.unwrap();
        let doc = ty.serialize(&channel).unwrap();

        assert_eq!(doc["type"], "WebSocketChannel2023");
        assert_eq!(doc["state"], "etag-7");
        assert_eq!(doc["id"], channel.id.as_str());
        assert!(doc["receiveFrom"].as_str().is_some());
    }

    #[test]
    fn test_describe_is_stable() {
        let ty = channel_type();
        assert_eq!(ty.describe(), ty.describe());
        assert_eq!(ty.describe().channel_type, "WebSocketChannel2023");
    }
}
