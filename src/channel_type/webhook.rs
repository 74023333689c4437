//! `WebhookChannel2023`: the server POSTs notifications to a client-supplied
//! `target`.
//!
//! `sender` defaults to the requesting agent's WebID so the receiver can tell
//! on whose behalf notifications arrive. When the client subscribes with a
//! known `state`, finalize asks the [`StateNotifier`] to send the current
//! state once the channel is committed.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::NotificationConfig;
use crate::error::{ChannelMismatch, FinalizeError, ValidationError};
use crate::notifier::{StateNotifier, TracingNotifier};
use crate::types::{
    AccessMap, ChannelDelivery, Credentials, Graph, NotificationChannel, SubscriptionService,
};

use super::base::{optional_iri, required_iri};
use super::{BaseChannelType, NotificationChannelType};

/// Webhook channel type.
#[derive(Clone)]
pub struct WebhookChannel2023 {
    base: BaseChannelType,
    notifier: Arc<dyn StateNotifier>,
}

impl std::fmt::Debug for WebhookChannel2023 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookChannel2023")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl WebhookChannel2023 {
    /// Create the channel type from configuration with a tracing notifier.
    pub fn new(config: &NotificationConfig) -> Self {
        Self::with_notifier(config.webhook_type.clone(), config, Arc::new(TracingNotifier))
    }

    /// Create the channel type under a custom IRI and notifier.
    pub fn with_notifier(
        channel_type: impl Into<String>,
        config: &NotificationConfig,
        notifier: Arc<dyn StateNotifier>,
    ) -> Self {
        Self {
            base: BaseChannelType::new(channel_type, config),
            notifier,
        }
    }
}

#[async_trait]
impl NotificationChannelType for WebhookChannel2023 {
    fn channel_type(&self) -> &str {
        self.base.channel_type()
    }

    fn describe(&self) -> SubscriptionService {
        self.base.service().clone()
    }

    async fn construct(
        &self,
        data: &Graph,
        credentials: &Credentials,
    ) -> Result<NotificationChannel, ValidationError> {
        let fields = self.base.parse_common(data, &["target", "sender"])?;

        let target = required_iri(data, &fields.subject, "target")?;
        match url::Url::parse(&target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ValidationError::field("target", "must be an http(s) URL")),
        }

        let sender = match optional_iri(data, &fields.subject, "sender")? {
            Some(sender) => Some(sender),
            None => credentials.web_id().map(str::to_string),
        };

        let (id, _) = self.base.generate_id();
        Ok(NotificationChannel {
            id,
            channel_type: self.base.channel_type().to_string(),
            topic: fields.topic,
            state: fields.state,
            start_at: fields.start_at,
            end_at: fields.end_at,
            rate: fields.rate,
            accept: fields.accept,
            delivery: ChannelDelivery::Webhook { target, sender },
        })
    }

    fn serialize(&self, channel: &NotificationChannel) -> Result<Value, ChannelMismatch> {
        self.base.ensure_owned(channel)?;
        let mut doc = self.base.serialize_common(channel);
        if let ChannelDelivery::Webhook { target, sender } = &channel.delivery {
            doc.insert("target".into(), json!(target));
            if let Some(sender) = sender {
                doc.insert("sender".into(), json!(sender));
            }
        }
        Ok(Value::Object(doc))
    }

    fn extract_modes(&self, channel: &NotificationChannel) -> AccessMap {
        self.base.extract_modes(channel)
    }

    async fn finalize(&self, channel: &NotificationChannel) -> Result<(), FinalizeError> {
        self.base.ensure_owned(channel)?;
        if channel.state.is_some() {
            self.notifier.emit_state(channel).await?;
        }
        Ok(())
    }
}
