//! Post-commit state notification hook.
//!
//! When a client subscribes with a known `state`, the server owes it one
//! notification describing the current state once the channel is committed.
//! Sending it is a transport concern; channel types only hand the channel to
//! a [`StateNotifier`].

use async_trait::async_trait;
use tracing::info;

use crate::types::{ChannelDelivery, NotificationChannel};

/// Error raised by a notifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifierError {
    /// Delivery target refused or could not be reached.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Emits the initial state notification of a committed channel.
#[async_trait]
pub trait StateNotifier: Send + Sync {
    /// Notify the channel's target of the current topic state.
    async fn emit_state(&self, channel: &NotificationChannel) -> Result<(), NotifierError>;
}

/// Notifier that records the notification as a tracing event.
///
/// Used when no transport is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl StateNotifier for TracingNotifier {
    async fn emit_state(&self, channel: &NotificationChannel) -> Result<(), NotifierError> {
        let endpoint = match &channel.delivery {
            ChannelDelivery::Webhook { target, .. } => target.as_str(),
            ChannelDelivery::WebSocket { receive_from } => receive_from.as_str(),
        };
        info!(
            target: "notification_channels::notifier",
            channel_id = %channel.id,
            topic = %channel.topic,
            state = channel.state.as_deref().unwrap_or(""),
            delivery = %endpoint,
            "initial state notification"
        );
        Ok(())
    }
}
