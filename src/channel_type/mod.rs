//! Channel types.
//!
//! A channel type is one notification transport (socket push, webhook, ...)
//! with its own payload rules. Every type implements
//! [`NotificationChannelType`]; the pipeline depends on nothing else.
//!
//! ## Lifecycle
//!
//! ```text
//! describe ─┐
//!           ├─ construct(graph, credentials) → NotificationChannel
//!           ├─ extract_modes(channel)        → AccessMap   (authorizer)
//!           ├─ serialize(channel)            → JSON-LD     (response body)
//!           └─ finalize(channel)                           (after response)
//! ```
//!
//! Every function taking a [`NotificationChannel`] only has to support
//! channels produced by `construct` on the same type. Implementations hold
//! no mutable state and may be called concurrently.

pub mod base;
pub mod webhook;
pub mod websocket;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ChannelMismatch, FinalizeError, ValidationError};
use crate::types::vocab::RDF_TYPE;
use crate::types::{AccessMap, Credentials, Graph, NotificationChannel, SubscriptionService, Term};

pub use base::{BaseChannelType, CommonFields};
pub use webhook::WebhookChannel2023;
pub use websocket::WebSocketChannel2023;

/// Capability set of a notification channel type.
#[async_trait]
pub trait NotificationChannelType: Send + Sync {
    /// IRI identifying this channel type; the registry key and the tag
    /// carried by every channel this type produces.
    fn channel_type(&self) -> &str;

    /// Discovery description. Pure; returns an equal value on every call.
    fn describe(&self) -> SubscriptionService;

    /// Validate the payload and build a channel.
    ///
    /// Must not make access decisions; `credentials` may only fill
    /// identity-derived fields.
    async fn construct(
        &self,
        data: &Graph,
        credentials: &Credentials,
    ) -> Result<NotificationChannel, ValidationError>;

    /// JSON-LD representation of a channel produced by this type.
    fn serialize(&self, channel: &NotificationChannel) -> Result<Value, ChannelMismatch>;

    /// Minimal access required to allow the channel.
    fn extract_modes(&self, channel: &NotificationChannel) -> AccessMap;

    /// Runs once, after the serialized channel has been returned.
    async fn finalize(&self, channel: &NotificationChannel) -> Result<(), FinalizeError> {
        let _ = channel;
        Ok(())
    }
}

/// Shallow read of the channel types a payload asks for.
///
/// Finds the single subject carrying `rdf:type` and returns its type IRIs
/// in canonical order. Does not look at any other statement.
pub fn requested_channel_types(data: &Graph) -> Result<Vec<String>, ValidationError> {
    let subject = typed_subject(data)?;
    Ok(data
        .objects(subject, RDF_TYPE)
        .into_iter()
        .filter_map(Term::as_iri)
        .map(str::to_string)
        .collect())
}

/// The one subject of the payload that carries a type.
pub fn typed_subject(data: &Graph) -> Result<&Term, ValidationError> {
    let subjects = data.subjects_with(RDF_TYPE);
    let mut iter = subjects.into_iter();
    match (iter.next(), iter.next()) {
        (Some(subject), None) => Ok(subject),
        (None, _) => Err(ValidationError::missing("type")),
        (Some(_), Some(_)) => Err(ValidationError::field(
            "type",
            "payload describes more than one typed subject",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::vocab::notify;

    #[test]
    fn test_requested_types() {
        let mut graph = Graph::new();
        let subject = Term::blank("b0");
        graph.add(subject.clone(), RDF_TYPE, Term::named(notify("WebhookChannel2023")));
        graph.add(subject, notify("topic"), Term::named("https://pod.example/"));
        assert_eq!(
            requested_channel_types(&graph).unwrap(),
            vec![notify("WebhookChannel2023")]
        );
    }

    #[test]
    fn test_missing_type_is_validation_error() {
        let mut graph = Graph::new();
        graph.add(Term::blank("b0"), notify("topic"), Term::named("https://pod.example/"));
        let err = requested_channel_types(&graph).unwrap_err();
        assert!(err.is_for("type"));
    }

    #[test]
    fn test_two_typed_subjects_rejected() {
        let mut graph = Graph::new();
        graph.add(Term::blank("a"), RDF_TYPE, Term::named("urn:t"));
        graph.add(Term::blank("b"), RDF_TYPE, Term::named("urn:t"));
        assert!(typed_subject(&graph).unwrap_err().is_for("type"));
    }
}
