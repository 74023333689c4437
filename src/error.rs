//! Error taxonomy of the subscription pipeline.

use crate::types::{DurationError, JsonLdError};

/// A payload failed structural or semantic validation.
///
/// `field` names the offending term (compact form) where one can be pinned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {}: {message}", field_label(.field))]
pub struct ValidationError {
    /// Offending field.
    pub field: Option<String>,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    /// Error on a specific field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Error on the payload as a whole.
    pub fn payload(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// A required field is absent.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::field(field, "required field is missing")
    }

    /// A field is present but not understood by the channel type.
    pub fn unsupported(field: impl Into<String>) -> Self {
        Self::field(field, "unsupported parameter")
    }

    /// Whether this error names `field`.
    pub fn is_for(&self, field: &str) -> bool {
        self.field.as_deref() == Some(field)
    }
}

fn field_label(field: &Option<String>) -> String {
    match field {
        Some(f) => format!("`{f}`"),
        None => "payload".to_string(),
    }
}

impl From<JsonLdError> for ValidationError {
    fn from(err: JsonLdError) -> Self {
        match &err {
            JsonLdError::UnsupportedValue { key } => Self::field(key.clone(), err.to_string()),
            _ => Self::payload(err.to_string()),
        }
    }
}

impl ValidationError {
    /// Wrap a duration parse failure on `field`.
    pub fn duration(field: impl Into<String>, err: DurationError) -> Self {
        Self::field(field, err.to_string())
    }
}

/// The authorizer denied the access map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// No usable credentials were presented.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Credentials are valid but lack the required access.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// A channel type's registry lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported channel type: {0}")]
pub struct UnsupportedChannelType(pub String);

/// A channel was handed to a channel type that did not produce it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("channel of type {found} given to {expected}")]
pub struct ChannelMismatch {
    /// Type that was asked to handle the channel.
    pub expected: String,
    /// Type tag carried by the channel.
    pub found: String,
}

/// Post-response step failed. Never reaches the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FinalizeError {
    /// The state notifier rejected the initial notification.
    #[error("notifier failed: {0}")]
    Notifier(#[from] crate::notifier::NotifierError),
    /// The channel does not belong to the finalizing type.
    #[error(transparent)]
    Mismatch(#[from] ChannelMismatch),
}

/// Error type for subscription requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// Requested channel type is not registered.
    #[error(transparent)]
    UnsupportedChannelType(#[from] UnsupportedChannelType),
    /// Payload was rejected by the channel type.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Authorizer denied the request.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// Caller cancelled before authorization completed.
    #[error("request cancelled")]
    Cancelled,
    /// Authorizer did not answer in time.
    #[error("authorization timed out")]
    AuthorizationTimeout,
    /// Invariant violation inside the server; not a client error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SubscriptionError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedChannelType(_) => "UNSUPPORTED_CHANNEL_TYPE",
            Self::Validation(_) => "INVALID_PAYLOAD",
            Self::Authorization(AuthorizationError::Unauthenticated(_)) => "UNAUTHENTICATED",
            Self::Authorization(AuthorizationError::Forbidden(_)) => "FORBIDDEN",
            Self::Cancelled => "CANCELLED",
            Self::AuthorizationTimeout => "AUTHORIZATION_TIMEOUT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedChannelType(_) | Self::Validation(_) | Self::Authorization(_)
        )
    }
}

impl From<ChannelMismatch> for SubscriptionError {
    fn from(err: ChannelMismatch) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_names_field() {
        assert_eq!(
            ValidationError::missing("target").to_string(),
            "invalid `target`: required field is missing"
        );
        assert_eq!(
            ValidationError::payload("no typed subject").to_string(),
            "invalid payload: no typed subject"
        );
        assert!(ValidationError::missing("target").is_for("target"));
    }

    #[test]
    fn test_json_ld_errors_keep_the_key() {
        let err: ValidationError = JsonLdError::UnsupportedValue {
            key: "topic".to_string(),
        }
        .into();
        assert!(err.is_for("topic"));
        let err: ValidationError = JsonLdError::NotAnObject.into();
        assert_eq!(err.field, None);
    }

    #[test]
    fn test_codes_are_distinct_per_auth_kind() {
        let unauth = SubscriptionError::from(AuthorizationError::Unauthenticated("x".into()));
        let forbidden = SubscriptionError::from(AuthorizationError::Forbidden("x".into()));
        assert_ne!(unauth.code(), forbidden.code());
        assert!(unauth.is_client_error());
        assert!(!SubscriptionError::Cancelled.is_client_error());
        assert!(!SubscriptionError::from(ChannelMismatch {
            expected: "a".into(),
            found: "b".into(),
        })
        .is_client_error());
    }
}
