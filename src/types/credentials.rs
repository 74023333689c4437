//! Caller credentials.
//!
//! Produced upstream by the authentication layer. The registry and pipeline
//! only pass them through; channel types may read the agent WebID to fill
//! identity-derived defaults, and the authorizer makes decisions on them.

use serde::{Deserialize, Serialize};

/// The agent (user) making the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCredential {
    /// WebID of the agent.
    pub web_id: String,
}

/// The client application making the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredential {
    /// Client identifier.
    pub client_id: String,
}

/// The identity provider that issued the agent's token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerCredential {
    /// Issuer URL.
    pub url: String,
}

/// Credentials of a request. All parts are optional; an empty value is an
/// anonymous request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Authenticated agent.
    pub agent: Option<AgentCredential>,
    /// Client application.
    pub client: Option<ClientCredential>,
    /// Token issuer.
    pub issuer: Option<IssuerCredential>,
}

impl Credentials {
    /// Anonymous credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Credentials for an agent identified by WebID.
    pub fn for_agent(web_id: impl Into<String>) -> Self {
        Self {
            agent: Some(AgentCredential {
                web_id: web_id.into(),
            }),
            ..Self::default()
        }
    }

    /// Attach a client identifier.
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client = Some(ClientCredential {
            client_id: client_id.into(),
        });
        self
    }

    /// WebID of the agent, if authenticated.
    pub fn web_id(&self) -> Option<&str> {
        self.agent.as_ref().map(|a| a.web_id.as_str())
    }

    /// Whether no agent is authenticated.
    pub fn is_anonymous(&self) -> bool {
        self.agent.is_none()
    }
}
