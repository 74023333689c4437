//! In-memory authorizer for testing and single-node development.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use super::{AuthorizationDecision, Authorizer};
use crate::error::AuthorizationError;
use crate::types::{AccessMap, AccessMode, Credentials};

/// Who a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Principal {
    /// Everyone, including anonymous requests.
    Public,
    /// Any authenticated agent.
    Authenticated,
    /// One agent, by WebID.
    Agent(String),
}

/// Grants keyed by resource.
///
/// A grant on a container (IRI ending in `/`) also applies to everything
/// below it. Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthorizer {
    grants: BTreeMap<String, BTreeMap<Principal, BTreeSet<AccessMode>>>,
}

impl InMemoryAuthorizer {
    /// Create an authorizer with no grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `modes` on `resource` to `principal`.
    pub fn grant(
        &mut self,
        resource: impl Into<String>,
        principal: Principal,
        modes: impl IntoIterator<Item = AccessMode>,
    ) -> &mut Self {
        self.grants
            .entry(resource.into())
            .or_default()
            .entry(principal)
            .or_default()
            .extend(modes);
        self
    }

    /// Modes `credentials` hold on `resource`, including inherited grants.
    pub fn granted(&self, credentials: &Credentials, resource: &str) -> BTreeSet<AccessMode> {
        let mut modes = BTreeSet::new();
        for (granted_on, principals) in &self.grants {
            let applies = granted_on == resource
                || (granted_on.ends_with('/') && resource.starts_with(granted_on.as_str()));
            if !applies {
                continue;
            }
            for (principal, granted) in principals {
                let matches = match principal {
                    Principal::Public => true,
                    Principal::Authenticated => !credentials.is_anonymous(),
                    Principal::Agent(web_id) => credentials.web_id() == Some(web_id.as_str()),
                };
                if matches {
                    modes.extend(granted.iter().copied());
                }
            }
        }
        modes
    }
}

#[async_trait]
impl Authorizer for InMemoryAuthorizer {
    async fn authorize(
        &self,
        credentials: &Credentials,
        modes: &AccessMap,
    ) -> AuthorizationDecision {
        for (resource, required) in modes.iter() {
            let granted = self.granted(credentials, resource);
            let missing: Vec<String> = required
                .difference(&granted)
                .map(|mode| mode.to_string())
                .collect();
            if missing.is_empty() {
                continue;
            }
            let reason = format!("missing {} on {resource}", missing.join(", "));
            return AuthorizationDecision::Deny(if credentials.is_anonymous() {
                AuthorizationError::Unauthenticated(reason)
            } else {
                AuthorizationError::Forbidden(reason)
            });
        }
        AuthorizationDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "https://alice.example/profile#me";

    fn authorizer() -> InMemoryAuthorizer {
        let mut authz = InMemoryAuthorizer::new();
        authz
            .grant("https://pod.example/public/", Principal::Public, [AccessMode::Read])
            .grant(
                "https://pod.example/private/",
                Principal::Agent(ALICE.into()),
                [AccessMode::Read, AccessMode::Write],
            );
        authz
    }

    #[tokio::test]
    async fn test_public_read_inherited() {
        let decision = authorizer()
            .authorize(
                &Credentials::anonymous(),
                &AccessMap::single("https://pod.example/public/doc", [AccessMode::Read]),
            )
            .await;
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_anonymous_denied_is_unauthenticated() {
        let decision = authorizer()
            .authorize(
                &Credentials::anonymous(),
                &AccessMap::single("https://pod.example/private/doc", [AccessMode::Read]),
            )
            .await;
        assert!(matches!(
            decision,
            AuthorizationDecision::Deny(AuthorizationError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_other_agent_denied_is_forbidden() {
        let decision = authorizer()
            .authorize(
                &Credentials::for_agent("https://bob.example/profile#me"),
                &AccessMap::single("https://pod.example/private/doc", [AccessMode::Read]),
            )
            .await;
        assert!(matches!(
            decision,
            AuthorizationDecision::Deny(AuthorizationError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_grant_is_deny() {
        let decision = authorizer()
            .authorize(
                &Credentials::for_agent(ALICE),
                &AccessMap::single(
                    "https://pod.example/private/doc",
                    [AccessMode::Read, AccessMode::Control],
                ),
            )
            .await;
        let AuthorizationDecision::Deny(AuthorizationError::Forbidden(reason)) = decision else {
            panic!("expected forbidden");
        };
        assert!(reason.contains("control"));
    }

    #[test]
    fn test_container_prefix_does_not_leak_to_siblings() {
        let authz = authorizer();
        assert!(authz
            .granted(&Credentials::anonymous(), "https://pod.example/publicity")
            .is_empty());
    }
}
