//! Authorization boundary.
//!
//! The decision engine itself lives outside this crate; the pipeline only
//! needs `authorize(credentials, access map) -> allow | deny`.

pub mod memory;

use async_trait::async_trait;

use crate::error::AuthorizationError;
use crate::types::{AccessMap, Credentials};

pub use memory::{InMemoryAuthorizer, Principal};

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// Every requested mode is granted.
    Allow,
    /// At least one mode is missing.
    Deny(AuthorizationError),
}

impl AuthorizationDecision {
    /// Whether access is granted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Trait for authorization backends.
///
/// Implementations may perform I/O. They must answer for the whole map:
/// a partial grant is a deny.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Decide whether `credentials` hold every mode in `modes`.
    async fn authorize(&self, credentials: &Credentials, modes: &AccessMap)
        -> AuthorizationDecision;
}

/// Authorizer that grants everything. Development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(
        &self,
        _credentials: &Credentials,
        _modes: &AccessMap,
    ) -> AuthorizationDecision {
        AuthorizationDecision::Allow
    }
}
