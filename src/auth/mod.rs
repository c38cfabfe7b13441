//! Caller identity and role gating.

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub mod rbac;

pub use rbac::{authorize, Action, Role, STAFF};

/// An authenticated caller as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    pub fn is_staff(&self) -> bool {
        authorize(self.role, STAFF)
    }
}

/// Source of the current caller. The core trusts whatever it returns.
pub trait IdentityProvider: Send + Sync {
    /// `None` when the caller is not authenticated.
    fn current(&self) -> Option<Principal>;
}

/// Fixed identity, e.g. taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    principal: Option<Principal>,
}

impl StaticIdentityProvider {
    pub fn new(principal: Option<Principal>) -> Self {
        Self { principal }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current(&self) -> Option<Principal> {
        self.principal.clone()
    }
}

/// Checks that `principal` may perform `action`.
pub fn require(principal: Option<&Principal>, action: Action) -> Result<(), ServiceError> {
    let principal = principal
        .ok_or_else(|| ServiceError::Unauthorized(format!("sign in to perform {}", action)))?;
    rbac::check(principal.role, action)
}
