//! Caller identity as seen by authorizers.

use std::collections::HashSet;

/// The authenticated caller presenting a request.
///
/// Produced by the transport layer after authentication; the registry treats
/// it as opaque apart from the claims authorizers inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Authenticated principal identifier.
    pub principal: String,
    /// Role claims carried by the caller.
    pub roles: HashSet<String>,
    /// Email claim, if the token carried one.
    pub email: Option<String>,
}

impl CallerIdentity {
    /// Create an identity with no claims.
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            ..Self::default()
        }
    }

    /// Add a role claim.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Set the email claim.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
