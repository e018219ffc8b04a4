//! Per-key authorization policy.
//!
//! Every key record carries exactly one [`Authorizer`]. The set of variants is
//! closed: a key is gated either by role claims or by email claims, never
//! both. Authorizers are populated once while the registry loads and are
//! read-only afterwards.

use std::collections::HashSet;

use crate::identity::CallerIdentity;

/// Grants access to callers holding at least one authorized role.
///
/// Role names compare exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAuthorizer {
    roles: HashSet<String>,
}

impl RoleAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize an additional role. Adding a role twice has no effect.
    pub fn add_role(&mut self, role: impl Into<String>) {
        self.roles.insert(role.into());
    }

    /// True iff the caller's role claims intersect the authorized roles.
    pub fn is_authorized(&self, identity: &CallerIdentity) -> bool {
        identity.roles.iter().any(|role| self.roles.contains(role))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Grants access to callers whose email claim is on the list.
///
/// Addresses compare ASCII-case-insensitively with surrounding whitespace
/// trimmed; they are stored in normalized form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAuthorizer {
    emails: HashSet<String>,
}

impl EmailAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize an additional address. Adding an address twice has no effect.
    pub fn add_email(&mut self, email: &str) {
        self.emails.insert(normalize_email(email));
    }

    /// True iff the caller carries an email claim matching an entry.
    pub fn is_authorized(&self, identity: &CallerIdentity) -> bool {
        identity
            .email
            .as_deref()
            .map(|email| self.emails.contains(&normalize_email(email)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// The policy attached to a key record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorizer {
    Role(RoleAuthorizer),
    Email(EmailAuthorizer),
}

impl Authorizer {
    /// May this caller use the key?
    pub fn is_authorized(&self, identity: &CallerIdentity) -> bool {
        match self {
            Self::Role(auth) => auth.is_authorized(identity),
            Self::Email(auth) => auth.is_authorized(identity),
        }
    }

    /// Short label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "role",
            Self::Email(_) => "email",
        }
    }

    /// Build a role authorizer from a list of role names.
    pub fn from_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut auth = RoleAuthorizer::new();
        for role in roles {
            auth.add_role(role);
        }
        Self::Role(auth)
    }

    /// Build an email authorizer from a list of addresses.
    pub fn from_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut auth = EmailAuthorizer::new();
        for email in emails {
            auth.add_email(email.as_ref());
        }
        Self::Email(auth)
    }
}
