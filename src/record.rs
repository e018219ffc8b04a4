//! Key records: one loaded key version with its policy.

use crate::authz::Authorizer;
use crate::backend::KeyBackend;
use crate::error::{KeyStoreError, Result};
use crate::identity::CallerIdentity;

/// Key type reported for every key.
pub const KEY_TYPE: &str = "RSA";

/// Algorithm reported for every key.
pub const ALGORITHM: &str = "RS256";

/// A backend bound to its metadata and authorization policy.
///
/// Owned by the registry and immutable after construction.
#[derive(Debug)]
pub struct KeyRecord {
    backend: KeyBackend,
    key_id: String,
    authorizer: Authorizer,
    cache_expiration_days: Option<i64>,
}

impl KeyRecord {
    /// Bind a backend to its policy.
    ///
    /// Fails with a configuration error if no authorizer is supplied; a key
    /// without policy is never served.
    pub fn new(
        backend: KeyBackend,
        key_id: impl Into<String>,
        authorizer: Option<Authorizer>,
        cache_expiration_days: Option<i64>,
    ) -> Result<Self> {
        let key_id = key_id.into();
        let authorizer = authorizer.ok_or_else(|| {
            KeyStoreError::config(format!("key {key_id} has no authorizer configured"))
        })?;

        Ok(Self {
            backend,
            key_id,
            authorizer,
            cache_expiration_days,
        })
    }

    pub fn backend(&self) -> &KeyBackend {
        &self.backend
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_type(&self) -> &'static str {
        KEY_TYPE
    }

    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// How long clients may cache the public key, if limited.
    pub fn cache_expiration_days(&self) -> Option<i64> {
        self.cache_expiration_days
    }

    /// Check the caller against this key's policy.
    pub fn authorize(&self, identity: &CallerIdentity) -> Result<()> {
        if self.authorizer.is_authorized(identity) {
            Ok(())
        } else {
            tracing::warn!(
                key_id = %self.key_id,
                principal = %identity.principal,
                policy = self.authorizer.kind(),
                "access to key denied"
            );
            Err(KeyStoreError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SoftwareKey, SoftwareKeyring};

    fn backend(id: &str) -> KeyBackend {
        KeyBackend::Software(SoftwareKey::new(id, &SoftwareKeyring::new()))
    }

    #[test]
    fn test_missing_authorizer_fails_closed() {
        let err = KeyRecord::new(backend("k1"), "k1", None, None).unwrap_err();
        assert!(matches!(err, KeyStoreError::Configuration(ref msg) if msg.contains("k1")));
    }

    #[test]
    fn test_fixed_metadata() {
        let record = KeyRecord::new(
            backend("k1"),
            "k1",
            Some(Authorizer::from_roles(["ops"])),
            Some(2),
        )
        .unwrap();

        assert_eq!(record.key_id(), "k1");
        assert_eq!(record.key_type(), "RSA");
        assert_eq!(record.algorithm(), "RS256");
        assert_eq!(record.cache_expiration_days(), Some(2));
        assert_eq!(record.backend().key_id(), "k1");
    }

    #[test]
    fn test_authorize_delegates_to_policy() {
        let record = KeyRecord::new(
            backend("k1"),
            "k1",
            Some(Authorizer::from_emails(["a@example.com"])),
            None,
        )
        .unwrap();

        assert!(record
            .authorize(&CallerIdentity::new("u").with_email("a@example.com"))
            .is_ok());
        assert!(matches!(
            record.authorize(&CallerIdentity::new("u").with_email("b@example.com")),
            Err(KeyStoreError::Unauthorized)
        ));
    }
}
