//! Request-time key access.
//!
//! These are the two operations a request handler performs against the
//! registry:
//! 1. Publish the active public key of a logical name so clients can wrap
//!    content keys under it.
//! 2. Decrypt a wrapped payload with a specific key version, after the key's
//!    authorizer has granted the caller access.
//!
//! Plaintext exists only in the returned buffer, which is zeroised on drop.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::Result;
use crate::identity::CallerIdentity;
use crate::registry::{KeyRegistry, KID_SEPARATOR};

/// The public key as published to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedKey {
    pub kty: String,
    /// Base64 modulus.
    pub n: String,
    pub e: u32,
    pub alg: String,
    /// `{name}/{key id}`; clients send it back to select the version.
    pub kid: String,
}

/// Client cache policy for a published key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub exp: DateTime<Utc>,
}

/// Response body for a public key request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub key: PublishedKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,
}

/// Publish the active public key for `name`.
///
/// Not authorization-gated: anyone who may wrap content for this key needs
/// the public half. `now` anchors the cache expiry.
pub fn public_key(registry: &KeyRegistry, name: &str, now: DateTime<Utc>) -> Result<PublicKeyResponse> {
    let record = registry.get_active_key(name)?;
    let public = record.backend().public_key()?;

    let cache = record
        .cache_expiration_days()
        .and_then(Duration::try_days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .map(|exp| CachePolicy { exp });

    Ok(PublicKeyResponse {
        key: PublishedKey {
            kty: record.key_type().to_string(),
            n: public.modulus_base64(),
            e: public.exponent(),
            alg: record.algorithm().to_string(),
            kid: format!("{name}{KID_SEPARATOR}{}", record.key_id()),
        },
        cache,
    })
}

/// Decrypt `ciphertext` with version `key_id` of `name` on behalf of
/// `identity`.
///
/// Resolution happens before authorization, so an unknown key reports
/// `KeyNotFound` and a known key the caller may not use reports
/// `Unauthorized`.
pub fn decrypt(
    registry: &KeyRegistry,
    name: &str,
    key_id: &str,
    identity: &CallerIdentity,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let record = registry.get_key(name, key_id)?;
    record.authorize(identity)?;

    tracing::debug!(name, key_id, principal = %identity.principal, "decrypting payload");
    record.backend().decrypt(ciphertext)
}
