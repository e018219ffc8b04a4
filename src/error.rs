//! Error types for the key registry.
//!
//! Each variant is a distinct failure mode of loading or using a key. Error
//! messages are intentionally minimal: they signal *what* failed without
//! revealing *why* in ways that could leak cryptographic state. In particular
//! `DecryptionFailure` never distinguishes padding errors from other
//! ciphertext defects.

use thiserror::Error;

/// The single error type for all registry operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyStoreError {
    /// Key definitions are missing, malformed or contradictory. Raised only
    /// while loading; always fatal to startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The logical name, the version, or the provider handle could not be
    /// found.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The ciphertext failed cryptographic validation.
    #[error("decryption failed")]
    DecryptionFailure,

    /// Wrapping a payload under a public key failed (payload too long for
    /// the modulus, or the public key itself is unusable).
    #[error("encryption failed")]
    EncryptionFailure,

    /// The key's authorizer denied the caller.
    #[error("caller is not authorized to use this key")]
    Unauthorized,

    /// The key provider failed for a reason other than a missing key.
    #[error("key provider failure: {0}")]
    Provider(String),
}

impl KeyStoreError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for failures a caller may reasonably retry.
    ///
    /// Only provider failures qualify; misconfiguration and missing keys do
    /// not resolve by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = KeyStoreError> = std::result::Result<T, E>;
