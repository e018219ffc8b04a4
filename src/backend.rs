//! Key backends: the crypto capability a key record delegates to.
//!
//! A backend wraps one physical key and exposes exactly two operations:
//! public-key export and OAEP-SHA256 decryption. The set of backends is
//! closed:
//!
//! - [`KeyBackend::Provider`] delegates to an external key storage provider
//!   (HSM, OS key store) through the [`KeyStorageProvider`] capability. Every
//!   call opens its own [`ProviderKeyHandle`] and releases it on drop, so no
//!   handle outlives the call on any exit path.
//! - [`KeyBackend::Software`] holds RSA key material in memory and performs
//!   the same operation without provider indirection. Used in tests and in
//!   deployments without hardware.
//!
//! Construction is cheap and never contacts the provider. The public key is
//! computed on first use and cached for the lifetime of the backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use base64ct::{Base64, Encoding};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{KeyStoreError, Result};

// ---------------------------------------------------------------------------
// Public key
// ---------------------------------------------------------------------------

/// The public half of an RSA key.
///
/// Immutable once computed. Serializes the modulus as standard base64 of its
/// big-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(serialize_with = "serialize_b64", deserialize_with = "deserialize_b64")]
    modulus: Vec<u8>,
    exponent: u32,
}

impl PublicKey {
    /// Build a public key from big-endian modulus and exponent bytes.
    ///
    /// Fails if the exponent does not fit in 32 bits.
    pub fn from_parts(parts: &RsaPublicParts) -> Result<Self> {
        let exponent = crypto::exponent_to_u32(&parts.exponent)?;
        Ok(Self {
            modulus: parts.modulus.clone(),
            exponent,
        })
    }

    /// Big-endian modulus bytes.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Modulus as standard base64, the wire representation.
    pub fn modulus_base64(&self) -> String {
        Base64::encode_string(&self.modulus)
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Wrap a payload under this key with OAEP-SHA256.
    ///
    /// This is the client side of the exchange; the registry itself never
    /// encrypts.
    pub fn encrypt_oaep_sha256(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        crypto::encrypt(&self.modulus, self.exponent, plaintext)
    }
}

fn serialize_b64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&Base64::encode_string(bytes))
}

fn deserialize_b64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    Base64::decode_vec(&encoded).map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Provider capability
// ---------------------------------------------------------------------------

/// Raw public key parameters as exported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicParts {
    /// Big-endian modulus.
    pub modulus: Vec<u8>,
    /// Big-endian public exponent.
    pub exponent: Vec<u8>,
}

/// An open handle to one key inside a provider.
///
/// Dropping the handle releases it.
pub trait ProviderKeyHandle {
    /// Export the public parameters of the key.
    fn export_public(&self) -> Result<RsaPublicParts>;

    /// Decrypt an RSA-OAEP ciphertext using SHA-256.
    fn decrypt_oaep_sha256(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// An external key storage provider (HSM, platform key store).
///
/// Implementations must be safe to call from many threads at once; each call
/// to [`open`](Self::open) yields an independent handle.
pub trait KeyStorageProvider: Send + Sync {
    /// Does the provider hold a key with this id?
    fn exists(&self, key_id: &str) -> bool;

    /// Open a handle to the key. Returns `KeyNotFound` if it vanished.
    fn open(&self, key_id: &str) -> Result<Box<dyn ProviderKeyHandle + '_>>;
}

/// A key that lives inside an external provider.
pub struct ProviderKey {
    key_id: String,
    provider_name: String,
    provider: Arc<dyn KeyStorageProvider>,
    public_key: OnceLock<PublicKey>,
}

impl ProviderKey {
    pub fn new(
        key_id: impl Into<String>,
        provider_name: impl Into<String>,
        provider: Arc<dyn KeyStorageProvider>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            provider_name: provider_name.into(),
            provider,
            public_key: OnceLock::new(),
        }
    }

    fn open_handle(&self) -> Result<Box<dyn ProviderKeyHandle + '_>> {
        if !self.provider.exists(&self.key_id) {
            tracing::warn!(
                key_id = %self.key_id,
                provider = %self.provider_name,
                "key not present in provider"
            );
            return Err(KeyStoreError::KeyNotFound(format!(
                "key {} not found in {}",
                self.key_id, self.provider_name
            )));
        }
        self.provider.open(&self.key_id)
    }

    fn public_key(&self) -> Result<&PublicKey> {
        if let Some(cached) = self.public_key.get() {
            return Ok(cached);
        }

        let computed = {
            let handle = self.open_handle()?;
            PublicKey::from_parts(&handle.export_public()?)?
        };

        // A concurrent caller may have won the race; its value is identical.
        Ok(self.public_key.get_or_init(|| computed))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let handle = self.open_handle()?;
        handle
            .decrypt_oaep_sha256(ciphertext)
            .map(Zeroizing::new)
            .map_err(|err| match err {
                KeyStoreError::KeyNotFound(_) | KeyStoreError::Provider(_) => err,
                _ => KeyStoreError::DecryptionFailure,
            })
    }
}

impl fmt::Debug for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKey")
            .field("key_id", &self.key_id)
            .field("provider", &self.provider_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Software keys
// ---------------------------------------------------------------------------

/// In-memory RSA key material, indexed by key id.
///
/// Registered in a [`BackendCatalog`](crate::registry::BackendCatalog) under
/// a backend identifier, exactly like a provider.
#[derive(Clone, Default)]
pub struct SoftwareKeyring {
    keys: HashMap<String, Arc<RsaPrivateKey>>,
}

impl SoftwareKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a PEM-encoded (PKCS#8 or PKCS#1) private key under `key_id`.
    pub fn insert_pem(&mut self, key_id: impl Into<String>, pem: &str) -> Result<()> {
        let key = crypto::private_key_from_pem(pem)?;
        self.keys.insert(key_id.into(), Arc::new(key));
        Ok(())
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn get(&self, key_id: &str) -> Option<Arc<RsaPrivateKey>> {
        self.keys.get(key_id).cloned()
    }
}

impl fmt::Debug for SoftwareKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareKeyring")
            .field("key_ids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A key whose material is held in process memory.
pub struct SoftwareKey {
    key_id: String,
    material: Option<Arc<RsaPrivateKey>>,
    public_key: OnceLock<PublicKey>,
}

impl SoftwareKey {
    /// Resolve `key_id` from the keyring. Missing material is not an error
    /// here; it surfaces as `KeyNotFound` when the key is used.
    pub fn new(key_id: impl Into<String>, keyring: &SoftwareKeyring) -> Self {
        let key_id = key_id.into();
        let material = keyring.get(&key_id);
        Self {
            key_id,
            material,
            public_key: OnceLock::new(),
        }
    }

    fn material(&self) -> Result<&RsaPrivateKey> {
        self.material
            .as_deref()
            .ok_or_else(|| KeyStoreError::KeyNotFound(format!("key {} not found", self.key_id)))
    }

    fn public_key(&self) -> Result<&PublicKey> {
        if let Some(cached) = self.public_key.get() {
            return Ok(cached);
        }

        let (modulus, exponent) = crypto::public_parts(self.material()?);
        let computed = PublicKey::from_parts(&RsaPublicParts { modulus, exponent })?;
        Ok(self.public_key.get_or_init(|| computed))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        crypto::decrypt(self.material()?, ciphertext)
    }
}

impl fmt::Debug for SoftwareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareKey")
            .field("key_id", &self.key_id)
            .field("has_material", &self.material.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// The crypto capability behind a key record.
#[derive(Debug)]
pub enum KeyBackend {
    Provider(ProviderKey),
    Software(SoftwareKey),
}

impl KeyBackend {
    /// Id of the physical key this backend wraps.
    pub fn key_id(&self) -> &str {
        match self {
            Self::Provider(key) => &key.key_id,
            Self::Software(key) => &key.key_id,
        }
    }

    /// Short label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider",
            Self::Software(_) => "software",
        }
    }

    /// The public half of the key.
    ///
    /// Idempotent; cached after the first successful call. Fails with
    /// `KeyNotFound` if the key cannot be located.
    pub fn public_key(&self) -> Result<&PublicKey> {
        match self {
            Self::Provider(key) => key.public_key(),
            Self::Software(key) => key.public_key(),
        }
    }

    /// Decrypt an RSA-OAEP (SHA-256) ciphertext.
    ///
    /// Fails with `KeyNotFound` if the key cannot be located and with
    /// `DecryptionFailure` for any defect in the ciphertext. Blocks on the
    /// provider when one is involved.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Provider(key) => key.decrypt(ciphertext),
            Self::Software(key) => key.decrypt(ciphertext),
        }
    }
}
