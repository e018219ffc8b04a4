//! # keyvault-registry
//!
//! Server-side key registry for a decryption service.
//!
//! Callers never see private key material. They present a logical key name
//! (and optionally a version) plus their identity, and receive either the
//! public key to wrap content under, or the decrypted payload. The registry
//! resolves names to versions, enforces the per-key authorization policy and
//! delegates the cryptography to a pluggable backend.
//!
//! ## Public API
//!
//! - [`KeyRegistry`] loads [`KeyDefinition`]s against a [`BackendCatalog`]
//!   and resolves keys with `get_active_key` / `get_key`.
//! - [`access::public_key`] and [`access::decrypt`] are the request-time
//!   operations.
//! - [`KeyStorageProvider`] is the seam for hardware or OS key stores;
//!   [`SoftwareKeyring`] holds keys in memory.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use keyvault_registry::{
//!     access, BackendCatalog, CallerIdentity, KeyRegistry, KeyStoreConfig, KID_SEPARATOR,
//! };
//!
//! # fn run(provider: Arc<dyn keyvault_registry::KeyStorageProvider>) -> keyvault_registry::Result<()> {
//! let config = KeyStoreConfig::from_path("appsettings.json")?;
//! let catalog = BackendCatalog::new().with_provider("Contoso HSM", provider);
//! let registry = Arc::new(KeyRegistry::from_config(&config, &catalog)?);
//!
//! let published = access::public_key(&registry, "payroll", chrono::Utc::now())?;
//! let caller = CallerIdentity::new("alice").with_role("finance");
//! # let ciphertext = Vec::new();
//! let (name, key_id) = published.key.kid.split_once(KID_SEPARATOR).unwrap_or_default();
//! let plaintext = access::decrypt(&registry, name, key_id, &caller, &ciphertext)?;
//! # drop(plaintext);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod authz;
pub mod backend;
pub(crate) mod crypto;
pub mod config;
pub mod error;
pub mod identity;
pub mod record;
pub mod registry;

pub use authz::{Authorizer, EmailAuthorizer, RoleAuthorizer};
pub use backend::{
    KeyBackend, KeyStorageProvider, ProviderKey, ProviderKeyHandle, PublicKey, RsaPublicParts,
    SoftwareKey, SoftwareKeyring,
};
pub use config::{KeyDefinition, KeyStoreConfig};
pub use error::{KeyStoreError, Result};
pub use identity::CallerIdentity;
pub use record::{KeyRecord, ALGORITHM, KEY_TYPE};
pub use registry::{BackendCatalog, KeyRegistry, KID_SEPARATOR};
