//! The key registry: the sole entry point for resolving keys.
//!
//! The registry is built once from a full snapshot of key definitions and is
//! read-only afterwards. It can be shared across any number of threads
//! without locking.
//!
//! ## Versions and rotation
//!
//! Several definitions may share a logical name. The **first** definition
//! seen for a name becomes its active version; later ones stay addressable by
//! explicit id so that ciphertext produced under a rolled key can still be
//! decrypted. The active pointer never moves at runtime: rotating a key means
//! deploying a new definition list (new version first) and reloading.
//!
//! ```text
//! Keys[0]  payroll / v2   -> active
//! Keys[1]  payroll / v1   -> rolled, reachable via get_key("payroll", "v1")
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::authz::Authorizer;
use crate::backend::{KeyBackend, KeyStorageProvider, ProviderKey, SoftwareKey, SoftwareKeyring};
use crate::config::{KeyDefinition, KeyStoreConfig};
use crate::error::{KeyStoreError, Result};
use crate::record::KeyRecord;

/// Upper bound on `CacheExpirationInDays`.
pub const MAX_CACHE_EXPIRATION_DAYS: i64 = 3650;

/// Separator between the logical name and the key id in a `kid`.
pub const KID_SEPARATOR: char = '/';

// ---------------------------------------------------------------------------
// Backend catalog
// ---------------------------------------------------------------------------

enum BackendSource {
    Provider(Arc<dyn KeyStorageProvider>),
    Software(SoftwareKeyring),
}

/// Maps backend identifiers (the `KSP` setting) to the thing that holds
/// the keys.
///
/// A definition naming an identifier that is not in the catalog fails to
/// load.
#[derive(Default)]
pub struct BackendCatalog {
    sources: HashMap<String, BackendSource>,
}

impl BackendCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an external key storage provider.
    pub fn with_provider(
        mut self,
        backend_id: impl Into<String>,
        provider: Arc<dyn KeyStorageProvider>,
    ) -> Self {
        self.sources
            .insert(backend_id.into(), BackendSource::Provider(provider));
        self
    }

    /// Register an in-memory keyring.
    pub fn with_software(mut self, backend_id: impl Into<String>, keyring: SoftwareKeyring) -> Self {
        self.sources
            .insert(backend_id.into(), BackendSource::Software(keyring));
        self
    }

    pub fn contains(&self, backend_id: &str) -> bool {
        self.sources.contains_key(backend_id)
    }

    /// Build the backend for one key. Cheap; contacts no provider.
    fn backend(&self, backend_id: &str, key_id: &str) -> Result<KeyBackend> {
        match self.sources.get(backend_id) {
            Some(BackendSource::Provider(provider)) => Ok(KeyBackend::Provider(ProviderKey::new(
                key_id,
                backend_id,
                Arc::clone(provider),
            ))),
            Some(BackendSource::Software(keyring)) => {
                Ok(KeyBackend::Software(SoftwareKey::new(key_id, keyring)))
            }
            None => Err(KeyStoreError::config(format!(
                "unknown key backend: {backend_id}"
            ))),
        }
    }
}

impl fmt::Debug for BackendCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.sources.keys().collect();
        ids.sort();
        f.debug_struct("BackendCatalog").field("backends", &ids).finish()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Loaded keys, grouped by logical name.
#[derive(Debug)]
pub struct KeyRegistry {
    /// name -> key id -> record.
    keys: HashMap<String, HashMap<String, KeyRecord>>,
    /// name -> key id of the active version.
    active: HashMap<String, String>,
}

impl KeyRegistry {
    /// Load the `Keys` section of a settings document.
    pub fn from_config(config: &KeyStoreConfig, catalog: &BackendCatalog) -> Result<Self> {
        Self::load(config.definitions(), catalog)
    }

    /// Build the registry from key definitions, in order.
    ///
    /// Any invalid definition fails the whole load; no partially built
    /// registry is ever returned.
    pub fn load(definitions: &[KeyDefinition], catalog: &BackendCatalog) -> Result<Self> {
        if definitions.is_empty() {
            return Err(KeyStoreError::config("no key definitions"));
        }

        let mut keys: HashMap<String, HashMap<String, KeyRecord>> = HashMap::new();
        let mut active: HashMap<String, String> = HashMap::new();

        for (index, def) in definitions.iter().enumerate() {
            // The policy is derived fresh for every definition.
            let authorizer = authorizer_for(def)?;

            let name = required(&def.name, index, "Name")?;
            let id = required(&def.id, index, "Id")?;
            let backend_id = required(&def.backend, index, "KSP")?;

            // `/` separates name and id in published key ids.
            if name.contains(KID_SEPARATOR) {
                return Err(KeyStoreError::config(format!(
                    "key definition {index}: Name must not contain '{KID_SEPARATOR}'"
                )));
            }

            if let Some(days) = def.cache_expiration_in_days {
                if !(0..=MAX_CACHE_EXPIRATION_DAYS).contains(&days) {
                    return Err(KeyStoreError::config(format!(
                        "key {name}/{id}: CacheExpirationInDays must be between 0 and {MAX_CACHE_EXPIRATION_DAYS}"
                    )));
                }
            }

            let backend = catalog.backend(backend_id, id)?;
            let record = KeyRecord::new(backend, id, authorizer, def.cache_expiration_in_days)?;

            let versions = keys.entry(name.to_string()).or_default();
            if versions.contains_key(id) {
                return Err(KeyStoreError::config(format!(
                    "key {name}/{id} is defined more than once"
                )));
            }

            let is_active = !active.contains_key(name);
            tracing::debug!(
                name,
                key_id = id,
                backend = backend_id,
                kind = record.backend().kind(),
                policy = record.authorizer().kind(),
                active = is_active,
                "registered key"
            );

            versions.insert(id.to_string(), record);
            if is_active {
                active.insert(name.to_string(), id.to_string());
            }
        }

        let registry = Self { keys, active };
        tracing::info!(
            names = registry.active.len(),
            versions = registry.len(),
            "key registry loaded"
        );
        Ok(registry)
    }

    /// Resolve the active version of a logical key.
    pub fn get_active_key(&self, name: &str) -> Result<&KeyRecord> {
        let not_found = || KeyStoreError::KeyNotFound(format!("key {name} not found"));

        let id = self.active.get(name).ok_or_else(not_found)?;
        self.keys
            .get(name)
            .and_then(|versions| versions.get(id))
            .ok_or_else(not_found)
    }

    /// Resolve a specific version of a logical key, active or rolled.
    pub fn get_key(&self, name: &str, key_id: &str) -> Result<&KeyRecord> {
        self.keys
            .get(name)
            .and_then(|versions| versions.get(key_id))
            .ok_or_else(|| {
                KeyStoreError::KeyNotFound(format!("key {name}{KID_SEPARATOR}{key_id} not found"))
            })
    }

    /// Id of the active version of `name`.
    pub fn active_key_id(&self, name: &str) -> Option<&str> {
        self.active.get(name).map(String::as_str)
    }

    /// Logical key names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every version id loaded for `name`, sorted.
    pub fn versions(&self, name: &str) -> Result<Vec<&str>> {
        let versions = self
            .keys
            .get(name)
            .ok_or_else(|| KeyStoreError::KeyNotFound(format!("key {name} not found")))?;
        let mut ids: Vec<&str> = versions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Total number of key versions.
    pub fn len(&self) -> usize {
        self.keys.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// An empty list is treated the same as an absent one.
fn authorizer_for(def: &KeyDefinition) -> Result<Option<Authorizer>> {
    let roles = def.authorized_roles.as_ref().filter(|roles| !roles.is_empty());
    let emails = def.authorized_emails.as_ref().filter(|emails| !emails.is_empty());

    match (roles, emails) {
        (Some(_), Some(_)) => Err(KeyStoreError::config(
            "both role and email authorizers cannot be used on the same key",
        )),
        (Some(roles), None) => Ok(Some(Authorizer::from_roles(roles.iter().cloned()))),
        (None, Some(emails)) => Ok(Some(Authorizer::from_emails(emails))),
        (None, None) => Ok(None),
    }
}

/// Whitespace-only counts as missing; a present value is returned verbatim.
fn required<'a>(value: &'a Option<String>, index: usize, field: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(KeyStoreError::config(format!(
            "key definition {index} is missing {field}"
        ))),
    }
}
