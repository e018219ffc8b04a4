//! Key definitions as supplied by application settings.
//!
//! The settings document carries a `Keys` array; each entry defines one
//! version of one logical key:
//!
//! ```json
//! {
//!   "Keys": [
//!     {
//!       "Name": "payroll",
//!       "Id": "payroll-2025",
//!       "KSP": "Microsoft Software Key Storage Provider",
//!       "AuthorizedRoles": ["finance"],
//!       "CacheExpirationInDays": 1
//!     }
//!   ]
//! }
//! ```
//!
//! Every per-key field is optional at this layer. Required fields are
//! checked by [`KeyRegistry::load`](crate::registry::KeyRegistry::load) so
//! that a missing field is reported by name as a configuration error.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{KeyStoreError, Result};

/// One key version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyDefinition {
    /// Logical, caller-facing key name.
    pub name: Option<String>,
    /// Provider-assigned id of this version.
    pub id: Option<String>,
    /// Backend identifier: which provider or keyring holds the key.
    #[serde(rename = "KSP")]
    pub backend: Option<String>,
    pub authorized_roles: Option<Vec<String>>,
    #[serde(rename = "AuthorizedEmailAddress")]
    pub authorized_emails: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_days")]
    pub cache_expiration_in_days: Option<i64>,
}

impl KeyDefinition {
    /// A definition with the three required fields set.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            id: Some(id.into()),
            backend: Some(backend.into()),
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_emails = Some(emails.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_cache_expiration_days(mut self, days: i64) -> Self {
        self.cache_expiration_in_days = Some(days);
        self
    }
}

/// The `Keys` section of the settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyStoreConfig {
    pub keys: Option<Vec<KeyDefinition>>,
}

impl KeyStoreConfig {
    pub fn new(keys: Vec<KeyDefinition>) -> Self {
        Self { keys: Some(keys) }
    }

    /// Parse a settings document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| KeyStoreError::config(format!("invalid key settings: {err}")))
    }

    /// Read and parse a settings file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            KeyStoreError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// The key definitions in document order.
    pub fn definitions(&self) -> &[KeyDefinition] {
        self.keys.as_deref().unwrap_or_default()
    }
}

/// Settings trees often carry numbers as strings; accept both.
fn deserialize_days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Days {
        Number(i64),
        Text(String),
    }

    match Option::<Days>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Days::Number(days)) => Ok(Some(days)),
        Some(Days::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid CacheExpirationInDays: {text}"))),
    }
}
