//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keyvault_registry::{
    BackendCatalog, KeyBackend, KeyStorageProvider, KeyStoreError, ProviderKeyHandle, Result,
    RsaPublicParts, SoftwareKey, SoftwareKeyring,
};

pub const PEM_A: &str = include_str!("../fixtures/rsa-2048-a.pem");
pub const PEM_B: &str = include_str!("../fixtures/rsa-2048-b.pem");

/// A keyring holding fixture key A as `key-a` and fixture key B as `key-b`.
pub fn keyring() -> SoftwareKeyring {
    let mut keyring = SoftwareKeyring::new();
    keyring.insert_pem("key-a", PEM_A).unwrap();
    keyring.insert_pem("key-b", PEM_B).unwrap();
    keyring
}

/// Catalog with the fixture keyring under `soft` and a [`FakeHsm`] under `hsm`.
pub fn catalog(hsm: Arc<FakeHsm>) -> BackendCatalog {
    BackendCatalog::new()
        .with_software("soft", keyring())
        .with_provider("hsm", hsm)
}

/// Stand-in for a hardware provider.
///
/// Performs the crypto through software keys and keeps count of handles so
/// tests can check that none leak.
pub struct FakeHsm {
    ring: SoftwareKeyring,
    pub opened: AtomicUsize,
    pub released: AtomicUsize,
    pub exports: AtomicUsize,
}

impl FakeHsm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ring: keyring(),
            opened: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            exports: AtomicUsize::new(0),
        })
    }

    pub fn outstanding(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }
}

pub struct FakeHandle<'a> {
    hsm: &'a FakeHsm,
    key: KeyBackend,
}

impl ProviderKeyHandle for FakeHandle<'_> {
    fn export_public(&self) -> Result<RsaPublicParts> {
        self.hsm.exports.fetch_add(1, Ordering::SeqCst);
        let public = self.key.public_key()?;
        Ok(RsaPublicParts {
            modulus: public.modulus().to_vec(),
            exponent: public.exponent().to_be_bytes().to_vec(),
        })
    }

    fn decrypt_oaep_sha256(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.key.decrypt(ciphertext).map(|plaintext| plaintext.to_vec())
    }
}

impl Drop for FakeHandle<'_> {
    fn drop(&mut self) {
        self.hsm.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl KeyStorageProvider for FakeHsm {
    fn exists(&self, key_id: &str) -> bool {
        self.ring.contains(key_id)
    }

    fn open(&self, key_id: &str) -> Result<Box<dyn ProviderKeyHandle + '_>> {
        if !self.ring.contains(key_id) {
            return Err(KeyStoreError::KeyNotFound(key_id.to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        // Each handle gets its own view of the key, like a fresh native handle.
        Ok(Box::new(FakeHandle {
            hsm: self,
            key: KeyBackend::Software(SoftwareKey::new(key_id, &self.ring)),
        }))
    }
}
