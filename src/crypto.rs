//! Low-level RSA operations.
//!
//! This module is the only place in the crate that performs RSA operations.
//! The software backend and the client-side wrapping helper on
//! [`PublicKey`](crate::backend::PublicKey) go exclusively through the
//! functions exposed here; elsewhere `rsa` appears only as a key type.
//!
//! Primitive choices:
//! - **Padding**: OAEP with SHA-256 as both the label hash and the MGF1 hash
//! - **Randomness**: `OsRng`, for encryption and for private-key blinding
//! - **Key encoding**: PKCS#8 PEM, with PKCS#1 PEM accepted as a fallback

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{KeyStoreError, Result};

/// Big-endian modulus and exponent bytes of an RSA public key.
pub(crate) fn public_parts(key: &RsaPrivateKey) -> (Vec<u8>, Vec<u8>) {
    (key.n().to_bytes_be(), key.e().to_bytes_be())
}

/// Decrypt an OAEP-SHA256 ciphertext.
///
/// Every failure collapses into `DecryptionFailure`; callers learn nothing
/// about which check rejected the input.
pub(crate) fn decrypt(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    key.decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| KeyStoreError::DecryptionFailure)
}

/// Encrypt a payload under the public key `(modulus, exponent)` with
/// OAEP-SHA256.
pub(crate) fn encrypt(modulus: &[u8], exponent: u32, plaintext: &[u8]) -> Result<Vec<u8>> {
    let n = BigUint::from_bytes_be(modulus);
    let e = BigUint::from_bytes_be(&exponent.to_be_bytes());
    let key = RsaPublicKey::new(n, e).map_err(|_| KeyStoreError::EncryptionFailure)?;

    key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| KeyStoreError::EncryptionFailure)
}

/// Parse a PEM-encoded RSA private key.
pub(crate) fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| KeyStoreError::config("invalid RSA private key PEM"))
}

/// Convert a big-endian exponent to `u32`.
///
/// Leading zero bytes are ignored; anything wider than 32 bits is rejected
/// rather than truncated.
pub(crate) fn exponent_to_u32(bytes: &[u8]) -> Result<u32> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > 4 {
        return Err(KeyStoreError::Provider(
            "public exponent exceeds 32 bits".to_string(),
        ));
    }

    Ok(significant
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)))
}
