//! Rotation walkthrough with in-memory keys.
//!
//! Run with: `cargo run --example rotation_demo`
//!
//! 1. Deploy `payroll` with a single version and wrap a payload under it.
//! 2. Redeploy with a new version listed first.
//! 3. New content is wrapped under the new version; the old payload still
//!    decrypts through its explicit version id.

use keyvault_registry::{
    access, BackendCatalog, CallerIdentity, KeyRegistry, KeyStoreConfig, SoftwareKeyring,
    KID_SEPARATOR,
};

const PEM_2024: &str = include_str!("../tests/fixtures/rsa-2048-a.pem");
const PEM_2025: &str = include_str!("../tests/fixtures/rsa-2048-b.pem");

fn catalog() -> Result<BackendCatalog, Box<dyn std::error::Error>> {
    let mut keyring = SoftwareKeyring::new();
    keyring.insert_pem("payroll-2024", PEM_2024)?;
    keyring.insert_pem("payroll-2025", PEM_2025)?;
    Ok(BackendCatalog::new().with_software("software", keyring))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let caller = CallerIdentity::new("alice").with_role("finance");

    // 1. Initial deployment.
    let v1 = KeyStoreConfig::from_json(
        r#"{ "Keys": [
            { "Name": "payroll", "Id": "payroll-2024", "KSP": "software",
              "AuthorizedRoles": ["finance"], "CacheExpirationInDays": 1 }
        ] }"#,
    )?;
    let registry = KeyRegistry::from_config(&v1, &catalog()?)?;
    let published = access::public_key(&registry, "payroll", chrono::Utc::now())?;
    println!("published {}", serde_json::to_string_pretty(&published)?);

    let old_kid = published.key.kid.clone();
    let old_ciphertext = registry
        .get_active_key("payroll")?
        .backend()
        .public_key()?
        .encrypt_oaep_sha256(b"2024 bonus pool")?;

    // 2. Redeploy with the new version first.
    let v2 = KeyStoreConfig::from_json(
        r#"{ "Keys": [
            { "Name": "payroll", "Id": "payroll-2025", "KSP": "software",
              "AuthorizedRoles": ["finance"], "CacheExpirationInDays": 1 },
            { "Name": "payroll", "Id": "payroll-2024", "KSP": "software",
              "AuthorizedRoles": ["finance"] }
        ] }"#,
    )?;
    let registry = KeyRegistry::from_config(&v2, &catalog()?)?;
    let published = access::public_key(&registry, "payroll", chrono::Utc::now())?;
    println!("active kid is now {}", published.key.kid);

    // 3. Old content still opens through the rolled version.
    let (name, key_id) = old_kid.split_once(KID_SEPARATOR).ok_or("malformed kid")?;
    let plaintext = access::decrypt(&registry, name, key_id, &caller, &old_ciphertext)?;
    println!(
        "decrypted rolled payload via {old_kid}: {}",
        String::from_utf8_lossy(&plaintext)
    );

    Ok(())
}
