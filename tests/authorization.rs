//! Per-key authorization through the request-time API.

mod common;

use keyvault_registry::{
    access, Authorizer, CallerIdentity, KeyDefinition, KeyRegistry, KeyStoreError,
};

use common::{catalog, FakeHsm};

fn registry() -> KeyRegistry {
    let defs = vec![
        KeyDefinition::new("ops-key", "key-a", "soft").with_roles(["admin", "ops"]),
        KeyDefinition::new("mail-key", "key-b", "soft").with_emails(["a@example.com"]),
    ];
    KeyRegistry::load(&defs, &catalog(FakeHsm::new())).unwrap()
}

fn wrap(registry: &KeyRegistry, name: &str) -> Vec<u8> {
    registry
        .get_active_key(name)
        .unwrap()
        .backend()
        .public_key()
        .unwrap()
        .encrypt_oaep_sha256(b"secret")
        .unwrap()
}

#[test]
fn test_role_authorizer_intersection() {
    let auth = Authorizer::from_roles(["admin", "ops"]);

    let allowed = CallerIdentity::new("svc").with_role("ops").with_role("viewer");
    let denied = CallerIdentity::new("svc").with_role("viewer");

    assert!(auth.is_authorized(&allowed));
    assert!(!auth.is_authorized(&denied));
}

#[test]
fn test_email_authorizer_exact_address() {
    let auth = Authorizer::from_emails(["a@example.com"]);

    assert!(auth.is_authorized(&CallerIdentity::new("u").with_email("a@example.com")));
    assert!(!auth.is_authorized(&CallerIdentity::new("u").with_email("b@example.com")));
    assert!(!auth.is_authorized(&CallerIdentity::new("u").with_email("xa@example.com")));
    assert!(!auth.is_authorized(&CallerIdentity::new("u").with_role("a@example.com")));
}

#[test]
fn test_decrypt_with_role_policy() {
    let registry = registry();
    let ciphertext = wrap(&registry, "ops-key");

    let ops = CallerIdentity::new("svc").with_role("ops").with_role("viewer");
    assert_eq!(
        access::decrypt(&registry, "ops-key", "key-a", &ops, &ciphertext)
            .unwrap()
            .as_slice(),
        b"secret"
    );

    let viewer = CallerIdentity::new("svc").with_role("viewer");
    assert!(matches!(
        access::decrypt(&registry, "ops-key", "key-a", &viewer, &ciphertext),
        Err(KeyStoreError::Unauthorized)
    ));
}

#[test]
fn test_decrypt_with_email_policy() {
    let registry = registry();
    let ciphertext = wrap(&registry, "mail-key");

    let owner = CallerIdentity::new("u1").with_email("a@example.com");
    assert!(access::decrypt(&registry, "mail-key", "key-b", &owner, &ciphertext).is_ok());

    // An admin role does not help on an email-gated key.
    let admin = CallerIdentity::new("u2")
        .with_role("admin")
        .with_email("b@example.com");
    assert!(matches!(
        access::decrypt(&registry, "mail-key", "key-b", &admin, &ciphertext),
        Err(KeyStoreError::Unauthorized)
    ));
}

#[test]
fn test_policy_is_per_version() {
    // The rolled version carries its own, narrower policy.
    let defs = vec![
        KeyDefinition::new("payroll", "key-b", "soft").with_roles(["finance", "audit"]),
        KeyDefinition::new("payroll", "key-a", "soft").with_roles(["audit"]),
    ];
    let registry = KeyRegistry::load(&defs, &catalog(FakeHsm::new())).unwrap();
    let old = registry
        .get_key("payroll", "key-a")
        .unwrap()
        .backend()
        .public_key()
        .unwrap()
        .encrypt_oaep_sha256(b"archive")
        .unwrap();

    let finance = CallerIdentity::new("alice").with_role("finance");
    let auditor = CallerIdentity::new("carol").with_role("audit");

    assert!(matches!(
        access::decrypt(&registry, "payroll", "key-a", &finance, &old),
        Err(KeyStoreError::Unauthorized)
    ));
    assert!(access::decrypt(&registry, "payroll", "key-a", &auditor, &old).is_ok());
}
