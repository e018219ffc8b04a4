//! Request-path costs: resolving a key and decrypting a wrapped payload.
//!
//! Run with: `cargo bench --bench registry_benchmark`
//!
//! Resolution is two hash lookups and should sit in the tens of
//! nanoseconds. Decryption is dominated by the RSA private-key operation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyvault_registry::{
    access, BackendCatalog, CallerIdentity, KeyDefinition, KeyRegistry, SoftwareKeyring,
};

const PEM: &str = include_str!("../tests/fixtures/rsa-2048-a.pem");

fn registry() -> KeyRegistry {
    let mut keyring = SoftwareKeyring::new();
    keyring.insert_pem("v1", PEM).unwrap();
    let catalog = BackendCatalog::new().with_software("soft", keyring);

    // Many names, several versions each, to keep the maps realistic.
    let mut defs = Vec::new();
    for n in 0..100 {
        for v in 0..5 {
            let id = if n == 0 && v == 0 { "v1".to_string() } else { format!("v{n}-{v}") };
            defs.push(KeyDefinition::new(format!("key-{n}"), id, "soft").with_roles(["svc"]));
        }
    }
    KeyRegistry::load(&defs, &catalog).unwrap()
}

fn bench_resolution(c: &mut Criterion) {
    let registry = registry();

    c.bench_function("get_active_key", |b| {
        b.iter(|| registry.get_active_key(black_box("key-42")).unwrap());
    });
    c.bench_function("get_key_rolled", |b| {
        b.iter(|| registry.get_key(black_box("key-42"), black_box("v42-3")).unwrap());
    });
}

fn bench_decrypt(c: &mut Criterion) {
    let registry = registry();
    let caller = CallerIdentity::new("bench").with_role("svc");
    let ciphertext = registry
        .get_active_key("key-0")
        .unwrap()
        .backend()
        .public_key()
        .unwrap()
        .encrypt_oaep_sha256(&[7u8; 32])
        .unwrap();

    c.bench_function("decrypt_software_2048", |b| {
        b.iter(|| {
            access::decrypt(&registry, "key-0", "v1", &caller, black_box(&ciphertext)).unwrap()
        });
    });
}

criterion_group!(benches, bench_resolution, bench_decrypt);
criterion_main!(benches);
