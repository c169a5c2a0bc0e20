//! End-to-end signing scenarios over envelopes.

use ptd_core::{EntityType, Envelope, IdGenerator, PtdError, Signable};
use ptd_crypto::{generate_key_pair, verify, verify_with_key_lookup, KeyRing, Signer};
use serde_json::json;

fn tournament(name: &str) -> Envelope {
    Envelope::create(
        &IdGenerator::new(),
        EntityType::Tournament,
        json!({"name": name, "start_date": "2025-07-01"}),
        "integration",
    )
}

#[test]
fn sign_then_corrupt_last_signature_char() {
    let signer = Signer::new(generate_key_pair().unwrap(), "test-key", "tester");
    let mut doc = tournament("Test");
    signer.sign(&mut doc).unwrap();

    let sig = doc.signature().unwrap();
    assert_eq!(sig.algorithm, "ed25519");
    assert_eq!(sig.public_key_id, "test-key");
    verify(&doc, &signer.public_key()).unwrap();

    let stored = &mut doc.meta.signature.as_mut().unwrap().signature;
    let last = stored.pop().unwrap();
    stored.push(if last == 'A' { 'B' } else { 'A' });

    let err = verify(&doc, &signer.public_key()).unwrap_err();
    assert!(
        matches!(err, PtdError::SignatureInvalid(_) | PtdError::SignatureFailed(_)),
        "unexpected error: {err}"
    );
}

#[test]
fn wrong_key_fails_verification() {
    let a = Signer::generate("a", "alice").unwrap();
    let b = Signer::generate("b", "bob").unwrap();
    let mut doc = tournament("Open");
    a.sign(&mut doc).unwrap();
    assert!(matches!(
        verify(&doc, &b.public_key()),
        Err(PtdError::SignatureFailed(_))
    ));
}

#[test]
fn unsigned_document_reports_missing_signature() {
    let key = generate_key_pair().unwrap().public_key();
    let doc = tournament("Unsigned");
    assert!(matches!(verify(&doc, &key), Err(PtdError::SignatureMissing)));
    assert!(matches!(
        verify_with_key_lookup(&doc, &KeyRing::new()),
        Err(PtdError::SignatureMissing)
    ));
}

#[test]
fn payload_change_after_signing_fails() {
    let s = Signer::generate("k", "s").unwrap();
    let mut doc = tournament("Original");
    s.sign(&mut doc).unwrap();
    doc.spec["name"] = json!("Changed");
    assert!(matches!(s.verify(&doc), Err(PtdError::SignatureFailed(_))));
}

#[test]
fn signature_survives_json_roundtrip() {
    let s = Signer::generate("k", "s").unwrap();
    let mut doc = tournament("Roundtrip");
    doc.meta.tags = vec!["clay".into(), "junior".into()];
    doc.meta
        .extensions
        .insert("vendor.x".into(), json!({"z": 1.25, "a": [true, null]}));
    s.sign(&mut doc).unwrap();

    let text = serde_json::to_string_pretty(&doc).unwrap();
    let back: Envelope = serde_json::from_str(&text).unwrap();
    s.verify(&back).unwrap();
}

#[test]
fn key_lookup_resolves_from_ring() {
    let s = Signer::generate("ring-key", "s").unwrap();
    let mut doc = tournament("Ring");
    s.sign(&mut doc).unwrap();

    let mut ring = KeyRing::new();
    assert!(matches!(
        verify_with_key_lookup(&doc, &ring),
        Err(PtdError::SignatureKeyMissing(_))
    ));
    ring.insert("ring-key", s.public_key());
    verify_with_key_lookup(&doc, &ring).unwrap();
}
