//! Artifact signing: tamper detection, unsafe override, key provisioning

use mathlang::signing::SIGNATURE_LEN;
use mathlang::{CompileError, Compiler, Config, SigningKey, UnverifiedReason, Verification};
use proptest::prelude::*;

const SOURCE: &str = r#"
f = 2*x + 1;
roots = SOLVE f IN REAL;
PRINT "roots:", roots;
"#;

fn signed() -> (Compiler, Vec<u8>) {
    let compiler = Compiler::new(SigningKey::from_bytes([42; 32]));
    let artifact = compiler.compile(SOURCE).unwrap();
    (compiler, artifact)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn flipping_any_payload_byte_is_detected(index in any::<prop::sample::Index>(), mask in 1u8..=255) {
        let (compiler, mut artifact) = signed();
        let payload_len = artifact.len() - SIGNATURE_LEN;
        artifact[index.index(payload_len)] ^= mask;

        let err = compiler.decompile(&artifact, false).unwrap_err();
        prop_assert_eq!(err.unverified_reason(), Some(UnverifiedReason::Mismatch));
    }

    #[test]
    fn flipping_any_signature_byte_is_detected(index in 0..SIGNATURE_LEN, mask in 1u8..=255) {
        let (compiler, mut artifact) = signed();
        let offset = artifact.len() - SIGNATURE_LEN + index;
        artifact[offset] ^= mask;

        let err = compiler.decompile(&artifact, false).unwrap_err();
        prop_assert_eq!(err.unverified_reason(), Some(UnverifiedReason::Mismatch));
    }
}

#[test]
fn test_unsafe_mode_accepts_bad_signature() {
    let (compiler, mut artifact) = signed();
    let last = artifact.len() - 1;
    artifact[last] ^= 0xff;

    let decompiled = compiler.decompile(&artifact, true).unwrap();
    assert_eq!(
        decompiled.verification,
        Verification::Skipped(UnverifiedReason::Mismatch)
    );
    assert!(decompiled.executable.code.contains("_s.solveset("));
}

#[test]
fn test_missing_key_is_distinct_from_mismatch() {
    let (_, artifact) = signed();
    let unprovisioned = Compiler::ephemeral();

    let err = unprovisioned.decompile(&artifact, false).unwrap_err();
    assert!(matches!(
        err,
        CompileError::SignatureUnverified(UnverifiedReason::MissingKey)
    ));
    assert_eq!(
        unprovisioned.decompile(&artifact, true).unwrap().verification,
        Verification::Skipped(UnverifiedReason::MissingKey)
    );
}

#[test]
fn test_provisioned_key_verifies_across_compilers() {
    let (producer, artifact) = signed();
    let config = Config::default().with_signing_key(producer.signing_key());
    let consumer = Compiler::from_config(&config).unwrap();

    assert!(consumer.decompile(&artifact, false).unwrap().is_verified());
}

#[test]
fn test_corruption_is_reported_even_in_unsafe_mode() {
    let (compiler, artifact) = signed();
    let payload_len = artifact.len() - SIGNATURE_LEN;

    // keep a valid signature over a payload that is not an executable
    let garbage = vec![0xAB; payload_len];
    let mut forged = garbage.clone();
    forged.extend_from_slice(&compiler.signing_key().sign(&garbage));
    let err = compiler.decompile(&forged, false).unwrap_err();
    assert!(matches!(err, CompileError::ArtifactCorrupt(_)));

    let truncated = &artifact[..SIGNATURE_LEN - 1];
    let err = compiler.decompile(truncated, true).unwrap_err();
    assert!(matches!(err, CompileError::ArtifactCorrupt(_)));
    assert!(err.is_artifact_error());
}
