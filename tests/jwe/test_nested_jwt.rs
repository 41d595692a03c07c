//! Nested JWT envelopes
//!
//! Signed tokens travel as `{"njwt": ...}` inside an ECDH-ES envelope whose
//! header carries `cty: NJWT` and the token expiry.

use vau_tunnel::crypto::base64url::{base64url_decode, base64url_encode};
use vau_tunnel::crypto::ecdh::{Curve, SecretKey};
use vau_tunnel::crypto::random::OsRandom;
use vau_tunnel::crypto::CryptoError;
use vau_tunnel::jwe::{
    ContentEncryption, DecryptionKey, EncryptionKey, JweEnvelope, JweHeader,
    NESTED_JWT_CONTENT_TYPE,
};

const ACCESS_TOKEN: &str = "eyJhbGciOiJCUDI1NlIxIiwidHlwIjoiYXQrSldUIn0.eyJleHAiOjE2MTU5OTU0MDh9.c2ln";
const EXPIRY: i64 = 1615995408;

fn recipient() -> SecretKey {
    SecretKey::from_bytes(Curve::P256, &[0x1f; 32]).unwrap()
}

fn header_json(envelope: &JweEnvelope) -> String {
    String::from_utf8(base64url_decode(envelope.encoded_header()).unwrap()).unwrap()
}

#[test]
fn test_nest_jwt_round_trip() {
    let secret = recipient();
    let envelope =
        JweEnvelope::nest_jwt(ACCESS_TOKEN, &secret.public_key(), Some(EXPIRY), &OsRandom).unwrap();

    let parsed = JweEnvelope::parse(&envelope.to_compact()).unwrap();
    assert_eq!(parsed.header().alg, "ECDH-ES");
    assert_eq!(parsed.header().cty.as_deref(), Some(NESTED_JWT_CONTENT_TYPE));
    assert_eq!(parsed.header().exp, Some(EXPIRY));
    assert_eq!(
        parsed.nested_jwt(DecryptionKey::EcdhEs(&secret)).unwrap(),
        ACCESS_TOKEN
    );

    let plaintext = parsed.decrypt(DecryptionKey::EcdhEs(&secret)).unwrap();
    assert_eq!(
        plaintext.as_slice(),
        format!("{{\"njwt\":\"{}\"}}", ACCESS_TOKEN).as_bytes()
    );
}

#[test]
fn test_expiry_serialized_in_canonical_position() {
    let envelope =
        JweEnvelope::nest_jwt(ACCESS_TOKEN, &recipient().public_key(), Some(EXPIRY), &OsRandom)
            .unwrap();

    let json = header_json(&envelope);
    assert!(json.starts_with("{\"enc\":\"A256GCM\",\"epk\":{\"y\":"), "{}", json);
    assert!(
        json.ends_with(",\"cty\":\"NJWT\",\"exp\":1615995408,\"alg\":\"ECDH-ES\"}"),
        "{}",
        json
    );
}

#[test]
fn test_nest_jwt_without_expiry_omits_exp() {
    let envelope =
        JweEnvelope::nest_jwt(ACCESS_TOKEN, &recipient().public_key(), None, &OsRandom).unwrap();
    assert_eq!(envelope.header().exp, None);
    assert!(!header_json(&envelope).contains("exp"));
}

#[test]
fn test_header_template_members_are_kept() {
    let secret = SecretKey::from_bytes(Curve::Secp256k1, &[0x2b; 32]).unwrap();
    let template = JweHeader::direct(ContentEncryption::A256Gcm, Some("JWT"))
        .with_expiry(Some(EXPIRY))
        .with_type(Some("JWT"));

    let envelope = JweEnvelope::encrypt_with_header(
        b"challenge",
        EncryptionKey::EcdhEs(&secret.public_key()),
        template,
        &OsRandom,
    )
    .unwrap();

    // alg and epk come from the key, not the template
    assert_eq!(envelope.header().alg, "ECDH-ES");
    assert_eq!(envelope.header().epk.as_ref().unwrap().crv, "secp256k1");
    assert!(header_json(&envelope)
        .ends_with(",\"cty\":\"JWT\",\"exp\":1615995408,\"typ\":\"JWT\",\"alg\":\"ECDH-ES\"}"));

    let parsed = JweEnvelope::parse(&envelope.to_compact()).unwrap();
    assert_eq!(parsed, envelope);
    assert_eq!(
        parsed.decrypt(DecryptionKey::EcdhEs(&secret)).unwrap().as_slice(),
        b"challenge"
    );
}

#[test]
fn test_direct_template_drops_epk() {
    let key = [9u8; 32];
    let template = JweHeader::direct(ContentEncryption::A256Gcm, Some("JWT")).with_expiry(Some(EXPIRY));
    let envelope =
        JweEnvelope::encrypt_with_header(b"token", EncryptionKey::Direct(&key), template, &OsRandom)
            .unwrap();

    assert_eq!(envelope.header().alg, "dir");
    assert!(envelope.header().epk.is_none());
    assert_eq!(
        header_json(&envelope),
        "{\"enc\":\"A256GCM\",\"cty\":\"JWT\",\"exp\":1615995408,\"alg\":\"dir\"}"
    );
}

#[test]
fn test_unsupported_template_enc_rejected() {
    let mut template = JweHeader::direct(ContentEncryption::A256Gcm, None);
    template.enc = "A128GCM".into();
    let result = JweEnvelope::encrypt_with_header(
        b"x",
        EncryptionKey::EcdhEs(&recipient().public_key()),
        template,
        &OsRandom,
    );
    assert!(matches!(result, Err(CryptoError::UnsupportedAlgorithm(_))));
}

#[test]
fn test_altered_expiry_fails_authentication() {
    let secret = recipient();
    let envelope =
        JweEnvelope::nest_jwt(ACCESS_TOKEN, &secret.public_key(), Some(EXPIRY), &OsRandom).unwrap();

    let extended = envelope.header().clone().with_expiry(Some(EXPIRY + 3600));
    let mut segments: Vec<String> = envelope.to_compact().split('.').map(str::to_string).collect();
    segments[0] = base64url_encode(serde_json::to_vec(&extended).unwrap());
    let forged = JweEnvelope::parse(&segments.join(".")).unwrap();

    assert_eq!(
        forged.nested_jwt(DecryptionKey::EcdhEs(&secret)),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn test_non_nested_payload_is_corrupt() {
    let secret = recipient();
    let envelope = JweEnvelope::encrypt(
        b"not json",
        EncryptionKey::EcdhEs(&secret.public_key()),
        Some(NESTED_JWT_CONTENT_TYPE),
        &OsRandom,
    )
    .unwrap();
    assert!(matches!(
        envelope.nested_jwt(DecryptionKey::EcdhEs(&secret)),
        Err(CryptoError::CorruptPayload(_))
    ));
}
