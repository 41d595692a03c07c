//! ECDH Key Agreement Tests
//!
//! Static/ephemeral agreement on both supported curves, plus the key
//! parsing paths a received `epk` goes through.

use rand::rngs::OsRng;
use vau_tunnel::crypto::ecdh::{
    ecdh_shared_secret, generate_ephemeral_keypair, Curve, PublicKey, SecretKey,
};
use vau_tunnel::crypto::CryptoError;

/// RFC 7518 appendix C keys (P-256)
const ALICE_EPHEMERAL: &str = "d3f3716913d4310a0026de741b3f18893afc8114f0c84682ba677e313a13988a";
const BOB_X: &str = "c1e349cb61ec70248ce801034c3834e1b88ebe1161cb25af38741f785fcfc4c4";
const BOB_Y: &str = "7bc96708ef80952b53f8d2555fe72b841ed04588628b1d378a594939500ec9c9";
const EXPECTED_Z: &str = "9e56d91d817135d372834283bf84269cfb316ea3da806a48f6daa7798cfe90c4";

#[test]
fn test_rfc7518_shared_secret() {
    let alice = SecretKey::from_bytes(Curve::P256, &hex::decode(ALICE_EPHEMERAL).unwrap()).unwrap();
    let bob = PublicKey::from_coordinates(
        Curve::P256,
        &hex::decode(BOB_X).unwrap(),
        &hex::decode(BOB_Y).unwrap(),
    )
    .unwrap();

    let z = ecdh_shared_secret(&alice, &bob).unwrap();
    assert_eq!(hex::encode(z.as_bytes()), EXPECTED_Z);
}

#[test]
fn test_static_and_ephemeral_agree() {
    for curve in [Curve::P256, Curve::Secp256k1] {
        let recipient = SecretKey::random(curve, &mut OsRng);
        let ephemeral = generate_ephemeral_keypair(curve, &mut OsRng).unwrap();

        let sender_side = ecdh_shared_secret(ephemeral.secret_key(), &recipient.public_key()).unwrap();
        let recipient_side = ecdh_shared_secret(&recipient, ephemeral.public_key()).unwrap();
        assert_eq!(sender_side.as_bytes(), recipient_side.as_bytes());
    }
}

#[test]
fn test_compressed_and_uncompressed_parse_to_same_key() {
    for curve in [Curve::P256, Curve::Secp256k1] {
        let public = SecretKey::random(curve, &mut OsRng).public_key();
        let uncompressed = public.to_sec1_uncompressed();
        assert_eq!(uncompressed.len(), 65);

        let (x, y) = public.coordinates();
        let mut compressed = vec![if y[31] & 1 == 0 { 0x02 } else { 0x03 }];
        compressed.extend_from_slice(&x);

        assert_eq!(PublicKey::from_sec1_bytes(curve, &uncompressed).unwrap(), public);
        assert_eq!(PublicKey::from_sec1_bytes(curve, &compressed).unwrap(), public);
    }
}

#[test]
fn test_invalid_sec1_encodings() {
    for bytes in [vec![], vec![0x04; 20], vec![0x05; 65]] {
        assert_eq!(
            PublicKey::from_sec1_bytes(Curve::P256, &bytes),
            Err(CryptoError::InvalidPoint)
        );
    }
}

#[test]
fn test_short_coordinates_rejected() {
    assert_eq!(
        PublicKey::from_coordinates(Curve::Secp256k1, &[1u8; 31], &[1u8; 32]),
        Err(CryptoError::InvalidPoint)
    );
}

#[test]
fn test_secret_round_trips_through_bytes() {
    let secret = SecretKey::random(Curve::Secp256k1, &mut OsRng);
    let bytes = secret.to_bytes();
    assert_eq!(bytes.len(), 32);

    let restored = SecretKey::from_bytes(Curve::Secp256k1, &bytes).unwrap();
    assert_eq!(restored.public_key(), secret.public_key());
}

#[test]
fn test_secret_wrong_length() {
    assert!(matches!(
        SecretKey::from_bytes(Curve::P256, &[1u8; 31]),
        Err(CryptoError::Internal(_))
    ));
}
