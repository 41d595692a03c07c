//! AES-256-GCM content encryption tests
//!
//! Known-answer tests from the GCM specification (test cases 13, 14, 16)
//! plus the error mapping the JWE layer relies on.

use vau_tunnel::crypto::aes_gcm::{decrypt, encrypt, IV_SIZE, TAG_SIZE};
use vau_tunnel::crypto::CryptoError;

fn h(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

/// Test case 13: zero key, zero IV, empty plaintext
#[test]
fn test_gcm_case_13_empty_plaintext() {
    let sealed = encrypt(&[0u8; 32], &[0u8; IV_SIZE], b"", b"").unwrap();
    assert!(sealed.ciphertext.is_empty());
    assert_eq!(hex::encode(sealed.tag), "530f8afbc74536b9a963b4f1c4cb738b");
}

/// Test case 14: zero key, zero IV, one zero block
#[test]
fn test_gcm_case_14_single_block() {
    let sealed = encrypt(&[0u8; 32], &[0u8; IV_SIZE], b"", &[0u8; 16]).unwrap();
    assert_eq!(hex::encode(&sealed.ciphertext), "cea7403d4d606b6e074ec5d3baf39d18");
    assert_eq!(hex::encode(sealed.tag), "d0d1c8a799996bf0265b98b5d48ab919");
}

/// Test case 16: AAD and a partial final block
#[test]
fn test_gcm_case_16_with_aad() {
    let key = h("feffe9928665731c6d6a8f9467308308feffe9928665731c6d6a8f9467308308");
    let iv = h("cafebabefacedbaddecaf888");
    let aad = h("feedfacedeadbeeffeedfacedeadbeefabaddad2");
    let plaintext = h(
        "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72\
         1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b39",
    );

    let sealed = encrypt(&key, &iv, &aad, &plaintext).unwrap();
    assert_eq!(
        hex::encode(&sealed.ciphertext),
        "522dc1f099567d07f47f37a32a84427d643a8cdcbfe5c0c97598a2bd2555d1aa\
         8cb08e48590dbb3da7b08b1056828838c5f61e6393ba7a0abcc9f662"
    );
    assert_eq!(hex::encode(sealed.tag), "76fc6ece0f4e1768cddf8853bb2d551b");

    let opened = decrypt(&key, &iv, &aad, &sealed.ciphertext, &sealed.tag).unwrap();
    assert_eq!(opened, plaintext);
}

#[test]
fn test_aad_mismatch_fails() {
    let key = [7u8; 32];
    let iv = [9u8; IV_SIZE];
    let sealed = encrypt(&key, &iv, b"header-a", b"payload").unwrap();

    assert_eq!(
        decrypt(&key, &iv, b"header-b", &sealed.ciphertext, &sealed.tag),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn test_truncated_tag_is_corrupt() {
    let key = [7u8; 32];
    let iv = [9u8; IV_SIZE];
    let sealed = encrypt(&key, &iv, b"", b"payload").unwrap();

    let result = decrypt(&key, &iv, b"", &sealed.ciphertext, &sealed.tag[..TAG_SIZE - 1]);
    assert!(matches!(result, Err(CryptoError::CorruptPayload(_))));
}

#[test]
fn test_encrypt_rejects_bad_sizes() {
    assert!(matches!(
        encrypt(&[0u8; 16], &[0u8; IV_SIZE], b"", b"x"),
        Err(CryptoError::Internal(_))
    ));
    assert!(matches!(
        encrypt(&[0u8; 32], &[0u8; 16], b"", b"x"),
        Err(CryptoError::Internal(_))
    ));
}
