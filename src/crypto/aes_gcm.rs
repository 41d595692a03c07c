// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-256-GCM with Detached Tag
//!
//! JWE carries the IV, ciphertext and authentication tag in separate
//! segments, so this module exposes the detached form of AES-GCM:
//!
//! ```text
//! encrypt(key, iv, aad, plaintext) -> (ciphertext, tag)
//! decrypt(key, iv, aad, ciphertext, tag) -> plaintext
//! ```
//!
//! - Key: 32 bytes (256 bits)
//! - IV: 12 bytes (96 bits), unique per encryption
//! - Tag: 16 bytes (128 bits)
//! - AAD: the ASCII bytes of the protected header segment

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};

use super::error::{CryptoError, CryptoResult};

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;

/// GCM IV size in bytes
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Ciphertext and authentication tag produced by [`encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedContent {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_SIZE],
}

fn cipher(key: &[u8]) -> CryptoResult<Aes256Gcm> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::internal(format!(
            "AES-256-GCM key must be {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::internal(e.to_string()))
}

/// Encrypt `plaintext`, authenticating `aad`
///
/// # Arguments
///
/// * `key` - 32-byte content-encryption key
/// * `iv` - 12-byte IV; must never repeat under the same key
/// * `aad` - Additional authenticated data
/// * `plaintext` - Bytes to encrypt
///
/// # Errors
///
/// `Internal` if the key or IV has the wrong length.
pub fn encrypt(key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> CryptoResult<SealedContent> {
    // 1. Validate sizes
    let cipher = cipher(key)?;
    if iv.len() != IV_SIZE {
        return Err(CryptoError::internal(format!(
            "AES-GCM IV must be {} bytes, got {}",
            IV_SIZE,
            iv.len()
        )));
    }

    // 2. Encrypt in place, keep tag separate
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer)
        .map_err(|_| CryptoError::internal("AES-GCM encryption failed"))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(SealedContent {
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Decrypt `ciphertext` and verify `tag` over it and `aad`
///
/// # Errors
///
/// - `Internal` if the key has the wrong length
/// - `CorruptPayload` if the IV or tag has the wrong length
/// - `AuthenticationFailed` if the tag does not verify
pub fn decrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> CryptoResult<Vec<u8>> {
    // 1. Validate sizes
    let cipher = cipher(key)?;
    if iv.len() != IV_SIZE {
        return Err(CryptoError::corrupt(format!(
            "IV must be {} bytes, got {}",
            IV_SIZE,
            iv.len()
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(CryptoError::corrupt(format!(
            "authentication tag must be {} bytes, got {}",
            TAG_SIZE,
            tag.len()
        )));
    }

    // 2. Verify tag and decrypt; no detail leaks on failure
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv),
            aad,
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    Ok(buffer)
}
