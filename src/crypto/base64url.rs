// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Base64URL Codec
//!
//! Unpadded, URL-safe Base64 (RFC 4648 §5) as used by every JOSE segment.
//! Decoding is strict: padding characters, characters outside the URL-safe
//! alphabet, impossible lengths and non-zero trailing bits are rejected.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use super::error::CryptoResult;

/// Encode bytes as unpadded Base64URL
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode an unpadded Base64URL string
///
/// # Errors
///
/// `CryptoError::MalformedEncoding` on any invalid input.
pub fn base64url_decode(input: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(input)?)
}
