// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Closed error type for every operation of the codec, key agreement, AEAD
//! and JWE envelope layers.
//!
//! ## Error Variants
//!
//! - **MalformedEncoding**: Base64URL input with invalid characters or bad length
//! - **MalformedEnvelope**: compact JWE without 5 segments, undecodable segments or header
//! - **UnsupportedAlgorithm**: `alg`/`enc` outside the supported set
//! - **CurveUnsupported**: curve id without an arithmetic backend
//! - **InvalidPoint**: public key not on the expected curve (or the identity)
//! - **AuthenticationFailed**: AEAD tag mismatch, reported without detail
//! - **CorruptPayload**: any other inconsistency found while decoding
//! - **Internal**: programmer misuse (wrong key length, bad KDF length)
//!
//! Messages never contain key material, ciphertext or tag bytes.

use thiserror::Error;

/// Result alias for crypto and JWE operations
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Error type for all cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input is not valid unpadded Base64URL
    #[error("malformed Base64URL encoding")]
    MalformedEncoding,

    /// Compact serialization could not be split or decoded
    #[error("malformed JWE envelope: {0}")]
    MalformedEnvelope(String),

    /// Key-management or content-encryption algorithm is not supported
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Named curve is unknown or has no arithmetic backend
    #[error("unsupported curve: {0}")]
    CurveUnsupported(String),

    /// Public key is not a valid point on the expected curve
    #[error("invalid elliptic curve point")]
    InvalidPoint,

    /// AEAD authentication tag did not verify
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Decoded data is internally inconsistent
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Misuse of an API (wrong key length and similar)
    #[error("internal crypto error: {0}")]
    Internal(String),
}

impl CryptoError {
    /// Create a malformed envelope error
    pub fn envelope(reason: impl Into<String>) -> Self {
        CryptoError::MalformedEnvelope(reason.into())
    }

    /// Create a corrupt payload error
    pub fn corrupt(reason: impl Into<String>) -> Self {
        CryptoError::CorruptPayload(reason.into())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        CryptoError::Internal(reason.into())
    }

    /// Short stable identifier for logging
    pub fn kind(&self) -> &'static str {
        match self {
            CryptoError::MalformedEncoding => "malformed_encoding",
            CryptoError::MalformedEnvelope(_) => "malformed_envelope",
            CryptoError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            CryptoError::CurveUnsupported(_) => "curve_unsupported",
            CryptoError::InvalidPoint => "invalid_point",
            CryptoError::AuthenticationFailed => "authentication_failed",
            CryptoError::CorruptPayload(_) => "corrupt_payload",
            CryptoError::Internal(_) => "internal",
        }
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(_: base64::DecodeError) -> Self {
        CryptoError::MalformedEncoding
    }
}
