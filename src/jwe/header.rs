// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JWE Protected Header
//!
//! The header is serialized canonically: members in the fixed order
//! `enc, epk, apu, apv, cty, exp, typ, alg`, absent members omitted, no
//! whitespace. The Base64URL form of these bytes is both the first compact
//! segment and the AEAD additional data, so the order is part of the wire
//! contract.
//!
//! `alg` and `enc` are kept as received; [`JweHeader::key_management`] and
//! [`JweHeader::content_encryption`] resolve them against the supported set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::jwk::Jwk;
use crate::crypto::base64url::{base64url_decode, base64url_encode};
use crate::crypto::error::{CryptoError, CryptoResult};

/// Key-management algorithm (`alg`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagement {
    /// Ephemeral-static ECDH, derived key used directly as the CEK
    EcdhEs,
    /// Shared symmetric key used directly as the CEK
    Direct,
}

impl KeyManagement {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyManagement::EcdhEs => "ECDH-ES",
            KeyManagement::Direct => "dir",
        }
    }
}

impl fmt::Display for KeyManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyManagement {
    type Err = CryptoError;

    fn from_str(alg: &str) -> CryptoResult<Self> {
        match alg {
            "ECDH-ES" => Ok(KeyManagement::EcdhEs),
            "dir" => Ok(KeyManagement::Direct),
            other => Err(CryptoError::UnsupportedAlgorithm(format!("alg {}", other))),
        }
    }
}

/// Content-encryption algorithm (`enc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncryption {
    A256Gcm,
}

impl ContentEncryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncryption::A256Gcm => "A256GCM",
        }
    }

    /// CEK length in bits
    pub fn key_bits(&self) -> u32 {
        match self {
            ContentEncryption::A256Gcm => 256,
        }
    }
}

impl fmt::Display for ContentEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentEncryption {
    type Err = CryptoError;

    fn from_str(enc: &str) -> CryptoResult<Self> {
        match enc {
            "A256GCM" => Ok(ContentEncryption::A256Gcm),
            other => Err(CryptoError::UnsupportedAlgorithm(format!("enc {}", other))),
        }
    }
}

/// JWE protected header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JweHeader {
    pub enc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<Jwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    pub alg: String,
}

impl JweHeader {
    /// Header for ECDH-ES direct key agreement
    pub fn ecdh_es(epk: Jwk, enc: ContentEncryption, content_type: Option<&str>) -> Self {
        Self {
            enc: enc.as_str().to_string(),
            epk: Some(epk),
            apu: None,
            apv: None,
            cty: content_type.map(str::to_string),
            exp: None,
            typ: None,
            alg: KeyManagement::EcdhEs.as_str().to_string(),
        }
    }

    /// Header for a shared symmetric key
    pub fn direct(enc: ContentEncryption, content_type: Option<&str>) -> Self {
        Self {
            enc: enc.as_str().to_string(),
            epk: None,
            apu: None,
            apv: None,
            cty: content_type.map(str::to_string),
            exp: None,
            typ: None,
            alg: KeyManagement::Direct.as_str().to_string(),
        }
    }

    /// Set the `exp` member (seconds since the epoch)
    pub fn with_expiry(mut self, exp: Option<i64>) -> Self {
        self.exp = exp;
        self
    }

    /// Set the `typ` member
    pub fn with_type(mut self, typ: Option<&str>) -> Self {
        self.typ = typ.map(str::to_string);
        self
    }

    pub fn key_management(&self) -> CryptoResult<KeyManagement> {
        self.alg.parse()
    }

    pub fn content_encryption(&self) -> CryptoResult<ContentEncryption> {
        self.enc.parse()
    }

    /// Decoded `apu` member, empty when absent
    pub fn party_u_info(&self) -> CryptoResult<Vec<u8>> {
        decode_party_info(self.apu.as_deref(), "apu")
    }

    /// Decoded `apv` member, empty when absent
    pub fn party_v_info(&self) -> CryptoResult<Vec<u8>> {
        decode_party_info(self.apv.as_deref(), "apv")
    }

    /// Canonical JSON bytes
    pub fn canonical_json(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CryptoError::internal(e.to_string()))
    }

    /// Base64URL of the canonical JSON, i.e. the first compact segment
    pub fn encode(&self) -> CryptoResult<String> {
        Ok(base64url_encode(self.canonical_json()?))
    }

    /// Parse a header segment as received
    ///
    /// # Errors
    ///
    /// `MalformedEnvelope` if the segment is not Base64URL or not a JSON
    /// object with string `alg` and `enc` members.
    pub fn decode(segment: &str) -> CryptoResult<Self> {
        let json = base64url_decode(segment)
            .map_err(|_| CryptoError::envelope("header segment is not Base64URL"))?;
        serde_json::from_slice(&json)
            .map_err(|e| CryptoError::envelope(format!("invalid header JSON: {}", e)))
    }
}

fn decode_party_info(value: Option<&str>, member: &str) -> CryptoResult<Vec<u8>> {
    match value {
        Some(encoded) => base64url_decode(encoded)
            .map_err(|_| CryptoError::envelope(format!("{} is not Base64URL", member))),
        None => Ok(Vec::new()),
    }
}
