// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request VAU Encryption Context
//!
//! A [`VauCrypto`] is created for exactly one outer request. It owns the
//! request id and the response key that the server must use to encrypt its
//! answer, and is dropped (zeroizing the key) once the response is handled.
//!
//! ## Payload Framing
//!
//! ```text
//! request  (ECDH-ES, cty=VAU):  "1 <bearer> <request-id> <hex response key> <pseudonym|0> <raw request>"
//! response (dir, A256GCM):      "1 <request-id> <raw response>"
//! ```
//!
//! The request id is 16 random bytes as lower-case hex; the response key is a
//! fresh 256-bit AES key.

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::aes_gcm::KEY_SIZE;
use crate::crypto::ecdh::PublicKey;
use crate::crypto::error::{CryptoError, CryptoResult};
use crate::crypto::random::RandomSource;
use crate::jwe::{DecryptionKey, EncryptionKey, JweEnvelope};

/// Protocol version prefix of every tunnel payload
pub const VAU_PROTOCOL_VERSION: &str = "1";

/// `cty` header of outbound envelopes
pub const VAU_CONTENT_TYPE: &str = "VAU";

/// Placeholder sent when no pseudonym is known
pub const NO_PSEUDONYM: &str = "0";

/// Random bytes in a request id
pub const REQUEST_ID_SIZE: usize = 16;

/// Whether `value` fits in one space-delimited payload field
pub fn is_frame_field(value: &str) -> bool {
    !value.is_empty() && !value.bytes().any(|b| b.is_ascii_whitespace())
}

/// Client side of one tunnel round trip
pub struct VauCrypto {
    vau_public_key: PublicKey,
    request_id: String,
    response_key: Zeroizing<[u8; KEY_SIZE]>,
}

impl fmt::Debug for VauCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VauCrypto")
            .field("curve", &self.vau_public_key.curve())
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

impl VauCrypto {
    /// Draw a fresh request id and response key
    pub fn new(vau_public_key: PublicKey, random: &dyn RandomSource) -> Self {
        let mut id = [0u8; REQUEST_ID_SIZE];
        random.fill_bytes(&mut id);

        let mut response_key = Zeroizing::new([0u8; KEY_SIZE]);
        random.fill_bytes(&mut response_key[..]);

        Self {
            vau_public_key,
            request_id: hex::encode(id),
            response_key,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Encrypt the framed payload for the VAU
    ///
    /// # Returns
    ///
    /// Compact JWE to be sent as the outer request body
    ///
    /// # Errors
    ///
    /// `Internal` if the bearer token or pseudonym is empty or contains
    /// whitespace, since either would shift every later field.
    pub fn encrypt(
        &self,
        bearer_token: &str,
        pseudonym: Option<&str>,
        raw_request: &[u8],
        random: &dyn RandomSource,
    ) -> CryptoResult<String> {
        if !is_frame_field(bearer_token) {
            return Err(CryptoError::internal("bearer token cannot be framed"));
        }
        if pseudonym.is_some_and(|p| !is_frame_field(p)) {
            return Err(CryptoError::internal("pseudonym cannot be framed"));
        }

        let key_hex = Zeroizing::new(hex::encode(&self.response_key[..]));
        let prefix = Zeroizing::new(format!(
            "{} {} {} {} {} ",
            VAU_PROTOCOL_VERSION,
            bearer_token,
            self.request_id,
            key_hex.as_str(),
            pseudonym.unwrap_or(NO_PSEUDONYM)
        ));

        let mut payload = Zeroizing::new(Vec::with_capacity(prefix.len() + raw_request.len()));
        payload.extend_from_slice(prefix.as_bytes());
        payload.extend_from_slice(raw_request);

        let envelope = JweEnvelope::encrypt(
            &payload,
            EncryptionKey::EcdhEs(&self.vau_public_key),
            Some(VAU_CONTENT_TYPE),
            random,
        )?;
        Ok(envelope.to_compact())
    }

    /// Decrypt and validate a VAU response body
    ///
    /// # Returns
    ///
    /// Raw inner HTTP response bytes
    ///
    /// # Errors
    ///
    /// Envelope errors as produced by [`JweEnvelope::decrypt`];
    /// `CorruptPayload` if the version or request id does not match.
    pub fn decrypt(&self, body: &[u8]) -> CryptoResult<Vec<u8>> {
        let compact = std::str::from_utf8(body)
            .map_err(|_| CryptoError::envelope("response body is not ASCII"))?;
        let envelope = JweEnvelope::parse(compact)?;
        let plaintext = envelope.decrypt(DecryptionKey::Direct(&self.response_key[..]))?;

        let mut parts = plaintext.splitn(3, |b| *b == b' ');
        let version = parts.next().unwrap_or_default();
        let request_id = parts.next().unwrap_or_default();
        let raw_response = parts
            .next()
            .ok_or_else(|| CryptoError::corrupt("response payload is truncated"))?;

        if version != VAU_PROTOCOL_VERSION.as_bytes() {
            return Err(CryptoError::corrupt("unexpected response version"));
        }
        if request_id != self.request_id.as_bytes() {
            return Err(CryptoError::corrupt("response request id does not match"));
        }

        Ok(raw_response.to_vec())
    }
}

/// Decrypted outbound payload, as seen by the VAU
pub struct VauRequestPayload {
    pub bearer_token: String,
    pub request_id: String,
    pub response_key: Zeroizing<Vec<u8>>,
    pub pseudonym: Option<String>,
    pub raw_request: Vec<u8>,
}

impl fmt::Debug for VauRequestPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VauRequestPayload")
            .field("request_id", &self.request_id)
            .field("has_pseudonym", &self.pseudonym.is_some())
            .field("raw_request_len", &self.raw_request.len())
            .finish_non_exhaustive()
    }
}

impl VauRequestPayload {
    /// Split a decrypted request payload into its fields
    pub fn parse(plaintext: &[u8]) -> CryptoResult<Self> {
        let mut parts = plaintext.splitn(6, |b| *b == b' ');
        let mut field = |name: &str| {
            parts
                .next()
                .ok_or_else(|| CryptoError::corrupt(format!("request payload missing {}", name)))
        };

        let version = field("version")?;
        let bearer = field("bearer token")?;
        let request_id = field("request id")?;
        let key_hex = field("response key")?;
        let pseudonym = field("pseudonym")?;
        let raw_request = field("request")?;

        if version != VAU_PROTOCOL_VERSION.as_bytes() {
            return Err(CryptoError::corrupt("unexpected request version"));
        }
        let text = |bytes: &[u8], name: &str| {
            String::from_utf8(bytes.to_vec())
                .map_err(|_| CryptoError::corrupt(format!("{} is not UTF-8", name)))
        };
        let response_key = Zeroizing::new(
            hex::decode(key_hex).map_err(|_| CryptoError::corrupt("response key is not hex"))?,
        );
        if response_key.len() != KEY_SIZE {
            return Err(CryptoError::corrupt("response key has wrong length"));
        }

        Ok(Self {
            bearer_token: text(bearer, "bearer token")?,
            request_id: text(request_id, "request id")?,
            response_key,
            pseudonym: match pseudonym {
                b"0" => None,
                other => Some(text(other, "pseudonym")?),
            },
            raw_request: raw_request.to_vec(),
        })
    }

    /// Encrypt a raw response back to the client under its response key
    pub fn seal_response(&self, raw_response: &[u8], random: &dyn RandomSource) -> CryptoResult<String> {
        let mut payload = Vec::with_capacity(raw_response.len() + 40);
        payload.extend_from_slice(
            format!("{} {} ", VAU_PROTOCOL_VERSION, self.request_id).as_bytes(),
        );
        payload.extend_from_slice(raw_response);

        let envelope = JweEnvelope::encrypt(
            &payload,
            EncryptionKey::Direct(&self.response_key),
            None,
            random,
        )?;
        Ok(envelope.to_compact())
    }
}
