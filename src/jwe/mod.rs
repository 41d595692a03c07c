// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JWE Compact Envelope
//!
//! Five Base64URL segments joined by `.`:
//!
//! ```text
//! header . encrypted_key . iv . ciphertext . tag
//! ```
//!
//! ## Supported Algorithms
//!
//! - `alg`: `ECDH-ES` (direct key agreement) and `dir` (shared symmetric key)
//! - `enc`: `A256GCM`
//!
//! Both key-management modes use the agreed or shared key directly as the
//! CEK, so the encrypted-key segment is always empty.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let envelope = JweEnvelope::encrypt(payload, EncryptionKey::EcdhEs(&vau_key), Some("VAU"), &OsRandom)?;
//! let wire = envelope.to_compact();
//!
//! let parsed = JweEnvelope::parse(&wire)?;
//! let plaintext = parsed.decrypt(DecryptionKey::EcdhEs(&secret))?;
//! ```

pub mod header;
pub mod jwk;

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::aes_gcm::{self, IV_SIZE};
use crate::crypto::base64url::{base64url_decode, base64url_encode};
use crate::crypto::concat_kdf::{concat_kdf, OtherInfo};
use crate::crypto::ecdh::{ecdh_shared_secret, EphemeralKeyPair, PublicKey, SecretKey};
use crate::crypto::error::{CryptoError, CryptoResult};
use crate::crypto::random::RandomSource;

pub use header::{ContentEncryption, JweHeader, KeyManagement};
pub use jwk::Jwk;

/// Number of segments in a compact JWE
pub const COMPACT_SEGMENTS: usize = 5;

/// `cty` of an envelope wrapping a signed JWT
pub const NESTED_JWT_CONTENT_TYPE: &str = "NJWT";

#[derive(Serialize, Deserialize)]
struct NestedJwt {
    njwt: String,
}

/// Recipient key material for encryption
#[derive(Debug, Clone, Copy)]
pub enum EncryptionKey<'a> {
    /// Recipient static public key (`ECDH-ES`)
    EcdhEs(&'a PublicKey),
    /// Shared 256-bit key (`dir`)
    Direct(&'a [u8]),
}

/// Recipient key material for decryption
#[derive(Debug, Clone, Copy)]
pub enum DecryptionKey<'a> {
    /// Recipient static private key (`ECDH-ES`)
    EcdhEs(&'a SecretKey),
    /// Shared 256-bit key (`dir`)
    Direct(&'a [u8]),
}

/// Parsed or freshly sealed compact JWE
///
/// Immutable once constructed. The encoded header is kept exactly as
/// received since it is the AEAD additional data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JweEnvelope {
    header: JweHeader,
    encoded_header: String,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl JweEnvelope {
    /// Encrypt `payload` for the recipient with fresh randomness
    ///
    /// # Arguments
    ///
    /// * `payload` - Plaintext bytes
    /// * `key` - Recipient public key (`ECDH-ES`) or shared key (`dir`)
    /// * `content_type` - Optional `cty` header value
    /// * `random` - Source for the ephemeral key pair and IV
    pub fn encrypt(
        payload: &[u8],
        key: EncryptionKey<'_>,
        content_type: Option<&str>,
        random: &dyn RandomSource,
    ) -> CryptoResult<Self> {
        let template = JweHeader::direct(ContentEncryption::A256Gcm, content_type);
        Self::encrypt_with_header(payload, key, template, random)
    }

    /// Encrypt with caller-chosen header members
    ///
    /// `alg` and `epk` are set from `key`; `enc`, `cty`, `exp`, `typ`,
    /// `apu` and `apv` are taken from `template` and bound into the CEK
    /// derivation and the AAD.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` if the template's `enc` is not supported.
    pub fn encrypt_with_header(
        payload: &[u8],
        key: EncryptionKey<'_>,
        template: JweHeader,
        random: &dyn RandomSource,
    ) -> CryptoResult<Self> {
        match key {
            EncryptionKey::EcdhEs(recipient) => {
                // Ephemeral key always lives on the recipient's curve
                let ephemeral = random.ephemeral_keypair(recipient.curve())?;
                let iv = random.iv();
                Self::seal_ecdh_es(payload, recipient, &ephemeral, &iv, template)
            }
            EncryptionKey::Direct(cek) => {
                let mut header = template;
                header.content_encryption()?;
                header.alg = KeyManagement::Direct.as_str().to_string();
                header.epk = None;
                Self::seal(header, cek, &random.iv(), payload)
            }
        }
    }

    /// ECDH-ES encryption with caller-supplied ephemeral key pair and IV
    ///
    /// Identical inputs reproduce identical bytes; only conformance tests
    /// should call this directly.
    pub fn encrypt_with_ephemeral(
        payload: &[u8],
        recipient: &PublicKey,
        ephemeral: &EphemeralKeyPair,
        iv: &[u8],
        content_type: Option<&str>,
    ) -> CryptoResult<Self> {
        let template = JweHeader::direct(ContentEncryption::A256Gcm, content_type);
        Self::seal_ecdh_es(payload, recipient, ephemeral, iv, template)
    }

    /// Wrap a signed JWT as `{"njwt": ...}` in an ECDH-ES envelope
    ///
    /// The envelope carries `cty: NJWT` and, when given, the token's own
    /// expiry as `exp`.
    pub fn nest_jwt(
        jwt: &str,
        recipient: &PublicKey,
        expiry: Option<i64>,
        random: &dyn RandomSource,
    ) -> CryptoResult<Self> {
        let payload = Zeroizing::new(
            serde_json::to_vec(&NestedJwt {
                njwt: jwt.to_string(),
            })
            .map_err(|e| CryptoError::internal(e.to_string()))?,
        );
        let template = JweHeader::direct(ContentEncryption::A256Gcm, Some(NESTED_JWT_CONTENT_TYPE))
            .with_expiry(expiry);
        Self::encrypt_with_header(&payload, EncryptionKey::EcdhEs(recipient), template, random)
    }

    /// Decrypt a nested-JWT envelope and return the inner token
    ///
    /// # Errors
    ///
    /// Any [`decrypt`](Self::decrypt) error; `CorruptPayload` if the
    /// plaintext is not a `{"njwt": ...}` document.
    pub fn nested_jwt(&self, key: DecryptionKey<'_>) -> CryptoResult<String> {
        let plaintext = self.decrypt(key)?;
        let nested: NestedJwt = serde_json::from_slice(&plaintext)
            .map_err(|_| CryptoError::corrupt("payload is not a nested JWT"))?;
        Ok(nested.njwt)
    }

    fn seal_ecdh_es(
        payload: &[u8],
        recipient: &PublicKey,
        ephemeral: &EphemeralKeyPair,
        iv: &[u8],
        template: JweHeader,
    ) -> CryptoResult<Self> {
        // 1. Key agreement on the recipient's curve
        let shared = ecdh_shared_secret(ephemeral.secret_key(), recipient)?;

        // 2. Header with the ephemeral public key
        let mut header = template;
        let enc = header.content_encryption()?;
        header.epk = Some(Jwk::from_public_key(ephemeral.public_key()));
        header.alg = KeyManagement::EcdhEs.as_str().to_string();

        // 3. Derive CEK bound to enc and key length
        let cek = derive_ecdh_es_key(shared.as_bytes(), &header, enc)?;

        // 4. Encrypt with the encoded header as AAD
        Self::seal(header, &cek, iv, payload)
    }

    /// Encrypt under a precomputed content-encryption key
    ///
    /// The header is taken as-is; nothing checks that `cek` matches what its
    /// `alg` would derive.
    pub fn seal(header: JweHeader, cek: &[u8], iv: &[u8], payload: &[u8]) -> CryptoResult<Self> {
        let encoded_header = header.encode()?;
        let sealed = aes_gcm::encrypt(cek, iv, encoded_header.as_bytes(), payload)?;

        Ok(Self {
            header,
            encoded_header,
            encrypted_key: Vec::new(),
            iv: iv.to_vec(),
            ciphertext: sealed.ciphertext,
            tag: sealed.tag.to_vec(),
        })
    }

    /// Parse the compact serialization
    ///
    /// # Errors
    ///
    /// `MalformedEnvelope` if there are not exactly five segments, a segment
    /// is not Base64URL, or the header is not valid JSON.
    pub fn parse(compact: &str) -> CryptoResult<Self> {
        let segments: Vec<&str> = compact.trim().split('.').collect();
        if segments.len() != COMPACT_SEGMENTS {
            return Err(CryptoError::envelope(format!(
                "expected {} segments, got {}",
                COMPACT_SEGMENTS,
                segments.len()
            )));
        }

        let header = JweHeader::decode(segments[0])?;
        let decode = |segment: &str, name: &str| {
            base64url_decode(segment)
                .map_err(|_| CryptoError::envelope(format!("{} segment is not Base64URL", name)))
        };

        Ok(Self {
            header,
            encoded_header: segments[0].to_string(),
            encrypted_key: decode(segments[1], "encrypted key")?,
            iv: decode(segments[2], "iv")?,
            ciphertext: decode(segments[3], "ciphertext")?,
            tag: decode(segments[4], "tag")?,
        })
    }

    /// Decrypt with the recipient's key material
    ///
    /// All-or-nothing: no plaintext is returned unless the tag verifies.
    ///
    /// # Errors
    ///
    /// - `UnsupportedAlgorithm` for unknown `alg`/`enc`, or key material of the wrong kind
    /// - `MalformedEnvelope` for a non-empty encrypted key or missing `epk`
    /// - `CurveUnsupported` / `InvalidPoint` for a bad ephemeral key
    /// - `CorruptPayload` for a wrong IV or tag length
    /// - `AuthenticationFailed` on tag mismatch
    pub fn decrypt(&self, key: DecryptionKey<'_>) -> CryptoResult<Zeroizing<Vec<u8>>> {
        // 1. Algorithm negotiation before any cryptography
        let alg = self.header.key_management()?;
        let enc = self.header.content_encryption()?;

        if !self.encrypted_key.is_empty() {
            return Err(CryptoError::envelope(format!(
                "encrypted key must be empty for {}",
                alg
            )));
        }

        // 2. Resolve the CEK
        match (alg, key) {
            (KeyManagement::EcdhEs, DecryptionKey::EcdhEs(secret)) => {
                let epk = self
                    .header
                    .epk
                    .as_ref()
                    .ok_or_else(|| CryptoError::envelope("ECDH-ES header without epk"))?
                    .to_public_key()?;
                let shared = ecdh_shared_secret(secret, &epk)?;
                let cek = derive_ecdh_es_key(shared.as_bytes(), &self.header, enc)?;
                self.open(&cek)
            }
            (KeyManagement::Direct, DecryptionKey::Direct(cek)) => self.open(cek),
            (alg, _) => Err(CryptoError::UnsupportedAlgorithm(format!(
                "key material does not match alg {}",
                alg
            ))),
        }
    }

    /// Decrypt under a precomputed content-encryption key
    pub fn open(&self, cek: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if self.iv.len() != IV_SIZE {
            return Err(CryptoError::corrupt(format!(
                "IV must be {} bytes, got {}",
                IV_SIZE,
                self.iv.len()
            )));
        }
        let plaintext = aes_gcm::decrypt(
            cek,
            &self.iv,
            self.encoded_header.as_bytes(),
            &self.ciphertext,
            &self.tag,
        )?;
        Ok(Zeroizing::new(plaintext))
    }

    pub fn header(&self) -> &JweHeader {
        &self.header
    }

    /// Header segment exactly as it appears on the wire
    pub fn encoded_header(&self) -> &str {
        &self.encoded_header
    }

    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Compact serialization
    pub fn to_compact(&self) -> String {
        [
            self.encoded_header.clone(),
            base64url_encode(&self.encrypted_key),
            base64url_encode(&self.iv),
            base64url_encode(&self.ciphertext),
            base64url_encode(&self.tag),
        ]
        .join(".")
    }
}

impl fmt::Display for JweEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_compact())
    }
}

impl std::str::FromStr for JweEnvelope {
    type Err = CryptoError;

    fn from_str(compact: &str) -> CryptoResult<Self> {
        Self::parse(compact)
    }
}

/// Concat KDF for ECDH-ES direct agreement: AlgorithmID is `enc`
fn derive_ecdh_es_key(
    shared_secret: &[u8],
    header: &JweHeader,
    enc: ContentEncryption,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let other_info = OtherInfo::direct(enc.as_str(), enc.key_bits())
        .with_party_info(header.party_u_info()?, header.party_v_info()?);
    concat_kdf(shared_secret, &other_info)
}
