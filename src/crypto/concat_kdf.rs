// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Concat KDF (NIST SP 800-56A §5.8.1, single-step, SHA-256)
//!
//! Derives the content-encryption key from an ECDH shared secret the way
//! JWA §4.6.2 prescribes for `ECDH-ES` in direct key agreement mode:
//!
//! ```text
//! round_i   = SHA-256( be32(i) || Z || OtherInfo )      i = 1, 2, ...
//! OtherInfo = lp(AlgorithmID) || lp(PartyUInfo) || lp(PartyVInfo) || be32(keydatalen)
//! lp(x)     = be32(len(x)) || x
//! ```
//!
//! Output is the first `keydatalen / 8` bytes of the concatenated rounds.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::error::{CryptoError, CryptoResult};

const HASH_LEN: usize = 32;

/// Fixed-info block fed to every KDF round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherInfo {
    /// `enc` value in direct key agreement mode
    pub algorithm_id: Vec<u8>,
    /// Decoded `apu` (empty when absent)
    pub party_u_info: Vec<u8>,
    /// Decoded `apv` (empty when absent)
    pub party_v_info: Vec<u8>,
    /// Derived key length in bits
    pub key_data_len_bits: u32,
}

impl OtherInfo {
    /// OtherInfo for ECDH-ES direct agreement with no party info
    pub fn direct(enc: &str, key_data_len_bits: u32) -> Self {
        Self {
            algorithm_id: enc.as_bytes().to_vec(),
            party_u_info: Vec::new(),
            party_v_info: Vec::new(),
            key_data_len_bits,
        }
    }

    pub fn with_party_info(mut self, apu: Vec<u8>, apv: Vec<u8>) -> Self {
        self.party_u_info = apu;
        self.party_v_info = apv;
        self
    }

    /// Serialized OtherInfo bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            16 + self.algorithm_id.len() + self.party_u_info.len() + self.party_v_info.len(),
        );
        push_length_prefixed(&mut out, &self.algorithm_id);
        push_length_prefixed(&mut out, &self.party_u_info);
        push_length_prefixed(&mut out, &self.party_v_info);
        out.extend_from_slice(&self.key_data_len_bits.to_be_bytes());
        out
    }
}

fn push_length_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

/// Derive `key_data_len_bits / 8` bytes from the shared secret `z`
///
/// # Errors
///
/// `Internal` when the requested length is zero or not a whole number of bytes.
pub fn concat_kdf(z: &[u8], other_info: &OtherInfo) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let bits = other_info.key_data_len_bits;
    if bits == 0 || bits % 8 != 0 {
        return Err(CryptoError::internal(format!(
            "key data length must be a positive multiple of 8 bits, got {}",
            bits
        )));
    }

    let key_len = (bits / 8) as usize;
    let info = other_info.to_bytes();
    let rounds = key_len.div_ceil(HASH_LEN);

    let mut derived = Zeroizing::new(Vec::with_capacity(rounds * HASH_LEN));
    for counter in 1..=rounds as u32 {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update(&info);
        derived.extend_from_slice(&hasher.finalize());
    }

    derived.truncate(key_len);
    Ok(derived)
}
