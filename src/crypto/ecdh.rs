// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Agreement
//!
//! Ephemeral-static Elliptic Curve Diffie-Hellman over the named curves the
//! tunnel negotiates:
//!
//! - **P-256** (NIST P-256 / secp256r1) via `p256`
//! - **secp256k1** via `k256`
//!
//! The brainpoolP256r1 JWK name (`BP-256`) is recognised so that headers
//! carrying it can be parsed and re-serialized, but no arithmetic backend is
//! available for it and every key operation fails with `CurveUnsupported`.
//!
//! The shared secret is the x-coordinate of the agreed point. Secret scalars
//! and shared secrets are zeroized on drop by the curve crates.

use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::error::{CryptoError, CryptoResult};

/// Size of a 256-bit curve coordinate or scalar in bytes
pub const COORDINATE_SIZE: usize = 32;

/// JWK curve name of brainpoolP256r1
pub const BRAINPOOL_P256R1_JWK_NAME: &str = "BP-256";

/// Named elliptic curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// NIST P-256
    P256,
    /// secp256k1
    Secp256k1,
}

impl Curve {
    /// Curve name used in the JWK `crv` member
    pub fn jwk_name(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::Secp256k1 => "secp256k1",
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jwk_name())
    }
}

impl FromStr for Curve {
    type Err = CryptoError;

    fn from_str(name: &str) -> CryptoResult<Self> {
        match name {
            "P-256" => Ok(Curve::P256),
            "secp256k1" => Ok(Curve::Secp256k1),
            other => Err(CryptoError::CurveUnsupported(other.to_string())),
        }
    }
}

/// Static or ephemeral public key on a supported curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::PublicKey),
    Secp256k1(k256::PublicKey),
}

impl PublicKey {
    /// Curve the key lives on
    pub fn curve(&self) -> Curve {
        match self {
            PublicKey::P256(_) => Curve::P256,
            PublicKey::Secp256k1(_) => Curve::Secp256k1,
        }
    }

    /// Parse a SEC1 encoded point (compressed or uncompressed)
    ///
    /// # Errors
    ///
    /// `InvalidPoint` if the bytes do not encode a non-identity point on `curve`.
    pub fn from_sec1_bytes(curve: Curve, bytes: &[u8]) -> CryptoResult<Self> {
        match curve {
            Curve::P256 => p256::PublicKey::from_sec1_bytes(bytes)
                .map(PublicKey::P256)
                .map_err(|_| CryptoError::InvalidPoint),
            Curve::Secp256k1 => k256::PublicKey::from_sec1_bytes(bytes)
                .map(PublicKey::Secp256k1)
                .map_err(|_| CryptoError::InvalidPoint),
        }
    }

    /// Build a key from big-endian affine coordinates
    pub fn from_coordinates(curve: Curve, x: &[u8], y: &[u8]) -> CryptoResult<Self> {
        if x.len() != COORDINATE_SIZE || y.len() != COORDINATE_SIZE {
            return Err(CryptoError::InvalidPoint);
        }

        match curve {
            Curve::P256 => {
                let point = p256::EncodedPoint::from_affine_coordinates(
                    p256::FieldBytes::from_slice(x),
                    p256::FieldBytes::from_slice(y),
                    false,
                );
                Option::<p256::PublicKey>::from(p256::PublicKey::from_encoded_point(&point))
                    .map(PublicKey::P256)
                    .ok_or(CryptoError::InvalidPoint)
            }
            Curve::Secp256k1 => {
                let point = k256::EncodedPoint::from_affine_coordinates(
                    k256::FieldBytes::from_slice(x),
                    k256::FieldBytes::from_slice(y),
                    false,
                );
                Option::<k256::PublicKey>::from(k256::PublicKey::from_encoded_point(&point))
                    .map(PublicKey::Secp256k1)
                    .ok_or(CryptoError::InvalidPoint)
            }
        }
    }

    /// Uncompressed SEC1 encoding (`04 || x || y`)
    pub fn to_sec1_uncompressed(&self) -> Vec<u8> {
        match self {
            PublicKey::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::Secp256k1(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Big-endian affine coordinates `(x, y)`
    pub fn coordinates(&self) -> ([u8; COORDINATE_SIZE], [u8; COORDINATE_SIZE]) {
        let sec1 = self.to_sec1_uncompressed();
        let mut x = [0u8; COORDINATE_SIZE];
        let mut y = [0u8; COORDINATE_SIZE];
        x.copy_from_slice(&sec1[1..1 + COORDINATE_SIZE]);
        y.copy_from_slice(&sec1[1 + COORDINATE_SIZE..]);
        (x, y)
    }
}

/// Private scalar on a supported curve
///
/// Zeroized on drop.
#[derive(Clone)]
pub enum SecretKey {
    P256(p256::SecretKey),
    Secp256k1(k256::SecretKey),
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&self.curve()).finish()
    }
}

impl SecretKey {
    /// Generate a random scalar on `curve`
    pub fn random<R: CryptoRng + RngCore>(curve: Curve, rng: &mut R) -> Self {
        match curve {
            Curve::P256 => SecretKey::P256(p256::SecretKey::random(rng)),
            Curve::Secp256k1 => SecretKey::Secp256k1(k256::SecretKey::random(rng)),
        }
    }

    /// Load a 32-byte big-endian scalar
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != COORDINATE_SIZE {
            return Err(CryptoError::internal(format!(
                "private key must be {} bytes, got {}",
                COORDINATE_SIZE,
                bytes.len()
            )));
        }

        let invalid = |_| CryptoError::internal("private key is not a valid scalar");
        match curve {
            Curve::P256 => p256::SecretKey::from_slice(bytes)
                .map(SecretKey::P256)
                .map_err(invalid),
            Curve::Secp256k1 => k256::SecretKey::from_slice(bytes)
                .map(SecretKey::Secp256k1)
                .map_err(invalid),
        }
    }

    /// Big-endian scalar bytes
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            SecretKey::P256(key) => Zeroizing::new(key.to_bytes().to_vec()),
            SecretKey::Secp256k1(key) => Zeroizing::new(key.to_bytes().to_vec()),
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            SecretKey::P256(_) => Curve::P256,
            SecretKey::Secp256k1(_) => Curve::Secp256k1,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            SecretKey::P256(key) => PublicKey::P256(key.public_key()),
            SecretKey::Secp256k1(key) => PublicKey::Secp256k1(key.public_key()),
        }
    }
}

/// Raw ECDH output (x-coordinate of the shared point)
///
/// Zeroized on drop.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Per-operation key pair; never persisted
#[derive(Debug, Clone)]
pub struct EphemeralKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Rebuild a key pair from a known scalar (conformance tests)
    pub fn from_secret_bytes(curve: Curve, bytes: &[u8]) -> CryptoResult<Self> {
        Ok(Self::from(SecretKey::from_bytes(curve, bytes)?))
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn curve(&self) -> Curve {
        self.public.curve()
    }
}

impl From<SecretKey> for EphemeralKeyPair {
    fn from(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }
}

/// Generate a fresh ephemeral key pair on `curve`
pub fn generate_ephemeral_keypair<R: CryptoRng + RngCore>(
    curve: Curve,
    rng: &mut R,
) -> CryptoResult<EphemeralKeyPair> {
    Ok(EphemeralKeyPair::from(SecretKey::random(curve, rng)))
}

/// Compute the ECDH shared secret between `private` and `peer_public`
///
/// # Errors
///
/// `InvalidPoint` if the peer key is on a different curve than the private
/// key. Identity and off-curve points are already unrepresentable as a
/// [`PublicKey`].
pub fn ecdh_shared_secret(private: &SecretKey, peer_public: &PublicKey) -> CryptoResult<SharedSecret> {
    match (private, peer_public) {
        (SecretKey::P256(secret), PublicKey::P256(public)) => {
            let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
            Ok(SharedSecret(Zeroizing::new(shared.raw_secret_bytes().to_vec())))
        }
        (SecretKey::Secp256k1(secret), PublicKey::Secp256k1(public)) => {
            let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
            Ok(SharedSecret(Zeroizing::new(shared.raw_secret_bytes().to_vec())))
        }
        _ => Err(CryptoError::InvalidPoint),
    }
}
