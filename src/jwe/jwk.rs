// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON Web Key for the `epk` header member
//!
//! Only uncompressed EC keys are represented. Member order on the wire is
//! `y, x, kty, crv`.

use serde::{Deserialize, Serialize};

use crate::crypto::base64url::{base64url_decode, base64url_encode};
use crate::crypto::ecdh::{Curve, PublicKey, COORDINATE_SIZE};
use crate::crypto::error::{CryptoError, CryptoResult};

/// Key type of every JWK this crate handles
pub const EC_KEY_TYPE: &str = "EC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub y: String,
    pub x: String,
    pub kty: String,
    pub crv: String,
}

impl Jwk {
    pub fn from_public_key(key: &PublicKey) -> Self {
        let (x, y) = key.coordinates();
        Self {
            y: base64url_encode(y),
            x: base64url_encode(x),
            kty: EC_KEY_TYPE.to_string(),
            crv: key.curve().jwk_name().to_string(),
        }
    }

    /// Build a JWK from an uncompressed SEC1 point without validating it
    ///
    /// Works for any curve name, including ones without an arithmetic
    /// backend such as `BP-256`.
    pub fn from_uncompressed_point(crv: &str, point: &[u8]) -> CryptoResult<Self> {
        if point.len() != 1 + 2 * COORDINATE_SIZE || point[0] != 0x04 {
            return Err(CryptoError::InvalidPoint);
        }
        let (x, y) = point[1..].split_at(COORDINATE_SIZE);
        Ok(Self {
            y: base64url_encode(y),
            x: base64url_encode(x),
            kty: EC_KEY_TYPE.to_string(),
            crv: crv.to_string(),
        })
    }

    /// Resolve the key on its curve
    ///
    /// # Errors
    ///
    /// - `UnsupportedAlgorithm` if `kty` is not `EC`
    /// - `CurveUnsupported` for curves without a backend
    /// - `MalformedEnvelope` if a coordinate is not Base64URL
    /// - `InvalidPoint` if the coordinates are not on the curve
    pub fn to_public_key(&self) -> CryptoResult<PublicKey> {
        if self.kty != EC_KEY_TYPE {
            return Err(CryptoError::UnsupportedAlgorithm(format!("kty {}", self.kty)));
        }
        let curve: Curve = self.crv.parse()?;
        let x = base64url_decode(&self.x)
            .map_err(|_| CryptoError::envelope("epk x coordinate is not Base64URL"))?;
        let y = base64url_decode(&self.y)
            .map_err(|_| CryptoError::envelope("epk y coordinate is not Base64URL"))?;
        PublicKey::from_coordinates(curve, &x, &y)
    }
}
