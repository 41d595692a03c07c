// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cryptographic Primitives
//!
//! Building blocks for the JWE envelope and the VAU tunnel:
//!
//! - **Base64URL**: unpadded URL-safe codec for every compact segment
//! - **ECDH**: ephemeral-static key agreement on P-256 and secp256k1
//! - **Concat KDF**: SP 800-56A single-step KDF with SHA-256
//! - **AES-GCM**: AES-256-GCM with a detached 128-bit tag
//! - **Random**: injectable randomness source
//!
//! ## Security Considerations
//!
//! - Ephemeral private keys, shared secrets and derived keys are zeroized on drop
//! - IVs are drawn fresh for every encryption
//! - Tag verification failures carry no detail about the mismatch
//!
//! ## Key Derivation Flow
//!
//! 1. Sender generates an ephemeral key pair on the recipient's curve
//! 2. Sender computes ECDH with the recipient's static public key
//! 3. Both sides run Concat KDF over the shared secret with OtherInfo bound to `enc`
//! 4. The derived 256-bit key encrypts the payload with AES-256-GCM

pub mod aes_gcm;
pub mod base64url;
pub mod concat_kdf;
pub mod ecdh;
pub mod error;
pub mod random;

pub use base64url::{base64url_decode, base64url_encode};
pub use concat_kdf::{concat_kdf, OtherInfo};
pub use ecdh::{
    ecdh_shared_secret, generate_ephemeral_keypair, Curve, EphemeralKeyPair, PublicKey, SecretKey,
    SharedSecret,
};
pub use error::{CryptoError, CryptoResult};
pub use random::{OsRandom, RandomSource};
