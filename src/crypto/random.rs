// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Injectable Randomness
//!
//! Every random value the JWE and tunnel layers need (ephemeral key pairs,
//! IVs, request ids, response keys) is drawn from a [`RandomSource`] passed
//! in by the caller. Production code uses [`OsRandom`]; conformance tests
//! substitute a source that returns fixed key pairs and bytes.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use super::ecdh::{generate_ephemeral_keypair, Curve, EphemeralKeyPair};
use super::error::CryptoResult;

/// Source of cryptographic randomness
pub trait RandomSource: Send + Sync {
    /// Fill `dest` with random bytes
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Produce a fresh ephemeral key pair on `curve`
    fn ephemeral_keypair(&self, curve: Curve) -> CryptoResult<EphemeralKeyPair> {
        generate_ephemeral_keypair(curve, &mut RandomSourceRng(self))
    }

    /// Draw a fresh 96-bit AES-GCM IV
    fn iv(&self) -> [u8; 12] {
        let mut iv = [0u8; 12];
        self.fill_bytes(&mut iv);
        iv
    }
}

/// Operating-system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Adapts a [`RandomSource`] to the `rand_core` traits the curve crates expect
pub struct RandomSourceRng<'a, S: ?Sized>(pub &'a S);

impl<S: RandomSource + ?Sized> RngCore for RandomSourceRng<'_, S> {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.0.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.0.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.fill_bytes(dest);
        Ok(())
    }
}

impl<S: RandomSource + ?Sized> CryptoRng for RandomSourceRng<'_, S> {}
