// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! External Collaborators
//!
//! The tunnel consumes three services it does not implement:
//!
//! - **BearerTokenProvider**: the identity provider session
//! - **VauCertificateProvider**: the trust store, reduced to "validated key or error"
//! - **Transport**: one HTTP round trip
//!
//! Implementations report failures as `anyhow` errors; the tunnel maps them
//! into [`VauError`](super::error::VauError) at the boundary.

use anyhow::Result;
use async_trait::async_trait;

use super::http::{HttpRequest, HttpResponse};
use crate::crypto::ecdh::PublicKey;

#[async_trait]
pub trait BearerTokenProvider: Send + Sync {
    /// Current access token, refreshed out of band
    async fn current_bearer_token(&self) -> Result<String>;
}

#[async_trait]
pub trait VauCertificateProvider: Send + Sync {
    /// Public key of a VAU certificate that passed chain and validity checks
    async fn validated_vau_public_key(&self) -> Result<PublicKey>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Fixed bearer token
#[derive(Clone)]
pub struct StaticBearerToken(String);

impl StaticBearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticBearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticBearerToken(..)")
    }
}

#[async_trait]
impl BearerTokenProvider for StaticBearerToken {
    async fn current_bearer_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Pre-validated VAU public key
#[derive(Debug, Clone)]
pub struct StaticVauCertificate(PublicKey);

impl StaticVauCertificate {
    pub fn new(public_key: PublicKey) -> Self {
        Self(public_key)
    }
}

#[async_trait]
impl VauCertificateProvider for StaticVauCertificate {
    async fn validated_vau_public_key(&self) -> Result<PublicKey> {
        Ok(self.0.clone())
    }
}
