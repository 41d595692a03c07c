// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tunnel Error Types
//!
//! Closed error union for a tunnel traversal. Cryptographic failures are
//! carried unchanged in [`VauError::Crypto`]; failures of external
//! collaborators are adapted at the boundary into their own variants.

use thiserror::Error;

use crate::crypto::error::CryptoError;

/// Generic text shown to end users for every tunnel failure
pub const USER_FACING_MESSAGE: &str = "secure connection failed";

pub type VauResult<T> = std::result::Result<T, VauError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VauError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Trust oracle rejected the VAU certificate
    #[error("VAU certificate invalid: {0}")]
    CertificateInvalid(String),

    /// Identity provider could not supply a bearer token
    #[error("bearer token unavailable: {0}")]
    BearerTokenUnavailable(String),

    /// Outer request could not be delivered or answered
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Inner request cannot be framed (bad URL, header value, method)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal tunnel error: {0}")]
    Internal(String),
}

impl VauError {
    /// Text safe to show to a user; never carries detail
    pub fn user_message(&self) -> &'static str {
        USER_FACING_MESSAGE
    }

    /// Short stable identifier for logging
    pub fn kind(&self) -> &'static str {
        match self {
            VauError::Crypto(e) => e.kind(),
            VauError::CertificateInvalid(_) => "certificate_invalid",
            VauError::BearerTokenUnavailable(_) => "bearer_token_unavailable",
            VauError::TransportFailure(_) => "transport_failure",
            VauError::InvalidRequest(_) => "invalid_request",
            VauError::Internal(_) => "internal",
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, VauError::Crypto(CryptoError::AuthenticationFailed))
    }
}
