// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! VAU Tunnel
//!
//! Wraps each inner HTTP request into an ECDH-ES JWE addressed to the VAU's
//! validated public key and posts it to the tunnel endpoint. Responses are
//! `dir` JWEs under a per-request response key.
//!
//! ## Components
//!
//! - **http**: inner request/response types and their raw HTTP/1.1 encoding
//! - **crypto**: per-request context (request id, response key, payload framing)
//! - **providers**: bearer token, certificate and transport interfaces
//! - **tunnel**: the request state machine
//! - **transport**: reqwest implementation of [`Transport`]
//!
//! ## Security Considerations
//!
//! - Encryption is bound to a key the trust store has validated
//! - No fallback to plaintext: any crypto failure fails the request
//! - The pseudonym is persisted before decryption is attempted

pub mod crypto;
pub mod error;
pub mod http;
pub mod providers;
pub mod transport;
pub mod tunnel;

pub use self::crypto::{VauCrypto, VauRequestPayload};
pub use self::http::{HttpRequest, HttpResponse};
pub use error::{VauError, VauResult, USER_FACING_MESSAGE};
pub use providers::{
    BearerTokenProvider, StaticBearerToken, StaticVauCertificate, Transport,
    VauCertificateProvider,
};
pub use transport::ReqwestTransport;
pub use tunnel::{TunnelSession, TunnelState, VauTunnel, TUNNEL_CONTENT_TYPE};
