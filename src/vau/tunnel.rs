// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! VAU Tunnel State Machine
//!
//! Every inner request makes one traversal:
//!
//! ```text
//! Idle ─► Preparing ─► Encrypting ─► Sending ─► ReceivingPseudonym ─┬─► Decrypting ─► Done
//!                                                                    └─► Done (passthrough)
//! any step ─► Failed
//! ```
//!
//! Each state carries what the previous transition produced, so the
//! invariant of a state can be checked on its own. In particular a response
//! only reaches `ReceivingPseudonym` after any pseudonym it carried has been
//! handed to the store, whatever decryption does afterwards.
//!
//! No retries happen here; retry policy belongs to the caller.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use tracing::{debug, info, info_span, warn, Instrument, Span};
use url::Url;
use zeroize::Zeroizing;

use super::crypto::{is_frame_field, VauCrypto, NO_PSEUDONYM};
use super::error::{VauError, VauResult};
use super::http::{HttpRequest, HttpResponse};
use super::providers::{BearerTokenProvider, Transport, VauCertificateProvider};
use crate::config::TunnelConfig;
use crate::crypto::random::{OsRandom, RandomSource};
use crate::pseudonym::PseudonymStore;

/// Content type of encrypted tunnel bodies in both directions
pub const TUNNEL_CONTENT_TYPE: &str = "application/octet-stream";

/// Response header carrying the pseudonym
pub const DEFAULT_PSEUDONYM_HEADER: &str = "userpseudonym";

/// Inputs gathered before encryption
pub struct TunnelSession {
    pub bearer_token: Zeroizing<String>,
    pub pseudonym: Option<String>,
    pub crypto: VauCrypto,
}

impl fmt::Debug for TunnelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelSession")
            .field("has_pseudonym", &self.pseudonym.is_some())
            .field("crypto", &self.crypto)
            .finish_non_exhaustive()
    }
}

/// One point of a tunnel traversal
#[derive(Debug)]
pub enum TunnelState {
    /// Inner request accepted, nothing done yet
    Idle { request: HttpRequest },
    /// Bearer token, validated VAU key and pseudonym are at hand
    Preparing {
        request: HttpRequest,
        session: TunnelSession,
    },
    /// Outer request built around the encrypted inner request
    Encrypting {
        original_url: Url,
        crypto: VauCrypto,
        outer: HttpRequest,
    },
    /// Outer response received
    Sending {
        original_url: Url,
        crypto: VauCrypto,
        response: HttpResponse,
    },
    /// Pseudonym from the response, if any, has been stored
    ReceivingPseudonym {
        original_url: Url,
        crypto: VauCrypto,
        response: HttpResponse,
    },
    /// Raw inner response decrypted and validated
    Decrypting { original_url: Url, raw_response: Vec<u8> },
    Done { response: HttpResponse },
    Failed { error: VauError },
}

impl TunnelState {
    pub fn new(request: HttpRequest) -> Self {
        TunnelState::Idle { request }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TunnelState::Idle { .. } => "idle",
            TunnelState::Preparing { .. } => "preparing",
            TunnelState::Encrypting { .. } => "encrypting",
            TunnelState::Sending { .. } => "sending",
            TunnelState::ReceivingPseudonym { .. } => "receiving_pseudonym",
            TunnelState::Decrypting { .. } => "decrypting",
            TunnelState::Done { .. } => "done",
            TunnelState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TunnelState::Done { .. } | TunnelState::Failed { .. })
    }

    /// Request id once a crypto context exists
    pub fn request_id(&self) -> Option<&str> {
        match self {
            TunnelState::Preparing { session, .. } => Some(session.crypto.request_id()),
            TunnelState::Encrypting { crypto, .. }
            | TunnelState::Sending { crypto, .. }
            | TunnelState::ReceivingPseudonym { crypto, .. } => Some(crypto.request_id()),
            _ => None,
        }
    }

    fn into_result(self) -> VauResult<HttpResponse> {
        match self {
            TunnelState::Done { response } => Ok(response),
            TunnelState::Failed { error } => Err(error),
            other => Err(VauError::Internal(format!(
                "traversal stopped in state {}",
                other.name()
            ))),
        }
    }
}

/// Client for a VAU tunnel endpoint
///
/// Cheap to share: concurrent [`execute`](Self::execute) calls each own
/// their crypto context and only meet at the pseudonym store.
#[derive(Clone)]
pub struct VauTunnel {
    endpoint: Url,
    pseudonym_header: HeaderName,
    bearer_tokens: Arc<dyn BearerTokenProvider>,
    certificates: Arc<dyn VauCertificateProvider>,
    transport: Arc<dyn Transport>,
    pseudonyms: Arc<dyn PseudonymStore>,
    random: Arc<dyn RandomSource>,
}

impl fmt::Debug for VauTunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VauTunnel")
            .field("endpoint", &self.endpoint.as_str())
            .field("pseudonym_header", &self.pseudonym_header)
            .finish_non_exhaustive()
    }
}

impl VauTunnel {
    pub fn new(
        endpoint: Url,
        bearer_tokens: Arc<dyn BearerTokenProvider>,
        certificates: Arc<dyn VauCertificateProvider>,
        transport: Arc<dyn Transport>,
        pseudonyms: Arc<dyn PseudonymStore>,
    ) -> Self {
        Self {
            endpoint,
            pseudonym_header: HeaderName::from_static(DEFAULT_PSEUDONYM_HEADER),
            bearer_tokens,
            certificates,
            transport,
            pseudonyms,
            random: Arc::new(OsRandom),
        }
    }

    /// Tunnel for the endpoint and pseudonym header in `config`
    pub fn from_config(
        config: &TunnelConfig,
        bearer_tokens: Arc<dyn BearerTokenProvider>,
        certificates: Arc<dyn VauCertificateProvider>,
        transport: Arc<dyn Transport>,
        pseudonyms: Arc<dyn PseudonymStore>,
    ) -> VauResult<Self> {
        Self::new(
            config.endpoint.clone(),
            bearer_tokens,
            certificates,
            transport,
            pseudonyms,
        )
        .with_pseudonym_header(&config.pseudonym_header)
    }

    pub fn with_pseudonym_header(mut self, name: &str) -> VauResult<Self> {
        self.pseudonym_header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| VauError::Internal(format!("invalid pseudonym header {:?}", name)))?;
        Ok(self)
    }

    /// Replace the randomness source (fixed-vector tests)
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `request` through the tunnel and return the inner response
    ///
    /// Non-tunnel responses (anything but `200` with
    /// `application/octet-stream`) are returned unchanged.
    pub async fn execute(&self, request: HttpRequest) -> VauResult<HttpResponse> {
        let span = info_span!(
            "vau_request",
            method = %request.method,
            path = %request.url.path(),
            request_id = tracing::field::Empty
        );

        async move {
            let mut state = TunnelState::new(request);
            while !state.is_terminal() {
                state = self.advance(state).await;
                if let Some(id) = state.request_id() {
                    Span::current().record("request_id", id);
                }
            }

            match &state {
                TunnelState::Done { response } => {
                    info!("✅ Tunnel request completed with status {}", response.status)
                }
                TunnelState::Failed { error } => {
                    warn!("❌ Tunnel request failed: {}", error.kind())
                }
                _ => {}
            }
            state.into_result()
        }
        .instrument(span)
        .await
    }

    /// Perform exactly one transition
    ///
    /// Terminal states are returned unchanged.
    pub async fn advance(&self, state: TunnelState) -> TunnelState {
        let from = state.name();
        let next = match state {
            TunnelState::Idle { request } => self.prepare(request).await,
            TunnelState::Preparing { request, session } => self.encrypt(request, session),
            TunnelState::Encrypting {
                original_url,
                crypto,
                outer,
            } => self.send(original_url, crypto, outer).await,
            TunnelState::Sending {
                original_url,
                crypto,
                response,
            } => {
                self.receive_pseudonym(&response).await;
                Ok(TunnelState::ReceivingPseudonym {
                    original_url,
                    crypto,
                    response,
                })
            }
            TunnelState::ReceivingPseudonym {
                original_url,
                crypto,
                response,
            } => decrypt(original_url, crypto, response),
            TunnelState::Decrypting {
                original_url,
                raw_response,
            } => HttpResponse::decode_raw(&raw_response, original_url)
                .map(|response| TunnelState::Done { response }),
            terminal @ (TunnelState::Done { .. } | TunnelState::Failed { .. }) => Ok(terminal),
        };

        let next = next.unwrap_or_else(|error| TunnelState::Failed { error });
        debug!("Tunnel state {} -> {}", from, next.name());
        next
    }

    async fn prepare(&self, request: HttpRequest) -> VauResult<TunnelState> {
        // 1. Bearer token from the identity provider
        let bearer_token = self
            .bearer_tokens
            .current_bearer_token()
            .await
            .map_err(|e| VauError::BearerTokenUnavailable(e.to_string()))?;

        // 2. Validated VAU key from the trust store
        let vau_public_key = self
            .certificates
            .validated_vau_public_key()
            .await
            .map_err(|e| VauError::CertificateInvalid(e.to_string()))?;

        // 3. Pseudonym from the previous response, if any
        let pseudonym = self.pseudonyms.get_pseudonym().await;

        let crypto = VauCrypto::new(vau_public_key, self.random.as_ref());
        Ok(TunnelState::Preparing {
            request,
            session: TunnelSession {
                bearer_token: Zeroizing::new(bearer_token),
                pseudonym,
                crypto,
            },
        })
    }

    fn encrypt(&self, request: HttpRequest, session: TunnelSession) -> VauResult<TunnelState> {
        let raw_request = request.encode_raw()?;
        let compact = session.crypto.encrypt(
            &session.bearer_token,
            session.pseudonym.as_deref(),
            &raw_request,
            self.random.as_ref(),
        )?;

        let mut outer = HttpRequest::new(Method::POST, self.endpoint.clone())
            .with_body(Bytes::from(compact.into_bytes()));
        outer
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(TUNNEL_CONTENT_TYPE));

        Ok(TunnelState::Encrypting {
            original_url: request.url,
            crypto: session.crypto,
            outer,
        })
    }

    async fn send(
        &self,
        original_url: Url,
        crypto: VauCrypto,
        outer: HttpRequest,
    ) -> VauResult<TunnelState> {
        debug!("Sending {} byte envelope to {}", outer.body.len(), self.endpoint);
        let response = self
            .transport
            .send(outer)
            .await
            .map_err(|e| VauError::TransportFailure(e.to_string()))?;

        Ok(TunnelState::Sending {
            original_url,
            crypto,
            response,
        })
    }

    /// Store a pseudonym carried by `response`; failures are absorbed
    async fn receive_pseudonym(&self, response: &HttpResponse) {
        let Some(value) = response.headers.get(&self.pseudonym_header) else {
            return;
        };

        // Must survive the space-delimited request framing unchanged
        let pseudonym = match value.to_str().map(str::trim) {
            Ok(p) if is_frame_field(p) && p != NO_PSEUDONYM => p.to_string(),
            _ => {
                warn!("Ignoring unusable {} header", self.pseudonym_header);
                return;
            }
        };

        if let Err(e) = self.pseudonyms.set_pseudonym(Some(pseudonym)).await {
            warn!("Failed to persist pseudonym: {}", e);
        } else {
            debug!("Pseudonym updated from response");
        }
    }
}

fn is_tunnel_response(response: &HttpResponse) -> bool {
    response.status == StatusCode::OK
        && response.media_type().as_deref() == Some(TUNNEL_CONTENT_TYPE)
}

fn decrypt(original_url: Url, crypto: VauCrypto, response: HttpResponse) -> VauResult<TunnelState> {
    if !is_tunnel_response(&response) {
        debug!(
            "Passing through non-tunnel response with status {}",
            response.status
        );
        return Ok(TunnelState::Done { response });
    }

    let raw_response = crypto.decrypt(&response.body)?;
    // crypto (and its response key) is dropped here
    Ok(TunnelState::Decrypting {
        original_url,
        raw_response,
    })
}
