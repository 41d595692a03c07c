//! End-to-end tunnel scenarios
//!
//! Pseudonym continuity across requests, fail-open pseudonym updates,
//! passthrough of non-tunnel responses and concurrent use of one tunnel.

use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use http::StatusCode;
use url::Url;
use vau_tunnel::crypto::CryptoError;
use vau_tunnel::pseudonym::{FilePseudonymStore, InMemoryPseudonymStore, PseudonymStore};
use vau_tunnel::vau::{HttpRequest, StaticBearerToken, StaticVauCertificate, VauError};
use vau_tunnel::{TunnelConfig, VauTunnel};

use super::support::{self, FakeVau, ReadOnlyPseudonymStore, Reply};

#[tokio::test]
async fn test_pseudonym_continuity() {
    let vau = Arc::new(FakeVau::new());
    let store = Arc::new(InMemoryPseudonymStore::new());
    let tunnel = support::tunnel(&vau, store.clone());

    vau.hand_out_pseudonym("userpseudonym", "ABC123");
    tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(store.get_pseudonym().await.as_deref(), Some("ABC123"));

    tunnel.execute(support::inner_request()).await.unwrap();

    vau.with_received(0, |r| assert_eq!(r.payload.pseudonym, None));
    vau.with_received(1, |r| assert_eq!(r.payload.pseudonym.as_deref(), Some("ABC123")));
}

#[tokio::test]
async fn test_pseudonym_kept_when_not_sent_again() {
    let vau = Arc::new(FakeVau::new());
    let store = Arc::new(InMemoryPseudonymStore::with_pseudonym(Some("OLD".into())));
    let tunnel = support::tunnel(&vau, store.clone());

    tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(store.get_pseudonym().await.as_deref(), Some("OLD"));
    vau.with_received(0, |r| assert_eq!(r.payload.pseudonym.as_deref(), Some("OLD")));
}

#[tokio::test]
async fn test_pseudonym_stored_even_when_decryption_fails() {
    let vau = Arc::new(FakeVau::new());
    let store = Arc::new(InMemoryPseudonymStore::new());
    let tunnel = support::tunnel(&vau, store.clone());

    vau.hand_out_pseudonym("userpseudonym", "XYZ789");
    vau.push_reply(Reply::Tampered);

    let error = tunnel.execute(support::inner_request()).await.unwrap_err();
    assert!(error.is_authentication_failure());
    assert_eq!(error, VauError::Crypto(CryptoError::AuthenticationFailed));
    assert_eq!(store.get_pseudonym().await.as_deref(), Some("XYZ789"));
}

#[tokio::test]
async fn test_unframeable_pseudonym_is_not_stored() {
    for handed_out in ["ABC 123", "0"] {
        let vau = Arc::new(FakeVau::new());
        let store = Arc::new(InMemoryPseudonymStore::with_pseudonym(Some("OLD".into())));
        let tunnel = support::tunnel(&vau, store.clone());

        vau.hand_out_pseudonym("userpseudonym", handed_out);
        tunnel.execute(support::inner_request()).await.unwrap();
        assert_eq!(store.get_pseudonym().await.as_deref(), Some("OLD"));

        // The session keeps working with the last good pseudonym
        let response = tunnel.execute(support::inner_request()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        vau.with_received(1, |r| assert_eq!(r.payload.pseudonym.as_deref(), Some("OLD")));
    }
}

#[tokio::test]
async fn test_bearer_token_with_space_is_rejected_before_sending() {
    let vau = Arc::new(FakeVau::new());
    let tunnel = VauTunnel::new(
        support::endpoint(),
        Arc::new(StaticBearerToken::new("Bearer abc")),
        Arc::new(StaticVauCertificate::new(vau.public_key())),
        vau.clone(),
        Arc::new(InMemoryPseudonymStore::new()),
    );

    let error = tunnel.execute(support::inner_request()).await.unwrap_err();
    assert_eq!(
        error,
        VauError::Crypto(CryptoError::internal("bearer token cannot be framed"))
    );
    assert_eq!(vau.received_count(), 0);
}

#[tokio::test]
async fn test_store_failure_does_not_fail_request() {
    let vau = Arc::new(FakeVau::new());
    let tunnel = support::tunnel(&vau, Arc::new(ReadOnlyPseudonymStore));

    vau.hand_out_pseudonym("userpseudonym", "ABC123");
    let response = tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_server_error_passes_through() {
    let vau = Arc::new(FakeVau::new());
    let tunnel = support::tunnel(&vau, Arc::new(InMemoryPseudonymStore::new()));

    vau.push_reply(Reply::Plain {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        content_type: "text/plain",
        body: "VAU maintenance",
    });

    let response = tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.header_str("content-type"), Some("text/plain"));
    assert_eq!(&response.body[..], b"VAU maintenance");
}

#[tokio::test]
async fn test_ok_without_tunnel_content_type_passes_through() {
    let vau = Arc::new(FakeVau::new());
    let tunnel = support::tunnel(&vau, Arc::new(InMemoryPseudonymStore::new()));

    vau.push_reply(Reply::Plain {
        status: StatusCode::OK,
        content_type: "application/json",
        body: "{}",
    });

    let response = tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"{}");
}

#[tokio::test]
async fn test_pseudonym_stored_from_passthrough_response() {
    let vau = Arc::new(FakeVau::new());
    let store = Arc::new(InMemoryPseudonymStore::new());
    let tunnel = support::tunnel(&vau, store.clone());

    vau.hand_out_pseudonym("userpseudonym", "P1");
    vau.push_reply(Reply::Plain {
        status: StatusCode::SERVICE_UNAVAILABLE,
        content_type: "text/plain",
        body: "busy",
    });

    let response = tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(store.get_pseudonym().await.as_deref(), Some("P1"));
}

#[tokio::test]
async fn test_inner_error_status_is_decrypted() {
    let vau = Arc::new(FakeVau::new());
    let tunnel = support::tunnel(&vau, Arc::new(InMemoryPseudonymStore::new()));

    let not_found = vau_tunnel::vau::HttpResponse::new(
        StatusCode::NOT_FOUND,
        Url::parse(support::INNER_URL).unwrap(),
    )
    .with_body("no such task");
    vau.push_reply(Reply::Sealed(not_found));

    let response = tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.url.as_str(), support::INNER_URL);
    assert_eq!(&response.body[..], b"no such task");
}

#[tokio::test]
async fn test_concurrent_requests_get_their_own_responses() {
    let vau = Arc::new(FakeVau::new());
    let tunnel = support::tunnel(&vau, Arc::new(InMemoryPseudonymStore::new()));

    let requests = (0..8).map(|i| {
        let tunnel = tunnel.clone();
        async move {
            let url = Url::parse(&format!("https://erp.example/Task/{}", i)).unwrap();
            let response = tunnel.execute(HttpRequest::get(url)).await.unwrap();
            (i, response)
        }
    });

    for (i, response) in join_all(requests).await {
        assert_eq!(response.url.path(), format!("/Task/{}", i));
        assert_eq!(response.body, format!("GET /Task/{}", i));
    }

    assert_eq!(vau.received_count(), 8);
    let mut ids: Vec<String> = (0..8)
        .map(|i| vau.with_received(i, |r| r.payload.request_id.clone()))
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_configured_header_and_file_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pseudonym.json");

    let config = TunnelConfig::from_toml_str(&format!(
        "endpoint = \"{}\"\npseudonym_header = \"X-Pseudonym\"\npseudonym_file = {:?}\n",
        support::ENDPOINT,
        path
    ))
    .unwrap();

    let vau = Arc::new(FakeVau::new());
    let store = Arc::new(FilePseudonymStore::open(&path).await.unwrap());
    let mut changes = store.pseudonym_changes();
    assert_eq!(changes.next().await, Some(None));

    let tunnel = vau_tunnel::VauTunnel::from_config(
        &config,
        Arc::new(vau_tunnel::vau::StaticBearerToken::new(support::BEARER_TOKEN)),
        Arc::new(vau_tunnel::vau::StaticVauCertificate::new(vau.public_key())),
        vau.clone(),
        store.clone(),
    )
    .unwrap();
    assert_eq!(tunnel.endpoint().as_str(), support::ENDPOINT);

    vau.hand_out_pseudonym("x-pseudonym", "FILE42");
    tunnel.execute(support::inner_request()).await.unwrap();
    assert_eq!(changes.next().await, Some(Some("FILE42".to_string())));

    // A fresh store sees what the tunnel persisted
    let reopened = FilePseudonymStore::open(&path).await.unwrap();
    assert_eq!(reopened.get_pseudonym().await.as_deref(), Some("FILE42"));
}
