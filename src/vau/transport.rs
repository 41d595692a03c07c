// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! reqwest-backed Transport

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use reqwest::Client;
use tracing::debug;

use super::http::{HttpRequest, HttpResponse};
use super::providers::Transport;

/// Sends outer requests with a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())?;
        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        debug!(
            "Transport {} {} ({} bytes)",
            request.method,
            request.url,
            request.body.len()
        );
        let response = builder.body(request.body.to_vec()).send().await?;

        let status = StatusCode::from_u16(response.status().as_u16())?;
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            let name = HeaderName::from_bytes(name.as_str().as_bytes())?;
            let value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|e| anyhow!("invalid response header {}: {}", name, e))?;
            headers.append(name, value);
        }
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            url: request.url,
        })
    }
}
