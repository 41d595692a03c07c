// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use http::Method;
use tracing::info;
use url::Url;

use super::keys::parse_public_key;
use crate::config::TunnelConfig;
use crate::pseudonym::{FilePseudonymStore, InMemoryPseudonymStore, PseudonymStore};
use crate::vau::{
    HttpRequest, HttpResponse, ReqwestTransport, StaticBearerToken, StaticVauCertificate,
    VauTunnel,
};

/// Arguments for send command
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Validated VAU public key, SEC1 hex
    #[arg(long)]
    pub vau_key: String,

    /// Curve of the VAU key
    #[arg(long, default_value = "P-256")]
    pub curve: String,

    /// Bearer token (can also be set via VAU_BEARER_TOKEN env var)
    #[arg(long, env = "VAU_BEARER_TOKEN")]
    pub token: String,

    /// Inner request URL
    #[arg(long)]
    pub url: String,

    /// Inner request method
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Inner request headers as "Name: value"
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Inner request body
    #[arg(long)]
    pub body: Option<String>,
}

/// Build the inner request described by `args`
pub fn build_request(args: &SendArgs) -> Result<HttpRequest> {
    let url = Url::parse(&args.url).with_context(|| format!("Invalid URL {:?}", args.url))?;
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow!("Invalid method {:?}", args.method))?;

    let mut request = HttpRequest::new(method, url);
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("Header must look like \"Name: value\", got {:?}", header))?;
        request = request.with_header(name.trim(), value.trim())?;
    }
    if let Some(body) = &args.body {
        request = request.with_body(body.clone().into_bytes());
    }
    Ok(request)
}

/// Render a response the way `curl -i` does
pub fn format_response(response: &HttpResponse) -> String {
    let mut out = format!(
        "{} {}\n",
        response.status.as_u16(),
        response.status.canonical_reason().unwrap_or("")
    );
    for (name, value) in &response.headers {
        out.push_str(&format!(
            "{}: {}\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(&response.body));
    out
}

pub async fn send(args: SendArgs) -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();
    let config = TunnelConfig::from_env()?;

    let vau_key = parse_public_key(&args.curve, &args.vau_key)?;
    let request = build_request(&args)?;

    let pseudonyms: Arc<dyn PseudonymStore> = match &config.pseudonym_file {
        Some(path) => Arc::new(FilePseudonymStore::open(path).await?),
        None => Arc::new(InMemoryPseudonymStore::new()),
    };

    let tunnel = VauTunnel::from_config(
        &config,
        Arc::new(StaticBearerToken::new(args.token.clone())),
        Arc::new(StaticVauCertificate::new(vau_key)),
        Arc::new(ReqwestTransport::new(config.request_timeout)?),
        pseudonyms.clone(),
    )?;

    info!("🔐 Sending {} {} via {}", request.method, request.url, config.endpoint);
    let response = tunnel.execute(request).await.map_err(|e| {
        anyhow!("{} ({})", e.user_message(), e)
    })?;

    if pseudonyms.get_pseudonym().await.is_some() {
        info!("📝 Pseudonym available for the next request");
    }
    print!("{}", format_response(&response));
    Ok(())
}
