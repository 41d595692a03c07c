// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tunnel Configuration
//!
//! Loaded from environment variables or a TOML file:
//!
//! | Variable                   | TOML key               | Default         |
//! |----------------------------|------------------------|-----------------|
//! | `VAU_ENDPOINT`             | `endpoint`             | required        |
//! | `VAU_PSEUDONYM_HEADER`     | `pseudonym_header`     | `userpseudonym` |
//! | `VAU_PSEUDONYM_FILE`       | `pseudonym_file`       | none (memory)   |
//! | `VAU_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` | `30`            |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::vau::tunnel::DEFAULT_PSEUDONYM_HEADER;

pub const ENV_ENDPOINT: &str = "VAU_ENDPOINT";
pub const ENV_PSEUDONYM_HEADER: &str = "VAU_PSEUDONYM_HEADER";
pub const ENV_PSEUDONYM_FILE: &str = "VAU_PSEUDONYM_FILE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "VAU_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn default_pseudonym_header() -> String {
    DEFAULT_PSEUDONYM_HEADER.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Validated tunnel configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    /// VAU endpoint all outer requests are posted to
    pub endpoint: Url,
    /// Response header carrying the pseudonym
    pub pseudonym_header: String,
    /// Where to persist the pseudonym; in memory only when absent
    pub pseudonym_file: Option<PathBuf>,
    pub request_timeout: Duration,
}

/// On-disk form of [`TunnelConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TunnelConfigFile {
    endpoint: String,
    #[serde(default = "default_pseudonym_header")]
    pseudonym_header: String,
    #[serde(default)]
    pseudonym_file: Option<PathBuf>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl TryFrom<TunnelConfigFile> for TunnelConfig {
    type Error = anyhow::Error;

    fn try_from(file: TunnelConfigFile) -> Result<Self> {
        let endpoint = Url::parse(&file.endpoint)
            .with_context(|| format!("Invalid VAU endpoint {:?}", file.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!("VAU endpoint must be http(s), got {}", endpoint.scheme()));
        }
        if file.pseudonym_header.trim().is_empty() {
            return Err(anyhow!("Pseudonym header name must not be empty"));
        }
        if file.request_timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be at least one second"));
        }

        Ok(Self {
            endpoint,
            pseudonym_header: file.pseudonym_header.trim().to_ascii_lowercase(),
            pseudonym_file: file.pseudonym_file,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
        })
    }
}

impl TunnelConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            pseudonym_header: default_pseudonym_header(),
            pseudonym_file: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint =
            lookup(ENV_ENDPOINT).ok_or_else(|| anyhow!("{} is not set", ENV_ENDPOINT))?;

        let request_timeout_secs = match lookup(ENV_REQUEST_TIMEOUT_SECS) {
            Some(value) => value.trim().parse().with_context(|| {
                format!("{} must be a number of seconds, got {:?}", ENV_REQUEST_TIMEOUT_SECS, value)
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        TunnelConfigFile {
            endpoint,
            pseudonym_header: lookup(ENV_PSEUDONYM_HEADER)
                .unwrap_or_else(default_pseudonym_header),
            pseudonym_file: lookup(ENV_PSEUDONYM_FILE)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            request_timeout_secs,
        }
        .try_into()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TunnelConfigFile =
            toml::from_str(content).context("Failed to parse tunnel configuration")?;
        file.try_into()
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&content)
    }
}
