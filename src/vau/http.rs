// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inner HTTP Messages
//!
//! Request and response types carried through the tunnel, plus their raw
//! HTTP/1.1 byte encoding. The raw form is what gets encrypted, so the
//! framing is fixed:
//!
//! ```text
//! request:  METHOD SP path[?query] SP HTTP/1.1 CRLF
//!           [Host: host[:port] CRLF]            (unless given)
//!           *(Name: value CRLF)                  (insertion order)
//!           [Content-Length: n CRLF]             (body present, not given)
//!           CRLF body
//!
//! response: HTTP/1.1 SP code SP reason CRLF *(Name: value CRLF) CRLF body
//! ```

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{Method, StatusCode};
use url::Url;

use super::error::{VauError, VauResult};
use crate::crypto::error::CryptoError;

const HTTP_VERSION: &str = "HTTP/1.1";
const CRLF: &[u8] = b"\r\n";
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Inner (or outer) HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Append a header, keeping earlier values of the same name
    pub fn with_header(mut self, name: &str, value: &str) -> VauResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| VauError::InvalidRequest(format!("invalid header name {:?}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| VauError::InvalidRequest(format!("invalid value for header {}", name)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Request target: path plus query
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Raw HTTP/1.1 bytes of this request
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the URL has no host.
    pub fn encode_raw(&self) -> VauResult<Vec<u8>> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(
            format!("{} {} {}", self.method, self.target(), HTTP_VERSION).as_bytes(),
        );
        out.extend_from_slice(CRLF);

        if !self.headers.contains_key(HOST) {
            let host = self
                .url
                .host_str()
                .ok_or_else(|| VauError::InvalidRequest("request URL has no host".to_string()))?;
            let authority = match self.url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            push_header_line(&mut out, "Host", authority.as_bytes());
        }

        push_headers(&mut out, &self.headers);

        if !self.body.is_empty() && !self.headers.contains_key(CONTENT_LENGTH) {
            push_header_line(&mut out, "Content-Length", self.body.len().to_string().as_bytes());
        }

        out.extend_from_slice(CRLF);
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    /// Parse a raw request; the URL is rebuilt as `https://{Host}{target}`
    pub fn decode_raw(raw: &[u8]) -> VauResult<Self> {
        let (start_line, headers, body) = split_message(raw)?;

        let mut parts = start_line.splitn(3, ' ');
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v)) => (m, t, v),
            _ => return Err(corrupt("malformed request line")),
        };
        if !version.starts_with("HTTP/1.") {
            return Err(corrupt("unsupported HTTP version"));
        }
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| corrupt("invalid method"))?;

        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| corrupt("request without Host header"))?;
        let url = Url::parse(&format!("https://{}{}", host, target))
            .map_err(|_| corrupt("invalid request target"))?;

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Inner (or outer) HTTP response, bound to the URL it answers
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl HttpResponse {
    pub fn new(status: StatusCode, url: Url) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            url,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of `name` as a string, if present and visible ASCII
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Content-Type` without parameters, lower-cased
    pub fn media_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
    }

    /// Raw HTTP/1.1 bytes of this response
    pub fn encode_raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(
            format!(
                "{} {} {}",
                HTTP_VERSION,
                self.status.as_u16(),
                self.status.canonical_reason().unwrap_or("")
            )
            .as_bytes(),
        );
        out.extend_from_slice(CRLF);
        push_headers(&mut out, &self.headers);
        if !self.body.is_empty() && !self.headers.contains_key(CONTENT_LENGTH) {
            push_header_line(&mut out, "Content-Length", self.body.len().to_string().as_bytes());
        }
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse a raw response and bind it to `url`
    ///
    /// # Errors
    ///
    /// `CorruptPayload` on a malformed status line or header, or when
    /// `Content-Length` disagrees with the body.
    pub fn decode_raw(raw: &[u8], url: Url) -> VauResult<Self> {
        let (status_line, headers, body) = split_message(raw)?;

        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or("");
        if !version.starts_with("HTTP/1.") {
            return Err(corrupt("malformed status line"));
        }
        let code = parts.next().ok_or_else(|| corrupt("status line without code"))?;
        let status =
            StatusCode::from_bytes(code.as_bytes()).map_err(|_| corrupt("invalid status code"))?;

        Ok(Self {
            status,
            headers,
            body,
            url,
        })
    }
}

fn corrupt(reason: &str) -> VauError {
    VauError::Crypto(CryptoError::corrupt(reason))
}

/// Split into start line, headers and body, validating `Content-Length`
fn split_message(raw: &[u8]) -> VauResult<(String, HeaderMap, Bytes)> {
    let head_end = raw
        .windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .ok_or_else(|| corrupt("missing end of header section"))?;

    let head = std::str::from_utf8(&raw[..head_end])
        .map_err(|_| corrupt("header section is not UTF-8"))?;
    let body = Bytes::copy_from_slice(&raw[head_end + HEAD_TERMINATOR.len()..]);

    let mut lines = head.split("\r\n");
    let start_line = lines.next().unwrap_or("").to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| corrupt("header line without colon"))?;
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| corrupt("invalid header name"))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| corrupt("invalid header value"))?;
        headers.append(name, value);
    }

    if let Some(length) = headers.get(CONTENT_LENGTH) {
        let length: usize = length
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| corrupt("invalid Content-Length"))?;
        if length != body.len() {
            return Err(corrupt("Content-Length does not match body"));
        }
    }

    Ok((start_line, headers, body))
}

fn push_headers(out: &mut Vec<u8>, headers: &HeaderMap) {
    for (name, value) in headers {
        push_header_line(out, &title_case(name.as_str()), value.as_bytes());
    }
}

fn push_header_line(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out.extend_from_slice(CRLF);
}

/// `content-type` -> `Content-Type`
fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
