// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod crypto;
pub mod jwe;
pub mod pseudonym;
pub mod vau;

// Re-export main types
pub use config::TunnelConfig;
pub use crypto::{Curve, CryptoError, OsRandom, PublicKey, RandomSource, SecretKey};
pub use jwe::{DecryptionKey, EncryptionKey, JweEnvelope, JweHeader};
pub use pseudonym::{FilePseudonymStore, InMemoryPseudonymStore, PseudonymStore};
pub use vau::{HttpRequest, HttpResponse, VauError, VauTunnel};
