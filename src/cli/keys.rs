// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Args};
use tracing::info;

use super::read_input;
use crate::crypto::base64url::base64url_decode;
use crate::crypto::ecdh::{Curve, PublicKey, SecretKey};
use crate::crypto::random::{OsRandom, RandomSource, RandomSourceRng};
use crate::jwe::{DecryptionKey, EncryptionKey, JweEnvelope};

/// Arguments for keygen command
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Curve (P-256 or secp256k1)
    #[arg(long, default_value = "P-256")]
    pub curve: String,
}

/// Arguments for encrypt command
#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Recipient public key, SEC1 hex (compressed or uncompressed)
    #[arg(long)]
    pub recipient: String,

    /// Curve of the recipient key
    #[arg(long, default_value = "P-256")]
    pub curve: String,

    /// Optional `cty` header value
    #[arg(long)]
    pub content_type: Option<String>,

    /// Payload file (stdin when omitted)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

/// Arguments for decrypt command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("key").required(true).args(["private_key", "direct_key"])))]
pub struct DecryptArgs {
    /// Recipient private key, 32-byte hex (ECDH-ES)
    #[arg(long)]
    pub private_key: Option<String>,

    /// Curve of the private key
    #[arg(long, default_value = "P-256")]
    pub curve: String,

    /// Shared symmetric key, Base64URL (dir)
    #[arg(long)]
    pub direct_key: Option<String>,

    /// Compact JWE file (stdin when omitted)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

pub(crate) fn parse_curve(name: &str) -> Result<Curve> {
    name.parse()
        .map_err(|e| anyhow!("{} (supported: P-256, secp256k1)", e))
}

pub(crate) fn parse_public_key(curve: &str, sec1_hex: &str) -> Result<PublicKey> {
    let bytes = hex::decode(sec1_hex.trim()).context("Public key is not hex")?;
    Ok(PublicKey::from_sec1_bytes(parse_curve(curve)?, &bytes)?)
}

/// Generate a key pair and render it as two hex lines
pub fn generate_keypair_text(curve: Curve, random: &dyn RandomSource) -> String {
    let secret = SecretKey::random(curve, &mut RandomSourceRng(random));
    format!(
        "private_key: {}\npublic_key: {}\n",
        hex::encode(secret.to_bytes().as_slice()),
        hex::encode(secret.public_key().to_sec1_uncompressed())
    )
}

/// Encrypt `payload` for the key in `args`
pub fn encrypt_payload(args: &EncryptArgs, payload: &[u8], random: &dyn RandomSource) -> Result<String> {
    let recipient = parse_public_key(&args.curve, &args.recipient)?;
    let envelope = JweEnvelope::encrypt(
        payload,
        EncryptionKey::EcdhEs(&recipient),
        args.content_type.as_deref(),
        random,
    )?;
    Ok(envelope.to_compact())
}

/// Decrypt a compact JWE with the key in `args`
pub fn decrypt_payload(args: &DecryptArgs, compact: &[u8]) -> Result<Vec<u8>> {
    let compact = std::str::from_utf8(compact).context("JWE input is not ASCII")?;
    let envelope = JweEnvelope::parse(compact)?;

    let plaintext = match (&args.private_key, &args.direct_key) {
        (Some(private_hex), None) => {
            let bytes = zeroize::Zeroizing::new(
                hex::decode(private_hex.trim()).context("Private key is not hex")?,
            );
            let secret = SecretKey::from_bytes(parse_curve(&args.curve)?, &bytes)?;
            envelope.decrypt(DecryptionKey::EcdhEs(&secret))?
        }
        (None, Some(direct)) => {
            let key = zeroize::Zeroizing::new(base64url_decode(direct.trim())?);
            envelope.decrypt(DecryptionKey::Direct(&key))?
        }
        _ => return Err(anyhow!("Use exactly one of --private-key or --direct-key")),
    };

    Ok(plaintext.to_vec())
}

pub fn keygen(args: KeygenArgs) -> Result<()> {
    let curve = parse_curve(&args.curve)?;
    info!("🔑 Generating {} key pair", curve);
    print!("{}", generate_keypair_text(curve, &OsRandom));
    Ok(())
}

pub fn encrypt(args: EncryptArgs) -> Result<()> {
    let payload = read_input(args.input.as_deref())?;
    let compact = encrypt_payload(&args, &payload, &OsRandom)?;
    println!("{}", compact);
    Ok(())
}

pub fn decrypt(args: DecryptArgs) -> Result<()> {
    let input = read_input(args.input.as_deref())?;
    let plaintext = decrypt_payload(&args, &input)?;
    std::io::stdout().write_all(&plaintext)?;
    Ok(())
}
