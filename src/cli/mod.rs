// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod keys;
pub mod tunnel;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// VAU tunnel CLI
#[derive(Parser, Debug)]
#[command(name = "vau-cli")]
#[command(version)]
#[command(about = "JWE tooling and VAU tunnel client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a static key pair
    Keygen(keys::KeygenArgs),

    /// Encrypt a payload into a compact JWE (ECDH-ES + A256GCM)
    Encrypt(keys::EncryptArgs),

    /// Decrypt a compact JWE
    Decrypt(keys::DecryptArgs),

    /// Send one request through the VAU tunnel
    Send(tunnel::SendArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Keygen(args) => keys::keygen(args),
        Commands::Encrypt(args) => keys::encrypt(args),
        Commands::Decrypt(args) => keys::decrypt(args),
        Commands::Send(args) => tunnel::send(args).await,
    }
}

/// Read a file, or stdin when no path is given
pub(crate) fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read input file {:?}", path))
        }
        None => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}
