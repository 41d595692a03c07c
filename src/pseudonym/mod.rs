// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pseudonym Store
//!
//! Holds the single opaque pseudonym the VAU hands out for session
//! continuity. The store is the only state shared between concurrent tunnel
//! requests: writes are serialized and the last write wins.
//!
//! Observers subscribe through [`PseudonymStore::pseudonym_changes`], which
//! yields the current value first and then every change.

pub mod file;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use file::FilePseudonymStore;

#[async_trait]
pub trait PseudonymStore: Send + Sync {
    async fn get_pseudonym(&self) -> Option<String>;

    /// Replace the pseudonym; `None` clears it (logout)
    async fn set_pseudonym(&self, pseudonym: Option<String>) -> Result<()>;

    fn pseudonym_changes(&self) -> BoxStream<'static, Option<String>>;
}

/// Shared notification core for store implementations
#[derive(Debug)]
pub(crate) struct PseudonymCell {
    sender: watch::Sender<Option<String>>,
}

impl PseudonymCell {
    pub(crate) fn new(initial: Option<String>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    /// Store `value`; returns whether it differed from the previous one
    pub(crate) fn replace(&self, value: Option<String>) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    pub(crate) fn changes(&self) -> BoxStream<'static, Option<String>> {
        WatchStream::new(self.sender.subscribe()).boxed()
    }
}

/// Volatile store, lost on restart
#[derive(Debug)]
pub struct InMemoryPseudonymStore {
    cell: PseudonymCell,
}

impl InMemoryPseudonymStore {
    pub fn new() -> Self {
        Self::with_pseudonym(None)
    }

    pub fn with_pseudonym(pseudonym: Option<String>) -> Self {
        Self {
            cell: PseudonymCell::new(pseudonym),
        }
    }
}

impl Default for InMemoryPseudonymStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PseudonymStore for InMemoryPseudonymStore {
    async fn get_pseudonym(&self) -> Option<String> {
        self.cell.get()
    }

    async fn set_pseudonym(&self, pseudonym: Option<String>) -> Result<()> {
        self.cell.replace(pseudonym);
        Ok(())
    }

    fn pseudonym_changes(&self) -> BoxStream<'static, Option<String>> {
        self.cell.changes()
    }
}
