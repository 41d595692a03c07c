// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{PseudonymCell, PseudonymStore};

#[derive(Debug, Serialize, Deserialize)]
struct PseudonymDocument {
    pseudonym: String,
}

/// Pseudonym persisted as a small JSON document
///
/// Writes go to a temp file that is renamed over the target. Clearing the
/// pseudonym removes the file.
#[derive(Debug)]
pub struct FilePseudonymStore {
    path: PathBuf,
    cell: PseudonymCell,
    write_lock: Mutex<()>,
}

impl FilePseudonymStore {
    /// Open the store, loading any pseudonym already on disk
    ///
    /// An unreadable document is logged and treated as no pseudonym.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let initial = load_document(&path).await?;
        Ok(Self {
            path,
            cell: PseudonymCell::new(initial),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, pseudonym: Option<&str>) -> Result<()> {
        match pseudonym {
            Some(value) => {
                if let Some(parent) = self.path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent).await?;
                    }
                }

                let json = serde_json::to_vec(&PseudonymDocument {
                    pseudonym: value.to_string(),
                })?;

                // Write atomically using a temp file
                let temp_path = self.path.with_extension("tmp");
                if let Err(e) = replace_with_temp(&temp_path, &self.path, &json).await {
                    // Nothing to clean up if creation itself failed
                    fs::remove_file(&temp_path).await.ok();
                    return Err(e);
                }
            }
            None => {
                if self.path.exists() {
                    fs::remove_file(&self.path).await?;
                }
            }
        }
        Ok(())
    }
}

async fn replace_with_temp(temp_path: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .with_context(|| format!("Failed to create {:?}", temp_path))?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(temp_path, path)
        .await
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

async fn load_document(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    match serde_json::from_slice::<PseudonymDocument>(&contents) {
        Ok(document) => Ok(Some(document.pseudonym)),
        Err(e) => {
            warn!("Ignoring unreadable pseudonym file {:?}: {}", path, e);
            Ok(None)
        }
    }
}

#[async_trait]
impl PseudonymStore for FilePseudonymStore {
    async fn get_pseudonym(&self) -> Option<String> {
        self.cell.get()
    }

    async fn set_pseudonym(&self, pseudonym: Option<String>) -> Result<()> {
        // Single writer: disk and cell are updated under the same lock
        let _guard = self.write_lock.lock().await;

        if self.cell.get() == pseudonym {
            return Ok(());
        }

        self.persist(pseudonym.as_deref()).await?;
        self.cell.replace(pseudonym);
        debug!("Pseudonym persisted to {:?}", self.path);
        Ok(())
    }

    fn pseudonym_changes(&self) -> BoxStream<'static, Option<String>> {
        self.cell.changes()
    }
}
