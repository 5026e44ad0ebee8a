//! Upload persistence and the upload-then-ingest flow

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use srag_core::{Error, Result};

use crate::ingestion::{IngestStatus, IngestionPipeline, Upload};
use crate::ledger::FilenameLedger;

/// Directory holding raw uploads
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path component of `name`, rejecting names that have none
    pub fn sanitize(name: &str) -> Result<String> {
        let base = name
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .unwrap_or_default();

        if base.is_empty() || base == "." || base == ".." {
            return Err(Error::InvalidInput(format!("invalid upload filename: {:?}", name)));
        }
        Ok(base.to_string())
    }

    /// Write the raw bytes to `<dir>/<file name>`, returning the path
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let file_name = Self::sanitize(file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "upload saved");
        Ok(path)
    }
}

/// Result of one upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Ingestion completed and the file was recorded
    Ingested { chunks: usize },
    /// The file was already recorded and ingestion was not forced
    AlreadyIngested,
    Failed { error: String },
}

/// Saves an upload, ingests it and records it in the ledger on success
pub struct Uploader {
    store: UploadStore,
    ledger: Arc<FilenameLedger>,
    pipeline: Arc<IngestionPipeline>,
}

impl Uploader {
    pub fn new(store: UploadStore, ledger: Arc<FilenameLedger>, pipeline: Arc<IngestionPipeline>) -> Self {
        Self {
            store,
            ledger,
            pipeline,
        }
    }

    pub fn ledger(&self) -> &FilenameLedger {
        &self.ledger
    }

    /// Upload `file_name`. `on_status` sees every ingestion status in order.
    ///
    /// With `force` false a file already in the ledger is saved but not
    /// ingested again.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        force: bool,
        mut on_status: impl FnMut(&IngestStatus) + Send,
    ) -> Result<UploadOutcome> {
        let file_name = UploadStore::sanitize(file_name)?;
        let path = self.store.save(&file_name, &bytes).await?;

        if !force && self.ledger.contains(&file_name).await? {
            tracing::info!(file = %file_name, "already ingested, skipping");
            return Ok(UploadOutcome::AlreadyIngested);
        }

        let upload = Upload::new(file_name.clone(), bytes).with_source(path.display().to_string());
        let mut statuses = self.pipeline.ingest(upload);
        let mut outcome = UploadOutcome::Failed {
            error: "ingestion ended without a result".to_string(),
        };

        while let Some(status) = statuses.next().await {
            on_status(&status);
            match status {
                IngestStatus::Completed { chunks, .. } => {
                    outcome = UploadOutcome::Ingested { chunks };
                }
                IngestStatus::Failed { error } => {
                    outcome = UploadOutcome::Failed { error };
                }
                _ => {}
            }
        }

        if let UploadOutcome::Ingested { .. } = outcome {
            self.ledger.append_if_absent(&file_name).await?;
        }
        Ok(outcome)
    }
}
