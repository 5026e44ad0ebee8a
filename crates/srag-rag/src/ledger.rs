//! Record of successfully ingested filenames

use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use srag_core::{Error, Result};

/// Newline-delimited list of filenames whose ingestion completed
pub struct FilenameLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilenameLedger {
    /// Open the ledger, creating an empty file (and its directory) if needed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        OpenOptions::new().create(true).append(true).open(&path).await?;

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded filenames in the order they were added
    pub async fn filenames(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Exact line match; "a.pdf" does not match "data.pdf"
    pub async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.filenames().await?.iter().any(|entry| entry == name))
    }

    pub async fn append(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.append_unlocked(name).await
    }

    /// Append `name` unless already present. Returns whether it was added.
    pub async fn append_if_absent(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        if self.contains(name).await? {
            return Ok(false);
        }
        self.append_unlocked(name).await?;
        Ok(true)
    }

    async fn append_unlocked(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(['\n', '\r']) {
            return Err(Error::InvalidInput(format!("invalid ledger entry: {:?}", name)));
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(format!("{}\n", name).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_then_contains() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FilenameLedger::open(dir.path().join("filename.log")).await.unwrap();

        assert!(!ledger.contains("report.pdf").await.unwrap());
        ledger.append("report.pdf").await.unwrap();
        assert!(ledger.contains("report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_contains_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FilenameLedger::open(dir.path().join("filename.log")).await.unwrap();
        ledger.append("data.pdf").await.unwrap();

        assert!(!ledger.contains("a.pdf").await.unwrap());
        assert!(!ledger.contains("data").await.unwrap());
    }

    #[tokio::test]
    async fn test_created_empty_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uploads").join("filename.log");
        let ledger = FilenameLedger::open(&path).await.unwrap();

        assert!(path.exists());
        assert!(ledger.filenames().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filenames_order_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filename.log");
        std::fs::write(&path, "a.pdf\n\nb.pdf\r\n").unwrap();

        let ledger = FilenameLedger::open(&path).await.unwrap();
        ledger.append("c.pdf").await.unwrap();
        assert_eq!(ledger.filenames().await.unwrap(), vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn test_append_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FilenameLedger::open(dir.path().join("filename.log")).await.unwrap();

        assert!(ledger.append_if_absent("x.pdf").await.unwrap());
        assert!(!ledger.append_if_absent("x.pdf").await.unwrap());
        assert_eq!(ledger.filenames().await.unwrap(), vec!["x.pdf"]);
    }

    #[tokio::test]
    async fn test_rejects_multiline_names() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FilenameLedger::open(dir.path().join("filename.log")).await.unwrap();
        assert!(matches!(ledger.append("a\nb").await, Err(Error::InvalidInput(_))));
    }
}
