//! JSON-file-backed candidate store.
//!
//! Stands in for the spreadsheet collaborator: a flat file holding one
//! record per candidate, read on `list_pending` and rewritten in place on
//! `update_status`. Pending means the record has never been called or its
//! last outcome left it eligible ("No Answer").

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::{CandidateStore, StatusUpdate, StoreError};
use crate::dispatcher::Candidate;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCandidate {
    name: String,
    phone: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    last_called_at: String,
    #[serde(default)]
    attempts: u32,
}

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles against the backing file.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_records(&self) -> Result<Vec<StoredCandidate>, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Unavailable(format!("malformed store file: {}", e)))
    }

    async fn write_records(&self, records: &[StoredCandidate]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.path.display(), e)))
    }

    fn is_pending(record: &StoredCandidate) -> bool {
        record.status.is_empty() || record.status == "Pending" || record.status == "No Answer"
    }
}

#[async_trait]
impl CandidateStore for JsonFileStore {
    async fn list_pending(&self) -> Result<Vec<Candidate>, StoreError> {
        let records = self.read_records().await?;
        let candidates: Vec<Candidate> = records
            .into_iter()
            .enumerate()
            .filter(|(_, r)| Self::is_pending(r))
            .map(|(index, r)| Candidate {
                name: r.name,
                phone: r.phone,
                role: r.role,
                notes: r.notes,
                attempts: r.attempts,
                row: index as u32,
            })
            .collect();

        info!(count = candidates.len(), "Loaded pending candidates");
        Ok(candidates)
    }

    async fn update_status(&self, row: u32, update: &StatusUpdate) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_records().await?;
        let record = records
            .get_mut(row as usize)
            .ok_or(StoreError::NotFound(row))?;

        record.status = update.status.clone();
        record.outcome = update.outcome.clone();
        record.last_called_at = update.last_called_at.to_rfc3339();
        record.attempts = update.attempts;

        self.write_records(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn seed_file(dir: &tempfile::TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("candidates.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    const SEED: &str = r#"[
        {"name": "Ada", "phone": "+15550001", "role": "Engineer"},
        {"name": "Grace", "phone": "+15550002", "status": "No Answer", "attempts": 1},
        {"name": "Alan", "phone": "+15550003", "status": "Not Interested", "attempts": 2}
    ]"#;

    #[tokio::test]
    async fn lists_only_pending_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(seed_file(&dir, SEED));

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].name, "Ada");
        assert_eq!(pending[0].row, 0);
        assert_eq!(pending[1].name, "Grace");
        assert_eq!(pending[1].attempts, 1);
        assert_eq!(pending[1].row, 1);
    }

    #[tokio::test]
    async fn update_status_rewrites_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(seed_file(&dir, SEED));

        let update = StatusUpdate {
            status: "No Answer".to_string(),
            outcome: "No Answer".to_string(),
            last_called_at: Utc::now(),
            attempts: 1,
        };
        store.update_status(0, &update).await.unwrap();

        let records = store.read_records().await.unwrap();
        assert_eq!(records[0].status, "No Answer");
        assert_eq!(records[0].attempts, 1);
        // Other records untouched
        assert_eq!(records[1].name, "Grace");
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));

        let err = store.list_pending().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unknown_row_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(seed_file(&dir, SEED));

        let update = StatusUpdate {
            status: "Completed".to_string(),
            outcome: "Interested".to_string(),
            last_called_at: Utc::now(),
            attempts: 1,
        };
        let err = store.update_status(99, &update).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
    }
}
