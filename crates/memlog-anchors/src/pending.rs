use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use memlog_core::MemlogError;
use serde::{Deserialize, Serialize};

use crate::types::{AnchorRecord, AnchorStatus};

const PENDING_FILE: &str = "pending.json";
const PENDING_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PendingFile {
    version: u32,
    anchors: Vec<AnchorRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    last_check: Option<String>,
}

impl Default for PendingFile {
    fn default() -> Self {
        Self { version: PENDING_VERSION, anchors: Vec::new(), last_check: None }
    }
}

/// Read/write access to `anchors/pending.json`. One rewrite per mutation —
/// there is no append log, since the whole file is small and rewritten
/// atomically on every status transition.
pub struct PendingStore {
    path: PathBuf,
    anchors_dir: PathBuf,
}

impl PendingStore {
    pub fn open(data_dir: &Path) -> Result<Self, MemlogError> {
        let anchors_dir = data_dir.join("anchors");
        fs::create_dir_all(&anchors_dir)?;
        Ok(Self { path: anchors_dir.join(PENDING_FILE), anchors_dir })
    }

    pub fn anchors_dir(&self) -> &Path {
        &self.anchors_dir
    }

    fn read(&self) -> Result<PendingFile, MemlogError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => {
                serde_json::from_str(&json).map_err(|e| MemlogError::Serialization(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PendingFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &PendingFile) -> Result<(), MemlogError> {
        fs::write(&self.path, serde_json::to_string_pretty(file)?)?;
        Ok(())
    }

    pub fn get(&self, target_id: &str) -> Result<Option<AnchorRecord>, MemlogError> {
        Ok(self.read()?.anchors.into_iter().find(|a| a.target_id == target_id))
    }

    pub fn all(&self) -> Result<Vec<AnchorRecord>, MemlogError> {
        Ok(self.read()?.anchors)
    }

    /// Insert a brand-new pending record. Fails with `AnchorAlready` if
    /// `target_id` already has a record under this provider (duplicate
    /// submissions do not mutate state).
    pub fn insert_new(&self, record: AnchorRecord) -> Result<(), MemlogError> {
        let mut file = self.read()?;
        if file.anchors.iter().any(|a| a.target_id == record.target_id && a.provider == record.provider) {
            return Err(MemlogError::AnchorAlready { provider: record.provider });
        }
        file.anchors.push(record);
        self.write(&file)
    }

    /// Replace the record for `target_id` (status transition: pending →
    /// confirmed/failed, or an error string update on retry).
    pub fn replace(&self, target_id: &str, updated: AnchorRecord) -> Result<(), MemlogError> {
        let mut file = self.read()?;
        match file.anchors.iter_mut().find(|a| a.target_id == target_id) {
            Some(slot) => *slot = updated,
            None => file.anchors.push(updated),
        }
        self.write(&file)
    }

    pub fn pending_records(&self) -> Result<Vec<AnchorRecord>, MemlogError> {
        Ok(self.read()?.anchors.into_iter().filter(|a| a.status == AnchorStatus::Pending).collect())
    }

    pub fn touch_last_check(&self) -> Result<(), MemlogError> {
        let mut file = self.read()?;
        file.last_check = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        self.write(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnchorStatus;

    fn sample(target_id: &str) -> AnchorRecord {
        AnchorRecord {
            provider: "calendar".into(),
            target_id: target_id.into(),
            target_hash: "sha256:aa".into(),
            status: AnchorStatus::Pending,
            submitted_at: "2026-01-01T00:00:00.000Z".into(),
            confirmed_at: None,
            proof_artifact_path: "anchors/entry-1.ots".into(),
            external_coords: None,
            error: None,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        store.insert_new(sample("1")).unwrap();
        let got = store.get("1").unwrap().unwrap();
        assert_eq!(got.target_id, "1");
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        store.insert_new(sample("1")).unwrap();
        let err = store.insert_new(sample("1")).unwrap_err();
        assert!(matches!(err, MemlogError::AnchorAlready { .. }));
    }

    #[test]
    fn replace_transitions_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        store.insert_new(sample("1")).unwrap();

        let mut confirmed = store.get("1").unwrap().unwrap();
        confirmed.status = AnchorStatus::Confirmed;
        confirmed.confirmed_at = Some("2026-01-02T00:00:00.000Z".into());
        store.replace("1", confirmed).unwrap();

        let got = store.get("1").unwrap().unwrap();
        assert_eq!(got.status, AnchorStatus::Confirmed);
        assert!(store.pending_records().unwrap().is_empty());
    }
}
