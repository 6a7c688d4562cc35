//! Storage backends: where reports live.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StoreError;
use crate::types::{ReportId, StoredReport};

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// Backend for persisting reports.
///
/// Implement this for your infrastructure:
/// - InMemoryBackend (testing)
/// - FileBackend (single node)
/// - Your database (production)
pub trait StorageBackend: Send + Sync {
    fn get(&self, id: &ReportId) -> Result<Option<StoredReport>, StoreError>;

    /// Store a new report. Returns `false`, leaving storage untouched, if the
    /// id is already taken.
    fn insert(&self, report: &StoredReport) -> Result<bool, StoreError>;

    /// Overwrite an existing report.
    fn put(&self, report: &StoredReport) -> Result<(), StoreError>;

    /// Returns whether anything was deleted.
    fn delete(&self, id: &ReportId) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<StoredReport>, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// In-memory storage (for testing and ephemeral use).
pub struct InMemoryBackend {
    reports: RwLock<HashMap<ReportId, StoredReport>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ReportId, StoredReport>>, StoreError> {
        self.reports
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<ReportId, StoredReport>>, StoreError> {
        self.reports
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, id: &ReportId) -> Result<Option<StoredReport>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn insert(&self, report: &StoredReport) -> Result<bool, StoreError> {
        let mut reports = self.write()?;
        if reports.contains_key(&report.id) {
            return Ok(false);
        }
        reports.insert(report.id.clone(), report.clone());
        Ok(true)
    }

    fn put(&self, report: &StoredReport) -> Result<(), StoreError> {
        self.write()?.insert(report.id.clone(), report.clone());
        Ok(())
    }

    fn delete(&self, id: &ReportId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<StoredReport>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// File-based storage (one JSON file per report).
///
/// Directory layout:
/// ```text
/// reports/
///   {report_id}.json
/// ```
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::storage("create dir", e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn report_path(&self, id: &ReportId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }

    fn read_report_file(&self, path: &Path) -> Result<StoredReport, StoreError> {
        let data = fs::read_to_string(path).map_err(|e| StoreError::storage("read", e))?;
        serde_json::from_str(&data).map_err(|e| StoreError::storage("parse", e))
    }

    /// Serialize next to the final path; the caller moves it into place.
    fn write_temp(&self, report: &StoredReport) -> Result<PathBuf, StoreError> {
        let json = serde_json::to_string_pretty(report).map_err(|e| StoreError::storage("serialize", e))?;
        let tmp = self.report_path(&report.id).with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::storage("write", e))?;
        Ok(tmp)
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, id: &ReportId) -> Result<Option<StoredReport>, StoreError> {
        let path = self.report_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_report_file(&path).map(Some)
    }

    fn insert(&self, report: &StoredReport) -> Result<bool, StoreError> {
        let tmp = self.write_temp(report)?;
        // hard_link refuses to replace an existing file, which makes
        // "insert if absent" atomic.
        let linked = fs::hard_link(&tmp, self.report_path(&report.id));
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StoreError::storage("link", e)),
        }
    }

    fn put(&self, report: &StoredReport) -> Result<(), StoreError> {
        // Atomic write: write to temp, then rename
        let tmp = self.write_temp(report)?;
        fs::rename(&tmp, self.report_path(&report.id)).map_err(|e| StoreError::storage("rename", e))
    }

    fn delete(&self, id: &ReportId) -> Result<bool, StoreError> {
        match fs::remove_file(self.report_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::storage("delete", e)),
        }
    }

    fn list(&self) -> Result<Vec<StoredReport>, StoreError> {
        let mut reports = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::storage("readdir", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::storage("entry", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                reports.push(self.read_report_file(&path)?);
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecryptionStatus, DetailedAddress, ReportStatus};
    use chrono::Utc;
    use siiec_envelope::Envelope;

    fn report(id: &str) -> StoredReport {
        let now = Utc::now();
        StoredReport {
            id: ReportId::parse(id).unwrap(),
            is_anonymous: true,
            role: None,
            category: "robo".into(),
            report_type: "asalto".into(),
            custom_crime_type: None,
            envelope: Envelope::from_parts("AAAA", "BBBB", "CCCC", None, None),
            latitude: Some(19.5),
            longitude: Some(-99.25),
            address: DetailedAddress::default(),
            timestamp: now,
            trust_score: None,
            ai_analysis: None,
            status: ReportStatus::Pending,
            assigned_to: None,
            decryption: DecryptionStatus::Unavailable,
            created_at: now,
            updated_at: now,
        }
    }

    fn exercise(backend: &dyn StorageBackend) {
        let a = report("a");
        assert!(backend.insert(&a).unwrap());
        assert!(!backend.insert(&a).unwrap(), "second insert must not overwrite");
        assert_eq!(backend.get(&a.id).unwrap(), Some(a.clone()));

        let mut changed = a.clone();
        changed.status = ReportStatus::Published;
        backend.put(&changed).unwrap();
        assert_eq!(backend.get(&a.id).unwrap().unwrap().status, ReportStatus::Published);

        assert!(backend.insert(&report("b")).unwrap());
        assert_eq!(backend.list().unwrap().len(), 2);

        assert!(backend.delete(&a.id).unwrap());
        assert!(!backend.delete(&a.id).unwrap());
        assert_eq!(backend.get(&a.id).unwrap(), None);
        assert_eq!(backend.list().unwrap().len(), 1);
    }

    #[test]
    fn in_memory_backend() {
        exercise(&InMemoryBackend::new());
    }

    #[test]
    fn file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("reports")).unwrap();
        exercise(&backend);

        // No temp files are left behind.
        let leftovers = fs::read_dir(backend.dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let a = report("persisted");
        FileBackend::new(dir.path()).unwrap().insert(&a).unwrap();

        let reopened = FileBackend::new(dir.path()).unwrap();
        assert_eq!(reopened.get(&a.id).unwrap(), Some(a));
    }
}
