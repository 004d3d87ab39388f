//! Résumé record persistence.
//!
//! Records are kept per owner (the signed-in user's email). Two stores
//! implement [`RecordStore`]:
//!
//! - [`LocalStore`]: one JSON file per owner under a directory. No
//!   concurrency control; the last write wins. This is the durable store.
//! - [`RemoteStore`]: the HTTP CRUD surface, currently short-circuited. It
//!   enforces the session (401 when signed out) and can be flagged
//!   unavailable (503), but otherwise returns synthetic success without
//!   touching storage.
//!
//! ## Local layout
//!
//! ```text
//! <dir>/
//! ├── 3f1c9a0b5e2d7c41.json   # records for one owner (SHA-256 prefix of the email)
//! └── 8a0e4b7d21c6f953.json
//! ```

use crate::session::SessionProvider;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not signed in")]
    Unauthorized,
    #[error("Record service unavailable")]
    Unavailable,
    #[error("No record with id '{0}'")]
    NotFound(String),
}

impl StoreError {
    /// HTTP-style status for surfacing to a client.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Unauthorized => 401,
            StoreError::NotFound(_) => 404,
            StoreError::Unavailable => 503,
            StoreError::Io(_) | StoreError::Json(_) => 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// A stored résumé.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeRecord {
    /// Assigned by the store on create.
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub summary: Option<String>,
    pub experiences: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
    /// Résumé layout template id.
    pub template: Option<String>,
    /// File name of the exported profile photo.
    pub photo: Option<String>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: Option<String>,
}

pub trait RecordStore {
    fn list(&self, owner: &str) -> Result<Vec<ResumeRecord>, StoreError>;
    /// Store a new record and return it with its assigned id.
    fn create(&self, owner: &str, record: ResumeRecord) -> Result<ResumeRecord, StoreError>;
    /// Replace the record with the same id.
    fn update(&self, owner: &str, record: ResumeRecord) -> Result<ResumeRecord, StoreError>;
    fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError>;
}

// =============================================================================
// Local store
// =============================================================================

/// JSON-file store, one file per owner.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Storage key for `owner`: emails are case-insensitive, file names are not.
    fn path_for(&self, owner: &str) -> PathBuf {
        let digest = Sha256::digest(owner.trim().to_lowercase().as_bytes());
        let key = format!("{:x}", digest);
        self.dir.join(format!("{}.json", &key[..16]))
    }

    fn load(&self, owner: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        let path = self.path_for(owner);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, owner: &str, records: &[ResumeRecord]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(owner);
        fs::write(&path, serde_json::to_string_pretty(records)?)?;
        debug!(path = %path.display(), count = records.len(), "records saved");
        Ok(())
    }
}

fn next_id(records: &[ResumeRecord]) -> String {
    let max = records
        .iter()
        .filter_map(|r| r.id.strip_prefix("resume-")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("resume-{}", max + 1)
}

fn touch(mut record: ResumeRecord) -> ResumeRecord {
    record.updated_at = Some(Utc::now().to_rfc3339());
    record
}

impl RecordStore for LocalStore {
    fn list(&self, owner: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        self.load(owner)
    }

    fn create(&self, owner: &str, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        let mut records = self.load(owner)?;
        let mut record = touch(record);
        record.id = next_id(&records);
        records.push(record.clone());
        self.save(owner, &records)?;
        Ok(record)
    }

    fn update(&self, owner: &str, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        let mut records = self.load(owner)?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;
        *slot = touch(record);
        let updated = slot.clone();
        self.save(owner, &records)?;
        Ok(updated)
    }

    fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let mut records = self.load(owner)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(owner, &records)
    }
}

// =============================================================================
// Remote store
// =============================================================================

/// Stubbed remote CRUD API (`GET/POST/DELETE /resumes`).
pub struct RemoteStore {
    session: Arc<dyn SessionProvider>,
    available: bool,
}

impl RemoteStore {
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self {
            session,
            available: true,
        }
    }

    /// Simulate the backing service being down.
    pub fn unavailable(session: Arc<dyn SessionProvider>) -> Self {
        Self {
            session,
            available: false,
        }
    }

    fn authorize(&self, operation: &str) -> Result<(), StoreError> {
        if self.session.current_user().is_none() {
            warn!(operation, "remote store rejected unauthenticated request");
            return Err(StoreError::Unauthorized);
        }
        if !self.available {
            warn!(operation, "remote store unavailable");
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

impl RecordStore for RemoteStore {
    fn list(&self, _owner: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        self.authorize("GET /resumes")?;
        Ok(Vec::new())
    }

    fn create(&self, _owner: &str, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        self.authorize("POST /resumes")?;
        let mut record = touch(record);
        if record.id.is_empty() {
            record.id = "remote-1".to_string();
        }
        Ok(record)
    }

    fn update(&self, _owner: &str, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        self.authorize("POST /resumes")?;
        Ok(touch(record))
    }

    fn delete(&self, _owner: &str, _id: &str) -> Result<(), StoreError> {
        self.authorize("DELETE /resumes")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{StaticSession, User};
    use tempfile::TempDir;

    fn record(name: &str) -> ResumeRecord {
        ResumeRecord {
            name: Some(name.to_string()),
            skills: vec!["Rust".into()],
            ..ResumeRecord::default()
        }
    }

    // =========================================================================
    // LocalStore
    // =========================================================================

    #[test]
    fn create_list_update_delete() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let owner = "ada@example.com";

        assert!(store.list(owner).unwrap().is_empty());

        let a = store.create(owner, record("Ada")).unwrap();
        let b = store.create(owner, record("Ada L.")).unwrap();
        assert_eq!(a.id, "resume-1");
        assert_eq!(b.id, "resume-2");
        assert!(a.updated_at.is_some());
        assert_eq!(store.list(owner).unwrap().len(), 2);

        let mut edited = a.clone();
        edited.summary = Some("Analyst".into());
        store.update(owner, edited).unwrap();
        let listed = store.list(owner).unwrap();
        assert_eq!(listed[0].summary.as_deref(), Some("Analyst"));

        store.delete(owner, "resume-1").unwrap();
        let listed = store.list(owner).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "resume-2");

        // Ids are not reused while higher ones exist
        assert_eq!(store.create(owner, record("x")).unwrap().id, "resume-3");
    }

    #[test]
    fn owners_are_isolated_and_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store.create("Ada@Example.com", record("Ada")).unwrap();
        assert_eq!(store.list("ada@example.com").unwrap().len(), 1);
        assert!(store.list("bob@example.com").unwrap().is_empty());
    }

    #[test]
    fn missing_records_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let err = store.delete("a@b.c", "resume-9").unwrap_err();
        assert_eq!(err.status_code(), 404);
        let ghost = ResumeRecord {
            id: "resume-9".into(),
            ..ResumeRecord::default()
        };
        assert!(matches!(
            store.update("a@b.c", ghost),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn last_write_wins_across_instances() {
        let tmp = TempDir::new().unwrap();
        let first = LocalStore::new(tmp.path());
        let second = LocalStore::new(tmp.path());
        let created = first.create("a@b.c", record("One")).unwrap();

        let mut from_first = created.clone();
        from_first.name = Some("First".into());
        let mut from_second = created;
        from_second.name = Some("Second".into());
        first.update("a@b.c", from_first).unwrap();
        second.update("a@b.c", from_second).unwrap();

        assert_eq!(
            first.list("a@b.c").unwrap()[0].name.as_deref(),
            Some("Second")
        );
    }

    #[test]
    fn corrupt_file_is_json_error() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        fs::write(store.path_for("a@b.c"), "{not json").unwrap();
        let err = store.list("a@b.c").unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
        assert_eq!(err.status_code(), 500);
    }

    // =========================================================================
    // RemoteStore
    // =========================================================================

    #[test]
    fn remote_requires_session() {
        let store = RemoteStore::new(Arc::new(StaticSession::signed_out()));
        let err = store.list("a@b.c").unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn remote_unavailable_is_503() {
        let session = Arc::new(StaticSession::signed_in(User::new("a@b.c", "A")));
        let store = RemoteStore::unavailable(session);
        assert_eq!(store.delete("a@b.c", "x").unwrap_err().status_code(), 503);
    }

    #[test]
    fn remote_returns_synthetic_success() {
        let session = Arc::new(StaticSession::signed_in(User::new("a@b.c", "A")));
        let store = RemoteStore::new(session.clone());
        assert!(store.list("a@b.c").unwrap().is_empty());
        let created = store.create("a@b.c", record("Ada")).unwrap();
        assert_eq!(created.id, "remote-1");
        assert!(store.delete("a@b.c", &created.id).is_ok());

        session.sign_out();
        assert!(matches!(
            store.create("a@b.c", record("Ada")),
            Err(StoreError::Unauthorized)
        ));
    }
}
