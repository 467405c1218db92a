use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use crate::models::{Application, Status};

/// Names under which blobs live in the key-value substrate.
pub mod keys {
    /// JSON array of all applications.
    pub const APPLICATIONS: &str = "jobApplications";
    /// RFC 3339 timestamp of the last successful cloud sync.
    pub const LAST_SYNC: &str = "driveLastSync";
    /// Cloud provider access token, set by `drive login`.
    pub const DRIVE_TOKEN: &str = "driveAccessToken";
    /// AI provider credential, overridable by environment.
    pub const AI_KEY: &str = "aiApiKey";
    /// JSON map of already-emitted reminder notifications.
    pub const NOTIFIED: &str = "notifiedReminders";
}

/// Durable storage of opaque string blobs keyed by name. The substrate
/// decides nothing about content; callers own serialization.
pub trait KeyValue {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

// --- SQLite-backed substrate ---

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
            Ok(proj_dirs.data_dir().join("apptrack.db"))
        } else {
            Ok(PathBuf::from("apptrack.db"))
        }
    }
}

impl KeyValue for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            });
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

// --- In-memory substrate for tests ---

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl KeyValue for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// --- Record store ---

/// The canonical in-memory collection for one run. Every mutation persists
/// the whole collection back to the substrate before returning.
pub struct RecordStore<S: KeyValue> {
    kv: S,
    apps: Vec<Application>,
}

impl<S: KeyValue> RecordStore<S> {
    pub fn load(kv: S) -> Result<Self> {
        let apps = match kv.get(keys::APPLICATIONS)? {
            Some(blob) => match serde_json::from_str(&blob) {
                Ok(apps) => apps,
                Err(e) => {
                    // A corrupt local blob degrades to a fresh collection
                    // rather than locking the user out of the app.
                    eprintln!("warning: stored applications are unreadable ({e}), starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(Self { kv, apps })
    }

    pub fn applications(&self) -> &[Application] {
        &self.apps
    }

    pub fn find(&self, id: &str) -> Option<&Application> {
        self.apps.iter().find(|a| a.id == id)
    }

    /// Resolve an exact id or a unique prefix of one; errors on ambiguity.
    pub fn resolve_id(&self, prefix: &str) -> Result<String> {
        if self.find(prefix).is_some() {
            return Ok(prefix.to_string());
        }
        let matches: Vec<&Application> = self
            .apps
            .iter()
            .filter(|a| a.id.starts_with(prefix))
            .collect();
        match matches.as_slice() {
            [] => anyhow::bail!("no application with id '{}'", prefix),
            [one] => Ok(one.id.clone()),
            many => anyhow::bail!(
                "id prefix '{}' is ambiguous ({} matches)",
                prefix,
                many.len()
            ),
        }
    }

    pub fn add(&mut self, app: Application) -> Result<()> {
        self.apps.push(app);
        self.persist()
    }

    /// Replace all fields of the record with the same id. Returns false if
    /// no such record exists; nothing is persisted in that case.
    pub fn update(&mut self, app: Application) -> Result<bool> {
        match self.apps.iter_mut().find(|a| a.id == app.id) {
            Some(slot) => {
                *slot = app;
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Status-only update, the board-move operation.
    pub fn update_status(&mut self, id: &str, status: Status) -> Result<bool> {
        match self.apps.iter_mut().find(|a| a.id == id) {
            Some(app) => {
                app.status = status;
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Irreversible removal. No tombstone, no undo.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.apps.len();
        self.apps.retain(|a| a.id != id);
        if self.apps.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Swap in a merged collection after a sync.
    pub fn replace_all(&mut self, apps: Vec<Application>) -> Result<()> {
        self.apps = apps;
        self.persist()
    }

    pub fn append_all(&mut self, apps: Vec<Application>) -> Result<()> {
        self.apps.extend(apps);
        self.persist()
    }

    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        match self.kv.get(keys::LAST_SYNC)? {
            Some(raw) => Ok(raw.parse().ok()),
            None => Ok(None),
        }
    }

    pub fn record_sync_time(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.kv.set(keys::LAST_SYNC, &at.to_rfc3339())
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    fn persist(&mut self) -> Result<()> {
        let blob =
            serde_json::to_string(&self.apps).context("failed to serialize applications")?;
        self.kv.set(keys::APPLICATIONS, &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::new_record_id;
    use chrono::NaiveDate;

    fn app(id: &str, company: &str) -> Application {
        Application {
            id: id.to_string(),
            company: company.to_string(),
            position: "Engineer".to_string(),
            applied_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: Status::Applied,
            source: None,
            job_link: None,
            notes: None,
            reminder_date: None,
            reminder_note: None,
        }
    }

    #[test]
    fn test_load_empty_store() {
        let store = RecordStore::load(MemoryStore::default()).unwrap();
        assert!(store.applications().is_empty());
    }

    #[test]
    fn test_mutations_persist_and_reload() {
        let mut store = RecordStore::load(MemoryStore::default()).unwrap();
        store.add(app("a1", "Acme")).unwrap();
        store.add(app("a2", "Globex")).unwrap();
        store.update_status("a2", Status::Interviewing).unwrap();
        assert!(store.remove("a1").unwrap());

        // Reload from the same substrate.
        let kv = std::mem::take(store.kv_mut());
        let reloaded = RecordStore::load(kv).unwrap();
        assert_eq!(reloaded.applications().len(), 1);
        assert_eq!(reloaded.applications()[0].company, "Globex");
        assert_eq!(reloaded.applications()[0].status, Status::Interviewing);
    }

    #[test]
    fn test_update_preserves_id() {
        let mut store = RecordStore::load(MemoryStore::default()).unwrap();
        store.add(app("a1", "Acme")).unwrap();
        let mut edited = app("a1", "Acme Corp");
        edited.status = Status::Offer;
        assert!(store.update(edited).unwrap());
        let found = store.find("a1").unwrap();
        assert_eq!(found.company, "Acme Corp");
        assert_eq!(found.status, Status::Offer);
        assert!(!store.update(app("missing", "Nope")).unwrap());
    }

    #[test]
    fn test_corrupt_blob_starts_empty() {
        let mut kv = MemoryStore::default();
        kv.set(keys::APPLICATIONS, "{not json").unwrap();
        let store = RecordStore::load(kv).unwrap();
        assert!(store.applications().is_empty());
    }

    #[test]
    fn test_resolve_id_prefix() {
        let mut store = RecordStore::load(MemoryStore::default()).unwrap();
        let id1 = new_record_id("2024-01-01T10:00:00Z".parse().unwrap());
        let id2 = new_record_id("2024-05-01T10:00:00Z".parse().unwrap());
        let mut a = app(&id1, "Acme");
        a.id = id1.clone();
        let mut b = app(&id2, "Globex");
        b.id = id2.clone();
        store.add(a).unwrap();
        store.add(b).unwrap();

        assert_eq!(store.resolve_id("2024-05").unwrap(), id2);
        assert!(store.resolve_id("2024-").is_err()); // ambiguous
        assert!(store.resolve_id("1999").is_err()); // no match
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apptrack.db");
        {
            let mut kv = SqliteStore::open_at(&path).unwrap();
            kv.set("k", "v1").unwrap();
            kv.set("k", "v2").unwrap();
            assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
        }
        let mut kv = SqliteStore::open_at(&path).unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }
}
