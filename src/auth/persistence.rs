//! Durable storage for the refresh token
//!
//! Only the refresh token ever leaves memory. It is written as a small JSON
//! document under the `refresh_token` key so a restarted client can resume
//! the session without asking for credentials again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ClientError, ClientResult};

/// Backend for the persisted half of the session.
///
/// All calls are synchronous and complete before returning, so the next
/// process start always observes the latest write or removal. A blank
/// token is a revocation marker and reads back as signed out.
pub trait TokenPersistence: Send + Sync {
    /// Persisted refresh token, if any
    fn load(&self) -> ClientResult<Option<String>>;

    /// Replace the persisted refresh token
    fn save(&self, refresh_token: &str) -> ClientResult<()>;

    /// Erase the persisted refresh token. Succeeds when nothing is stored.
    fn clear(&self) -> ClientResult<()>;
}

/// On-disk document
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    refresh_token: String,
    saved_at: DateTime<Utc>,
}

/// JSON file persistence, written atomically with owner-only permissions
#[derive(Debug, Clone)]
pub struct FileTokenPersistence {
    path: PathBuf,
}

impl FileTokenPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl TokenPersistence for FileTokenPersistence {
    fn load(&self) -> ClientResult<Option<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Truncated by a clear() that could not remove the file
        if contents.trim().is_empty() {
            return Ok(None);
        }

        let session: PersistedSession = serde_json::from_str(&contents).map_err(|e| {
            ClientError::Storage(format!(
                "corrupt session file at '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(Some(session.refresh_token).filter(|token| !token.trim().is_empty()))
    }

    fn save(&self, refresh_token: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(&PersistedSession {
            refresh_token: refresh_token.to_string(),
            saved_at: Utc::now(),
        })?;

        // Write-then-rename so a crash never leaves a half-written file
        let temp = self.temp_path();
        let written = write_private(&temp, contents.as_bytes())
            .and_then(|()| fs::rename(&temp, &self.path));

        if let Err(e) = written {
            // The temp file holds the token; never leave it behind
            if let Err(cleanup) = fs::remove_file(&temp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::error!(
                        path = %temp.display(),
                        error = %cleanup,
                        "Failed to remove temporary session file"
                    );
                }
            }
            return Err(e.into());
        }

        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        let removed = match fs::remove_file(&self.path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => e,
        };

        tracing::warn!(
            path = %self.path.display(),
            error = %removed,
            "Could not remove session file, truncating it instead"
        );

        match OpenOptions::new().write(true).truncate(true).open(&self.path) {
            Ok(_) => Ok(()),
            Err(_) => Err(removed.into()),
        }
    }
}

/// Create (or reuse) `path` with owner-only permissions and write `contents`.
///
/// The mode is set when the file is created, so the token is never readable
/// by other users, not even briefly.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // A leftover temp file keeps its old mode; tighten it before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    file.sync_all()
}

/// In-process persistence.
///
/// Clones share the same slot, so a test can hand one clone to a
/// "first run" client and another to a "restarted" one.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenPersistence {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a refresh token already persisted
    pub fn with_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(refresh_token.into()))),
        }
    }

    /// Current persisted value
    pub fn stored(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenPersistence for MemoryTokenPersistence {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self.stored())
    }

    fn save(&self, refresh_token: &str) -> ClientResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(refresh_token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_store() -> (FileTokenPersistence, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenPersistence::new(dir.path().join("nested").join("session.json"));
        (store, dir)
    }

    #[test]
    fn test_file_persistence_roundtrip() {
        let (store, _dir) = create_temp_store();

        assert_eq!(store.load().unwrap(), None);

        store.save("r1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("r1"));

        store.save("r2").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("r2"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_persistence_survives_new_handle() {
        let (store, _dir) = create_temp_store();
        store.save("r1").unwrap();

        let reopened = FileTokenPersistence::new(store.path());
        assert_eq!(reopened.load().unwrap().as_deref(), Some("r1"));
    }

    #[test]
    fn test_file_persistence_canonical_key() {
        let (store, _dir) = create_temp_store();
        store.save("r1").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["refresh_token"], "r1");
        assert!(raw.get("access_token").is_none());
    }

    #[test]
    fn test_clear_without_file_is_ok() {
        let (store, _dir) = create_temp_store();
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let (store, _dir) = create_temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _dir) = create_temp_store();
        store.save("r1").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let (store, _dir) = create_temp_store();
        // A directory in the way makes the final rename fail
        fs::create_dir_all(store.path()).unwrap();

        assert!(store.save("r_secret").is_err());
        assert!(!store.temp_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _dir) = create_temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.temp_path(), "stale").unwrap();
        fs::set_permissions(store.temp_path(), fs::Permissions::from_mode(0o644)).unwrap();

        write_private(&store.temp_path(), b"{}").unwrap();

        let mode = fs::metadata(store.temp_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_truncated_or_blank_file_reads_as_signed_out() {
        let (store, _dir) = create_temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();

        fs::write(store.path(), "").unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.save("").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_in_locked_directory_still_revokes() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _dir) = create_temp_store();
        store.save("r1").unwrap();

        // Entries cannot be removed from a read-only directory (unless root)
        let parent = store.path().parent().unwrap().to_path_buf();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

        let cleared = store.clear();
        let loaded = store.load();

        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(cleared.is_ok());
        assert_eq!(loaded.unwrap(), None);
    }

    #[test]
    fn test_memory_persistence_shared_between_clones() {
        let first = MemoryTokenPersistence::new();
        let second = first.clone();

        first.save("r1").unwrap();
        assert_eq!(second.load().unwrap().as_deref(), Some("r1"));

        second.clear().unwrap();
        assert_eq!(first.stored(), None);
    }
}
