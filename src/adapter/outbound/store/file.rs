//! JSON file store for the cluster identity.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::ClusterIdentity;
use crate::error::{Result, StorageError};
use crate::port::store::ClusterStore;

/// File name of the identity document inside the state directory.
pub const IDENTITY_FILE: &str = "cluster.json";

/// Default state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".minicluster";

/// Stores the identity as `<state_dir>/cluster.json`.
#[derive(Debug, Clone)]
pub struct ClusterStateStore {
    path: PathBuf,
}

impl ClusterStateStore {
    /// Store rooted at `state_dir`. Nothing is created until the first save.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(IDENTITY_FILE),
        }
    }

    /// Store under `./.minicluster`.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(DEFAULT_STATE_DIR)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, json: &str) -> std::result::Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            write_err(e)
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;
        Ok(())
    }
}

impl ClusterStore for ClusterStateStore {
    fn save(&self, identity: &ClusterIdentity) -> Result<()> {
        let json = serde_json::to_string_pretty(identity).map_err(StorageError::Encode)?;
        self.write_atomic(&json)?;
        debug!(
            cluster_id = %identity.cluster_id,
            members = identity.members.len(),
            path = %self.path.display(),
            "Saved cluster identity"
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<ClusterIdentity>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };

        let identity = serde_json::from_str(&contents).map_err(|source| StorageError::Decode {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(identity))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared cluster identity");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove {
                path: self.path.clone(),
                source,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::error::Error;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClusterStateStore::new(dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_creates_parent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClusterStateStore::new(dir.path().join("nested").join("state"));
        let mut identity = ClusterIdentity::with_id("cafe0001");
        identity.push(Role::Coordination, "zk-id", "minicluster-coordination-cafe0001");

        store.save(&identity).unwrap();

        assert_eq!(store.load().unwrap(), Some(identity));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn second_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClusterStateStore::new(dir.path());
        let mut identity = ClusterIdentity::with_id("cafe0001");
        store.save(&identity).unwrap();
        identity.push(Role::Master, "m", "minicluster-master-cafe0001");
        store.save(&identity).unwrap();

        assert_eq!(store.load().unwrap().unwrap().members.len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClusterStateStore::new(dir.path());
        store.save(&ClusterIdentity::with_id("cafe0001")).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClusterStateStore::new(dir.path());
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();

        assert!(matches!(err, Error::Storage(StorageError::Decode { .. })));
    }
}
