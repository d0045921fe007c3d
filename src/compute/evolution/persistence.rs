//! Snapshot storage for resuming populations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::schema::{PoolSnapshot, SNAPSHOT_VERSION};

/// File name used by manual save/load.
pub const CURRENT_POOL_FILE: &str = "pool.json";

/// Snapshot persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Snapshot version {found} is newer than supported version {SNAPSHOT_VERSION}")]
    UnsupportedVersion { found: u32 },
    #[error("Snapshot input size {found} does not match configured input size {expected}")]
    InputSizeMismatch { expected: usize, found: usize },
}

/// Directory of population snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (creating if needed) a snapshot directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, PersistError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| PersistError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Path of the per-generation backup for `generation`.
    pub fn generation_path(&self, generation: u32) -> PathBuf {
        self.dir.join(format!("backup{generation}.json"))
    }

    /// Path of the manual save file.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_POOL_FILE)
    }

    /// Write the per-generation backup.
    pub fn write_generation(&self, snapshot: &PoolSnapshot) -> Result<PathBuf, PersistError> {
        let path = self.generation_path(snapshot.generation);
        write_snapshot(&path, snapshot)?;
        Ok(path)
    }

    /// Write the manual save file.
    pub fn save_current(&self, snapshot: &PoolSnapshot) -> Result<PathBuf, PersistError> {
        let path = self.current_path();
        write_snapshot(&path, snapshot)?;
        Ok(path)
    }

    /// Read the manual save file.
    pub fn load_current(&self) -> Result<PoolSnapshot, PersistError> {
        read_snapshot(self.current_path())
    }
}

/// Serialize a snapshot to `path` as pretty JSON.
pub fn write_snapshot<P: AsRef<Path>>(path: P, snapshot: &PoolSnapshot) -> Result<(), PersistError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(snapshot).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and version-check a snapshot from `path`.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<PoolSnapshot, PersistError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: PoolSnapshot =
        serde_json::from_str(&content).map_err(|source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let found = snapshot.max_version();
    if found > SNAPSHOT_VERSION {
        return Err(PersistError::UnsupportedVersion { found });
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn empty_snapshot(generation: u32) -> PoolSnapshot {
        PoolSnapshot {
            version: SNAPSHOT_VERSION,
            generation,
            innovation: 5,
            max_fitness: 0,
            input_size: 4,
            species: Vec::new(),
        }
    }

    #[test]
    fn test_generation_files_are_numbered() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let path = store.write_generation(&empty_snapshot(3)).unwrap();
        assert!(path.ends_with("backup3.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_current_round_trip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested")).unwrap();

        store.save_current(&empty_snapshot(7)).unwrap();
        let loaded = store.load_current().unwrap();
        assert_eq!(loaded, empty_snapshot(7));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        assert!(matches!(store.load_current(), Err(PersistError::Io { .. })));
    }

    #[test]
    fn test_garbage_is_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_snapshot(&path), Err(PersistError::Json { .. })));
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");
        let mut snapshot = empty_snapshot(1);
        snapshot.version = SNAPSHOT_VERSION + 1;
        write_snapshot(&path, &snapshot).unwrap();
        assert!(matches!(
            read_snapshot(&path),
            Err(PersistError::UnsupportedVersion { .. })
        ));
    }
}
