//! Snapshot persistence collaborators.
//!
//! # Responsibility
//! - Define the load/save contract the navigation layer depends on.
//! - Provide the file-backed implementation and an in-memory one for tests.
//!
//! # Invariants
//! - `load` fails soft: any error or absence is `None`, never a panic.
//! - `save` failures are logged and swallowed; editing continues in memory.

use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence contract for the serialized workspace snapshot.
///
/// The blob is opaque here; encoding lives with the state module.
pub trait SnapshotStore {
    /// Loads the last saved snapshot, or `None` when absent or unreadable.
    fn load(&self) -> Option<String>;
    /// Stores a full snapshot. Returns `false` on failure; callers never
    /// surface the error to the user.
    fn save(&mut self, blob: &str) -> bool;
}

/// JSON-file snapshot store, one full snapshot per save.
///
/// Writes go through a sibling temp file and a rename so a crash mid-save
/// leaves the previous snapshot intact.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> FileSnapshotStore {
        FileSnapshotStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => {
                info!(
                    "event=state_load module=storage status=ok bytes={}",
                    blob.len()
                );
                Some(blob)
            }
            Err(err) => {
                debug!(
                    "event=state_load module=storage status=miss path={} error={err}",
                    self.path.display()
                );
                None
            }
        }
    }

    fn save(&mut self, blob: &str) -> bool {
        let temp = self.temp_path();
        if let Err(err) = fs::write(&temp, blob) {
            error!(
                "event=state_save module=storage status=error stage=write error={err}"
            );
            return false;
        }
        if let Err(err) = fs::rename(&temp, &self.path) {
            error!(
                "event=state_save module=storage status=error stage=rename error={err}"
            );
            let _ = fs::remove_file(&temp);
            return false;
        }
        debug!(
            "event=state_save module=storage status=ok bytes={}",
            blob.len()
        );
        true
    }
}

/// In-memory snapshot store for tests and headless embedding.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blob: Option<String>,
    pub save_count: usize,
    pub fail_saves: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> MemorySnapshotStore {
        MemorySnapshotStore::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> MemorySnapshotStore {
        MemorySnapshotStore {
            blob: Some(blob.into()),
            save_count: 0,
            fail_saves: false,
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Option<String> {
        self.blob.clone()
    }

    fn save(&mut self, blob: &str) -> bool {
        if self.fail_saves {
            return false;
        }
        self.blob = Some(blob.to_string());
        self.save_count += 1;
        true
    }
}
