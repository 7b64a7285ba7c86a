//! Target path mapping and file registration
//!
//! Implements the one-way projection from ConfigMap data entries to files
//! under a job's target directory, in one of two layouts:
//!
//! - nested (default): `target-dir/<namespace>/<name>/<key>`
//! - flattened: `target-dir/<namespace>_<name>_<key>`

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::FileStoreError;

/// Computes the target file path for a single data entry.
///
/// The mapping is a pure function of its inputs; it never consults the
/// filesystem or prior state. Note that the flattened layout joins the
/// components with `_` without escaping, so inputs that themselves contain
/// underscores can collide (`ns` + `a_b` vs `ns_a` + `b`). Kubernetes names
/// cannot contain `_`, but data keys can.
pub fn target_path(
    target_dir: &Path,
    namespace: &str,
    name: &str,
    key: &str,
    flatten: bool,
) -> PathBuf {
    if flatten {
        target_dir.join(format!("{namespace}_{name}_{key}"))
    } else {
        target_dir.join(namespace).join(name).join(key)
    }
}

/// Projects ConfigMap data entries into a target directory.
///
/// One `FileStore` corresponds to one job's (target directory, layout) pair.
/// All operations treat the filesystem as the source of truth; nothing is
/// cached between calls.
#[derive(Debug, Clone)]
pub struct FileStore {
    target_dir: PathBuf,
    flatten: bool,
}

impl FileStore {
    /// Creates a store rooted at `target_dir` using the given layout.
    pub fn new(target_dir: impl Into<PathBuf>, flatten: bool) -> Self {
        Self {
            target_dir: target_dir.into(),
            flatten,
        }
    }

    /// The directory all entry files live under.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Whether entries are colocated in a single flat directory.
    pub fn flatten(&self) -> bool {
        self.flatten
    }

    /// Maps one data entry to its file path under this store.
    pub fn entry_path(&self, namespace: &str, name: &str, key: &str) -> PathBuf {
        target_path(&self.target_dir, namespace, name, key, self.flatten)
    }

    /// Returns true if any of the ConfigMap's entries currently exist on
    /// disk under this store.
    ///
    /// This is the registration query: file presence is the only state.
    pub fn is_registered(
        &self,
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> bool {
        data.keys()
            .any(|key| self.entry_path(namespace, name, key).exists())
    }

    /// Writes every data entry to its mapped path, overwriting existing
    /// files, and returns the written paths.
    ///
    /// Parent directories are created as needed. Entries are written
    /// independently and not atomically; on error the write stops and the
    /// returned [`FileStoreError`] carries the paths written so far, leaving
    /// a mix of old and new files behind.
    pub fn register(
        &self,
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<Vec<PathBuf>, FileStoreError> {
        let mut written = Vec::with_capacity(data.len());

        for (key, contents) in data {
            let path = self.entry_path(namespace, name, key);

            if let Some(parent) = path.parent() {
                if let Err(source) = fs::create_dir_all(parent) {
                    return Err(FileStoreError::Write {
                        path,
                        completed: written,
                        source,
                    });
                }
            }

            if let Err(source) = fs::write(&path, contents) {
                return Err(FileStoreError::Write {
                    path,
                    completed: written,
                    source,
                });
            }

            written.push(path);
        }

        Ok(written)
    }

    /// Deletes every data entry's mapped file and returns the removed paths.
    ///
    /// A file that is already gone is treated as satisfied and skipped; the
    /// absence of the file is exactly the goal state. Any other deletion
    /// error stops the removal, and the returned [`FileStoreError`] carries
    /// the paths removed so far.
    pub fn remove(
        &self,
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<Vec<PathBuf>, FileStoreError> {
        let mut removed = Vec::with_capacity(data.len());

        for key in data.keys() {
            let path = self.entry_path(namespace, name, key);

            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(FileStoreError::Remove {
                        path,
                        completed: removed,
                        source,
                    });
                }
            }
        }

        Ok(removed)
    }
}
