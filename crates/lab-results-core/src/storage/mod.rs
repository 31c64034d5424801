//! Local file store for uploaded documents, with an optional backup directory.
//!
//! Every stored file gets a fresh, collision-free name (see [`naming`]). When a
//! backup directory is configured each write is copied there as well; a failed
//! copy is logged and does not fail the write.

pub mod naming;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use naming::{fold_accents, is_safe_stored_name, sanitize_file_name, stored_file_name};

/// How many fresh names to try before giving up on a write.
const MAX_NAME_ATTEMPTS: usize = 5;

/// File store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Stored file is empty: {0}")]
    EmptyFile(String),

    #[error("Invalid stored file name: {0}")]
    InvalidName(String),

    #[error("File not found in store: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A file written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Name inside the store directory
    pub name: String,
    /// Size in bytes as read back after the write
    pub size: u64,
    /// SHA-256 of the contents (hex)
    pub checksum: String,
    /// Whether the backup copy was written
    pub backed_up: bool,
}

/// What `remove` found and deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Removal {
    pub primary: bool,
    pub backup: bool,
}

impl Removal {
    pub fn any(self) -> bool {
        self.primary || self.backup
    }
}

/// Directory-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    backup: Option<PathBuf>,
}

impl FileStore {
    /// Open a store rooted at `root`, creating directories as needed.
    pub fn open<P: AsRef<Path>>(root: P, backup: Option<P>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(io_err(&root))?;

        let backup = match backup {
            Some(dir) => {
                let dir = dir.as_ref().to_path_buf();
                fs::create_dir_all(&dir).map_err(io_err(&dir))?;
                Some(dir)
            }
            None => None,
        };

        Ok(Self { root, backup })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backup_root(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// Resolve a stored name to its primary path.
    pub fn path_of(&self, name: &str) -> StorageResult<PathBuf> {
        if !is_safe_stored_name(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn backup_path_of(&self, name: &str) -> Option<PathBuf> {
        self.backup.as_ref().map(|dir| dir.join(name))
    }

    /// Write `bytes` under a fresh name derived from `prefix` and `original_name`.
    ///
    /// The file is created with create-new semantics, so an existing stored file
    /// is never overwritten. A zero-byte result is removed again and reported as
    /// [`StorageError::EmptyFile`].
    pub fn store(&self, prefix: &str, original_name: &str, bytes: &[u8]) -> StorageResult<StoredFile> {
        let (name, path) = self.create_unique(prefix, original_name, bytes)?;

        let size = fs::metadata(&path).map_err(io_err(&path))?.len();
        if size == 0 {
            let _ = fs::remove_file(&path);
            return Err(StorageError::EmptyFile(original_name.to_string()));
        }

        let checksum = hex::encode(Sha256::digest(bytes));
        let backed_up = self.copy_to_backup(&name, &path);

        tracing::info!(file = %name, size, backed_up, "stored file");
        Ok(StoredFile {
            name,
            size,
            checksum,
            backed_up,
        })
    }

    fn create_unique(
        &self,
        prefix: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> StorageResult<(String, PathBuf)> {
        let mut last_err = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = stored_file_name(prefix, original_name, Utc::now());
            let path = self.root.join(&name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    last_err = Some(StorageError::Io { path, source: e });
                    continue;
                }
                Err(e) => return Err(StorageError::Io { path, source: e }),
            };

            if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(StorageError::Io { path, source: e });
            }
            return Ok((name, path));
        }

        Err(last_err.unwrap_or_else(|| StorageError::InvalidName(original_name.to_string())))
    }

    /// Best-effort copy of a stored file into the backup directory.
    fn copy_to_backup(&self, name: &str, path: &Path) -> bool {
        let Some(backup_path) = self.backup_path_of(name) else {
            return false;
        };
        match fs::copy(path, &backup_path) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "backup copy failed");
                false
            }
        }
    }

    /// Whether the primary copy exists.
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Whether the backup copy exists.
    pub fn backup_exists(&self, name: &str) -> bool {
        is_safe_stored_name(name)
            && self
                .backup_path_of(name)
                .map(|p| p.is_file())
                .unwrap_or(false)
    }

    /// Read a stored file.
    ///
    /// If the primary copy is gone but the backup is present, the primary is
    /// restored from the backup first.
    pub fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            self.restore_from_backup(name)?;
        }
        fs::read(&path).map_err(io_err(&path))
    }

    fn restore_from_backup(&self, name: &str) -> StorageResult<()> {
        let path = self.path_of(name)?;
        let backup_path = match self.backup_path_of(name) {
            Some(p) if p.is_file() => p,
            _ => return Err(StorageError::NotFound(name.to_string())),
        };
        fs::copy(&backup_path, &path).map_err(io_err(&path))?;
        tracing::warn!(file = %name, "primary copy missing, restored from backup");
        Ok(())
    }

    /// Delete a stored file and its backup. Missing copies are not an error.
    pub fn remove(&self, name: &str) -> StorageResult<Removal> {
        let path = self.path_of(name)?;
        let primary = remove_if_present(&path)?;

        let backup = match self.backup_path_of(name) {
            Some(backup_path) => remove_if_present(&backup_path)?,
            None => false,
        };

        Ok(Removal { primary, backup })
    }

    /// Stored names in the primary directory.
    ///
    /// Entries that could never be a stored name (dotfiles, non-UTF-8 names)
    /// are skipped.
    pub fn list(&self) -> StorageResult<Vec<String>> {
        list_stored_names(&self.root)
    }

    /// Stored names in the backup directory, empty without one.
    pub fn list_backup(&self) -> StorageResult<Vec<String>> {
        match &self.backup {
            Some(dir) => list_stored_names(dir),
            None => Ok(Vec::new()),
        }
    }
}

fn list_stored_names(dir: &Path) -> StorageResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        if !entry.file_type().map_err(io_err(dir))?.is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if is_safe_stored_name(name) => names.push(name.to_string()),
            _ => tracing::debug!(entry = ?entry.file_name(), "skipping foreign file in store"),
        }
    }
    names.sort();
    Ok(names)
}

fn remove_if_present(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("main"), Some(dir.path().join("backup"))).unwrap();
        (dir, store)
    }

    #[test]
    fn test_store_writes_primary_and_backup() {
        let (_dir, store) = setup_store();

        let stored = store.store("ORD-1", "informe.pdf", b"%PDF-1.4 data").unwrap();

        assert!(stored.name.starts_with("ORD-1_informe_"));
        assert_eq!(stored.size, 13);
        assert!(stored.backed_up);
        assert_eq!(stored.checksum, hex::encode(Sha256::digest(b"%PDF-1.4 data")));
        assert!(store.exists(&stored.name));
        assert!(store.backup_exists(&stored.name));
        assert_eq!(store.read(&stored.name).unwrap(), b"%PDF-1.4 data");
    }

    #[test]
    fn test_empty_file_is_removed() {
        let (_dir, store) = setup_store();

        let err = store.store("ORD-1", "vacio.pdf", b"").unwrap_err();
        assert!(matches!(err, StorageError::EmptyFile(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_store_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("imgs"), None).unwrap();

        let stored = store.store("", "foto.png", b"png").unwrap();
        assert!(!stored.backed_up);
        assert!(!store.backup_exists(&stored.name));
    }

    #[test]
    fn test_remove_reports_what_existed() {
        let (_dir, store) = setup_store();
        let stored = store.store("ORD-1", "informe.pdf", b"data").unwrap();

        let removal = store.remove(&stored.name).unwrap();
        assert_eq!(removal, Removal { primary: true, backup: true });
        assert!(!store.exists(&stored.name));

        let again = store.remove(&stored.name).unwrap();
        assert!(!again.any());
    }

    #[test]
    fn test_read_restores_from_backup() {
        let (_dir, store) = setup_store();
        let stored = store.store("ORD-1", "informe.pdf", b"data").unwrap();

        fs::remove_file(store.path_of(&stored.name).unwrap()).unwrap();
        assert!(!store.exists(&stored.name));

        assert_eq!(store.read(&stored.name).unwrap(), b"data");
        assert!(store.exists(&stored.name));
    }

    #[test]
    fn test_read_missing_everywhere() {
        let (_dir, store) = setup_store();
        let err = store.read("ORD-1_x_20240101_000000_deadbeef.pdf").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let (_dir, store) = setup_store();
        assert!(matches!(
            store.read("../secret.pdf"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            store.remove("a/b.pdf"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(!store.exists("../secret.pdf"));
    }

    #[test]
    fn test_list_sorted() {
        let (_dir, store) = setup_store();
        let a = store.store("A", "x.pdf", b"1").unwrap();
        let b = store.store("B", "x.pdf", b"2").unwrap();

        assert_eq!(store.list().unwrap(), vec![a.name, b.name]);
    }

    #[test]
    fn test_list_skips_foreign_entries() {
        let (_dir, store) = setup_store();
        let stored = store.store("A", "x.pdf", b"1").unwrap();
        fs::write(store.root().join(".DS_Store"), b"junk").unwrap();
        fs::write(store.backup_root().unwrap().join(".DS_Store"), b"junk").unwrap();

        assert_eq!(store.list().unwrap(), vec![stored.name.clone()]);
        assert_eq!(store.list_backup().unwrap(), vec![stored.name]);
    }
}
