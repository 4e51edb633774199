//! Store directory management.
//!
//! On-disk layout:
//!
//! ```text
//! <store_path>/
//! ├─ MANIFEST          # Metadata (relations, format version)
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ wal.log           # Write-ahead log
//! ├─ records.dat       # Record log
//! └─ INDEX/            # Persisted relationship index snapshots
//!    └─ <relation>.idx
//! ```
//!
//! The LOCK file ensures only one process opens the store at a time.

use crate::error::{CoreError, CoreResult};
use crate::manifest::Manifest;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "MANIFEST";
const MANIFEST_TEMP: &str = "MANIFEST.tmp";
const LOCK_FILE: &str = "LOCK";
const WAL_FILE: &str = "wal.log";
const RECORDS_FILE: &str = "records.dat";
const INDEX_DIR: &str = "INDEX";

/// Manages the store directory structure and file locking.
///
/// Holds an exclusive advisory lock on the directory for its lifetime;
/// only one `StoreDir` can exist per directory at a time.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing and
    /// `create_if_missing` is false, or [`CoreError::Locked`] if
    /// another process holds the lock.
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the WAL file path.
    #[must_use]
    pub fn wal_path(&self) -> PathBuf {
        self.path.join(WAL_FILE)
    }

    /// Returns the record log file path.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.path.join(RECORDS_FILE)
    }

    /// Returns the MANIFEST file path.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Returns the index snapshot directory path.
    #[must_use]
    pub fn index_dir(&self) -> PathBuf {
        self.path.join(INDEX_DIR)
    }

    /// Returns the snapshot file path for one relation.
    #[must_use]
    pub fn index_path(&self, relation: &str) -> PathBuf {
        self.index_dir().join(format!("{relation}.idx"))
    }

    /// Returns whether this directory holds no store yet.
    #[must_use]
    pub fn is_new_store(&self) -> bool {
        !self.manifest_path().exists() && !self.records_path().exists()
    }

    /// Loads the manifest, or `None` for a new store.
    pub fn load_manifest(&self) -> CoreResult<Option<Manifest>> {
        let manifest_path = self.manifest_path();
        if !manifest_path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&manifest_path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        if data.is_empty() {
            return Ok(None);
        }

        Ok(Some(Manifest::decode(&data)?))
    }

    /// Saves the manifest atomically.
    ///
    /// Write-then-rename: write to a temp file, sync it, rename over
    /// MANIFEST, then fsync the directory so the rename is durable.
    pub fn save_manifest(&self, manifest: &Manifest) -> CoreResult<()> {
        let temp_path = self.path.join(MANIFEST_TEMP);

        let data = manifest.encode();
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.manifest_path())?;
        self.sync_directory(&self.path)?;

        Ok(())
    }

    /// Reads a relation's persisted index snapshot, or `None` if the
    /// file is absent.
    pub fn load_index_file(&self, relation: &str) -> CoreResult<Option<Vec<u8>>> {
        let path = self.index_path(relation);
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Writes a relation's index snapshot atomically.
    pub fn save_index_file(&self, relation: &str, data: &[u8]) -> CoreResult<()> {
        let index_dir = self.index_dir();
        if !index_dir.exists() {
            fs::create_dir_all(&index_dir)?;
            self.sync_directory(&self.path)?;
        }

        let temp_path = index_dir.join(format!("{relation}.idx.tmp"));
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.index_path(relation))?;
        self.sync_directory(&index_dir)?;

        Ok(())
    }

    #[cfg(unix)]
    fn sync_directory(&self, dir: &Path) -> CoreResult<()> {
        // On Unix an fsync on the directory makes the entry durable.
        let dir = File::open(dir)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self, _dir: &Path) -> CoreResult<()> {
        // NTFS journaling covers metadata durability on Windows.
        Ok(())
    }
}
