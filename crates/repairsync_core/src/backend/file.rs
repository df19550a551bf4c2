//! File-based backend.
//!
//! Directory layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK                 # Advisory lock for single-writer
//! ├─ meta.cbor            # Key-value metadata (sync cursor)
//! ├─ customers.cbor       # One snapshot per table
//! ├─ repair_orders.cbor
//! └─ ...
//! ```
//!
//! Every snapshot is written to a temporary file, synced, and renamed over
//! the previous one, so a crash mid-write leaves the old snapshot readable.

use super::{MetaTable, StoreBackend};
use crate::error::{StoreError, StoreResult};
use crate::kind::EntityKind;
use crate::record::Record;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const META_FILE: &str = "meta.cbor";
const SNAPSHOT_EXT: &str = "cbor";
const TEMP_EXT: &str = "tmp";

/// A backend persisting CBOR table snapshots in a locked directory.
///
/// Only one `FileBackend` can hold a directory at a time; a second open
/// fails with [`StoreError::Locked`].
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    _lock_file: File,
}

impl FileBackend {
    /// Opens (creating if needed) a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the path exists but is not a directory
    /// - another process holds the lock (`Locked`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(StoreError::invalid_record(format!(
                "store path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table_path(&self, kind: EntityKind) -> PathBuf {
        self.path
            .join(kind.table_name())
            .with_extension(SNAPSHOT_EXT)
    }

    fn read_snapshot<T: DeserializeOwned + Default>(
        &self,
        file_path: &Path,
        label: &str,
    ) -> StoreResult<T> {
        if !file_path.exists() {
            return Ok(T::default());
        }

        let file = File::open(file_path)?;
        if file.metadata()?.len() == 0 {
            return Ok(T::default());
        }

        ciborium::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::corrupted(label, e.to_string()))
    }

    fn write_snapshot<T: Serialize + ?Sized>(
        &self,
        file_path: &Path,
        value: &T,
    ) -> StoreResult<()> {
        let temp_path = file_path.with_extension(TEMP_EXT);

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::into_writer(value, &mut writer).map_err(|e| StoreError::codec(e.to_string()))?;
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, file_path)?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced
        Ok(())
    }
}

impl StoreBackend for FileBackend {
    fn load_table(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        self.read_snapshot(&self.table_path(kind), kind.table_name())
    }

    fn write_table(&self, kind: EntityKind, records: &[&Record]) -> StoreResult<()> {
        self.write_snapshot(&self.table_path(kind), records)
    }

    fn load_meta(&self) -> StoreResult<MetaTable> {
        self.read_snapshot(&self.path.join(META_FILE), "meta")
    }

    fn write_meta(&self, meta: &MetaTable) -> StoreResult<()> {
        self.write_snapshot(&self.path.join(META_FILE), meta)
    }
}
