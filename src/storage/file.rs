//! JSON-file-based storage backend.
//!
//! Stores each collection as a JSON array in a separate file under a
//! configurable directory (default: `$XDG_DATA_HOME/loanbook/`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "async")]
use core::future::{self, Future};

use super::batch::{WriteBatch, WriteOp};
use super::record::{self, Collection, Record};
use crate::error::{LoanbookError, Result};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "loanbook";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// Records of one collection, keyed by id.
type Records = BTreeMap<String, serde_json::Value>;

/// File-backed storage that persists records as JSON files.
///
/// Each collection is stored in a separate `.json` file holding an array
/// of records. Entries without a string `id` are skipped with a warning
/// when the file is read.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]).
///
/// Read operations acquire a shared lock (allowing concurrent readers),
/// while write operations acquire an exclusive lock.
///
/// # Atomicity
///
/// Every write is staged to a `.tmp` file and renamed into place. A
/// [`WriteBatch`] stages all touched collections before renaming any of
/// them, so a commit that fails while staging leaves every file unchanged.
/// Each rename is atomic but the set of renames is not: if one fails, the
/// collections already renamed keep their new contents and the remaining
/// staging files are removed.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock          (cross-process lock sentinel)
///   loans.json
///   transactions.json
///   settings.json
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory containing all JSON files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist. Also
    /// opens (or creates) the `storage.lock` sentinel file used for
    /// cross-process advisory locking.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        tracing::debug!(dir = %dir.display(), "opened file storage");
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/loanbook/` (typically
    /// `~/.local/share/loanbook/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                LoanbookError::Storage("could not determine platform data directory".into())
            })
    }

    /// Returns the directory holding the collection files.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the full path for a given file name.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Returns the staging path for a collection file.
    fn tmp_path(&self, collection: Collection) -> PathBuf {
        self.path(&format!("{}.tmp", collection.file_name()))
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<T, F: FnOnce() -> Result<T>>(&self, op: F) -> Result<T> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Only surface the unlock error when the operation succeeded;
        // otherwise the original error is more useful.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<T, F: FnOnce() -> Result<T>>(&self, op: F) -> Result<T> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads a collection file. Returns an empty map if the file does not
    /// exist.
    fn read_records(&self, collection: Collection) -> Result<Records> {
        let path = self.path(collection.file_name());
        let entries: Vec<serde_json::Value> = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(storage_io_error(err)),
        };
        let mut records = Records::new();
        for entry in entries {
            match entry.get("id").and_then(serde_json::Value::as_str) {
                Some(key) => {
                    let _old = records.insert(key.to_owned(), entry);
                }
                None => tracing::warn!(%collection, "skipping stored record without an id"),
            }
        }
        Ok(records)
    }

    /// Serializes a collection into its staging file.
    fn stage_records(&self, collection: Collection, records: &Records) -> Result<PathBuf> {
        let tmp_path = self.tmp_path(collection);
        let entries: Vec<&serde_json::Value> = records.values().collect();
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&tmp_path, json).map_err(storage_io_error)?;
        Ok(tmp_path)
    }

    /// Reads and decodes a single record (with lock).
    fn load<R: Record>(&self, id: &str) -> Result<Option<R>> {
        self.with_shared_lock(|| {
            let mut records = self.read_records(R::COLLECTION)?;
            records.remove(id).map(record::decode).transpose()
        })
    }

    /// Reads and decodes every record of a collection (with lock).
    fn load_all<R: Record>(&self) -> Result<Vec<R>> {
        self.with_shared_lock(|| {
            self.read_records(R::COLLECTION)?
                .into_values()
                .map(record::decode)
                .collect()
        })
    }

    /// Encodes and stores a single record.
    fn store<R: Record>(&self, item: &R) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(item)?;
        self.apply_batch(batch)
    }

    /// Removes a single record.
    fn remove<R: Record>(&self, id: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete::<R>(id);
        self.apply_batch(batch)
    }

    /// Applies a batch: reads every touched collection, applies the
    /// operations in memory, stages all files, then renames them into
    /// place.
    fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.with_exclusive_lock(|| {
            let mut touched: BTreeMap<Collection, Records> = BTreeMap::new();
            for collection in batch.collections() {
                let _old = touched.insert(collection, self.read_records(collection)?);
            }
            let op_count = batch.len();
            for op in batch.into_ops() {
                match op {
                    WriteOp::Put {
                        collection,
                        key,
                        value,
                    } => {
                        let _old = touched.entry(collection).or_default().insert(key, value);
                    }
                    WriteOp::Delete { collection, key } => {
                        let _old = touched.entry(collection).or_default().remove(&key);
                    }
                }
            }

            let mut staged = Vec::with_capacity(touched.len());
            for (&collection, records) in &touched {
                match self.stage_records(collection, records) {
                    Ok(tmp_path) => staged.push((tmp_path, self.path(collection.file_name()))),
                    Err(err) => {
                        for (tmp_path, _) in &staged {
                            discard_tmp(tmp_path);
                        }
                        return Err(err);
                    }
                }
            }
            promote_staged(&staged)?;
            tracing::debug!(ops = op_count, files = staged.len(), "committed write batch");
            Ok(())
        })
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Wraps an I/O error into a [`LoanbookError::Storage`].
fn storage_io_error(err: std::io::Error) -> LoanbookError {
    LoanbookError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`LoanbookError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> LoanbookError {
    LoanbookError::Storage(err.to_string().into())
}

/// Best-effort removal of a staging file after a failed commit.
fn discard_tmp(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove staging file");
    }
}

/// Renames staged files into place in order. On the first failure the
/// failed file and every file not yet renamed are discarded.
fn promote_staged(staged: &[(PathBuf, PathBuf)]) -> Result<()> {
    for (done, (tmp_path, path)) in staged.iter().enumerate() {
        if let Err(err) = fs::rename(tmp_path, path) {
            for (pending, _) in staged.iter().skip(done) {
                discard_tmp(pending);
            }
            return Err(storage_io_error(err));
        }
    }
    Ok(())
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for FileStorage {
    #[inline]
    fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        self.load(id)
    }

    #[inline]
    fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        self.load_all()
    }

    #[inline]
    fn put<R: Record>(&self, record: &R) -> Result<()> {
        self.store(record)
    }

    #[inline]
    fn delete<R: Record>(&self, id: &str) -> Result<()> {
        self.remove::<R>(id)
    }

    #[inline]
    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.apply_batch(batch)
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for FileStorage {
    #[inline]
    fn get<R: Record>(&self, id: &str) -> impl Future<Output = Result<Option<R>>> + Send {
        future::ready(self.load(id))
    }

    #[inline]
    fn get_all<R: Record>(&self) -> impl Future<Output = Result<Vec<R>>> + Send {
        future::ready(self.load_all())
    }

    #[inline]
    fn put<R: Record>(&self, record: &R) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.store(record))
    }

    #[inline]
    fn delete<R: Record>(&self, id: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.remove::<R>(id))
    }

    #[inline]
    fn commit(&self, batch: WriteBatch) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.apply_batch(batch))
    }
}
