//! In-memory storage backend for testing.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! the storage traits. Ideal for unit and integration tests where file I/O
//! is undesirable.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use super::batch::{WriteBatch, WriteOp};
use super::record::{self, Collection, Record};
use crate::error::{LoanbookError, Result};

/// Thread-safe in-memory storage for testing.
///
/// This type implements both [`super::Storage`] (async) and
/// [`super::BlockingStorage`] (blocking) traits, providing a zero-setup
/// storage backend for tests.
///
/// Records are kept as JSON values, so they round-trip through serde
/// exactly as they would through [`super::FileStorage`].
///
/// # Example
///
/// ```rust
/// use loanbook::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new();
/// // Use with the LoanManager or LoanManagerBlocking builders:
/// // LoanManagerBlocking::builder().storage(storage).build()
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Serialized records per collection, keyed by record id.
    collections: HashMap<Collection, BTreeMap<String, serde_json::Value>>,
}

impl Inner {
    /// Applies one staged operation.
    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::Put {
                collection,
                key,
                value,
            } => {
                let _old = self.collections.entry(collection).or_default().insert(key, value);
            }
            WriteOp::Delete { collection, key } => {
                if let Some(records) = self.collections.get_mut(&collection) {
                    let _old = records.remove(&key);
                }
            }
        }
    }
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records stored in `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn count(&self, collection: Collection) -> Result<usize> {
        self.with_lock(|inner| inner.collections.get(&collection).map_or(0, BTreeMap::len))
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }

    /// Reads and decodes a single record.
    fn load<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let value = self.with_lock(|inner| {
            inner
                .collections
                .get(&R::COLLECTION)
                .and_then(|records| records.get(id))
                .cloned()
        })?;
        value.map(record::decode).transpose()
    }

    /// Reads and decodes every record of a collection.
    fn load_all<R: Record>(&self) -> Result<Vec<R>> {
        let values: Vec<serde_json::Value> = self.with_lock(|inner| {
            inner
                .collections
                .get(&R::COLLECTION)
                .map(|records| records.values().cloned().collect())
                .unwrap_or_default()
        })?;
        values.into_iter().map(record::decode).collect()
    }

    /// Encodes and stores a single record.
    fn store<R: Record>(&self, item: &R) -> Result<()> {
        let (key, value) = record::encode(item)?;
        self.with_lock(|inner| {
            inner.apply(WriteOp::Put {
                collection: R::COLLECTION,
                key,
                value,
            });
        })
    }

    /// Removes a single record.
    fn remove<R: Record>(&self, id: &str) -> Result<()> {
        self.with_lock(|inner| {
            inner.apply(WriteOp::Delete {
                collection: R::COLLECTION,
                key: id.to_owned(),
            });
        })
    }

    /// Applies a whole batch under one lock acquisition.
    fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
        self.with_lock(|inner| {
            for op in batch.into_ops() {
                inner.apply(op);
            }
        })
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> LoanbookError {
    LoanbookError::Storage(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for InMemoryStorage {
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
impl super::Storage for InMemoryStorage {
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
