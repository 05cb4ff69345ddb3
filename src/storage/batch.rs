//! Unit-of-work batches applied atomically by a backend's `commit`.

use std::collections::BTreeSet;

use super::record::{self, Collection, Record};
use crate::error::Result;

/// A single staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or replace a record.
    Put {
        /// Target collection.
        collection: Collection,
        /// Record key.
        key: String,
        /// Serialized record.
        value: serde_json::Value,
    },
    /// Remove a record if present.
    Delete {
        /// Target collection.
        collection: Collection,
        /// Record key.
        key: String,
    },
}

impl WriteOp {
    /// Returns the collection this operation touches.
    #[inline]
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match *self {
            Self::Put { collection, .. } | Self::Delete { collection, .. } => collection,
        }
    }
}

/// An ordered set of writes across collections.
///
/// Records are serialized when staged, so a batch that was built
/// successfully cannot fail halfway through encoding. Operations apply in
/// insertion order; a later write to the same key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    /// Staged operations.
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an upsert of `record`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LoanbookError::MissingKey`] if the record has
    /// no id, or a serialization error.
    #[inline]
    pub fn put<R: Record>(&mut self, record: &R) -> Result<()> {
        let (key, value) = record::encode(record)?;
        self.ops.push(WriteOp::Put {
            collection: R::COLLECTION,
            key,
            value,
        });
        Ok(())
    }

    /// Stages removal of the record with `id` from `R`'s collection.
    #[inline]
    pub fn delete<R: Record>(&mut self, id: &str) {
        self.ops.push(WriteOp::Delete {
            collection: R::COLLECTION,
            key: id.to_owned(),
        });
    }

    /// Returns the number of staged operations.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing is staged.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the staged operations in order.
    #[inline]
    #[must_use]
    pub const fn ops(&self) -> &[WriteOp] {
        self.ops.as_slice()
    }

    /// Returns every collection touched by the batch.
    #[inline]
    #[must_use]
    pub fn collections(&self) -> BTreeSet<Collection> {
        self.ops.iter().map(WriteOp::collection).collect()
    }

    /// Consumes the batch and returns its operations.
    #[inline]
    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
