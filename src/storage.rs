//! Pluggable storage backends for loans, transactions and settings.
//!
//! This module defines the [`Storage`] (async) and [`BlockingStorage`]
//! (blocking) traits via a shared macro, so both variants expose the same
//! record-level contract: get by id, get all, upsert, idempotent delete,
//! and an atomic [`WriteBatch`] commit.

mod batch;
#[cfg(feature = "storage-file")]
mod file;
mod memory;
mod record;

pub use batch::{WriteBatch, WriteOp};
#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use memory::InMemoryStorage;
pub use record::{Collection, Record};

/// Generates a storage trait (async or blocking) with all record methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_storage {
    // ── Entry point ─────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: $mode:ident,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods $mode);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        define_storage!(@method $mode, get, [R: Record],
            "Returns the record of type `R` with the given id.\n\nReturns `Ok(None)` if no such record exists.\n\n# Errors\n\nReturns an error if the storage backend fails to read or the stored record cannot be decoded.",
            id: &str, -> Result<Option<R>>);
        define_storage!(@method $mode, get_all, [R: Record],
            "Returns every record of type `R`, ordered by key.\n\n# Errors\n\nReturns an error if the storage backend fails to read or a stored record cannot be decoded.",
            -> Result<Vec<R>>);
        define_storage!(@method $mode, put, [R: Record],
            "Inserts or fully replaces a record (matched by its key).\n\n# Errors\n\nReturns [`crate::error::LoanbookError::MissingKey`] if the record has no id, or an error if the storage backend fails to write.",
            record: &R, -> Result<()>);
        define_storage!(@method $mode, delete, [R: Record],
            "Removes the record of type `R` with the given id. Deleting a missing record succeeds.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            id: &str, -> Result<()>);
        define_storage!(@method $mode, commit, [],
            "Applies every operation of `batch` as one unit of work.\n\nSee the backend for how far the unit is atomic.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            batch: WriteBatch, -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, [$($generics:tt)*], $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name<$($generics)*>(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, [$($generics:tt)*], $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name<$($generics)*>(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_storage {
    //! Async storage trait definition.

    use super::{Record, WriteBatch};
    use crate::error::Result;

    define_storage! {
        trait_name: Storage,
        trait_doc: "Async storage backend for loanbook records.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_storage {
    //! Blocking storage trait definition.

    use super::{Record, WriteBatch};
    use crate::error::Result;

    define_storage! {
        trait_name: BlockingStorage,
        trait_doc: "Blocking storage backend for loanbook records.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_storage::Storage;
#[cfg(feature = "blocking")]
pub use blocking_storage::BlockingStorage;
