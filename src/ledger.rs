//! Transaction ledger over a [`Storage`] / [`BlockingStorage`] backend.
//!
//! The ledger assigns transaction ids, lists transactions newest first and
//! filters them with a composable [`TransactionFilter`].
//!
//! [`Storage`]: crate::storage::Storage
//! [`BlockingStorage`]: crate::storage::BlockingStorage

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::LoanbookError;
use crate::models::{LoanId, Transaction, TransactionId, TransactionType};

/// Composable filter for querying transactions from the ledger.
///
/// Use builder-style methods to chain multiple criteria. All conditions
/// are combined: a transaction must satisfy every set criterion to pass.
///
/// # Examples
///
/// ```
/// use loanbook::ledger::TransactionFilter;
/// use loanbook::models::{LoanId, TransactionType};
/// use chrono::NaiveDate;
///
/// let filter = TransactionFilter::new()
///     .date_range(
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
///     )
///     .kind(TransactionType::Expense)
///     .loan(LoanId::from("loan-1"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Start date (inclusive).
    pub date_from: Option<NaiveDate>,
    /// End date (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Income or expense.
    pub kind: Option<TransactionType>,
    /// Category (case-insensitive exact match).
    pub category: Option<String>,
    /// Household member (exact match).
    pub member: Option<String>,
    /// Linked loan.
    pub loan: Option<LoanId>,
    /// Description substring (case-insensitive).
    pub description: Option<String>,
    /// Minimum amount (inclusive).
    pub min_amount: Option<Decimal>,
    /// Maximum amount (inclusive).
    pub max_amount: Option<Decimal>,
}

impl TransactionFilter {
    /// Creates an empty filter that matches all transactions.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to transactions within the given date range (inclusive).
    #[inline]
    #[must_use]
    pub const fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Restricts to transactions on or after `from`.
    #[inline]
    #[must_use]
    pub const fn since(mut self, from: NaiveDate) -> Self {
        self.date_from = Some(from);
        self
    }

    /// Restricts to transactions on or before `to`.
    #[inline]
    #[must_use]
    pub const fn until(mut self, to: NaiveDate) -> Self {
        self.date_to = Some(to);
        self
    }

    /// Restricts to income or expense transactions.
    #[inline]
    #[must_use]
    pub const fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to the given category (case-insensitive).
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, category: T) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restricts to transactions attributed to the given member.
    #[inline]
    #[must_use]
    pub fn member<T: Into<String>>(mut self, member: T) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Restricts to transactions generated by the given loan.
    #[inline]
    #[must_use]
    pub fn loan(mut self, id: LoanId) -> Self {
        self.loan = Some(id);
        self
    }

    /// Restricts to transactions whose description contains the given
    /// substring (case-insensitive).
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, text: T) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Restricts to transactions of at least `min`.
    #[inline]
    #[must_use]
    pub const fn min_amount(mut self, min: Decimal) -> Self {
        self.min_amount = Some(min);
        self
    }

    /// Restricts to transactions of at most `max`.
    #[inline]
    #[must_use]
    pub const fn max_amount(mut self, max: Decimal) -> Self {
        self.max_amount = Some(max);
        self
    }

    /// Returns `true` if the transaction satisfies all set criteria.
    #[inline]
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.matches_date(tx)
            && self.kind.is_none_or(|kind| tx.kind == kind)
            && self.matches_category(tx)
            && self.member.as_ref().is_none_or(|member| tx.member.as_ref() == Some(member))
            && self.loan.as_ref().is_none_or(|loan| tx.loan_id.as_ref() == Some(loan))
            && self.matches_description(tx)
            && self.matches_amount(tx)
    }

    /// Checks date range criteria.
    fn matches_date(&self, tx: &Transaction) -> bool {
        self.date_from.is_none_or(|from| tx.date >= from)
            && self.date_to.is_none_or(|to| tx.date <= to)
    }

    /// Checks category criteria.
    fn matches_category(&self, tx: &Transaction) -> bool {
        self.category
            .as_ref()
            .is_none_or(|category| tx.category.to_lowercase() == category.to_lowercase())
    }

    /// Checks description criteria.
    fn matches_description(&self, tx: &Transaction) -> bool {
        self.description.as_ref().is_none_or(|text| {
            tx.description
                .to_lowercase()
                .contains(&text.to_lowercase())
        })
    }

    /// Checks amount criteria.
    fn matches_amount(&self, tx: &Transaction) -> bool {
        self.min_amount.is_none_or(|min| tx.amount >= min)
            && self.max_amount.is_none_or(|max| tx.amount <= max)
    }
}

/// Returns the transaction's id, generating one first if it has none.
pub(crate) fn ensure_id(tx: &mut Transaction) -> TransactionId {
    tx.id.get_or_insert_with(TransactionId::generate).clone()
}

/// Filters `all` and orders the result newest date first. Transactions on
/// the same date keep their storage order.
fn select(all: Vec<Transaction>, filter: &TransactionFilter) -> Vec<Transaction> {
    let mut selected: Vec<Transaction> = all.into_iter().filter(|tx| filter.matches(tx)).collect();
    selected.sort_by(|a, b| b.date.cmp(&a.date));
    selected
}

/// Error returned when an update names no transaction.
fn missing_id() -> LoanbookError {
    LoanbookError::Validation("transaction id is required".to_owned())
}

/// Generates a ledger type (async or blocking) over a storage trait.
macro_rules! define_ledger {
    (
        ledger_name: $ledger:ident,
        storage_trait: $storage_trait:ident,
        ledger_doc: $ledger_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $ledger_doc]
        #[derive(Debug)]
        pub struct $ledger<S: $storage_trait> {
            /// Storage backend.
            storage: S,
        }

        impl<S: $storage_trait> $ledger<S> {
            /// Creates a ledger over the given storage.
            #[inline]
            #[must_use]
            pub const fn new(storage: S) -> Self {
                Self { storage }
            }

            /// Returns a reference to the underlying storage backend.
            #[inline]
            #[must_use]
            pub const fn storage(&self) -> &S {
                &self.storage
            }

            /// Stores a new transaction, assigning a UUID when it has no id.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to write.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn add(&self, mut transaction: Transaction) -> Result<TransactionId> {
                let id = ensure_id(&mut transaction);
                self.storage.put(&transaction) $( .$await_ext )? ?;
                tracing::debug!(id = %id, "transaction added");
                Ok(id)
            }

            /// Looks up a transaction by id.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[inline]
            pub $($async_kw)? fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
                self.storage.get::<Transaction>(id.as_inner()) $( .$await_ext )?
            }

            /// Returns transactions matching `filter`, newest first.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            pub $($async_kw)? fn get_all(
                &self,
                filter: &TransactionFilter,
            ) -> Result<Vec<Transaction>> {
                let all = self.storage.get_all::<Transaction>() $( .$await_ext )? ?;
                Ok(select(all, filter))
            }

            /// Returns every transaction linked to `loan_id`, newest first.
            ///
            /// This is a convenience wrapper around [`Self::get_all`].
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            pub $($async_kw)? fn for_loan(&self, loan_id: &LoanId) -> Result<Vec<Transaction>> {
                self.get_all(&TransactionFilter::new().loan(loan_id.clone())) $( .$await_ext )?
            }

            /// Replaces a stored transaction.
            ///
            /// # Errors
            ///
            /// Returns [`crate::error::LoanbookError::Validation`] if the transaction has no
            /// id, or an error if the storage backend fails to write.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn update(&self, transaction: &Transaction) -> Result<()> {
                if transaction.id.is_none() {
                    return Err(missing_id());
                }
                self.storage.put(transaction) $( .$await_ext )?
            }

            /// Deletes a transaction. Deleting a missing id succeeds.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to write.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn delete(&self, id: &TransactionId) -> Result<()> {
                self.storage.delete::<Transaction>(id.as_inner()) $( .$await_ext )? ?;
                tracing::debug!(id = %id, "transaction deleted");
                Ok(())
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_ledger {
    //! Async transaction ledger.

    use crate::error::Result;
    use crate::models::{LoanId, Transaction, TransactionId};
    use crate::storage::Storage;

    use super::{TransactionFilter, ensure_id, missing_id, select};

    define_ledger! {
        ledger_name: Ledger,
        storage_trait: Storage,
        ledger_doc: "Async transaction ledger.\n\nCreate one with [`Ledger::new`] over any [`Storage`] backend.",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_ledger {
    //! Blocking transaction ledger.

    use crate::error::Result;
    use crate::models::{LoanId, Transaction, TransactionId};
    use crate::storage::BlockingStorage;

    use super::{TransactionFilter, ensure_id, missing_id, select};

    define_ledger! {
        ledger_name: LedgerBlocking,
        storage_trait: BlockingStorage,
        ledger_doc: "Blocking transaction ledger.\n\nCreate one with [`LedgerBlocking::new`] over any [`BlockingStorage`] backend.",
    }
}

#[cfg(feature = "async")]
pub use async_ledger::Ledger;
#[cfg(feature = "blocking")]
pub use blocking_ledger::LedgerBlocking;
