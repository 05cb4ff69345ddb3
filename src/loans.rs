//! Loan lifecycle management over a [`Storage`] / [`BlockingStorage`]
//! backend.
//!
//! A loan manager creates loans (optionally recording the disbursement in
//! the ledger), keeps their amortization schedule in sync with their
//! terms, registers and undoes payments, and deletes loans together with
//! every transaction they generated. Each mutating operation commits a
//! single [`WriteBatch`], so a loan and its transactions never diverge.
//!
//! Every mutating operation reports its outcome through a [`Notifier`]
//! exactly once.
//!
//! [`Storage`]: crate::storage::Storage
//! [`BlockingStorage`]: crate::storage::BlockingStorage
//! [`WriteBatch`]: crate::storage::WriteBatch
//! [`Notifier`]: crate::notify::Notifier

mod lifecycle;

use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate figures over all stored loans.
///
/// Totals cover active loans only. `total_remaining` is
/// `total_active - total_paid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    /// Number of active loans.
    pub active: usize,
    /// Number of completed loans.
    pub completed: usize,
    /// Sum of the principal of active loans.
    pub total_active: Decimal,
    /// Sum of what has been paid on active loans.
    pub total_paid: Decimal,
    /// Principal of active loans still outstanding.
    pub total_remaining: Decimal,
}

/// Generates a loan manager type (async or blocking) with its builder.
macro_rules! define_loan_manager {
    (
        manager_name: $manager:ident,
        builder_name: $builder:ident,
        ledger_name: $ledger:ident,
        storage_trait: $storage_trait:ident,
        manager_doc: $manager_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<S: $storage_trait> {
            /// Storage backend.
            storage: Option<S>,
            /// Notification sink; [`TracingNotifier`] when unset.
            notifier: Option<Box<dyn Notifier>>,
        }

        impl<S: $storage_trait> $builder<S> {
            /// Sets the storage backend.
            #[inline]
            #[must_use]
            pub fn storage(mut self, storage: S) -> Self {
                self.storage = Some(storage);
                self
            }

            /// Sets the sink that receives operation outcomes.
            #[inline]
            #[must_use]
            pub fn notifier<N: Notifier + 'static>(mut self, notifier: N) -> Self {
                self.notifier = Some(Box::new(notifier));
                self
            }

            /// Builds the loan manager.
            ///
            /// # Errors
            ///
            /// Returns [`LoanbookError::Storage`] if no storage was provided.
            #[inline]
            pub fn build(self) -> Result<$manager<S>> {
                let storage = self.storage.ok_or_else(|| {
                    LoanbookError::Storage("storage backend is required".into())
                })?;
                Ok($manager {
                    ledger: $ledger::new(storage),
                    notifier: self.notifier.unwrap_or_else(|| Box::new(TracingNotifier)),
                })
            }
        }

        #[doc = $manager_doc]
        #[derive(Debug)]
        pub struct $manager<S: $storage_trait> {
            /// Ledger over the storage backend.
            ledger: $ledger<S>,
            /// Notification sink.
            notifier: Box<dyn Notifier>,
        }

        impl<S: $storage_trait> $manager<S> {
            /// Creates a new builder for configuring the manager.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder<S> {
                $builder {
                    storage: None,
                    notifier: None,
                }
            }

            /// Returns the transaction ledger sharing this manager's storage.
            #[inline]
            #[must_use]
            pub const fn ledger(&self) -> &$ledger<S> {
                &self.ledger
            }

            /// Returns a reference to the underlying storage backend.
            #[inline]
            #[must_use]
            pub const fn storage(&self) -> &S {
                self.ledger.storage()
            }

            /// Looks up a loan by id.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[inline]
            pub $($async_kw)? fn get(&self, id: &LoanId) -> Result<Option<Loan>> {
                self.storage().get::<Loan>(id.as_inner()) $( .$await_ext )?
            }

            /// Returns every stored loan.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[inline]
            pub $($async_kw)? fn get_all(&self) -> Result<Vec<Loan>> {
                self.storage().get_all::<Loan>() $( .$await_ext )?
            }

            /// Creates a loan and returns its id.
            ///
            /// Derives the installment amount and schedule from the loan's
            /// terms, and records the disbursement in the ledger when
            /// `initial_transaction` is set.
            ///
            /// # Errors
            ///
            /// Returns [`LoanbookError::Validation`] if the amount, name or
            /// start date is missing; nothing is written in that case.
            /// Returns an error if the storage backend fails to write.
            #[tracing::instrument(skip_all, fields(name = %loan.name))]
            pub $($async_kw)? fn add(&self, loan: Loan) -> Result<LoanId> {
                let outcome = self.try_add(loan) $( .$await_ext )?;
                self.report(outcome, "Loan added", "Error adding loan")
            }

            /// Performs [`Self::add`] without notifying.
            $($async_kw)? fn try_add(&self, mut loan: Loan) -> Result<LoanId> {
                lifecycle::validate_new(&loan)?;
                let id = lifecycle::prepare_new(&mut loan);
                let mut batch = WriteBatch::new();
                batch.put(&loan)?;
                if let Some(tx) = lifecycle::initial_transaction(&loan, &id) {
                    batch.put(&tx)?;
                }
                self.storage().commit(batch) $( .$await_ext )? ?;
                tracing::info!(loan_id = %id, "loan added");
                Ok(id)
            }

            /// Stores a modified loan.
            ///
            /// An existing schedule is recomputed from its own rows, with
            /// the installment terms read back from it; otherwise a
            /// schedule is generated when an installment count is set.
            ///
            /// # Errors
            ///
            /// Returns [`LoanbookError::Validation`] if the loan has no id,
            /// or an error if the storage backend fails to write.
            #[tracing::instrument(skip_all, fields(name = %loan.name))]
            pub $($async_kw)? fn update(&self, loan: Loan) -> Result<()> {
                let outcome = self.try_update(loan) $( .$await_ext )?;
                self.report(outcome, "Loan updated", "Error updating loan")
            }

            /// Performs [`Self::update`] without notifying.
            $($async_kw)? fn try_update(&self, mut loan: Loan) -> Result<()> {
                let _id = lifecycle::require_id(&loan)?;
                lifecycle::reconcile_schedule(&mut loan);
                self.storage().put(&loan) $( .$await_ext )?
            }

            /// Records a payment against a loan and returns the updated loan.
            ///
            /// The payment is written to the ledger as an expense linked to
            /// the loan. The loan completes once the payments cover its
            /// principal.
            ///
            /// # Errors
            ///
            /// Returns [`LoanbookError::NotFound`] for an unknown loan, or an
            /// error if the storage backend fails.
            #[tracing::instrument(skip_all, fields(loan_id = %loan_id, amount = %amount))]
            pub $($async_kw)? fn register_payment(
                &self,
                loan_id: &LoanId,
                amount: Decimal,
                date: NaiveDate,
                member: Option<String>,
            ) -> Result<Loan> {
                let outcome = self.try_register_payment(loan_id, amount, date, member)
                    $( .$await_ext )?;
                self.report(outcome, "Payment registered", "Error registering payment")
            }

            /// Performs [`Self::register_payment`] without notifying.
            $($async_kw)? fn try_register_payment(
                &self,
                loan_id: &LoanId,
                amount: Decimal,
                date: NaiveDate,
                member: Option<String>,
            ) -> Result<Loan> {
                let mut loan = self.require(loan_id) $( .$await_ext )? ?;
                let tx = lifecycle::payment_transaction(&loan, loan_id, amount, date, member);
                lifecycle::apply_payment(&mut loan, Payment {
                    date,
                    amount,
                    transaction_id: tx.id.clone(),
                });
                lifecycle::reconcile_schedule(&mut loan);
                let mut batch = WriteBatch::new();
                batch.put(&tx)?;
                batch.put(&loan)?;
                self.storage().commit(batch) $( .$await_ext )? ?;
                tracing::info!(
                    paid = %loan.paid_amount,
                    status = %loan.status,
                    "payment registered"
                );
                Ok(loan)
            }

            /// Reverts the most recent payment of a loan.
            ///
            /// Removes the payment's ledger entry and returns `true`. When
            /// the loan has no payments nothing changes, a warning is
            /// reported and `false` is returned.
            ///
            /// Payments recorded without a transaction link are matched to
            /// the ledger by loan, date and amount (within a cent).
            ///
            /// # Errors
            ///
            /// Returns [`LoanbookError::NotFound`] for an unknown loan, or an
            /// error if the storage backend fails.
            #[tracing::instrument(skip_all, fields(loan_id = %loan_id))]
            pub $($async_kw)? fn undo_last_payment(&self, loan_id: &LoanId) -> Result<bool> {
                let outcome = self.try_undo_last_payment(loan_id) $( .$await_ext )?;
                match outcome {
                    Ok(false) => {
                        self.notifier.notify("No payments to undo", NotifyLevel::Warning);
                        Ok(false)
                    }
                    Ok(true) | Err(_) => {
                        self.report(outcome, "Payment undone", "Error undoing payment")
                    }
                }
            }

            /// Performs [`Self::undo_last_payment`] without notifying.
            $($async_kw)? fn try_undo_last_payment(&self, loan_id: &LoanId) -> Result<bool> {
                let mut loan = self.require(loan_id) $( .$await_ext )? ?;
                let Some(last) = loan.payments.last().cloned() else {
                    return Ok(false);
                };
                let linked = match last.transaction_id.clone() {
                    Some(id) => Some(id),
                    None => {
                        let txs = self.ledger.for_loan(loan_id) $( .$await_ext )? ?;
                        let found = lifecycle::match_legacy_payment(&last, loan_id, &txs).cloned();
                        if found.is_none() {
                            tracing::warn!("no ledger entry matches the undone payment");
                        }
                        found
                    }
                };
                let _undone = lifecycle::revert_last_payment(&mut loan);
                lifecycle::reconcile_schedule(&mut loan);
                let mut batch = WriteBatch::new();
                if let Some(tx_id) = linked {
                    batch.delete::<Transaction>(tx_id.as_inner());
                }
                batch.put(&loan)?;
                self.storage().commit(batch) $( .$await_ext )? ?;
                tracing::info!(paid = %loan.paid_amount, "payment undone");
                Ok(true)
            }

            /// Deletes a loan and every transaction linked to it.
            ///
            /// # Errors
            ///
            /// Returns [`LoanbookError::NotFound`] for an unknown loan, or an
            /// error if the storage backend fails.
            #[tracing::instrument(skip_all, fields(loan_id = %id))]
            pub $($async_kw)? fn delete(&self, id: &LoanId) -> Result<()> {
                let outcome = self.try_delete(id) $( .$await_ext )?;
                self.report(outcome, "Loan deleted", "Error deleting loan")
            }

            /// Performs [`Self::delete`] without notifying.
            $($async_kw)? fn try_delete(&self, id: &LoanId) -> Result<()> {
                let _loan = self.require(id) $( .$await_ext )? ?;
                let linked = self.ledger.for_loan(id) $( .$await_ext )? ?;
                let mut batch = WriteBatch::new();
                for tx_id in linked.iter().filter_map(|tx| tx.id.as_ref()) {
                    batch.delete::<Transaction>(tx_id.as_inner());
                }
                batch.delete::<Loan>(id.as_inner());
                let removed = batch.len().saturating_sub(1);
                self.storage().commit(batch) $( .$await_ext )? ?;
                tracing::info!(transactions = removed, "loan deleted");
                Ok(())
            }

            /// Summarizes all stored loans.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[inline]
            pub $($async_kw)? fn summary(&self) -> Result<LoanSummary> {
                let loans = self.get_all() $( .$await_ext )? ?;
                Ok(lifecycle::summarize(&loans))
            }

            /// Loads a loan that must exist.
            $($async_kw)? fn require(&self, id: &LoanId) -> Result<Loan> {
                self.get(id) $( .$await_ext )? ?.ok_or_else(|| lifecycle::not_found(id))
            }

            /// Notifies the outcome of an operation once and passes it through.
            fn report<T>(&self, outcome: Result<T>, success: &str, failure: &str) -> Result<T> {
                match outcome {
                    Ok(value) => {
                        self.notifier.notify(success, NotifyLevel::Success);
                        Ok(value)
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "{failure}");
                        self.notifier.notify(failure, NotifyLevel::Error);
                        Err(err)
                    }
                }
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_loans {
    //! Async loan manager.

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::error::{LoanbookError, Result};
    use crate::ledger::Ledger;
    use crate::models::{Loan, LoanId, Payment, Transaction};
    use crate::notify::{Notifier, NotifyLevel, TracingNotifier};
    use crate::storage::{Storage, WriteBatch};

    use super::{LoanSummary, lifecycle};

    define_loan_manager! {
        manager_name: LoanManager,
        builder_name: LoanManagerBuilder,
        ledger_name: Ledger,
        storage_trait: Storage,
        manager_doc: "Async loan manager.\n\nUse [`LoanManager::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`LoanManager`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_loans {
    //! Blocking loan manager.

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::error::{LoanbookError, Result};
    use crate::ledger::LedgerBlocking;
    use crate::models::{Loan, LoanId, Payment, Transaction};
    use crate::notify::{Notifier, NotifyLevel, TracingNotifier};
    use crate::storage::{BlockingStorage, WriteBatch};

    use super::{LoanSummary, lifecycle};

    define_loan_manager! {
        manager_name: LoanManagerBlocking,
        builder_name: LoanManagerBlockingBuilder,
        ledger_name: LedgerBlocking,
        storage_trait: BlockingStorage,
        manager_doc: "Blocking loan manager.\n\nUse [`LoanManagerBlocking::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`LoanManagerBlocking`].",
    }
}

#[cfg(feature = "async")]
pub use async_loans::{LoanManager, LoanManagerBuilder};
#[cfg(feature = "blocking")]
pub use blocking_loans::{LoanManagerBlocking, LoanManagerBlockingBuilder};

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::error::LoanbookError;
    use crate::models::{Loan, LoanId, LoanStatus, Payment, Transaction, TransactionType};
    use crate::notify::{Notifier, NotifyLevel};
    use crate::storage::{Collection, InMemoryStorage};

    #[derive(Debug, Clone, Default)]
    struct Recording(Arc<Mutex<Vec<(String, NotifyLevel)>>>);

    impl Recording {
        fn seen(&self) -> Vec<(String, NotifyLevel)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Notifier for Recording {
        fn notify(&self, message: &str, level: NotifyLevel) {
            self.0.lock().unwrap().push((message.to_owned(), level));
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn car_loan() -> Loan {
        Loan::new("Car".to_owned(), dec!(1200), date(2024, 1, 1)).with_installments(12)
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::ledger::TransactionFilter;
        use crate::storage::{BlockingStorage, Record, WriteBatch};

        /// Reads from memory, refuses every write.
        #[derive(Debug, Default)]
        struct ReadOnly(InMemoryStorage);

        fn refused() -> LoanbookError {
            LoanbookError::Storage("disk full".into())
        }

        impl BlockingStorage for ReadOnly {
            fn get<R: Record>(&self, id: &str) -> crate::error::Result<Option<R>> {
                self.0.get(id)
            }

            fn get_all<R: Record>(&self) -> crate::error::Result<Vec<R>> {
                self.0.get_all()
            }

            fn put<R: Record>(&self, _record: &R) -> crate::error::Result<()> {
                Err(refused())
            }

            fn delete<R: Record>(&self, _id: &str) -> crate::error::Result<()> {
                Err(refused())
            }

            fn commit(&self, _batch: WriteBatch) -> crate::error::Result<()> {
                Err(refused())
            }
        }

        fn manager() -> (LoanManagerBlocking<InMemoryStorage>, Recording) {
            let sink = Recording::default();
            let manager = LoanManagerBlocking::builder()
                .storage(InMemoryStorage::new())
                .notifier(sink.clone())
                .build()
                .unwrap();
            (manager, sink)
        }

        #[test]
        fn builder_requires_storage() {
            let result = LoanManagerBlocking::<InMemoryStorage>::builder().build();
            assert!(matches!(result, Err(LoanbookError::Storage(_))));
        }

        #[test]
        fn add_derives_terms_and_schedule() {
            let (manager, sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let loan = manager.get(&id).unwrap().unwrap();
            assert_eq!(loan.installment_amount, Some(dec!(100)));
            assert_eq!(loan.schedule.len(), 12);
            assert_eq!(loan.status, LoanStatus::Active);
            assert_eq!(sink.seen(), vec![("Loan added".to_owned(), NotifyLevel::Success)]);
        }

        #[test]
        fn add_with_initial_transaction_writes_both() {
            let (manager, _sink) = manager();
            let id = manager
                .add(car_loan().with_initial_transaction(TransactionType::Income))
                .unwrap();
            let linked = manager.ledger().for_loan(&id).unwrap();
            assert_eq!(linked.len(), 1);
            let disbursement = linked.first().unwrap();
            assert_eq!(disbursement.amount, dec!(1200));
            assert_eq!(disbursement.kind, TransactionType::Income);
            assert_eq!(disbursement.description, "Préstamo: Car");
        }

        #[test]
        fn add_validates_before_writing() {
            let (manager, sink) = manager();
            let mut loan = car_loan().with_initial_transaction(TransactionType::Expense);
            loan.start_date = None;
            let err = manager.add(loan).unwrap_err();
            assert!(matches!(err, LoanbookError::Validation(_)));
            assert_eq!(manager.storage().count(Collection::Loans).unwrap(), 0);
            assert_eq!(manager.storage().count(Collection::Transactions).unwrap(), 0);
            assert_eq!(sink.seen(), vec![("Error adding loan".to_owned(), NotifyLevel::Error)]);
        }

        #[test]
        fn register_payment_records_transaction() {
            let (manager, sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let loan = manager
                .register_payment(&id, dec!(100), date(2024, 2, 1), Some("Ana".to_owned()))
                .unwrap();
            assert_eq!(loan.paid_amount, dec!(100));
            assert_eq!(loan.status, LoanStatus::Active);
            assert_eq!(loan.payments.len(), 1);

            let txs = manager.ledger().get_all(&TransactionFilter::new()).unwrap();
            assert_eq!(txs.len(), 1);
            let tx = txs.first().unwrap();
            assert_eq!(tx.kind, TransactionType::Expense);
            assert_eq!(tx.category, "Préstamos");
            assert_eq!(tx.description, "Pago de cuota: Car");
            assert_eq!(tx.member.as_deref(), Some("Ana"));
            assert_eq!(tx.loan_id.as_ref(), Some(&id));
            assert_eq!(loan.payments.first().unwrap().transaction_id, tx.id);
            assert_eq!(sink.seen().len(), 2);
        }

        #[test]
        fn paying_off_completes_the_loan() {
            let (manager, _sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let _first = manager
                .register_payment(&id, dec!(600), date(2024, 2, 1), None)
                .unwrap();
            let loan = manager
                .register_payment(&id, dec!(600), date(2024, 3, 1), None)
                .unwrap();
            assert_eq!(loan.status, LoanStatus::Completed);
            assert_eq!(loan.remaining(), Decimal::ZERO);
        }

        #[test]
        fn register_payment_on_unknown_loan() {
            let (manager, sink) = manager();
            let err = manager
                .register_payment(&LoanId::from("nope"), dec!(1), date(2024, 2, 1), None)
                .unwrap_err();
            assert!(matches!(err, LoanbookError::NotFound { entity: "loan", .. }));
            assert_eq!(
                sink.seen(),
                vec![("Error registering payment".to_owned(), NotifyLevel::Error)]
            );
        }

        #[test]
        fn undo_on_unknown_loan() {
            let (manager, sink) = manager();
            let err = manager.undo_last_payment(&LoanId::from("nope")).unwrap_err();
            assert!(matches!(err, LoanbookError::NotFound { entity: "loan", .. }));
            assert_eq!(
                sink.seen(),
                vec![("Error undoing payment".to_owned(), NotifyLevel::Error)]
            );
        }

        #[test]
        fn delete_on_unknown_loan() {
            let (manager, sink) = manager();
            let err = manager.delete(&LoanId::from("nope")).unwrap_err();
            assert!(matches!(err, LoanbookError::NotFound { entity: "loan", .. }));
            assert_eq!(
                sink.seen(),
                vec![("Error deleting loan".to_owned(), NotifyLevel::Error)]
            );
        }

        #[test]
        fn undo_without_payments_is_a_warning() {
            let (manager, sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let before = manager.get(&id).unwrap();
            assert!(!manager.undo_last_payment(&id).unwrap());
            assert_eq!(manager.get(&id).unwrap(), before);
            assert_eq!(
                sink.seen().last(),
                Some(&("No payments to undo".to_owned(), NotifyLevel::Warning))
            );
        }

        #[test]
        fn undo_removes_linked_transaction() {
            let (manager, _sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let _paid = manager
                .register_payment(&id, dec!(100), date(2024, 2, 1), None)
                .unwrap();
            assert!(manager.undo_last_payment(&id).unwrap());
            let loan = manager.get(&id).unwrap().unwrap();
            assert!(loan.payments.is_empty());
            assert_eq!(loan.paid_amount, Decimal::ZERO);
            assert!(manager.ledger().for_loan(&id).unwrap().is_empty());
        }

        #[test]
        fn payment_round_trip_pins_installment_overrides() {
            let (manager, _sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let before = manager.get(&id).unwrap().unwrap();
            assert!(before.first_installment_amount.is_none());
            assert!(before.last_installment_amount.is_none());
            let _paid = manager
                .register_payment(&id, dec!(100), date(2024, 2, 1), None)
                .unwrap();
            assert!(manager.undo_last_payment(&id).unwrap());
            let after = manager.get(&id).unwrap().unwrap();
            assert_eq!(after.first_installment_amount, Some(dec!(100)));
            assert_eq!(after.last_installment_amount, Some(dec!(100)));
            assert_eq!(after.schedule, before.schedule);
            assert_eq!(after.paid_amount, before.paid_amount);
        }

        #[test]
        fn undo_reactivates_a_completed_loan() {
            let (manager, _sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let _full = manager
                .register_payment(&id, dec!(1200), date(2024, 2, 1), None)
                .unwrap();
            let extra = manager
                .register_payment(&id, dec!(10), date(2024, 3, 1), None)
                .unwrap();
            assert_eq!(extra.status, LoanStatus::Completed);
            assert!(manager.undo_last_payment(&id).unwrap());
            let loan = manager.get(&id).unwrap().unwrap();
            assert_eq!(loan.paid_amount, dec!(1200));
            assert_eq!(loan.status, LoanStatus::Active);
        }

        #[test]
        fn undo_matches_unlinked_payment_by_date_and_amount() {
            let (manager, _sink) = manager();
            let id = manager.add(car_loan()).unwrap();
            let mut loan = manager.get(&id).unwrap().unwrap();
            loan.payments.push(Payment {
                date: date(2024, 2, 1),
                amount: dec!(100),
                transaction_id: None,
            });
            loan.paid_amount = dec!(100);
            manager.update(loan).unwrap();

            let mut legacy = Transaction::new(
                date(2024, 2, 1),
                dec!(100.01),
                TransactionType::Expense,
                "Préstamos".to_owned(),
                "Pago de cuota: Car".to_owned(),
            );
            legacy.loan_id = Some(id.clone());
            let _legacy = manager.ledger().add(legacy).unwrap();
            let _unrelated = manager
                .ledger()
                .add(Transaction::new(
                    date(2024, 2, 1),
                    dec!(100),
                    TransactionType::Expense,
                    "Food".to_owned(),
                    "Groceries".to_owned(),
                ))
                .unwrap();

            assert!(manager.undo_last_payment(&id).unwrap());
            assert!(manager.ledger().for_loan(&id).unwrap().is_empty());
            assert_eq!(manager.storage().count(Collection::Transactions).unwrap(), 1);
        }

        #[test]
        fn delete_cascades_to_transactions() {
            let (manager, sink) = manager();
            let id = manager
                .add(car_loan().with_initial_transaction(TransactionType::Expense))
                .unwrap();
            let other = manager.add(car_loan()).unwrap();
            for day in [1, 2] {
                let _paid = manager
                    .register_payment(&id, dec!(100), date(2024, 2, day), None)
                    .unwrap();
            }
            let _kept = manager
                .register_payment(&other, dec!(50), date(2024, 2, 3), None)
                .unwrap();

            manager.delete(&id).unwrap();
            assert!(manager.get(&id).unwrap().is_none());
            assert!(manager.ledger().for_loan(&id).unwrap().is_empty());
            assert_eq!(manager.ledger().for_loan(&other).unwrap().len(), 1);
            assert_eq!(
                sink.seen().last(),
                Some(&("Loan deleted".to_owned(), NotifyLevel::Success))
            );
        }

        #[test]
        fn update_requires_id_and_recomputes_custom_rows() {
            let (manager, _sink) = manager();
            let err = manager.update(car_loan()).unwrap_err();
            assert!(matches!(err, LoanbookError::Validation(_)));

            let id = manager.add(car_loan()).unwrap();
            let mut loan = manager.get(&id).unwrap().unwrap();
            loan.schedule.truncate(2);
            if let Some(first) = loan.schedule.first_mut() {
                first.amount = dec!(700);
            }
            manager.update(loan).unwrap();
            let stored = manager.get(&id).unwrap().unwrap();
            assert_eq!(stored.installments, Some(2));
            assert_eq!(stored.installment_amount, Some(dec!(700)));
            assert_eq!(stored.last_installment_amount, Some(dec!(100)));
            assert_eq!(stored.schedule.last().unwrap().balance, dec!(400));
        }

        #[test]
        fn summary_totals_active_loans() {
            let (manager, _sink) = manager();
            let car = manager.add(car_loan()).unwrap();
            let phone = manager
                .add(Loan::new("Phone".to_owned(), dec!(300), date(2024, 1, 1)))
                .unwrap();
            let _part = manager
                .register_payment(&car, dec!(200), date(2024, 2, 1), None)
                .unwrap();
            let _full = manager
                .register_payment(&phone, dec!(300), date(2024, 2, 1), None)
                .unwrap();
            let summary = manager.summary().unwrap();
            assert_eq!(summary.active, 1);
            assert_eq!(summary.completed, 1);
            assert_eq!(summary.total_active, dec!(1200));
            assert_eq!(summary.total_paid, dec!(200));
            assert_eq!(summary.total_remaining, dec!(1000));
        }

        #[test]
        fn failures_notify_once() {
            let backing = InMemoryStorage::new();
            let mut stored = car_loan();
            stored.id = Some(LoanId::from("car"));
            stored.payments.push(Payment {
                date: date(2024, 2, 1),
                amount: dec!(100),
                transaction_id: None,
            });
            stored.paid_amount = dec!(100);
            backing.put(&stored).unwrap();

            let sink = Recording::default();
            let manager = LoanManagerBlocking::builder()
                .storage(ReadOnly(backing))
                .notifier(sink.clone())
                .build()
                .unwrap();
            let id = LoanId::from("car");

            assert!(manager.add(car_loan()).is_err());
            assert!(manager.update(stored).is_err());
            assert!(
                manager
                    .register_payment(&id, dec!(1), date(2024, 2, 1), None)
                    .is_err()
            );
            assert!(manager.undo_last_payment(&id).is_err());
            assert!(manager.delete(&id).is_err());

            let seen = sink.seen();
            assert_eq!(seen.len(), 5);
            assert!(seen.iter().all(|&(_, level)| level == NotifyLevel::Error));
            let loan = manager.get(&id).unwrap().unwrap();
            assert_eq!(loan.payments.len(), 1);
            assert_eq!(loan.paid_amount, dec!(100));
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::ledger::TransactionFilter;

        #[tokio::test]
        async fn full_lifecycle() {
            let sink = Recording::default();
            let manager = LoanManager::builder()
                .storage(InMemoryStorage::new())
                .notifier(sink.clone())
                .build()
                .unwrap();

            let id = manager
                .add(car_loan().with_initial_transaction(TransactionType::Expense))
                .await
                .unwrap();
            let loan = manager
                .register_payment(&id, dec!(100), date(2024, 2, 1), None)
                .await
                .unwrap();
            assert_eq!(loan.paid_amount, dec!(100));
            assert_eq!(
                manager
                    .ledger()
                    .get_all(&TransactionFilter::new())
                    .await
                    .unwrap()
                    .len(),
                2
            );

            assert!(manager.undo_last_payment(&id).await.unwrap());
            assert!(!manager.undo_last_payment(&id).await.unwrap());
            assert_eq!(manager.summary().await.unwrap().total_remaining, dec!(1200));

            manager.delete(&id).await.unwrap();
            assert!(manager.get_all().await.unwrap().is_empty());
            assert_eq!(manager.storage().count(Collection::Transactions).unwrap(), 0);
            assert_eq!(sink.seen().len(), 5);
        }

        #[tokio::test]
        async fn builder_requires_storage() {
            let result = LoanManager::<InMemoryStorage>::builder().build();
            assert!(result.is_err());
        }
    }
}
