//! Storage-independent steps of the loan lifecycle.
//!
//! The managers in [`super`] load records, call these helpers to mutate
//! them, and stage the results in a single write batch.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::LoanSummary;
use crate::error::{LoanbookError, Result};
use crate::ledger;
use crate::models::{
    LOAN_CATEGORY, Loan, LoanId, LoanStatus, Payment, Transaction, TransactionId, TransactionType,
};
use crate::money::{self, round_cents};
use crate::schedule::{self, ScheduleEdit};

/// Checks the fields required to create a loan.
pub(crate) fn validate_new(loan: &Loan) -> Result<()> {
    let mut missing = Vec::new();
    if loan.amount.is_none_or(|amount| amount.is_zero()) {
        missing.push("amount");
    }
    if loan.name.is_empty() {
        missing.push("name");
    }
    if loan.start_date.is_none() {
        missing.push("startDate");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoanbookError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Returns the id of a loan that is being updated.
pub(crate) fn require_id(loan: &Loan) -> Result<LoanId> {
    loan.id
        .clone()
        .ok_or_else(|| LoanbookError::Validation("loan id is required".to_owned()))
}

/// Error for a loan id that does not resolve.
pub(crate) fn not_found(id: &LoanId) -> LoanbookError {
    LoanbookError::NotFound {
        entity: "loan",
        id: id.to_string(),
    }
}

/// Assigns an id, derives the installment amount and builds the schedule
/// of a loan about to be created.
pub(crate) fn prepare_new(loan: &mut Loan) -> LoanId {
    let id = loan.id.get_or_insert_with(LoanId::generate).clone();
    let periods = loan.installments.unwrap_or(0);
    if loan.installment_amount.is_none()
        && periods > 0
        && let Some(amount) = loan.amount.filter(|amount| !amount.is_zero())
    {
        loan.installment_amount = Some(round_cents(amount / Decimal::from(periods)));
    }
    if periods > 0 {
        loan.schedule = schedule::compute_schedule(loan);
    }
    id
}

/// Builds the disbursement transaction requested by `initial_transaction`.
pub(crate) fn initial_transaction(loan: &Loan, id: &LoanId) -> Option<Transaction> {
    if !loan.initial_transaction {
        return None;
    }
    let date = loan.start_date?;
    let mut tx = Transaction::new(
        date,
        money::non_negative(loan.amount),
        loan.kind.unwrap_or(TransactionType::Expense),
        LOAN_CATEGORY.to_owned(),
        format!("Préstamo: {}", loan.name),
    );
    tx.loan_id = Some(id.clone());
    let _id = ledger::ensure_id(&mut tx);
    Some(tx)
}

/// Brings the schedule in line with the loan's terms before it is stored.
///
/// Edited rows take priority: when the loan carries a schedule, it is
/// recomputed from its own rows and the installment terms are read back
/// from it. Otherwise a schedule is generated from the terms if an
/// installment count is set.
pub(crate) fn reconcile_schedule(loan: &mut Loan) {
    if loan.schedule.is_empty() {
        if loan.installments.is_some() {
            loan.schedule = schedule::compute_schedule(loan);
        }
        return;
    }
    let edits: Vec<ScheduleEdit> = loan.schedule.iter().map(ScheduleEdit::from).collect();
    loan.schedule = schedule::compute_custom_schedule(loan, &edits);
    loan.installments = u32::try_from(loan.schedule.len()).ok();
    let first = loan.schedule.first().map(|row| row.amount);
    loan.installment_amount = first;
    loan.first_installment_amount = first;
    loan.last_installment_amount = loan.schedule.last().map(|row| row.amount);
}

/// Builds the ledger entry recorded for a payment.
pub(crate) fn payment_transaction(
    loan: &Loan,
    id: &LoanId,
    amount: Decimal,
    date: NaiveDate,
    member: Option<String>,
) -> Transaction {
    let mut tx = Transaction::new(
        date,
        amount,
        TransactionType::Expense,
        LOAN_CATEGORY.to_owned(),
        format!("Pago de cuota: {}", loan.name),
    );
    tx.loan_id = Some(id.clone());
    tx.member = member;
    let _id = ledger::ensure_id(&mut tx);
    tx
}

/// Recomputes `paid_amount` from the payment history.
fn recompute_paid(loan: &mut Loan) {
    loan.paid_amount = loan.payments.iter().map(|payment| payment.amount).sum();
}

/// Appends a payment and completes the loan once it is paid off.
pub(crate) fn apply_payment(loan: &mut Loan, payment: Payment) {
    loan.payments.push(payment);
    recompute_paid(loan);
    if loan.paid_amount >= money::non_negative(loan.amount) {
        loan.status = LoanStatus::Completed;
    }
}

/// Removes the most recent payment.
///
/// A completed loan always returns to active, even if the remaining
/// payments still cover the principal.
pub(crate) fn revert_last_payment(loan: &mut Loan) -> Option<Payment> {
    let payment = loan.payments.pop()?;
    recompute_paid(loan);
    if loan.status == LoanStatus::Completed {
        loan.status = LoanStatus::Active;
    }
    Some(payment)
}

/// Finds the ledger entry of a payment recorded without a transaction
/// link: same loan, same date, amount within a cent.
pub(crate) fn match_legacy_payment<'txs>(
    payment: &Payment,
    id: &LoanId,
    transactions: &'txs [Transaction],
) -> Option<&'txs TransactionId> {
    transactions
        .iter()
        .find(|tx| {
            tx.loan_id.as_ref() == Some(id)
                && tx.date == payment.date
                && money::approx_eq(tx.amount, payment.amount)
        })
        .and_then(|tx| tx.id.as_ref())
}

/// Aggregates counts and totals over all loans.
pub(crate) fn summarize(loans: &[Loan]) -> LoanSummary {
    let mut summary = LoanSummary::default();
    for loan in loans {
        match loan.status {
            LoanStatus::Active => {
                summary.active = summary.active.saturating_add(1);
                summary.total_active += money::non_negative(loan.amount);
                summary.total_paid += loan.paid_amount;
            }
            LoanStatus::Completed => summary.completed = summary.completed.saturating_add(1),
        }
    }
    summary.total_remaining = summary.total_active - summary.total_paid;
    summary
}
