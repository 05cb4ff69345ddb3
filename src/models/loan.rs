//! Loan model and its embedded schedule and payment entries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LoanId, LoanStatus, TransactionId, TransactionType, lenient};
use crate::storage::{Collection, Record};

/// One financing agreement.
///
/// Term fields are optional and deserialize leniently: numeric strings are
/// accepted and unparseable values become `None`. The amortization engine
/// reads absent or negative terms as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Unique identifier, assigned on creation when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LoanId>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Lender or counterparty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Principal.
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub amount: Option<Decimal>,
    /// Number of monthly installments.
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    /// Nominal annual interest rate, in percent.
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub interest_rate: Option<Decimal>,
    /// Regular installment amount; derived when absent.
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub installment_amount: Option<Decimal>,
    /// Override for the first installment.
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub first_installment_amount: Option<Decimal>,
    /// Override for the last installment.
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub last_installment_amount: Option<Decimal>,
    /// Date the loan was granted.
    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none",
    )]
    pub start_date: Option<NaiveDate>,
    /// Date of the first installment; defaults to `start_date`.
    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none",
    )]
    pub first_installment_date: Option<NaiveDate>,
    /// Direction of the initial transaction (defaults to expense).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    /// Whether `add` also records the disbursement as a transaction.
    #[serde(default)]
    pub initial_transaction: bool,
    /// Derived installment rows.
    #[serde(default)]
    pub schedule: Vec<Installment>,
    /// Payments made so far, oldest first.
    #[serde(default)]
    pub payments: Vec<Payment>,
    /// Sum of `payments[].amount`.
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Lifecycle state.
    #[serde(default)]
    pub status: LoanStatus,
}

impl Loan {
    /// Creates a loan with the three required fields set.
    #[inline]
    #[must_use]
    pub fn new(name: String, amount: Decimal, start_date: NaiveDate) -> Self {
        Self {
            name,
            amount: Some(amount),
            start_date: Some(start_date),
            ..Self::default()
        }
    }

    /// Sets the installment count.
    #[inline]
    #[must_use]
    pub fn with_installments(mut self, installments: u32) -> Self {
        self.installments = Some(installments);
        self
    }

    /// Sets the nominal annual interest rate, in percent.
    #[inline]
    #[must_use]
    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    /// Sets an explicit installment amount.
    #[inline]
    #[must_use]
    pub fn with_installment_amount(mut self, amount: Decimal) -> Self {
        self.installment_amount = Some(amount);
        self
    }

    /// Sets the first installment date.
    #[inline]
    #[must_use]
    pub fn with_first_installment_date(mut self, date: NaiveDate) -> Self {
        self.first_installment_date = Some(date);
        self
    }

    /// Requests an initial transaction of the given direction on `add`.
    #[inline]
    #[must_use]
    pub fn with_initial_transaction(mut self, kind: TransactionType) -> Self {
        self.initial_transaction = true;
        self.kind = Some(kind);
        self
    }

    /// Principal minus paid amount, never negative.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        (crate::money::non_negative(self.amount) - self.paid_amount).max(Decimal::ZERO)
    }
}

impl Record for Loan {
    const COLLECTION: Collection = Collection::Loans;

    #[inline]
    fn key(&self) -> Option<&str> {
        self.id.as_ref().map(LoanId::as_inner)
    }
}

/// One scheduled payment period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// 1-based position.
    pub idx: u32,
    /// Due date.
    #[serde(deserialize_with = "lenient::date")]
    pub date: NaiveDate,
    /// Total cash due.
    pub amount: Decimal,
    /// Interest part of `amount`.
    pub interest: Decimal,
    /// Principal part of `amount`.
    pub principal: Decimal,
    /// Outstanding principal after this installment.
    pub balance: Decimal,
    /// Outstanding principal before this installment.
    pub pending_amount: Decimal,
}

/// A payment actually made against a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment date.
    #[serde(deserialize_with = "lenient::date")]
    pub date: NaiveDate,
    /// Paid amount.
    pub amount: Decimal,
    /// Ledger transaction recorded with this payment. Absent on entries
    /// written before payments were linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
}
