//! Data models for loans, transactions and settings.
//!
//! This module contains the persisted record shapes, newtype ID wrappers,
//! and enumeration types for constrained values.

mod enums;
mod ids;
mod lenient;
mod loan;
mod setting;
mod transaction;

pub use enums::{LoanStatus, TransactionType};
pub use ids::{LoanId, TransactionId};
pub use loan::{Installment, Loan, Payment};
pub use setting::{DEFAULT_MEMBER, Setting};
pub use transaction::Transaction;

/// Category of every transaction generated by loan activity.
pub const LOAN_CATEGORY: &str = "Préstamos";
