//! Household finance core: loans, amortization schedules and a local
//! transaction ledger.
//!
//! The crate is organized around a loan manager ([`loans`]) that keeps
//! loans, their amortization schedule ([`schedule`]) and the ledger
//! entries they generate ([`ledger`]) consistent on top of a pluggable
//! record store ([`storage`]). Both async and blocking variants are
//! available behind the `async` and `blocking` features.
//!
//! ```
//! use chrono::NaiveDate;
//! use loanbook::models::Loan;
//! use loanbook::schedule::compute_schedule;
//! use rust_decimal_macros::dec;
//!
//! let loan = Loan::new(
//!     "Car".to_owned(),
//!     dec!(10000),
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//! )
//! .with_installments(12)
//! .with_interest_rate(dec!(6));
//!
//! let rows = compute_schedule(&loan);
//! assert_eq!(rows.len(), 12);
//! assert_eq!(rows[0].amount, dec!(860.66));
//! ```

pub mod error;
pub mod ledger;
pub mod loans;
pub mod models;
pub mod money;
pub mod notify;
pub mod schedule;
pub mod storage;
