//! Enumeration types for constrained record values.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a loan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoanStatus {
    /// Still being repaid.
    #[default]
    Active,
    /// Paid amount reached the principal.
    Completed,
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Money going out.
    #[default]
    Expense,
}

impl core::fmt::Display for LoanStatus {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match *self {
            Self::Active => "active",
            Self::Completed => "completed",
        })
    }
}

impl core::fmt::Display for TransactionType {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match *self {
            Self::Income => "income",
            Self::Expense => "expense",
        })
    }
}
