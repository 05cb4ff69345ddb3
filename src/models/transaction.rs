//! Transaction model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LoanId, TransactionId, TransactionType, lenient};
use crate::storage::{Collection, Record};

/// A single cash movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier, assigned by the ledger when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    /// Booking date.
    #[serde(deserialize_with = "lenient::date")]
    pub date: NaiveDate,
    /// Unsigned magnitude.
    pub amount: Decimal,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Top-level category.
    #[serde(default)]
    pub category: String,
    /// Optional second-level category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Loan that generated this transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<LoanId>,
    /// Household member the movement is attributed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl Transaction {
    /// Creates a transaction without id, subcategory, loan or member.
    #[inline]
    #[must_use]
    pub const fn new(
        date: NaiveDate,
        amount: Decimal,
        kind: TransactionType,
        category: String,
        description: String,
    ) -> Self {
        Self {
            id: None,
            date,
            amount,
            kind,
            category,
            subcategory: None,
            description,
            loan_id: None,
            member: None,
        }
    }
}

impl Record for Transaction {
    const COLLECTION: Collection = Collection::Transactions;

    #[inline]
    fn key(&self) -> Option<&str> {
        self.id.as_ref().map(TransactionId::as_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deserialize_loan_payment_transaction() {
        let json = r#"{
            "id": "tx-001",
            "date": "2024-02-01",
            "amount": 100,
            "type": "expense",
            "category": "Préstamos",
            "description": "Pago de cuota: Car",
            "loanId": "loan-1",
            "member": "Ana"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.key(), Some("tx-001"));
        assert_eq!(tx.amount, dec!(100));
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.loan_id, Some(LoanId::from("loan-1")));
        assert_eq!(tx.member.as_deref(), Some("Ana"));
        assert!(tx.subcategory.is_none());
    }

    #[test]
    fn serialize_omits_absent_links() {
        let tx = Transaction::new(
            NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            dec!(42.10),
            TransactionType::Income,
            "Salary".to_owned(),
            "May".to_owned(),
        );
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("loanId").is_none());
        assert_eq!(json["type"], "income");
        assert_eq!(json["date"], "2024-05-03");
    }

    #[test]
    fn rejects_missing_date() {
        let json = r#"{"amount": 1, "type": "expense"}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }
}
