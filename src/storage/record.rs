//! Collections and the record contract shared by every backend.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{LoanbookError, Result};

/// A named group of records, keyed by record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Loan records.
    Loans,
    /// Transaction records.
    Transactions,
    /// User preferences.
    Settings,
}

impl Collection {
    /// Every collection, in a stable order.
    pub const ALL: [Self; 3] = [Self::Loans, Self::Transactions, Self::Settings];

    /// Returns the collection name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loans => "loans",
            Self::Transactions => "transactions",
            Self::Settings => "settings",
        }
    }

    /// Returns the file name used by file-based backends.
    #[inline]
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Loans => "loans.json",
            Self::Transactions => "transactions.json",
            Self::Settings => "settings.json",
        }
    }
}

impl core::fmt::Display for Collection {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that can be persisted in a [`Collection`].
///
/// Records are stored whole: a write replaces the previous version of the
/// record with the same key.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this record type lives in.
    const COLLECTION: Collection;

    /// Returns the identity key, or `None` if the record has not been
    /// assigned one yet.
    fn key(&self) -> Option<&str>;
}

/// Serializes a record into its key and JSON value.
pub(crate) fn encode<R: Record>(record: &R) -> Result<(String, serde_json::Value)> {
    let key = record
        .key()
        .ok_or(LoanbookError::MissingKey(R::COLLECTION))?
        .to_owned();
    let value = serde_json::to_value(record)?;
    Ok((key, value))
}

/// Deserializes a stored JSON value back into a record.
pub(crate) fn decode<R: Record>(value: serde_json::Value) -> Result<R> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Loan, Setting};
    use serde_json::json;

    #[test]
    fn collection_names() {
        assert_eq!(Collection::Loans.to_string(), "loans");
        assert_eq!(Collection::Transactions.file_name(), "transactions.json");
        assert_eq!(Collection::ALL.len(), 3);
    }

    #[test]
    fn encode_requires_key() {
        let err = encode(&Loan::default()).unwrap_err();
        assert!(matches!(err, LoanbookError::MissingKey(Collection::Loans)));
    }

    #[test]
    fn encode_decode_setting() {
        let (key, value) = encode(&Setting::new("theme".to_owned(), json!("dark"))).unwrap();
        assert_eq!(key, "theme");
        let back: Setting = decode(value).unwrap();
        assert_eq!(back.value, json!("dark"));
    }
}
