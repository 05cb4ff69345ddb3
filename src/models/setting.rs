//! Key-value preference record.

use serde::{Deserialize, Serialize};

use crate::storage::{Collection, Record};

/// Name of the setting holding the member applied to payments by default.
pub const DEFAULT_MEMBER: &str = "defaultMember";

/// A stored user preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Setting name.
    pub id: String,
    /// Arbitrary JSON value.
    pub value: serde_json::Value,
}

impl Setting {
    /// Creates a setting.
    #[inline]
    #[must_use]
    pub const fn new(id: String, value: serde_json::Value) -> Self {
        Self { id, value }
    }

    /// Returns the value if it is a non-empty string.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_str().filter(|text| !text.is_empty())
    }
}

impl Record for Setting {
    const COLLECTION: Collection = Collection::Settings;

    #[inline]
    fn key(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setting_roundtrip() {
        let setting = Setting::new(DEFAULT_MEMBER.to_owned(), json!("Ana"));
        let text = serde_json::to_string(&setting).unwrap();
        assert_eq!(text, r#"{"id":"defaultMember","value":"Ana"}"#);
        let back: Setting = serde_json::from_str(&text).unwrap();
        assert_eq!(back.as_text(), Some("Ana"));
    }

    #[test]
    fn as_text_ignores_non_strings() {
        assert_eq!(Setting::new("n".to_owned(), json!(3)).as_text(), None);
        assert_eq!(Setting::new("e".to_owned(), json!("")).as_text(), None);
    }
}
