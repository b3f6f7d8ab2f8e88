//! The persisted user-data entity.

use serde::{Deserialize, Serialize};

/// A user record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique key the record is stored under.
    pub account_id: String,
    /// Opaque payload.
    pub payload: String,
    /// Optional backend-defined metadata returned alongside the payload.
    ///
    /// No driver attaches a value yet; callers must treat `None` as normal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl UserRecord {
    /// Creates a record without metadata.
    #[must_use]
    pub fn new(account_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            payload: payload.into(),
            metadata: None,
        }
    }
}
