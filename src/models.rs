// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entry Data Models
//!
//! An entry is a schemaless JSON document owned by one user. The server only
//! interprets four fields; everything else is passed through verbatim.
//!
//! | Field       | Meaning                                              |
//! |-------------|------------------------------------------------------|
//! | `id`        | Client-assigned key, unique per owner                |
//! | `uid`       | Owner, always taken from the verified identity       |
//! | `_id`       | Storage id, assigned by the store, never by a client |
//! | `timestamp` | Sort key for listing (newest first)                  |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Wire name of the client-assigned entry id.
pub const CLIENT_ID_FIELD: &str = "id";
/// Wire name of the owner field.
pub const OWNER_FIELD: &str = "uid";
/// Wire name of the store-assigned id.
pub const STORAGE_ID_FIELD: &str = "_id";
/// Wire name of the ordering field.
pub const TIMESTAMP_FIELD: &str = "timestamp";

// =============================================================================
// Stored Entry
// =============================================================================

/// An entry as persisted and returned by `GET /entries`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Entry {
    /// Store-assigned identifier, stable across replaces.
    #[serde(rename = "_id")]
    pub storage_id: String,
    /// Client-assigned identifier.
    #[serde(rename = "id")]
    pub client_id: String,
    /// Owning user id.
    #[serde(rename = "uid")]
    pub owner: String,
    /// Client payload (including `timestamp`), stored verbatim.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

impl Entry {
    /// The ordering value, if the client supplied one.
    pub fn timestamp(&self) -> Option<&Value> {
        self.fields.get(TIMESTAMP_FIELD)
    }
}

// =============================================================================
// Upsert Draft
// =============================================================================

/// Validation failures for an inbound entry payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryValidationError {
    #[error("Entry payload must be a JSON object")]
    NotAnObject,

    #[error("Entry id required")]
    MissingClientId,

    #[error("Entry id must be a string")]
    InvalidClientId,
}

/// A validated upsert: owner forced, storage id stripped, client id present.
///
/// Only the store turns a draft into an [`Entry`], because only the store
/// knows the storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub owner: String,
    pub client_id: String,
    pub fields: Map<String, Value>,
}

impl EntryDraft {
    /// Validate a client payload on behalf of `owner`.
    ///
    /// Any `_id` or `uid` in the payload is discarded.
    pub fn from_payload(owner: &str, payload: Value) -> Result<Self, EntryValidationError> {
        let Value::Object(mut fields) = payload else {
            return Err(EntryValidationError::NotAnObject);
        };

        fields.remove(STORAGE_ID_FIELD);
        fields.remove(OWNER_FIELD);

        let client_id = match fields.remove(CLIENT_ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id,
            None | Some(Value::Null) | Some(Value::String(_)) => {
                return Err(EntryValidationError::MissingClientId)
            }
            Some(_) => return Err(EntryValidationError::InvalidClientId),
        };

        Ok(Self {
            owner: owner.to_string(),
            client_id,
            fields,
        })
    }

    /// The ordering value carried by this draft.
    pub fn timestamp(&self) -> Option<&Value> {
        self.fields.get(TIMESTAMP_FIELD)
    }

    /// Materialize the draft under the given storage id.
    pub fn into_entry(self, storage_id: String) -> Entry {
        Entry {
            storage_id,
            client_id: self.client_id,
            owner: self.owner,
            fields: self.fields,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Acknowledgement returned by write operations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft_forces_owner_and_strips_storage_id() {
        let payload = json!({
            "id": "e1",
            "uid": "someone-else",
            "_id": "forged",
            "text": "hello"
        });

        let draft = EntryDraft::from_payload("user-a", payload).unwrap();
        assert_eq!(draft.owner, "user-a");
        assert_eq!(draft.client_id, "e1");
        assert!(!draft.fields.contains_key("_id"));
        assert!(!draft.fields.contains_key("uid"));
        assert_eq!(draft.fields["text"], "hello");
    }

    #[test]
    fn draft_requires_client_id() {
        for payload in [json!({"text": "x"}), json!({"id": ""}), json!({"id": null})] {
            assert_eq!(
                EntryDraft::from_payload("user-a", payload),
                Err(EntryValidationError::MissingClientId)
            );
        }
    }

    #[test]
    fn draft_rejects_non_string_client_id() {
        let result = EntryDraft::from_payload("user-a", json!({"id": 42}));
        assert_eq!(result, Err(EntryValidationError::InvalidClientId));
    }

    #[test]
    fn draft_rejects_non_object_payload() {
        let result = EntryDraft::from_payload("user-a", json!(["id", "e1"]));
        assert_eq!(result, Err(EntryValidationError::NotAnObject));
    }

    #[test]
    fn entry_serializes_flat_document() {
        let entry = EntryDraft::from_payload(
            "user-a",
            json!({"id": "e1", "text": "hello", "timestamp": 5}),
        )
        .unwrap()
        .into_entry("sid-1".to_string());

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"_id": "sid-1", "id": "e1", "uid": "user-a", "text": "hello", "timestamp": 5})
        );

        let back: Entry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.timestamp(), Some(&json!(5)));
    }
}
