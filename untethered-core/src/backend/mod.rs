//! Backend collaborator interface.
//!
//! Everything the application persists goes through these traits: a
//! key→document store, an identity provider with session notifications,
//! and a blob store for uploaded files. Two implementations ship with the
//! crate: [`LocalBackend`] (files under a data directory) and
//! [`MemoryBackend`] (process memory, used by tests).

mod identity;
mod local;
mod memory;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{UntetheredError, UntetheredResult, ValidationError};

pub use identity::{IdentityProvider, Persistence, Profile, Session, SessionSubscription};
pub use local::LocalBackend;
pub use memory::MemoryBackend;

/// A stored document: a JSON object of named fields.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Key→document storage, grouped by collection.
///
/// Only per-document atomicity is assumed. There are no transactions, so a
/// read followed by a write can race with another writer.
pub trait DocumentStore: Send + Sync {
    fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = UntetheredResult<Option<Document>>> + Send;

    /// Replace the whole document, creating it if needed.
    fn set(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> impl Future<Output = UntetheredResult<()>> + Send;

    /// Overwrite the given top-level fields, keeping the others.
    /// Fails with `NotFound` when the document does not exist.
    fn update(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> impl Future<Output = UntetheredResult<()>> + Send;

    /// Every document in the collection with its key. No ordering guarantee.
    fn scan(
        &self,
        collection: &str,
    ) -> impl Future<Output = UntetheredResult<Vec<(String, Document)>>> + Send;

    /// Deleting a missing document is not an error.
    fn delete(&self, collection: &str, key: &str)
    -> impl Future<Output = UntetheredResult<()>> + Send;
}

/// Reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub path: String,
}

pub trait BlobStore: Send + Sync {
    fn upload_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = UntetheredResult<BlobRef>> + Send;

    fn blob_url(&self, blob: &BlobRef) -> impl Future<Output = UntetheredResult<String>> + Send;

    fn delete_blob(&self, blob: &BlobRef) -> impl Future<Output = UntetheredResult<()>> + Send;
}

/// A complete backend collaborator.
pub trait Backend: DocumentStore + IdentityProvider + BlobStore {}

impl<T: DocumentStore + IdentityProvider + BlobStore> Backend for T {}

/// Serialize a value into a document. The value must serialize to a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> UntetheredResult<Document> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(UntetheredError::BackendUnavailable(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> UntetheredResult<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(document))?)
}

/// Keys become file names in the local backend, so they may not contain
/// path separators or start with a dot.
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    let invalid = key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0']);

    if invalid {
        Err(ValidationError::InvalidDocumentKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Blob paths are '/'-separated keys.
pub(crate) fn validate_blob_path(path: &str) -> Result<(), ValidationError> {
    if path.split('/').all(|segment| validate_key(segment).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDocumentKey(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("u1_03_2025").is_ok());
        assert!(validate_key("9b2f6f0e-aaaa-bbbb-cccc-000000000000").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
    }

    #[test]
    fn test_validate_blob_path() {
        assert!(validate_blob_path("resources/1700000000000_notes.pdf").is_ok());
        assert!(validate_blob_path("resources/../secret").is_err());
        assert!(validate_blob_path("resources//x").is_err());
    }

    #[test]
    fn test_to_document_requires_object() {
        assert!(to_document(&"just a string").is_err());

        let doc = to_document(&serde_json::json!({ "a": 1 })).unwrap();
        assert_eq!(doc.get("a"), Some(&serde_json::json!(1)));
    }
}
