//! Storage layer: object storage for images, document store for sign records.

mod document;
mod error;
mod memory;

#[cfg(feature = "firebase")]
pub mod firebase;

pub use document::{DocValue, Document, sign_document};
pub use error::StoreError;
pub use memory::{MemoryDocumentStore, MemoryObjectStore, StoredDocument};

use async_trait::async_trait;

/// Result of one upload: an addressable reference and the content type the
/// store recorded for the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub reference: String,
    pub content_type: Option<String>,
}

/// Binary object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedObject, StoreError>;
}

/// Append-only document store. Every call creates a new document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the id of the new document.
    async fn add_document(&self, collection: &str, document: Document)
    -> Result<String, StoreError>;
}
