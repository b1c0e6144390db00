//! In-process stores. Used for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::{Document, DocumentStore, ObjectStore, StoreError, UploadedObject};

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Other(format!("mutex poisoned: {e}"))
}

/// Object store keeping uploads in memory under `mem://<path>`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    fail_suffix: Option<String>,
    drop_content_type: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every upload whose path ends with `suffix`.
    pub fn failing_on(suffix: impl Into<String>) -> Self {
        Self {
            fail_suffix: Some(suffix.into()),
            ..Self::default()
        }
    }

    /// Accept uploads but report no content type for them.
    pub fn without_content_type() -> Self {
        Self {
            drop_content_type: true,
            ..Self::default()
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().ok()?.get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedObject, StoreError> {
        if let Some(suffix) = &self.fail_suffix
            && path.ends_with(suffix.as_str())
        {
            return Err(StoreError::Server {
                status: 503,
                body: format!("upload of {path} refused"),
            });
        }
        let size = bytes.len();
        self.objects
            .lock()
            .map_err(poisoned)?
            .insert(path.to_string(), (bytes, content_type.to_string()));
        info!(path, size, "stored object in memory");
        Ok(UploadedObject {
            reference: format!("mem://{path}"),
            content_type: (!self.drop_content_type).then(|| content_type.to_string()),
        })
    }
}

/// One document held by [`MemoryDocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub collection: String,
    pub id: String,
    pub document: Document,
}

/// Document store appending to an in-memory list.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<Vec<StoredDocument>>,
    next_id: AtomicU64,
    fail: bool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn documents(&self) -> Vec<StoredDocument> {
        self.documents
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<String, StoreError> {
        if self.fail {
            return Err(StoreError::Server {
                status: 500,
                body: "write refused".into(),
            });
        }
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.documents.lock().map_err(poisoned)?.push(StoredDocument {
            collection: collection.to_string(),
            id: id.clone(),
            document,
        });
        info!(collection, id = %id, "stored document in memory");
        Ok(id)
    }
}
