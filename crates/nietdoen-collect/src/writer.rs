//! Record writer: one reviewed draft becomes one new document.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use nietdoen_core::{DraftRecord, PersistedSign, SchemaRegistry};
use nietdoen_store::{DocumentStore, sign_document};
use tracing::info;

use crate::error::SaveError;

/// A sign that reached the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenSign {
    pub id: String,
    pub sign: PersistedSign,
}

pub struct RecordWriter {
    documents: Arc<dyn DocumentStore>,
    collection: String,
}

impl RecordWriter {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            documents,
            collection: collection.into(),
        }
    }

    /// Snapshot `draft` and append it to the collection. Never updates an
    /// existing document.
    pub async fn write(
        &self,
        schema: &SchemaRegistry,
        draft: &DraftRecord,
        now: DateTime<Utc>,
    ) -> Result<WrittenSign, SaveError> {
        let sign = PersistedSign::snapshot(schema, draft, now.trunc_subsecs(0))?;
        let id = self
            .documents
            .add_document(&self.collection, sign_document(&sign))
            .await?;
        info!(collection = %self.collection, id = %id, "sign saved");
        Ok(WrittenSign { id, sign })
    }
}

#[cfg(test)]
mod tests {
    use nietdoen_core::{
        DraftRecord, ExtractionResult, FieldValue, GeoPoint, Language, StorageRefs, sign_schema,
    };
    use nietdoen_store::{DocValue, MemoryDocumentStore};

    use super::*;

    fn reviewed() -> DraftRecord {
        let mut result = ExtractionResult::new();
        for (field, value) in [
            ("design", "text"),
            ("shape", "rectangular"),
            ("condition", "good"),
            ("location", "fence"),
            ("sentiment", "negative"),
            ("material", "metal"),
            ("casing", "n/a"),
        ] {
            result.insert(field, FieldValue::Text(value.into()));
        }
        result.insert("colors", FieldValue::List(vec!["red".into()]));
        result.insert("symbols", FieldValue::List(vec!["bicycle".into()]));
        DraftRecord::from_extraction(
            Language::Dutch,
            result,
            StorageRefs {
                sm: "sm://1".into(),
                lg: "lg://1".into(),
            },
            Some(GeoPoint {
                latitude: 52.37,
                longitude: 4.89,
            }),
        )
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_720_000_000, 987_000_000).unwrap()
    }

    #[tokio::test]
    async fn writes_one_document_per_call() {
        let store = Arc::new(MemoryDocumentStore::new());
        let writer = RecordWriter::new(store.clone(), "signs");
        let schema = sign_schema().unwrap();

        let first = writer.write(&schema, &reviewed(), now()).await.unwrap();
        let second = writer.write(&schema, &reviewed(), now()).await.unwrap();
        assert_ne!(first.id, second.id);

        let docs = store.documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].collection, "signs");
        assert_eq!(docs[0].document.get("casing"), Some(&DocValue::Null));
    }

    #[tokio::test]
    async fn created_at_is_whole_seconds() {
        let store = Arc::new(MemoryDocumentStore::new());
        let writer = RecordWriter::new(store, "signs");
        let written = writer
            .write(&sign_schema().unwrap(), &reviewed(), now())
            .await
            .unwrap();
        assert_eq!(written.sign.created_at.timestamp(), 1_720_000_000);
        assert_eq!(written.sign.created_at.timestamp_subsec_nanos(), 0);
    }

    #[tokio::test]
    async fn invalid_draft_is_not_written() {
        let store = Arc::new(MemoryDocumentStore::new());
        let writer = RecordWriter::new(store.clone(), "signs");
        let err = writer
            .write(&sign_schema().unwrap(), &DraftRecord::new(Language::Dutch), now())
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::Invalid(_)));
        assert!(store.documents().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_persistence_error() {
        let writer = RecordWriter::new(Arc::new(MemoryDocumentStore::failing()), "signs");
        let err = writer
            .write(&sign_schema().unwrap(), &reviewed(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::Persistence(_)));
    }
}
