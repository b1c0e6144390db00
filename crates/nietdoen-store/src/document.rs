//! Store-neutral document values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use nietdoen_core::{FieldValue, GeoPoint, PersistedSign};

/// A typed document value. Mirrors what document databases can hold natively.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    String(String),
    Timestamp(DateTime<Utc>),
    GeoPoint(GeoPoint),
    Array(Vec<DocValue>),
    Map(BTreeMap<String, DocValue>),
}

pub type Document = BTreeMap<String, DocValue>;

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Option<&FieldValue>> for DocValue {
    fn from(value: Option<&FieldValue>) -> Self {
        match value {
            None => Self::Null,
            Some(FieldValue::Text(s)) => Self::String(s.clone()),
            Some(FieldValue::List(items)) => {
                Self::Array(items.iter().map(|s| Self::from(s.as_str())).collect())
            }
        }
    }
}

/// Lay out a persisted sign as a document.
///
/// Attributes sit at the top level next to `language`, `storage_urls`,
/// `created_at` and `coordinates`.
pub fn sign_document(sign: &PersistedSign) -> Document {
    let mut doc = Document::new();
    doc.insert("language".into(), sign.language.as_str().into());
    for (name, value) in &sign.attributes {
        doc.insert(name.clone(), DocValue::from(value.as_ref()));
    }
    doc.insert(
        "storage_urls".into(),
        DocValue::Map(BTreeMap::from([
            ("sm".to_string(), sign.storage_urls.sm.as_str().into()),
            ("lg".to_string(), sign.storage_urls.lg.as_str().into()),
        ])),
    );
    doc.insert("created_at".into(), DocValue::Timestamp(sign.created_at));
    doc.insert(
        "coordinates".into(),
        sign.coordinates.map_or(DocValue::Null, DocValue::GeoPoint),
    );
    doc
}
