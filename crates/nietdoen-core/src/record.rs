//! Extraction results, the editable draft, and the persisted sign snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::review::{self, ValidationErrors};
use crate::schema::{FieldSpec, Language, NOT_APPLICABLE, SchemaRegistry, ValueKind};

/// A single field value: one string or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Single,
            Self::List(_) => ValueKind::List,
        }
    }

    /// Blank text or a list without entries.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Text(_) => None,
            Self::List(items) => Some(items),
        }
    }
}

/// Schema-checked values parsed from the model's response.
///
/// Keys are always a subset of the schema's field names; fields the model
/// left out are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    values: BTreeMap<String, FieldValue>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One reading from the geolocation source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReading {
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

/// Object-storage references for the reduced and the original image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRefs {
    pub sm: String,
    pub lg: String,
}

/// The record being reviewed for the currently selected image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftRecord {
    language: Language,
    values: BTreeMap<String, FieldValue>,
    coordinates: Option<GeoPoint>,
    storage: Option<StorageRefs>,
}

impl DraftRecord {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    /// Seed a draft from a successful analysis.
    ///
    /// `storage` and `coordinates` are frozen here; later readings never
    /// replace a latched coordinate.
    pub fn from_extraction(
        language: Language,
        result: ExtractionResult,
        storage: StorageRefs,
        coordinates: Option<GeoPoint>,
    ) -> Self {
        Self {
            language,
            values: result.values,
            coordinates,
            storage: Some(storage),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    /// Unchecked write; the review form checks the value against the schema.
    pub(crate) fn set_value(&mut self, field: &str, value: FieldValue) {
        self.values.insert(field.to_string(), value);
    }

    pub(crate) fn clear_value(&mut self, field: &str) {
        self.values.remove(field);
    }

    pub fn coordinates(&self) -> Option<GeoPoint> {
        self.coordinates
    }

    /// Latch a coordinate if none was available at analysis time.
    ///
    /// Returns `true` if the reading was taken.
    pub fn latch_coordinates(&mut self, point: GeoPoint) -> bool {
        if self.coordinates.is_some() {
            return false;
        }
        self.coordinates = Some(point);
        true
    }

    pub fn storage(&self) -> Option<&StorageRefs> {
        self.storage.as_ref()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("record is not valid: {0}")]
    Invalid(ValidationErrors),
    #[error("image upload has not completed")]
    MissingStorage,
}

/// The write-time snapshot of a reviewed draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedSign {
    pub language: Language,
    /// One entry per schema field; `None` is written as null.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Option<FieldValue>>,
    pub storage_urls: StorageRefs,
    pub created_at: DateTime<Utc>,
    pub coordinates: Option<GeoPoint>,
}

impl PersistedSign {
    /// Validate `draft` and freeze it into a persistable record.
    pub fn snapshot(
        schema: &SchemaRegistry,
        draft: &DraftRecord,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        review::validate(schema, draft).map_err(SnapshotError::Invalid)?;
        let storage_urls = draft.storage.clone().ok_or(SnapshotError::MissingStorage)?;

        let attributes = schema
            .fields()
            .iter()
            .map(|spec| {
                let value = normalize_value(spec, draft.value(spec.name).cloned());
                (spec.name.to_string(), value)
            })
            .collect();

        Ok(Self {
            language: draft.language,
            attributes,
            storage_urls,
            created_at,
            coordinates: draft.coordinates,
        })
    }
}

/// Map the `"n/a"` sentinel to absent. Idempotent.
pub fn normalize_sentinel(value: Option<String>) -> Option<String> {
    value.filter(|v| v != NOT_APPLICABLE)
}

/// Write-time normalization of one field value.
///
/// Sentinel fields lose `"n/a"`; blank optional text becomes absent. List
/// values are written as-is.
pub fn normalize_value(spec: &FieldSpec, value: Option<FieldValue>) -> Option<FieldValue> {
    match value {
        Some(FieldValue::Text(text)) => {
            let text = if spec.nullable_sentinel {
                normalize_sentinel(Some(text))?
            } else {
                text
            };
            if text.trim().is_empty() && !spec.is_required() {
                None
            } else {
                Some(FieldValue::Text(text))
            }
        }
        Some(list @ FieldValue::List(_)) => Some(list),
        None if spec.kind == ValueKind::List => Some(FieldValue::List(Vec::new())),
        None => None,
    }
}
