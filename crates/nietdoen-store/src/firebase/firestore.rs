use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use nietdoen_core::{AccessContext, FirebaseConfig};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use super::{check_status, with_app_check};
use crate::{DocValue, Document, DocumentStore, StoreError};

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Cloud Firestore `createDocument` client for the project's default database.
pub struct Firestore {
    client: reqwest::Client,
    documents_url: String,
    api_key: String,
    access: Arc<AccessContext>,
}

#[derive(Deserialize)]
struct CreatedDocument {
    name: String,
}

impl Firestore {
    pub fn new(config: &FirebaseConfig, access: Arc<AccessContext>) -> Self {
        Self {
            client: reqwest::Client::new(),
            documents_url: format!(
                "{BASE_URL}/projects/{}/databases/(default)/documents",
                config.project_id
            ),
            api_key: config.api_key.clone(),
            access,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.documents_url)
    }
}

/// Firestore's typed JSON encoding of one value.
fn encode_value(value: &DocValue) -> Value {
    match value {
        DocValue::Null => json!({ "nullValue": null }),
        DocValue::String(s) => json!({ "stringValue": s }),
        DocValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Secs, true) })
        }
        DocValue::GeoPoint(p) => json!({
            "geoPointValue": { "latitude": p.latitude, "longitude": p.longitude }
        }),
        DocValue::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        DocValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn encode_fields(fields: &Document) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Last path segment of a document resource name.
fn document_id(name: &str) -> Result<String, StoreError> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::UnexpectedResponse(format!("document name: {name}")))
}

#[async_trait]
impl DocumentStore for Firestore {
    async fn add_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<String, StoreError> {
        let body = json!({ "fields": encode_fields(&document) });
        let mut builder = self
            .client
            .post(self.collection_url(collection))
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        if let Some(token) = self.access.id_token() {
            builder = builder.bearer_auth(token);
        }
        let resp = check_status(with_app_check(builder, &self.access).send().await?).await?;

        let created: CreatedDocument = resp.json().await?;
        let id = document_id(&created.name)?;
        info!(collection, id = %id, "document created");
        Ok(id)
    }
}
