use std::sync::Arc;

use async_trait::async_trait;
use nietdoen_core::{AccessContext, FirebaseConfig};
use serde::Deserialize;
use tracing::info;

use super::{check_status, with_app_check};
use crate::{ObjectStore, StoreError, UploadedObject};

const BASE_URL: &str = "https://firebasestorage.googleapis.com/v0/b";

/// Uploads to the project's default Cloud Storage bucket.
pub struct FirebaseStorage {
    client: reqwest::Client,
    bucket: String,
    access: Arc<AccessContext>,
}

#[derive(Deserialize)]
struct ObjectMetadata {
    name: String,
    bucket: String,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
}

impl ObjectMetadata {
    /// `gs://` address of the object, usable as a model file URI.
    fn reference(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }
}

impl FirebaseStorage {
    pub fn new(config: &FirebaseConfig, access: Arc<AccessContext>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bucket: config.storage_bucket.clone(),
            access,
        }
    }

    fn upload_url(&self) -> String {
        format!("{BASE_URL}/{}/o", self.bucket)
    }
}

#[async_trait]
impl ObjectStore for FirebaseStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedObject, StoreError> {
        let size = bytes.len();
        info!(bucket = %self.bucket, path, size, "uploading image");

        let mut builder = self
            .client
            .post(self.upload_url())
            .query(&[("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = self.access.id_token() {
            builder = builder.header(reqwest::header::AUTHORIZATION, format!("Firebase {token}"));
        }
        let resp = check_status(with_app_check(builder, &self.access).send().await?).await?;

        let meta: ObjectMetadata = resp.json().await?;
        let uploaded = UploadedObject {
            reference: meta.reference(),
            content_type: meta.content_type,
        };
        info!(reference = %uploaded.reference, "upload complete");
        Ok(uploaded)
    }
}
