//! Gemini over Vertex AI for Firebase.

use std::sync::Arc;

use async_trait::async_trait;
use nietdoen_core::{AccessContext, FirebaseConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::extract::{ExtractionError, ExtractionService};
use crate::prompt::ExtractionRequest;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LOCATION: &str = "us-central1";

const BASE_URL: &str = "https://firebasevertexai.googleapis.com/v1beta";

/// `generateContent` client for a Gemini model.
pub struct VertexClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    access: Arc<AccessContext>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl VertexClient {
    pub fn new(
        config: &FirebaseConfig,
        location: &str,
        model: &str,
        access: Arc<AccessContext>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{BASE_URL}/projects/{}/locations/{location}/publishers/google/models/{model}:generateContent",
                config.project_id
            ),
            api_key: config.api_key.clone(),
            access,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Request body: the instruction payload followed by the image as file data.
fn request_body(request: &ExtractionRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": request.payload },
                { "fileData": {
                    "mimeType": request.image.mime_type,
                    "fileUri": request.image.uri,
                } },
            ],
        }],
        "generationConfig": { "responseMimeType": "application/json" },
    })
}

/// Concatenated text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String, ExtractionError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(ExtractionError::Blocked(reason)),
            None => Err(ExtractionError::EmptyResponse),
        };
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl ExtractionService for VertexClient {
    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ExtractionError> {
        info!(image = %request.image.uri, language = %request.language, "invoking extraction model");
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request));
        if let Some(token) = self.access.app_check() {
            builder = builder.header("X-Firebase-AppCheck", token);
        }
        if let Some(token) = self.access.id_token() {
            builder = builder.header("Authorization", format!("Firebase {token}"));
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "extraction model returned an error");
            return Err(ExtractionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = response_text(parsed)?;
        info!(bytes = text.len(), "extraction model responded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ImageRef;
    use nietdoen_core::Language;

    fn request() -> ExtractionRequest {
        ExtractionRequest {
            language: Language::Dutch,
            image: ImageRef {
                uri: "gs://nietdoen.appspot.com/images/42_lg".into(),
                mime_type: "image/jpeg".into(),
            },
            payload: "{\"context\":\"...\"}".into(),
            fields: vec!["colors"],
        }
    }

    #[test]
    fn endpoint_names_project_location_and_model() {
        let config = FirebaseConfig {
            project_id: "nietdoen".into(),
            ..Default::default()
        };
        let client = VertexClient::new(
            &config,
            DEFAULT_LOCATION,
            DEFAULT_MODEL,
            Arc::new(AccessContext::new()),
        );
        assert_eq!(
            client.endpoint(),
            "https://firebasevertexai.googleapis.com/v1beta/projects/nietdoen/locations/us-central1/publishers/google/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn body_carries_payload_then_file_reference() {
        let body = request_body(&request());
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "{\"context\":\"...\"}");
        assert_eq!(parts[1]["fileData"]["mimeType"], "image/jpeg");
        assert_eq!(
            parts[1]["fileData"]["fileUri"],
            "gs://nietdoen.appspot.com/images/42_lg"
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn text_parts_are_concatenated() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"colors\":"},{"text":"[\"red\"]}"}]},"finishReason":"STOP"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response_text(parsed).unwrap(), r#"{"colors":["red"]}"#);
    }

    #[test]
    fn blocked_prompt_reported() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            response_text(parsed),
            Err(ExtractionError::Blocked(reason)) if reason == "SAFETY"
        ));
    }

    #[test]
    fn empty_candidate_reported() {
        let json = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            response_text(parsed),
            Err(ExtractionError::EmptyResponse)
        ));
    }
}
