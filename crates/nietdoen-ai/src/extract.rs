//! Extraction service seam and schema-checked parsing of model output.

use async_trait::async_trait;
use nietdoen_core::{ExtractionResult, FieldValue, SchemaRegistry, ValueKind};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::prompt::ExtractionRequest;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[cfg(feature = "vertex")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("request blocked by the model: {0}")]
    Blocked(String),

    #[error("{0}")]
    Other(String),
}

/// A hosted multimodal model that turns an instruction payload plus an image
/// reference into raw text.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ExtractionError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("response contains unknown field: {0}")]
    UnknownField(String),

    #[error("field {field} should be {expected}")]
    WrongShape {
        field: String,
        expected: &'static str,
    },
}

/// Parse the model's raw text into an [`ExtractionResult`].
///
/// Keys must be schema fields and values must have the field's shape.
/// `null` is treated as absent.
pub fn parse_response(schema: &SchemaRegistry, raw: &str) -> Result<ExtractionResult, ParseError> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ParseError::NotAnObject);
    };

    let mut result = ExtractionResult::new();
    for (key, value) in map {
        let spec = schema
            .field(&key)
            .ok_or_else(|| ParseError::UnknownField(key.clone()))?;
        let parsed = match (spec.kind, value) {
            (_, Value::Null) => continue,
            (ValueKind::Single, Value::String(s)) => FieldValue::Text(s),
            (ValueKind::List, Value::Array(items)) => FieldValue::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        _ => Err(wrong_shape(&key, spec.kind)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (kind, _) => return Err(wrong_shape(&key, kind)),
        };
        result.insert(key, parsed);
    }

    debug!(fields = result.len(), "parsed model response");
    Ok(result)
}

fn wrong_shape(field: &str, kind: ValueKind) -> ParseError {
    ParseError::WrongShape {
        field: field.to_string(),
        expected: match kind {
            ValueKind::Single => "a string",
            ValueKind::List => "an array of strings",
        },
    }
}
