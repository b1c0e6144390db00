//! Instruction payload for the extraction model, built from the schema.

use nietdoen_core::{Language, SchemaRegistry, ValueKind};
use serde_json::{Value, json};

/// Task description sent ahead of the per-field instructions.
///
/// `{language}` and `{keys}` are substituted when the payload is built.
pub const DEFAULT_CONTEXT: &str = "This is a picture of a sign written in {language} that forbids bicycles from being parked here. Following the instructions in each of the response fields, please provide the requested information. The response should be an object with the following keys: {keys}.";

/// Reference to an uploaded image, passed to the model by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub uri: String,
    pub mime_type: String,
}

/// One analysis request. Built fresh per analysis and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub language: Language,
    pub image: ImageRef,
    /// Serialized instruction payload.
    pub payload: String,
    /// Field names the model was asked to return.
    pub fields: Vec<&'static str>,
}

pub struct PromptBuilder<'a> {
    schema: &'a SchemaRegistry,
    context: String,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(schema: &'a SchemaRegistry) -> Self {
        Self {
            schema,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }

    /// Replace the context template.
    pub fn with_context(mut self, template: impl Into<String>) -> Self {
        self.context = template.into();
        self
    }

    fn context(&self, language: Language) -> String {
        self.context
            .replace("{language}", language.as_str())
            .replace("{keys}", &self.schema.field_names().join(","))
    }

    /// The serialized instruction payload. Identical inputs give identical bytes.
    pub fn payload(&self, language: Language) -> String {
        let response_fields: Vec<Value> = self
            .schema
            .fields()
            .iter()
            .map(|spec| {
                let mut field = json!({
                    "field": spec.name,
                    "instructions": spec.instructions,
                    "response_type": match spec.kind {
                        ValueKind::Single => "string",
                        ValueKind::List => "array",
                    },
                });
                if let Some(options) = spec.options {
                    field["options"] = json!(options);
                }
                field
            })
            .collect();

        json!({
            "context": self.context(language),
            "response_fields": response_fields,
        })
        .to_string()
    }

    pub fn request(&self, language: Language, image: ImageRef) -> ExtractionRequest {
        ExtractionRequest {
            language,
            image,
            payload: self.payload(language),
            fields: self.schema.field_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use nietdoen_core::sign_schema;

    fn image() -> ImageRef {
        ImageRef {
            uri: "gs://nietdoen.appspot.com/images/1_lg".into(),
            mime_type: "image/jpeg".into(),
        }
    }

    #[test]
    fn payload_is_deterministic() {
        let schema = sign_schema().unwrap();
        let a = PromptBuilder::new(&schema).payload(Language::Dutch);
        let b = PromptBuilder::new(&schema).payload(Language::Dutch);
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a, PromptBuilder::new(&schema).payload(Language::English));
    }

    #[test]
    fn payload_fields_match_schema() {
        let schema = sign_schema().unwrap();
        let payload: Value =
            serde_json::from_str(&PromptBuilder::new(&schema).payload(Language::Dutch)).unwrap();
        let names: BTreeSet<&str> = payload["response_fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        let expected: BTreeSet<&str> = schema.field_names().into_iter().collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn context_names_language_and_keys() {
        let schema = sign_schema().unwrap();
        let payload: Value =
            serde_json::from_str(&PromptBuilder::new(&schema).payload(Language::English)).unwrap();
        let context = payload["context"].as_str().unwrap();
        assert!(context.contains("written in english"));
        assert!(context.ends_with(
            "keys: design,casing,tone,shape,colors,text,symbols,condition,location,sentiment,material."
        ));
    }

    #[test]
    fn field_shapes_and_options() {
        let schema = sign_schema().unwrap();
        let payload: Value =
            serde_json::from_str(&PromptBuilder::new(&schema).payload(Language::Dutch)).unwrap();
        let fields = payload["response_fields"].as_array().unwrap();

        let colors = fields.iter().find(|f| f["field"] == "colors").unwrap();
        assert_eq!(colors["response_type"], "array");
        assert_eq!(colors["options"][2], "red");

        let text = fields.iter().find(|f| f["field"] == "text").unwrap();
        assert_eq!(text["response_type"], "string");
        assert!(text.get("options").is_none());
    }

    #[test]
    fn custom_context_template() {
        let schema = sign_schema().unwrap();
        let builder = PromptBuilder::new(&schema).with_context("Sign in {language}.");
        let payload: Value = serde_json::from_str(&builder.payload(Language::Dutch)).unwrap();
        assert_eq!(payload["context"], "Sign in dutch.");
    }

    #[test]
    fn request_references_image_by_address() {
        let schema = sign_schema().unwrap();
        let builder = PromptBuilder::new(&schema);
        let request = builder.request(Language::Dutch, image());
        assert_eq!(request.image, image());
        assert_eq!(request.payload, builder.payload(Language::Dutch));
        assert_eq!(request.fields, schema.field_names());
        assert!(!request.payload.contains("gs://"));
    }
}
