//! Schema registry: the fields the model is asked to extract from a sign photo.
//!
//! The registry is the single source for three consumers: the prompt builder
//! (which keys to return, which options to pick from), the review form (which
//! controls to render, which fields are required) and the record writer
//! (which values get the `"n/a"` sentinel treatment).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved value meaning "not applicable". Normalized to null at write time.
pub const NOT_APPLICABLE: &str = "n/a";

/// Pseudo-field names used for validation errors on the latched coordinate.
pub const COORDINATE_FIELDS: [&str; 2] = ["latitude", "longitude"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate field name: {0}")]
    DuplicateField(String),
    #[error("field name is reserved for coordinates: {0}")]
    ReservedName(String),
    #[error("select field has no options: {0}")]
    MissingOptions(String),
    #[error("schema has no fields")]
    Empty,
}

/// Shape of the value the model returns for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Single,
    List,
}

/// How the review form presents a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Exactly one of the allowed values.
    Select,
    /// Allowed values are suggestions; free text is accepted.
    Autocomplete,
    /// Free list of tags.
    Tags,
    /// Multi-line free text.
    TextArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Optional,
    /// Must be non-empty before the record can be saved.
    Required { message: &'static str },
}

/// One extractable attribute of a sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ValueKind,
    pub control: Control,
    pub options: Option<&'static [&'static str]>,
    pub instructions: &'static str,
    pub requirement: Requirement,
    /// Whether `"n/a"` is written as null.
    pub nullable_sentinel: bool,
}

impl FieldSpec {
    /// A single-valued field rendered as a select.
    pub const fn single(name: &'static str, label: &'static str, instructions: &'static str) -> Self {
        Self {
            name,
            label,
            kind: ValueKind::Single,
            control: Control::Select,
            options: None,
            instructions,
            requirement: Requirement::Optional,
            nullable_sentinel: false,
        }
    }

    /// A list-valued field rendered as a tag input.
    pub const fn list(name: &'static str, label: &'static str, instructions: &'static str) -> Self {
        Self {
            name,
            label,
            kind: ValueKind::List,
            control: Control::Tags,
            options: None,
            instructions,
            requirement: Requirement::Optional,
            nullable_sentinel: false,
        }
    }

    pub const fn options(mut self, options: &'static [&'static str]) -> Self {
        self.options = Some(options);
        self
    }

    pub const fn control(mut self, control: Control) -> Self {
        self.control = control;
        self
    }

    pub const fn required(mut self, message: &'static str) -> Self {
        self.requirement = Requirement::Required { message };
        self
    }

    pub const fn nullable_sentinel(mut self) -> Self {
        self.nullable_sentinel = true;
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.requirement, Requirement::Required { .. })
    }

    /// Whether `value` is one of the allowed options (always true for free text).
    pub fn allows(&self, value: &str) -> bool {
        match self.options {
            Some(options) => options.contains(&value),
            None => true,
        }
    }
}

/// Source language of the sign text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Dutch,
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Dutch, Language::English];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dutch => "dutch",
            Self::English => "english",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dutch" | "nl" => Ok(Self::Dutch),
            "english" | "en" => Ok(Self::English),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Ordered, validated set of [`FieldSpec`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    fields: Vec<FieldSpec>,
    tracks_coordinates: bool,
}

impl SchemaRegistry {
    /// Validate and build a registry. Field order is preserved.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if COORDINATE_FIELDS.contains(&field.name) {
                return Err(SchemaError::ReservedName(field.name.to_string()));
            }
            if !seen.insert(field.name) {
                return Err(SchemaError::DuplicateField(field.name.to_string()));
            }
            if field.control == Control::Select && field.options.is_none_or(|o| o.is_empty()) {
                return Err(SchemaError::MissingOptions(field.name.to_string()));
            }
        }
        Ok(Self {
            fields,
            tracks_coordinates: false,
        })
    }

    /// Variant that requires a resolved coordinate before saving.
    pub fn with_coordinates(mut self, track: bool) -> Self {
        self.tracks_coordinates = track;
        self
    }

    pub fn tracks_coordinates(&self) -> bool {
        self.tracks_coordinates
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Keys the model is instructed to return, in schema order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn allowed_values(&self, name: &str) -> Option<&'static [&'static str]> {
        self.field(name).and_then(|f| f.options)
    }
}

// ── Canonical sign schema ──

pub mod options {
    pub const DESIGN: &[&str] = &["text", "symbol", "both"];
    pub const COLORS: &[&str] = &[
        "white", "black", "red", "green", "blue", "yellow", "orange", "purple", "brown",
    ];
    pub const CASING: &[&str] = &["sentence", "title", "upper", "lower", "other", "n/a"];
    pub const CONDITION: &[&str] = &["new", "good", "fair", "poor"];
    pub const LOCATION: &[&str] = &["window", "fence", "wall", "door", "ground", "other"];
    pub const SENTIMENT: &[&str] = &["positive", "negative", "neutral"];
    pub const MATERIAL: &[&str] = &[
        "metal", "plastic", "wood", "paper", "sticker", "concrete", "other",
    ];
    pub const TONE: &[&str] = &["formal", "informal", "neutral", "n/a"];
    pub const SHAPE: &[&str] = &["rectangular", "circular", "triangular", "other"];
    pub const SYMBOLS: &[&str] = &[
        "bicycle",
        "moped",
        "lock",
        "tow truck",
        "parking symbol",
        "red circle and backslash",
        "red backslash only",
        "red circle only",
        "other",
    ];
}

/// The "do not park your bicycle here" sign schema, with coordinate tracking on.
pub fn sign_schema() -> Result<SchemaRegistry, SchemaError> {
    let fields = vec![
        FieldSpec::single(
            "design",
            "Design",
            "Is the \"do not park\" sign in the image expressed as text only or as a symbol only or as both?",
        )
        .options(options::DESIGN)
        .required("Please select a design"),
        FieldSpec::single(
            "casing",
            "Casing",
            "What is the casing of the sign text? Select one from the options below. Return \"n/a\" if not applicable because the image is a symbol only.",
        )
        .options(options::CASING)
        .nullable_sentinel(),
        FieldSpec::single(
            "tone",
            "Tone",
            "What is the tone of the sign text? Select one from the option below. Return \"n/a\" if not applicable (eg if the sign is a symbol only).",
        )
        .options(options::TONE)
        .nullable_sentinel(),
        FieldSpec::single(
            "shape",
            "Shape",
            "What is the shape of the sign? Leave blank if not applicable.",
        )
        .options(options::SHAPE)
        .control(Control::Autocomplete)
        .required("Please select a shape"),
        FieldSpec::list(
            "colors",
            "Colors",
            "Select all colors that are visible on the sign itself. Only select the colors from the options below.",
        )
        .options(options::COLORS)
        .required("Please select at least one color"),
        FieldSpec::single(
            "text",
            "Text",
            "What does the text on the sign literally say? Please provide the text as a string. Include any line breaks. If the sign is a symbol, return \"n/a\".",
        )
        .control(Control::TextArea)
        .nullable_sentinel(),
        FieldSpec::list(
            "symbols",
            "Symbols",
            "What symbols, if any, are present on the sign? If none, return an empty array. Only select from the options below.",
        )
        .options(options::SYMBOLS)
        .required("Please select at least one symbol"),
        FieldSpec::single(
            "condition",
            "Condition",
            "What is the condition of the sign? Only select the condition from the options below.",
        )
        .options(options::CONDITION)
        .required("Please select a condition"),
        FieldSpec::single(
            "location",
            "Location",
            "Where is the sign located? Only select the location from the options below.",
        )
        .options(options::LOCATION)
        .control(Control::Autocomplete)
        .required("Please select a location"),
        FieldSpec::single(
            "sentiment",
            "Sentiment",
            "What is the sentiment of the sign? Only select the sentiment from the options below. To be negative, the sign must be threatening something negative, like a fine or a tow. To be positive, the sign must use kind words or encouraging symbols. If the sign is neutral, it is neither positive nor negative.",
        )
        .options(options::SENTIMENT)
        .required("Please select a sentiment"),
        FieldSpec::single(
            "material",
            "Material",
            "What is the primary material of the sign? Only select the material from the options below.",
        )
        .options(options::MATERIAL)
        .control(Control::Autocomplete)
        .required("Please select a material"),
    ];
    Ok(SchemaRegistry::new(fields)?.with_coordinates(true))
}
