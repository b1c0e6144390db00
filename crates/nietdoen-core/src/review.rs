//! Review form: schema-driven controls, edits, and whole-record validation.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::record::{DraftRecord, FieldValue};
use crate::schema::{COORDINATE_FIELDS, Control, FieldSpec, Requirement, SchemaRegistry, ValueKind};

const COORDINATES_PENDING: &str = "Waiting for a location fix";

/// Every field-level error of one validation pass, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn push(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_string(), message.to_string());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Validate the whole draft. Never stops at the first error.
pub fn validate(schema: &SchemaRegistry, draft: &DraftRecord) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    for spec in schema.fields() {
        let Requirement::Required { message } = spec.requirement else {
            continue;
        };
        let missing = match draft.value(spec.name) {
            None => true,
            Some(value) => value.kind() != spec.kind || value.is_empty(),
        };
        if missing {
            errors.push(spec.name, message);
        }
    }

    if schema.tracks_coordinates() && draft.coordinates().is_none() {
        for field in COORDINATE_FIELDS {
            errors.push(field, COORDINATES_PENDING);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("{field} only accepts one of: {options}")]
    NotAnOption { field: String, options: String },
}

/// A single user edit against the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Raw input; list fields split on commas.
    Set { field: String, input: String },
    Clear { field: String },
}

/// Apply one edit, checking it against the field's control.
pub fn apply_edit(
    schema: &SchemaRegistry,
    draft: &mut DraftRecord,
    edit: Edit,
) -> Result<(), FormError> {
    match edit {
        Edit::Set { field, input } => {
            let spec = lookup(schema, &field)?;
            let value = parse_input(spec, &input)?;
            debug!(field = spec.name, "field edited");
            draft.set_value(spec.name, value);
        }
        Edit::Clear { field } => {
            let spec = lookup(schema, &field)?;
            debug!(field = spec.name, "field cleared");
            draft.clear_value(spec.name);
        }
    }
    Ok(())
}

fn lookup<'a>(schema: &'a SchemaRegistry, field: &str) -> Result<&'a FieldSpec, FormError> {
    schema
        .field(field)
        .ok_or_else(|| FormError::UnknownField(field.to_string()))
}

fn parse_input(spec: &FieldSpec, input: &str) -> Result<FieldValue, FormError> {
    match spec.kind {
        ValueKind::List => {
            let items = input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Ok(FieldValue::List(items))
        }
        ValueKind::Single => {
            let value = if spec.control == Control::TextArea {
                input.to_string()
            } else {
                input.trim().to_string()
            };
            if spec.control == Control::Select && !value.is_empty() && !spec.allows(&value) {
                return Err(FormError::NotAnOption {
                    field: spec.name.to_string(),
                    options: spec.options.unwrap_or_default().join(", "),
                });
            }
            Ok(FieldValue::Text(value))
        }
    }
}

/// Render state of one form control.
#[derive(Debug, Clone, PartialEq)]
pub struct FormControl<'a> {
    pub spec: &'a FieldSpec,
    pub value: Option<&'a FieldValue>,
    pub error: Option<&'a str>,
}

/// One control per schema field, in schema order, seeded from the draft.
pub fn controls<'a>(
    schema: &'a SchemaRegistry,
    draft: &'a DraftRecord,
    errors: Option<&'a ValidationErrors>,
) -> Vec<FormControl<'a>> {
    schema
        .fields()
        .iter()
        .map(|spec| FormControl {
            spec,
            value: draft.value(spec.name),
            error: errors.and_then(|e| e.get(spec.name)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ExtractionResult, GeoPoint, StorageRefs};
    use crate::schema::{Language, sign_schema};

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.into())
    }

    fn list(items: &[&str]) -> FieldValue {
        FieldValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    fn required_only() -> ExtractionResult {
        let mut result = ExtractionResult::new();
        result.insert("colors", list(&["red"]));
        result.insert("condition", text("good"));
        result.insert("location", text("fence"));
        result.insert("material", text("metal"));
        result.insert("sentiment", text("negative"));
        result.insert("shape", text("rectangular"));
        result.insert("design", text("text"));
        result.insert("symbols", list(&["bicycle"]));
        result
    }

    fn draft_from(result: ExtractionResult, coordinates: Option<GeoPoint>) -> DraftRecord {
        let refs = StorageRefs {
            sm: "sm://1".into(),
            lg: "lg://1".into(),
        };
        DraftRecord::from_extraction(Language::Dutch, result, refs, coordinates)
    }

    const HERE: Option<GeoPoint> = Some(GeoPoint {
        latitude: 52.0,
        longitude: 5.0,
    });

    #[test]
    fn all_required_fields_validate() {
        let schema = sign_schema().unwrap();
        assert_eq!(validate(&schema, &draft_from(required_only(), HERE)), Ok(()));
    }

    #[test]
    fn empty_colors_is_the_only_error() {
        let schema = sign_schema().unwrap();
        let mut result = required_only();
        result.insert("colors", list(&[]));
        let errors = validate(&schema, &draft_from(result, HERE)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("colors"), Some("Please select at least one color"));
        assert_eq!(errors.get("condition"), None);
    }

    #[test]
    fn empty_draft_reports_every_required_field() {
        let schema = sign_schema().unwrap();
        let errors = validate(&schema, &DraftRecord::new(Language::Dutch)).unwrap_err();
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(
            fields,
            vec![
                "colors",
                "condition",
                "design",
                "latitude",
                "location",
                "longitude",
                "material",
                "sentiment",
                "shape",
                "symbols"
            ]
        );
    }

    #[test]
    fn pending_coordinates_fail_only_when_tracked() {
        let tracked = sign_schema().unwrap();
        let errors = validate(&tracked, &draft_from(required_only(), None)).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["latitude", "longitude"]);

        let untracked = sign_schema().unwrap().with_coordinates(false);
        assert_eq!(validate(&untracked, &draft_from(required_only(), None)), Ok(()));
    }

    #[test]
    fn optional_fields_pass_unconditionally() {
        let schema = sign_schema().unwrap();
        let mut result = required_only();
        result.insert("text", text(""));
        result.insert("tone", text("n/a"));
        assert_eq!(validate(&schema, &draft_from(result, HERE)), Ok(()));
    }

    #[test]
    fn whitespace_counts_as_empty() {
        let schema = sign_schema().unwrap();
        let mut result = required_only();
        result.insert("shape", text("   "));
        let errors = validate(&schema, &draft_from(result, HERE)).unwrap_err();
        assert_eq!(errors.get("shape"), Some("Please select a shape"));
    }

    #[test]
    fn list_edit_splits_and_trims() {
        let schema = sign_schema().unwrap();
        let mut draft = draft_from(required_only(), HERE);
        apply_edit(
            &schema,
            &mut draft,
            Edit::Set {
                field: "colors".into(),
                input: " red, white ,,blue ".into(),
            },
        )
        .unwrap();
        assert_eq!(draft.value("colors"), Some(&list(&["red", "white", "blue"])));
    }

    #[test]
    fn edit_input_takes_the_field_shape() {
        let schema = sign_schema().unwrap();
        let mut draft = draft_from(required_only(), HERE);
        let set = |field: &str, input: &str| Edit::Set {
            field: field.into(),
            input: input.into(),
        };
        apply_edit(&schema, &mut draft, set("location", "fence, pole")).unwrap();
        assert_eq!(draft.value("location"), Some(&text("fence, pole")));
        apply_edit(&schema, &mut draft, set("colors", "red")).unwrap();
        assert_eq!(draft.value("colors"), Some(&list(&["red"])));
    }

    #[test]
    fn select_rejects_unknown_option() {
        let schema = sign_schema().unwrap();
        let mut draft = draft_from(required_only(), HERE);
        let err = apply_edit(
            &schema,
            &mut draft,
            Edit::Set {
                field: "condition".into(),
                input: "broken".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FormError::NotAnOption { ref field, .. } if field == "condition"));
        assert_eq!(draft.value("condition"), Some(&text("good")));
    }

    #[test]
    fn autocomplete_accepts_free_text() {
        let schema = sign_schema().unwrap();
        let mut draft = draft_from(required_only(), HERE);
        apply_edit(
            &schema,
            &mut draft,
            Edit::Set {
                field: "location".into(),
                input: "lamp post".into(),
            },
        )
        .unwrap();
        assert_eq!(draft.value("location"), Some(&text("lamp post")));
    }

    #[test]
    fn clear_and_unknown_field() {
        let schema = sign_schema().unwrap();
        let mut draft = draft_from(required_only(), HERE);
        apply_edit(&schema, &mut draft, Edit::Clear { field: "design".into() }).unwrap();
        assert_eq!(draft.value("design"), None);
        assert_eq!(
            apply_edit(&schema, &mut draft, Edit::Clear { field: "mood".into() }),
            Err(FormError::UnknownField("mood".into()))
        );
    }

    #[test]
    fn controls_cover_every_field_in_order() {
        let schema = sign_schema().unwrap();
        let draft = draft_from(required_only(), None);
        let errors = validate(&schema, &draft).unwrap_err();
        let rendered = controls(&schema, &draft, Some(&errors));
        let names: Vec<_> = rendered.iter().map(|c| c.spec.name).collect();
        assert_eq!(names, schema.field_names());
        let text_control = rendered.iter().find(|c| c.spec.name == "text").unwrap();
        assert_eq!(text_control.value, None);
        assert!(rendered.iter().all(|c| c.error.is_none()));
    }
}
