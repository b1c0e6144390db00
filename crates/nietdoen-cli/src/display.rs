//! Text rendering for the schema table, the review form, and saved signs.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use nietdoen_collect::{CollectSession, WrittenSign};
use nietdoen_core::review::controls;
use nietdoen_core::{Control, FieldValue, GeoReading, SchemaRegistry, ValidationErrors, ValueKind};

const LABEL_WIDTH: usize = 12;

fn control_name(control: Control) -> &'static str {
    match control {
        Control::Select => "select",
        Control::Autocomplete => "autocomplete",
        Control::Tags => "tags",
        Control::TextArea => "text",
    }
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Single => "string",
        ValueKind::List => "array",
    }
}

pub fn format_value(value: Option<&FieldValue>) -> String {
    match value {
        None => "-".to_string(),
        Some(FieldValue::Text(s)) if s.trim().is_empty() => "-".to_string(),
        Some(FieldValue::Text(s)) => s.clone(),
        Some(FieldValue::List(items)) if items.is_empty() => "-".to_string(),
        Some(FieldValue::List(items)) => items.join(", "),
    }
}

/// One row per field: name, shape, control, requiredness, options.
pub fn schema_table(schema: &SchemaRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<7} {:<13} {:<9} options",
        "field", "shape", "control", "required"
    );
    for spec in schema.fields() {
        let options = spec.options.map(|o| o.join(", ")).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<12} {:<7} {:<13} {:<9} {}",
            spec.name,
            kind_name(spec.kind),
            control_name(spec.control),
            if spec.is_required() { "yes" } else { "no" },
            options
        );
    }
    if schema.tracks_coordinates() {
        let _ = writeln!(out, "{:<12} {:<7} {:<13} {:<9}", "latitude", "number", "location", "yes");
        let _ = writeln!(out, "{:<12} {:<7} {:<13} {:<9}", "longitude", "number", "location", "yes");
    }
    out
}

/// Relative age of a reading, e.g. "3 minutes ago".
pub fn age_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let minutes = (secs as f64 / 60.0).round() as i64;
    let hours = (secs as f64 / 3600.0).round() as i64;
    let days = (secs as f64 / 86_400.0).round() as i64;
    match secs {
        0..45 => "a few seconds ago".to_string(),
        45..90 => "a minute ago".to_string(),
        _ if minutes < 45 => format!("{minutes} minutes ago"),
        _ if minutes < 90 => "an hour ago".to_string(),
        _ if hours < 22 => format!("{hours} hours ago"),
        _ if hours < 36 => "a day ago".to_string(),
        _ => format!("{days} days ago"),
    }
}

fn coordinates_line(reading: Option<GeoReading>, now: DateTime<Utc>) -> String {
    match reading {
        None => "Coordinates: Loading...".to_string(),
        Some(r) => format!(
            "Coordinates ({}): {}, {}",
            age_label(r.timestamp, now),
            r.point.latitude,
            r.point.longitude
        ),
    }
}

/// The review form for the current session state.
pub fn form(session: &CollectSession, errors: Option<&ValidationErrors>, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Language: {}   {}",
        session.language(),
        coordinates_line(session.location(), now)
    );
    if let Some(image) = session.image() {
        let _ = writeln!(out, "Image: {} ({})", image.name, image.mime_type);
    }

    let Some(draft) = session.draft() else {
        let _ = writeln!(out, "No record yet ({}).", session.stage());
        if let Some(e) = session.last_error() {
            let _ = writeln!(out, "Error: {e}");
        }
        return out;
    };

    for control in controls(session.schema(), draft, errors) {
        let marker = if control.spec.is_required() { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:<width$} {}",
            control.spec.label,
            format_value(control.value),
            width = LABEL_WIDTH
        );
        if let Some(message) = control.error {
            let _ = writeln!(out, "  {:<width$} ! {message}", "", width = LABEL_WIDTH);
        }
    }

    if session.schema().tracks_coordinates() {
        let latched = draft
            .coordinates()
            .map(|p| format!("{}, {}", p.latitude, p.longitude))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "* {:<width$} {latched}", "Location", width = LABEL_WIDTH);
        if let Some(message) = errors.and_then(|e| e.get("latitude")) {
            let _ = writeln!(out, "  {:<width$} ! {message}", "", width = LABEL_WIDTH);
        }
    }
    if let Some(e) = session.last_error() {
        let _ = writeln!(out, "Error: {e}");
    }
    out
}

/// Summary of a sign that was written.
pub fn saved(written: &WrittenSign) -> String {
    let sign = &written.sign;
    let mut out = String::new();
    let _ = writeln!(out, "Saved sign {}", written.id);
    let _ = writeln!(out, "  created_at   {}", sign.created_at.to_rfc3339());
    let _ = writeln!(out, "  language     {}", sign.language);
    for (name, value) in &sign.attributes {
        let _ = writeln!(out, "  {name:<12} {}", format_value(value.as_ref()));
    }
    let _ = writeln!(out, "  storage_urls {} | {}", sign.storage_urls.sm, sign.storage_urls.lg);
    if let Some(p) = sign.coordinates {
        let _ = writeln!(out, "  coordinates  {}, {}", p.latitude, p.longitude);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use nietdoen_core::sign_schema;

    use super::*;

    fn ago(secs: i64) -> String {
        let now = DateTime::from_timestamp(1_720_000_000, 0).unwrap();
        age_label(now - Duration::seconds(secs), now)
    }

    #[test]
    fn relative_ages() {
        assert_eq!(ago(0), "a few seconds ago");
        assert_eq!(ago(50), "a minute ago");
        assert_eq!(ago(180), "3 minutes ago");
        assert_eq!(ago(60 * 60), "an hour ago");
        assert_eq!(ago(5 * 3600), "5 hours ago");
        assert_eq!(ago(30 * 3600), "a day ago");
        assert_eq!(ago(3 * 86_400), "3 days ago");
        // Clock skew never shows a future reading.
        assert_eq!(ago(-30), "a few seconds ago");
    }

    #[test]
    fn values() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(&FieldValue::Text("  ".into()))), "-");
        assert_eq!(
            format_value(Some(&FieldValue::List(vec!["red".into(), "white".into()]))),
            "red, white"
        );
    }

    #[test]
    fn table_lists_every_field() {
        let schema = sign_schema().unwrap();
        let table = schema_table(&schema);
        for name in schema.field_names() {
            assert!(table.contains(name), "{name} missing");
        }
        assert!(table.contains("latitude"));
        let colors = table.lines().find(|l| l.starts_with("colors")).unwrap();
        assert!(colors.contains("array"));
        assert!(colors.contains("tags"));
        assert!(colors.contains("yes"));
    }

    #[test]
    fn table_without_coordinates() {
        let schema = sign_schema().unwrap().with_coordinates(false);
        assert!(!schema_table(&schema).contains("latitude"));
    }
}
