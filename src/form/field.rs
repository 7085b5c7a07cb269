use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::FormError;

/// Supported data kinds for claim fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Flag,
    Email,
    EmailList,
    File,
}

/// Yes/no answers stored as an enum instead of a loose string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(YesNo::Yes),
            "n" | "no" | "false" | "0" => Some(YesNo::No),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }
}

/// Reference to an attachment picked by the user. Only metadata is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
}

impl FileRef {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Human readable size, e.g. `1.5 KB`.
    pub fn display_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * 1024;
        if self.size < KB {
            format!("{} B", self.size)
        } else if self.size < MB {
            format!("{:.1} KB", self.size as f64 / KB as f64)
        } else {
            format!("{:.1} MB", self.size as f64 / MB as f64)
        }
    }
}

/// A single value held by the session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Flag(YesNo),
    Files(Vec<FileRef>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Whether the value counts towards a required field being filled.
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Empty => false,
            FieldValue::Text(text) => !text.trim().is_empty(),
            FieldValue::Number(value) => value.is_finite(),
            FieldValue::Flag(_) => true,
            FieldValue::Files(files) => !files.is_empty(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldValue::Files(_))
    }

    /// Parses the value as a number the way a numeric input would.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) if value.is_finite() => Some(*value),
            FieldValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<YesNo> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            FieldValue::Text(text) => YesNo::parse(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Flat string form used for persistence and rendering. Empty becomes "".
    pub fn to_plain(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(value) => f.write_str(&format_number(*value)),
            FieldValue::Flag(flag) => f.write_str(flag.as_str()),
            FieldValue::Files(files) => {
                let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

/// Formats whole numbers without a fractional part (`5500`, not `5500.0`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Declarative description of a single form field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub derived: bool,
}

impl FieldDescriptor {
    pub fn new(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label: label_for(key),
            kind,
            required: false,
            derived: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as computed by a derived rule rather than typed.
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Converts raw user input into a typed value for this field.
    pub fn parse_input(&self, raw: &str) -> Result<FieldValue, FormError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Empty);
        }
        match self.kind {
            FieldKind::Number => Ok(trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::text(trimmed))),
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|date| FieldValue::Text(date.to_string()))
                .map_err(|_| self.invalid("use YYYY-MM-DD format")),
            FieldKind::Flag => YesNo::parse(trimmed)
                .map(FieldValue::Flag)
                .ok_or_else(|| self.invalid("answer yes or no")),
            FieldKind::File => Err(self.invalid("attach files instead of typing a value")),
            FieldKind::Text | FieldKind::Email | FieldKind::EmailList => {
                Ok(FieldValue::text(raw.to_string()))
            }
        }
    }

    /// Lenient variant used when reloading persisted strings.
    pub fn restore_input(&self, raw: &str) -> FieldValue {
        self.parse_input(raw)
            .unwrap_or_else(|_| FieldValue::text(raw.to_string()))
    }

    fn invalid(&self, reason: &str) -> FormError {
        FormError::InvalidValue {
            field: self.key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Derives a display label from a field id: `claim-number` becomes `Claim Number`.
pub fn label_for(key: &str) -> String {
    key.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_capitalise_each_word() {
        assert_eq!(label_for("claim-number"), "Claim Number");
        assert_eq!(label_for("vin"), "Vin");
        assert_eq!(label_for("review-ampm"), "Review Ampm");
    }

    #[test]
    fn whitespace_text_is_not_filled() {
        assert!(!FieldValue::text("   ").is_filled());
        assert!(FieldValue::text(" x ").is_filled());
        assert!(!FieldValue::Files(Vec::new()).is_filled());
        assert!(FieldValue::Flag(YesNo::No).is_filled());
    }

    #[test]
    fn number_fields_keep_unparsable_input_as_text() {
        let descriptor = FieldDescriptor::new("current-mileage", FieldKind::Number);
        assert_eq!(
            descriptor.parse_input("15500").unwrap(),
            FieldValue::Number(15500.0)
        );
        assert_eq!(
            descriptor.parse_input("lots").unwrap(),
            FieldValue::text("lots")
        );
    }

    #[test]
    fn flag_fields_reject_other_answers() {
        let descriptor = FieldDescriptor::new("modifications", FieldKind::Flag);
        assert_eq!(
            descriptor.parse_input("Yes").unwrap(),
            FieldValue::Flag(YesNo::Yes)
        );
        assert!(matches!(
            descriptor.parse_input("maybe"),
            Err(FormError::InvalidValue { .. })
        ));
    }

    #[test]
    fn dates_must_be_iso_formatted() {
        let descriptor = FieldDescriptor::new("purchase-date", FieldKind::Date);
        assert!(descriptor.parse_input("2024-02-30").is_err());
        assert_eq!(
            descriptor.parse_input("2024-02-03").unwrap(),
            FieldValue::text("2024-02-03")
        );
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(FieldValue::Number(5500.0).to_plain(), "5500");
        assert_eq!(FieldValue::Number(12.5).to_plain(), "12.5");
    }

    #[test]
    fn file_sizes_use_binary_units() {
        assert_eq!(FileRef::new("a.pdf", 512).display_size(), "512 B");
        assert_eq!(FileRef::new("a.pdf", 1536).display_size(), "1.5 KB");
        assert_eq!(FileRef::new("a.pdf", 3 * 1024 * 1024).display_size(), "3.0 MB");
    }
}
