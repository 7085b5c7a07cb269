//! Printable renditions of a submission.
//!
//! Both renderers group fields by the form's section layout and print an
//! explicit "Not provided" marker for blank values.

use std::fmt::Write as _;

use crate::errors::RenderError;
use crate::form::layout::{keys, NON_DOCUMENT_FIELDS};
use crate::form::registry::FieldRegistry;
use crate::form::section::Section;
use crate::submission::payload::SubmissionPayload;

pub const NOT_PROVIDED: &str = "Not provided";
const NO_CLAIM_NUMBER: &str = "New Submission";

/// Rendered document handed to the dispatch collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub media_type: &'static str,
    pub file_name: String,
    pub pages: usize,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, payload: &SubmissionPayload) -> Result<Artifact, RenderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSection {
    pub title: String,
    /// `(field id, label)` pairs in print order.
    pub fields: Vec<(String, String)>,
}

/// Section grouping and labels used by every renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLayout {
    pub organisation: String,
    pub sections: Vec<DocumentSection>,
}

impl DocumentLayout {
    /// Mirrors the form sections, leaving out attachment and delivery fields.
    pub fn from_form(organisation: &str, sections: &[Section], registry: &FieldRegistry) -> Self {
        let sections = sections
            .iter()
            .map(|section| DocumentSection {
                title: section.title.to_string(),
                fields: section
                    .fields
                    .iter()
                    .filter(|key| !NON_DOCUMENT_FIELDS.contains(key))
                    .filter_map(|key| registry.get(key).ok())
                    .map(|descriptor| (descriptor.key.to_string(), descriptor.label.clone()))
                    .collect(),
            })
            .collect();
        Self {
            organisation: organisation.to_string(),
            sections,
        }
    }

    pub fn title(&self) -> String {
        format!("{} Claim Form", self.organisation)
    }

    fn claim_line(&self, payload: &SubmissionPayload) -> String {
        format!(
            "Claim #: {}",
            payload.field(keys::CLAIM_NUMBER).unwrap_or(NO_CLAIM_NUMBER)
        )
    }

    fn summary(&self, payload: &SubmissionPayload) -> Vec<(&'static str, String)> {
        vec![
            (
                "Submission Date",
                payload.submitted_at.format("%Y-%m-%d").to_string(),
            ),
            (
                "Contract Holder",
                join_fields(payload, &[keys::CONTRACT_FIRST_NAME, keys::CONTRACT_LAST_NAME]),
            ),
            (
                "Vehicle",
                join_fields(payload, &[keys::VEHICLE_YEAR, keys::VEHICLE_MAKE, keys::VEHICLE_MODEL]),
            ),
            ("VIN", join_fields(payload, &[keys::VIN])),
        ]
    }

    fn file_stem(&self, payload: &SubmissionPayload) -> String {
        let claim = payload.field(keys::CLAIM_NUMBER).unwrap_or("new");
        let claim: String = claim
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("claim_{}", claim)
    }
}

fn join_fields(payload: &SubmissionPayload, fields: &[&str]) -> String {
    fields.iter()
        .filter_map(|key| payload.field(key))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Paginated plain text, laid out on a fixed vertical grid.
#[derive(Debug, Clone)]
pub struct PlainTextRenderer {
    layout: DocumentLayout,
}

const PAGE_BREAK_AT: u32 = 280;
const PAGE_TOP: u32 = 20;
const BODY_TOP: u32 = 70;
const HEADING_ADVANCE: u32 = 10;
const LINE_ADVANCE: u32 = 5;
const SECTION_GAP: u32 = 10;

impl PlainTextRenderer {
    pub fn new(layout: DocumentLayout) -> Self {
        Self { layout }
    }

    fn pages(&self, payload: &SubmissionPayload) -> Vec<Vec<String>> {
        let layout = &self.layout;
        let mut first = vec![layout.title(), layout.claim_line(payload), String::new()];
        first.push("Summary".to_string());
        for (label, value) in layout.summary(payload) {
            first.push(format!("{}: {}", label, value).trim_end().to_string());
        }
        first.push(String::new());

        let mut cursor = PageCursor {
            pages: vec![first],
            y: BODY_TOP,
        };
        for section in &layout.sections {
            cursor.line(section.title.clone(), HEADING_ADVANCE);
            for (key, label) in &section.fields {
                let value = payload.field(key).unwrap_or(NOT_PROVIDED);
                cursor.line(format!("{}: {}", label, value), LINE_ADVANCE);
            }
            cursor.gap(SECTION_GAP);
        }
        cursor.pages
    }
}

/// Vertical position on the current page. A new page starts only when a
/// line is about to be written below the break line.
struct PageCursor {
    pages: Vec<Vec<String>>,
    y: u32,
}

impl PageCursor {
    fn line(&mut self, text: String, advance: u32) {
        if self.y > PAGE_BREAK_AT {
            self.pages.push(Vec::new());
            self.y = PAGE_TOP;
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(text);
        }
        self.y += advance;
    }

    /// Blank spacer line; dropped when the next line opens a new page anyway.
    fn gap(&mut self, advance: u32) {
        if self.y <= PAGE_BREAK_AT {
            self.line(String::new(), advance);
        }
    }
}

impl DocumentRenderer for PlainTextRenderer {
    fn render(&self, payload: &SubmissionPayload) -> Result<Artifact, RenderError> {
        let pages = self.pages(payload);
        let total = pages.len();
        let footer = format!(
            "This is an automated report from the {} Claim Form system.",
            self.layout.organisation
        );
        let mut out = String::new();
        for (index, lines) in pages.iter().enumerate() {
            if index > 0 {
                out.push('\u{c}');
            }
            for line in lines {
                writeln!(out, "{}", line).map_err(|err| RenderError::Failed(err.to_string()))?;
            }
            writeln!(out, "{}", footer).map_err(|err| RenderError::Failed(err.to_string()))?;
            writeln!(out, "Page {} of {}", index + 1, total)
                .map_err(|err| RenderError::Failed(err.to_string()))?;
        }
        Ok(Artifact {
            media_type: "text/plain",
            file_name: format!("{}.txt", self.layout.file_stem(payload)),
            pages: total,
            bytes: out.into_bytes(),
        })
    }
}

/// Single-page HTML suitable as a message body.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    layout: DocumentLayout,
}

impl HtmlRenderer {
    pub fn new(layout: DocumentLayout) -> Self {
        Self { layout }
    }
}

impl DocumentRenderer for HtmlRenderer {
    fn render(&self, payload: &SubmissionPayload) -> Result<Artifact, RenderError> {
        let layout = &self.layout;
        let escape = |text: &str| html_escape::encode_text(text).into_owned();
        let title = escape(&layout.title());

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", title));
        html.push_str(&format!(
            "<div class=\"header\">\n<h1>{}</h1>\n<div class=\"claim-number\">{}</div>\n</div>\n",
            title,
            escape(&layout.claim_line(payload))
        ));

        html.push_str("<div class=\"summary\">\n");
        for (label, value) in layout.summary(payload) {
            html.push_str(&format!(
                "<p><strong>{}:</strong> {}</p>\n",
                label,
                escape(&value)
            ));
        }
        html.push_str("</div>\n");

        for section in &layout.sections {
            html.push_str(&format!(
                "<div class=\"section\">\n<h2>{}</h2>\n",
                escape(&section.title)
            ));
            for (key, label) in &section.fields {
                let value = match payload.field(key) {
                    Some(value) => escape(value),
                    None => format!("<span class=\"empty\">{}</span>", NOT_PROVIDED),
                };
                html.push_str(&format!(
                    "<div class=\"field\"><span class=\"field-name\">{}:</span> <span class=\"field-value\">{}</span></div>\n",
                    escape(label),
                    value
                ));
            }
            html.push_str("</div>\n");
        }

        html.push_str(&format!(
            "<div class=\"footer\"><p>This is an automated email from the {} Claim Form system.</p></div>\n",
            escape(&layout.organisation)
        ));
        html.push_str("</body>\n</html>\n");

        Ok(Artifact {
            media_type: "text/html",
            file_name: format!("{}.html", layout.file_stem(payload)),
            pages: 1,
            bytes: html.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldDescriptor, FieldKind};
    use chrono::{TimeZone, Utc};

    fn layout(field_count: usize) -> DocumentLayout {
        let keys: Vec<&'static str> = ["a", "b", "c", "d", "e", "f", "g", "h"]
            .into_iter()
            .take(field_count)
            .collect();
        let registry = FieldRegistry::from_descriptors(
            keys.iter()
                .copied()
                .map(|key| FieldDescriptor::new(key, FieldKind::Text))
                .collect::<Vec<_>>(),
        )
        .unwrap();
        DocumentLayout::from_form(
            "Acme",
            &[Section::new("only", "Only Section", keys)],
            &registry,
        )
    }

    fn payload(fields: &[(&str, &str)]) -> SubmissionPayload {
        SubmissionPayload::new(
            Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
            "claims@example.com".into(),
            Vec::new(),
            fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[test]
    fn blank_values_print_not_provided() {
        let artifact = PlainTextRenderer::new(layout(2))
            .render(&payload(&[("a", "filled"), ("b", "  ")]))
            .unwrap();
        let text = artifact.as_text();
        assert!(text.contains("A: filled"));
        assert!(text.contains("B: Not provided"));
        assert_eq!(artifact.pages, 1);
        assert_eq!(artifact.file_name, "claim_new.txt");
    }

    #[test]
    fn plain_text_layout_is_stable() {
        let artifact = PlainTextRenderer::new(layout(1))
            .render(&payload(&[("claim-number", "CLM-7"), ("a", "x")]))
            .unwrap();
        insta::assert_snapshot!(artifact.as_text().trim_end(), @r###"
        Acme Claim Form
        Claim #: CLM-7

        Summary
        Submission Date: 2024-05-02
        Contract Holder:
        Vehicle:
        VIN:

        Only Section
        A: x

        This is an automated report from the Acme Claim Form system.
        Page 1 of 1
        "###);
    }

    #[test]
    fn section_ending_at_the_margin_adds_no_blank_page() {
        let fields = (0..40)
            .map(|index| (format!("f{}", index), format!("Field {}", index)))
            .collect();
        let layout = DocumentLayout {
            organisation: "Acme".into(),
            sections: vec![DocumentSection {
                title: "Long Section".into(),
                fields,
            }],
        };
        let artifact = PlainTextRenderer::new(layout).render(&payload(&[])).unwrap();
        let text = artifact.as_text();

        assert_eq!(artifact.pages, 1);
        assert!(text.contains("Field 39: Not provided"));
        assert!(text.trim_end().ends_with("Page 1 of 1"));
    }

    #[test]
    fn overflowing_section_continues_on_the_next_page() {
        let section = |title: &str, count: usize| DocumentSection {
            title: title.into(),
            fields: (0..count)
                .map(|index| (format!("{}-{}", title, index), format!("{} {}", title, index)))
                .collect(),
        };
        let layout = DocumentLayout {
            organisation: "Acme".into(),
            sections: vec![section("First", 42), section("Second", 2)],
        };
        let artifact = PlainTextRenderer::new(layout).render(&payload(&[])).unwrap();
        let text = artifact.as_text();
        let second_page = text.split('\u{c}').nth(1).unwrap();

        assert_eq!(artifact.pages, 2);
        assert!(second_page.starts_with("First 41: Not provided\n\nSecond\n"));
        assert!(second_page.contains("Page 2 of 2"));
    }

    #[test]
    fn html_escapes_user_input() {
        let artifact = HtmlRenderer::new(layout(1))
            .render(&payload(&[("a", "<b>bold</b> & co")]))
            .unwrap();
        let html = artifact.as_text();
        assert_eq!(artifact.media_type, "text/html");
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; co"));
        assert!(!html.contains("<b>bold"));
    }
}
