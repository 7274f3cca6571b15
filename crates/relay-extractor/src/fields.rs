//! Labelled field extraction
//!
//! Extraction is table driven: each [`FieldSpec`] names a field, lists its
//! label variants in priority order, and carries a capture rule plus a chain
//! of post-processing steps. A label matches a segment when the segment
//! starts with it (case-insensitive) and is followed by a separator. A label
//! standing alone in a table cell takes its value from the next data cell of
//! the same row.

use std::collections::BTreeMap;

use regex::Regex;
use relay_core::{FieldValue, OwnerInfo};
use serde::Serialize;

use crate::markup::{collapse_whitespace, segments, Segment};

/// Characters accepted between a label and its value
const SEPARATORS: &[char] = &[':', '=', '-', '|'];

/// Values that pages print instead of leaving a cell empty
const PLACEHOLDERS: &[&str] = &["n/a", "na", "null", "none", "nil", "-", "--"];

pub const OWNER_NAME: &str = "name";
pub const OWNER_IDENTIFIER: &str = "identifier";
pub const OWNER_GUARDIAN: &str = "guardianName";
pub const OWNER_ADDRESS: &str = "address";

// ============================================================================
// Field Specs
// ============================================================================

/// What part of the text after a label is kept
#[derive(Debug, Clone)]
pub enum CaptureRule {
    /// Everything up to the next markup boundary or line break
    UntilBoundary,
    /// The first match of a pattern inside that span
    Pattern(Regex),
}

/// Clean-up applied to a captured value, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    CollapseWhitespace,
    DigitsOnly,
    TrimPunctuation,
}

impl PostProcess {
    fn apply(&self, value: &str) -> String {
        match self {
            Self::CollapseWhitespace => collapse_whitespace(value),
            Self::DigitsOnly => value.chars().filter(char::is_ascii_digit).collect(),
            Self::TrimPunctuation => value
                .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '|' | '.'))
                .to_string(),
        }
    }
}

/// One row of the extraction table
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: String,
    pub labels: Vec<String>,
    pub capture: CaptureRule,
    pub post: Vec<PostProcess>,
}

impl FieldSpec {
    pub fn new(key: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            key: key.into(),
            labels,
            capture: CaptureRule::UntilBoundary,
            post: vec![PostProcess::CollapseWhitespace],
        }
    }

    pub fn with_labels(key: impl Into<String>, labels: &[&str]) -> Self {
        Self::new(key, labels.iter().map(|l| l.to_string()).collect())
    }

    /// Restrict the capture to a regex match; an invalid pattern is ignored
    pub fn capture_pattern(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.capture = CaptureRule::Pattern(regex),
            Err(e) => tracing::warn!("Ignoring invalid capture pattern for {}: {}", self.key, e),
        }
        self
    }

    pub fn then(mut self, step: PostProcess) -> Self {
        self.post.push(step);
        self
    }

    fn finish(&self, raw: &str) -> Option<String> {
        let captured = match &self.capture {
            CaptureRule::UntilBoundary => raw.to_string(),
            CaptureRule::Pattern(regex) => regex.find(raw)?.as_str().to_string(),
        };

        let value = self
            .post
            .iter()
            .fold(captured, |acc, step| step.apply(&acc));

        let value = value.trim();
        if value.is_empty() || PLACEHOLDERS.contains(&value.to_ascii_lowercase().as_str()) {
            None
        } else {
            Some(value.to_string())
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Field key -> extracted value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<String, FieldValue>);

impl ExtractedFields {
    /// Value for a key; unknown keys read as not found
    pub fn get(&self, key: &str) -> FieldValue {
        self.0.get(key).cloned().unwrap_or_default()
    }

    pub fn found_count(&self) -> usize {
        self.0.values().filter(|v| v.is_found()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn into_owner_info(self) -> OwnerInfo {
        OwnerInfo {
            name: self.get(OWNER_NAME),
            identifier: self.get(OWNER_IDENTIFIER),
            guardian_name: self.get(OWNER_GUARDIAN),
            address: self.get(OWNER_ADDRESS),
        }
    }
}

/// Pulls labelled scalar values out of markup or plain text
#[derive(Debug, Clone)]
pub struct TextFieldExtractor {
    specs: Vec<FieldSpec>,
}

impl TextFieldExtractor {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self { specs }
    }

    /// Owner-details table; `address_labels` sets the address priority order
    pub fn owner_fields(address_labels: &[String]) -> Self {
        Self::new(vec![
            FieldSpec::with_labels(
                OWNER_NAME,
                &["Owner Name", "Name", "Full Name", "Subscriber Name"],
            )
            .then(PostProcess::TrimPunctuation),
            FieldSpec::with_labels(
                OWNER_IDENTIFIER,
                &["CNIC", "CNIC No", "CNIC Number", "NIC", "ID Card"],
            )
            .capture_pattern(r"\d{5}[-\s]?\d{7}[-\s]?\d")
            .then(PostProcess::DigitsOnly),
            FieldSpec::with_labels(
                OWNER_GUARDIAN,
                &["Father Name", "Father/Husband Name", "Husband Name", "Guardian Name"],
            )
            .then(PostProcess::TrimPunctuation),
            FieldSpec::new(OWNER_ADDRESS, address_labels.to_vec())
                .then(PostProcess::TrimPunctuation),
        ])
    }

    /// Extract every configured field; misses become [`FieldValue::NotFound`]
    pub fn extract_fields(&self, text: &str) -> ExtractedFields {
        let segments = segments(text);

        let fields = self
            .specs
            .iter()
            .map(|spec| (spec.key.clone(), self.extract_one(&segments, spec)))
            .collect();

        ExtractedFields(fields)
    }

    pub fn extract_owner(&self, text: &str) -> OwnerInfo {
        self.extract_fields(text).into_owner_info()
    }

    /// Label variants in priority order; only the first occurrence of each is read
    fn extract_one(&self, segments: &[Segment], spec: &FieldSpec) -> FieldValue {
        for label in &spec.labels {
            let first = (0..segments.len()).find_map(|index| self.match_label(segments, index, label));
            if let Some(value) = first.and_then(|raw| spec.finish(raw)) {
                return FieldValue::Found(value);
            }
        }
        FieldValue::NotFound
    }

    fn match_label<'a>(&self, segments: &'a [Segment], index: usize, label: &str) -> Option<&'a str> {
        let segment = &segments[index];
        let rest = label_rest(&segment.text, label)?;

        if !rest.is_empty() {
            let inline = rest.strip_prefix(SEPARATORS)?.trim();
            if !inline.is_empty() {
                return Some(inline);
            }
        }

        // "Label:" alone in a cell; the value sits in the next cell of the row
        let next = segments.get(index + 1)?;
        if next.line != segment.line || next.header || next.text.ends_with(':') || self.is_label(&next.text) {
            return None;
        }
        Some(&next.text)
    }

    /// Whether a segment reads as a label of any configured field
    fn is_label(&self, text: &str) -> bool {
        self.specs.iter().flat_map(|spec| &spec.labels).any(|label| {
            label_rest(text, label).is_some_and(|rest| rest.is_empty() || rest.starts_with(SEPARATORS))
        })
    }
}

/// Text after a leading label, trimmed; `None` when the segment starts otherwise
fn label_rest<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let text = text.trim_start_matches(|c: char| !c.is_alphanumeric());
    Some(strip_prefix_ignore_case(text, label)?.trim_start())
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_address_labels() -> Vec<String> {
        ["Address", "Residential Address", "Permanent Address"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn owner_extractor() -> TextFieldExtractor {
        TextFieldExtractor::owner_fields(&default_address_labels())
    }

    #[test]
    fn test_partial_markup_degrades_per_field() {
        let owner = owner_extractor().extract_owner("<p>Owner Name: Jane Doe</p>");
        assert_eq!(owner.name.as_str(), "Jane Doe");
        assert_eq!(owner.address.as_str(), "not found");
        assert_eq!(owner.identifier, FieldValue::NotFound);
    }

    #[test]
    fn test_table_layout() {
        let html = r#"
            <table>
              <tr><th>Name</th><td>Muhammad <b>Ali</b></td></tr>
              <tr><th>CNIC:</th><td>35202-1234567-1</td></tr>
              <tr><th>Father Name</th><td>Ahmed Khan</td></tr>
              <tr><th>Address:</th><td>House 1, Street 2, Lahore.</td></tr>
            </table>"#;
        let owner = owner_extractor().extract_owner(html);
        assert_eq!(owner.name.as_str(), "Muhammad Ali");
        assert_eq!(owner.identifier.as_str(), "3520212345671");
        assert_eq!(owner.guardian_name.as_str(), "Ahmed Khan");
        assert_eq!(owner.address.as_str(), "House 1, Street 2, Lahore");
    }

    #[test]
    fn test_label_requires_separator_or_boundary() {
        let text = "Father Name: Ahmed\nName of city: Lahore\nName: Bilal";
        let owner = owner_extractor().extract_owner(text);
        assert_eq!(owner.name.as_str(), "Bilal");
        assert_eq!(owner.guardian_name.as_str(), "Ahmed");
    }

    #[test]
    fn test_label_case_insensitive() {
        let owner = owner_extractor().extract_owner("OWNER NAME - Sara Malik");
        assert_eq!(owner.name.as_str(), "Sara Malik");
    }

    #[test]
    fn test_address_priority_first_variant_wins() {
        let text = "Permanent Address: Village X\nAddress: City Y";
        let owner = owner_extractor().extract_owner(text);
        assert_eq!(owner.address.as_str(), "City Y");

        let reordered = TextFieldExtractor::owner_fields(&[
            "Permanent Address".to_string(),
            "Address".to_string(),
        ]);
        assert_eq!(reordered.extract_owner(text).address.as_str(), "Village X");
    }

    #[test]
    fn test_later_variant_used_when_earlier_absent() {
        let owner = owner_extractor().extract_owner("Residential Address: Block 7, Karachi");
        assert_eq!(owner.address.as_str(), "Block 7, Karachi");
    }

    #[test]
    fn test_placeholder_values_are_not_found() {
        let owner = owner_extractor().extract_owner("Name: N/A\nAddress: -");
        assert_eq!(owner.name, FieldValue::NotFound);
        assert_eq!(owner.address, FieldValue::NotFound);
    }

    #[test]
    fn test_empty_cell_does_not_steal_next_label() {
        let html = "<td>Address:</td><td></td><td>CNIC:</td><td>35202-1234567-1</td>";
        let owner = owner_extractor().extract_owner(html);
        assert_eq!(owner.address, FieldValue::NotFound);
        assert_eq!(owner.identifier.as_str(), "3520212345671");
    }

    #[test]
    fn test_first_occurrence_of_a_label_wins() {
        let text = "CNIC: hidden\nCNIC: 35202 1234567 1\nName: N/A\nName: Bilal";
        let owner = owner_extractor().extract_owner(text);
        assert_eq!(owner.identifier, FieldValue::NotFound);
        assert_eq!(owner.name, FieldValue::NotFound);

        let spaced = owner_extractor().extract_owner("CNIC: 35202 1234567 1");
        assert_eq!(spaced.identifier.as_str(), "3520212345671");
    }

    #[test]
    fn test_header_row_does_not_shift_values() {
        let html = r#"
            <table>
              <tr><th>Name</th><th>CNIC</th><th>Address</th></tr>
              <tr><td>Jane Doe</td><td>35202-1234567-1</td><td>Lahore</td></tr>
            </table>"#;
        let owner = owner_extractor().extract_owner(html);
        assert_eq!(owner.name, FieldValue::NotFound);
        assert_eq!(owner.identifier, FieldValue::NotFound);
        assert_eq!(owner.address, FieldValue::NotFound);
    }

    #[test]
    fn test_bare_label_needs_value_in_same_row() {
        let html = r#"
            <table>
              <tr><td>Name</td><td>Name</td></tr>
              <tr><td>Address</td></tr>
              <tr><td>Lahore</td></tr>
            </table>"#;
        let owner = owner_extractor().extract_owner(html);
        assert_eq!(owner.name, FieldValue::NotFound);
        assert_eq!(owner.address, FieldValue::NotFound);
    }

    #[test]
    fn test_inline_markup_inside_value_is_stripped() {
        let extractor = owner_extractor();
        let owner = extractor.extract_owner("<p>Owner Name: <b>Jane</b> Doe</p><p>Address: <a href=\"#\">Block <i>7</i></a>, Karachi</p>");
        assert_eq!(owner.name.as_str(), "Jane Doe");
        assert_eq!(owner.address.as_str(), "Block 7, Karachi");
    }

    #[test]
    fn test_self_closing_script_keeps_page() {
        let owner = owner_extractor().extract_owner("<script src=x.js/><p>Owner Name: Jane Doe</p>");
        assert_eq!(owner.name.as_str(), "Jane Doe");
    }

    #[test]
    fn test_custom_spec_table() {
        let extractor = TextFieldExtractor::new(vec![FieldSpec::with_labels(
            "operator",
            &["Operator", "Network"],
        )]);
        let fields = extractor.extract_fields("Network: Zong\nStatus: Active");
        assert_eq!(fields.get("operator").as_str(), "Zong");
        assert_eq!(fields.get("missing"), FieldValue::NotFound);
        assert_eq!(fields.found_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        let fields = owner_extractor().extract_fields("");
        assert_eq!(fields.found_count(), 0);
        assert_eq!(fields.iter().count(), 4);
    }

    proptest! {
        #[test]
        fn prop_extraction_is_idempotent(text in ".{0,300}") {
            let extractor = owner_extractor();
            prop_assert_eq!(extractor.extract_fields(&text), extractor.extract_fields(&text));
        }

        #[test]
        fn prop_never_panics_on_markup_noise(text in "[<>/a-zA-Z: =\"&;#0-9\n-]{0,200}") {
            let _ = owner_extractor().extract_owner(&text);
        }
    }
}
