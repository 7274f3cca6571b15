//! Context-aware phone number extraction
//!
//! Every phone number in a document becomes a [`NumberRecord`]. The network
//! and line type are inferred from keywords found in a window of text around
//! the number.

use regex::Regex;
use relay_core::{canonical_mobile, NumberRecord, Subtype, UNKNOWN_CATEGORY};

/// Mobile number with or without country code and separators
const NUMBER_PATTERN: &str = r"(?:(?:\+|\b)92[\s-]?|\b0)3\d{2}[\s-]?\d{7}\b";

/// Phrases marking a data-only connection
const DATA_ONLY_MARKERS: &[&str] = &["data only", "data-only", "data sim", "internet only", "mbb"];

/// A network and the keywords that identify it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Built-in network table, in match priority order
pub fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Jazz", &["jazz", "mobilink", "warid"]),
        CategoryRule::new("Zong", &["zong", "cmpak"]),
        CategoryRule::new("Telenor", &["telenor", "djuice"]),
        CategoryRule::new("Ufone", &["ufone"]),
    ]
}

/// Scans text for numbers and classifies each one by its surroundings
#[derive(Debug, Clone)]
pub struct ContextualRecordExtractor {
    pattern: Regex,
    categories: Vec<CategoryRule>,
    data_only_markers: Vec<String>,
    window_size: usize,
    dedupe: bool,
}

impl ContextualRecordExtractor {
    /// Extractor with the built-in pattern and network table
    pub fn new(window_size: usize) -> Result<Self, regex::Error> {
        Self::with_rules(
            default_categories(),
            DATA_ONLY_MARKERS.iter().map(|m| m.to_string()).collect(),
            window_size,
        )
    }

    pub fn with_rules(
        categories: Vec<CategoryRule>,
        data_only_markers: Vec<String>,
        window_size: usize,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(NUMBER_PATTERN)?,
            categories,
            data_only_markers: data_only_markers.iter().map(|m| m.to_lowercase()).collect(),
            window_size,
            dedupe: false,
        })
    }

    /// Keep only the first record for each number
    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// One record per non-overlapping match, in document order
    pub fn extract_records(&self, text: &str) -> Vec<NumberRecord> {
        let mut records: Vec<NumberRecord> = Vec::new();

        for mat in self.pattern.find_iter(text) {
            let Some(number) = canonical_mobile(mat.as_str()) else {
                continue;
            };
            if self.dedupe && records.iter().any(|r| r.number == number) {
                continue;
            }

            let window = context_window(text, mat.start(), mat.end(), self.window_size).to_lowercase();
            let category = self
                .categories
                .iter()
                .find(|rule| rule.keywords.iter().any(|k| window.contains(k.as_str())))
                .map(|rule| rule.category.as_str())
                .unwrap_or(UNKNOWN_CATEGORY);
            let subtype = if self.data_only_markers.iter().any(|m| window.contains(m.as_str())) {
                Subtype::DataOnly
            } else {
                Subtype::VoiceData
            };

            records.push(NumberRecord::new(number, category, subtype));
        }

        tracing::debug!("Extracted {} number record(s)", records.len());
        records
    }
}

/// Text within `window_size / 2` characters either side of a match
///
/// Bounds are clamped to the text; offsets inside a character are widened to
/// the enclosing character.
pub fn context_window(text: &str, start: usize, end: usize, window_size: usize) -> &str {
    let half = window_size / 2;
    let end = ceil_char_boundary(text, end.min(text.len()));
    let start = floor_char_boundary(text, start.min(end));

    let lo = text[..start]
        .char_indices()
        .rev()
        .take(half)
        .last()
        .map_or(start, |(i, _)| i);
    let hi = text[end..]
        .char_indices()
        .nth(half)
        .map_or(text.len(), |(i, _)| end + i);

    &text[lo..hi]
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    (0..=index).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0)
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    (index..=text.len())
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(text.len())
}
