//! Relay Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout relay:
//! - Canonical records produced by the provider chain
//! - Identity report types produced by the extraction pass
//! - Common error types
//! - The HTTP fetch collaborator trait
//! - Query validation and configuration management

pub mod config;
pub mod query;

pub use config::{
    AppConfig, ConfigError, HttpConfig, IdentityConfig, LoggingConfig, MediaConfig,
    ProviderEntry, RequestShape, ServerConfig,
};
pub use query::{canonical_cnic, canonical_mobile, IdentityKey, Query};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Sentinel rendered for any field the extraction pass could not locate
pub const NOT_FOUND: &str = "not found";

/// Category assigned to a number when no network keyword is near it
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Category name of the synthetic summary row
pub const TOTAL_ROW: &str = "Total";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("All providers failed after {} attempt(s)", attempts.len())]
    AllProvidersExhausted { attempts: Vec<AttemptSummary> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Failure raised by the HTTP fetch collaborator for a single call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("{0}")]
    Other(String),
}

/// How a single failed provider attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider answered but its payload did not satisfy the success predicate
    Rejected,
    /// The call itself failed (network, timeout, body decode)
    TransportFailure,
}

/// Serializable diagnostic for one failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub provider: String,
    pub outcome: FailureKind,
    pub reason: String,
}

// ============================================================================
// Extracted Field Values
// ============================================================================

/// Result of extracting a single labelled field
///
/// Serializes as the captured string or as [`NOT_FOUND`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Found(String),
    #[default]
    NotFound,
}

impl FieldValue {
    /// Build from an optional capture, treating blank text as absent
    pub fn from_capture(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self::Found(v),
            _ => Self::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Found(v) => v,
            Self::NotFound => NOT_FOUND,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == NOT_FOUND {
            Ok(Self::NotFound)
        } else {
            Ok(Self::from_capture(Some(raw)))
        }
    }
}

// ============================================================================
// Media Records
// ============================================================================

/// Provider-agnostic result of a media resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMediaRecord {
    /// Direct media URL; the only required field
    pub media_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl CanonicalMediaRecord {
    /// Create a record; returns `None` when the media URL is blank
    pub fn new(media_url: impl Into<String>) -> Option<Self> {
        let media_url = media_url.into().trim().to_string();
        if media_url.is_empty() {
            return None;
        }
        Some(Self {
            media_url,
            thumbnail_url: None,
            title: None,
            author: None,
            duration_seconds: None,
        })
    }

    /// Set thumbnail, ignoring blank values
    pub fn with_thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = non_blank(url);
        self
    }

    /// Set title, ignoring blank values
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = non_blank(title);
        self
    }

    /// Set author, ignoring blank values
    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = non_blank(author);
        self
    }

    pub fn with_duration(mut self, seconds: Option<u64>) -> Self {
        self.duration_seconds = seconds;
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Identity Records
// ============================================================================

/// Owner details scraped from an identity lookup page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    pub name: FieldValue,
    pub identifier: FieldValue,
    pub guardian_name: FieldValue,
    pub address: FieldValue,
}

impl OwnerInfo {
    /// True when at least one field was located
    pub fn has_any(&self) -> bool {
        [&self.name, &self.identifier, &self.guardian_name, &self.address]
            .iter()
            .any(|f| f.is_found())
    }
}

/// Line type of a registered number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtype {
    #[default]
    #[serde(rename = "voice+data")]
    VoiceData,
    #[serde(rename = "data-only")]
    DataOnly,
}

impl Subtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceData => "voice+data",
            Self::DataOnly => "data-only",
        }
    }
}

impl std::fmt::Display for Subtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
}

/// One phone number found in a scraped document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberRecord {
    /// Canonical 11-digit number, separators stripped
    pub number: String,
    pub category: String,
    pub subtype: Subtype,
    pub status: RecordStatus,
}

impl NumberRecord {
    pub fn new(number: impl Into<String>, category: impl Into<String>, subtype: Subtype) -> Self {
        Self {
            number: number.into(),
            category: category.into(),
            subtype,
            status: RecordStatus::Active,
        }
    }
}

/// Per-network tally; `total` is always `voice_data_count + data_only_count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub category: String,
    pub voice_data_count: u32,
    pub data_only_count: u32,
    pub total: u32,
}

impl NetworkSummary {
    pub fn new(category: impl Into<String>, voice_data_count: u32, data_only_count: u32) -> Self {
        Self {
            category: category.into(),
            voice_data_count,
            data_only_count,
            total: voice_data_count + data_only_count,
        }
    }

    pub fn is_total_row(&self) -> bool {
        self.category == TOTAL_ROW
    }
}

/// Everything recovered from one identity lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub owner: OwnerInfo,
    pub records: Vec<NumberRecord>,
    pub networks: Vec<NetworkSummary>,
    pub record_count: usize,
}

impl AggregateReport {
    pub fn new(owner: OwnerInfo, records: Vec<NumberRecord>, networks: Vec<NetworkSummary>) -> Self {
        let record_count = records.len();
        Self {
            owner,
            records,
            networks,
            record_count,
        }
    }
}

// ============================================================================
// HTTP Fetch Collaborator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Raw upstream answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the HTTP client used to reach upstream providers
///
/// One call per invocation; implementations own timeouts and must not retry.
#[async_trait::async_trait]
pub trait HttpFetch: Send + Sync {
    async fn call(&self, request: FetchRequest) -> std::result::Result<FetchResponse, TransportError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_serializes_sentinel() {
        let owner = OwnerInfo {
            name: FieldValue::Found("Jane Doe".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["name"], "Jane Doe");
        assert_eq!(json["address"], "not found");
        assert_eq!(json["guardianName"], "not found");
    }

    #[test]
    fn test_field_value_blank_capture_is_not_found() {
        assert_eq!(FieldValue::from_capture(Some("  ".into())), FieldValue::NotFound);
        assert_eq!(FieldValue::from_capture(None), FieldValue::NotFound);
        assert!(FieldValue::from_capture(Some("x".into())).is_found());
    }

    #[test]
    fn test_media_record_requires_url() {
        assert!(CanonicalMediaRecord::new("   ").is_none());

        let record = CanonicalMediaRecord::new("https://cdn.example/v.mp4")
            .unwrap()
            .with_title(Some(" ".into()))
            .with_author(Some("someone".into()));
        assert_eq!(record.title, None);
        assert_eq!(record.author.as_deref(), Some("someone"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mediaUrl"], "https://cdn.example/v.mp4");
        assert!(json.get("thumbnailUrl").is_none());
    }

    #[test]
    fn test_network_summary_total() {
        let row = NetworkSummary::new("Jazz", 3, 2);
        assert_eq!(row.total, 5);
        assert!(!row.is_total_row());
        assert!(NetworkSummary::new(TOTAL_ROW, 0, 0).is_total_row());
    }

    #[test]
    fn test_subtype_wire_names() {
        assert_eq!(serde_json::to_string(&Subtype::DataOnly).unwrap(), "\"data-only\"");
        assert_eq!(serde_json::to_string(&Subtype::VoiceData).unwrap(), "\"voice+data\"");
        assert_eq!(serde_json::to_string(&RecordStatus::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn test_exhausted_error_message() {
        let err = RelayError::AllProvidersExhausted {
            attempts: vec![AttemptSummary {
                provider: "a".into(),
                outcome: FailureKind::Rejected,
                reason: "HTTP 500".into(),
            }],
        };
        assert_eq!(err.to_string(), "All providers failed after 1 attempt(s)");
    }

    #[test]
    fn test_fetch_response_success_range() {
        assert!(FetchResponse::new(200, "").is_success());
        assert!(FetchResponse::new(204, "").is_success());
        assert!(!FetchResponse::new(302, "").is_success());
        assert!(!FetchResponse::new(503, "").is_success());
    }
}
