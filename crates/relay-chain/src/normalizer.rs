//! Response normalizers
//!
//! Each provider answers in its own shape. A normalizer maps one provider's
//! raw body to the canonical record, or reports why it could not. Normalizers
//! are total: malformed or unexpected input is a `NotApplicable`, never a
//! panic or an error.

use std::sync::Arc;

use relay_core::{AggregateReport, CanonicalMediaRecord, RelayError, Result};
use relay_extractor::IdentityExtractor;
use serde_json::Value;
use url::Url;

/// Outcome of normalizing one body
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Record(T),
    NotApplicable(String),
}

/// Uniform contract over provider-specific payload shapes
pub trait ResponseNormalizer: Send + Sync {
    type Output: Send;

    /// Field whose presence makes an attempt a success
    fn success_field(&self) -> &'static str;

    fn normalize(&self, body: &str) -> Normalized<Self::Output>;
}

// ============================================================================
// Media adapters
// ============================================================================

/// Known media payload shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAdapter {
    /// `{code: 0, data: {hdplay, play, cover, title, duration, author: {nickname}}}`
    Tikwm,
    /// `{video: {noWatermark, cover, duration}, title, author: {name}}`
    Tiklydown,
    /// `{status: "ok", links: [{a, t}], cover, desc, author}`
    Lovetik,
}

impl std::str::FromStr for MediaAdapter {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tikwm" => Ok(Self::Tikwm),
            "tiklydown" => Ok(Self::Tiklydown),
            "lovetik" => Ok(Self::Lovetik),
            other => Err(RelayError::Config(format!("unknown media adapter '{other}'"))),
        }
    }
}

impl MediaAdapter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tikwm => "tikwm",
            Self::Tiklydown => "tiklydown",
            Self::Lovetik => "lovetik",
        }
    }
}

/// A media adapter bound to the origin of its provider
#[derive(Debug, Clone)]
pub struct MediaNormalizer {
    adapter: MediaAdapter,
    origin: Option<Url>,
}

impl MediaNormalizer {
    pub fn new(adapter: MediaAdapter, endpoint: &str) -> Self {
        let origin = Url::parse(endpoint)
            .ok()
            .and_then(|u| Url::parse(&u.origin().ascii_serialization()).ok());
        Self { adapter, origin }
    }

    pub fn adapter(&self) -> MediaAdapter {
        self.adapter
    }

    /// Make provider-relative links absolute
    fn absolute(&self, link: Option<String>) -> Option<String> {
        let link = link?;
        if link.starts_with("http://") || link.starts_with("https://") {
            return Some(link);
        }
        if let Some(rest) = link.strip_prefix("//") {
            return Some(format!("https://{rest}"));
        }
        match &self.origin {
            Some(origin) => origin.join(&link).ok().map(String::from),
            None => Some(link),
        }
    }

    fn tikwm(&self, root: &Value) -> Normalized<CanonicalMediaRecord> {
        if root.get("code").and_then(Value::as_i64) != Some(0) {
            let msg = str_at(root, &["msg"]).unwrap_or_else(|| "non-zero code".to_string());
            return Normalized::NotApplicable(format!("provider error: {msg}"));
        }
        let data = &root["data"];
        let media = str_at(data, &["hdplay"]).or_else(|| str_at(data, &["play"]));
        let Some(record) = self.absolute(media).and_then(CanonicalMediaRecord::new) else {
            return Normalized::NotApplicable("missing data.play".to_string());
        };

        Normalized::Record(
            record
                .with_thumbnail(self.absolute(
                    str_at(data, &["cover"]).or_else(|| str_at(data, &["origin_cover"])),
                ))
                .with_title(str_at(data, &["title"]))
                .with_author(
                    str_at(data, &["author", "nickname"])
                        .or_else(|| str_at(data, &["author", "unique_id"])),
                )
                .with_duration(seconds_at(data, &["duration"])),
        )
    }

    fn tiklydown(&self, root: &Value) -> Normalized<CanonicalMediaRecord> {
        let media = str_at(root, &["video", "noWatermark"]);
        let Some(record) = self.absolute(media).and_then(CanonicalMediaRecord::new) else {
            return Normalized::NotApplicable("missing video.noWatermark".to_string());
        };

        Normalized::Record(
            record
                .with_thumbnail(self.absolute(str_at(root, &["video", "cover"])))
                .with_title(str_at(root, &["title"]))
                .with_author(
                    str_at(root, &["author", "name"])
                        .or_else(|| str_at(root, &["author", "unique_id"])),
                )
                .with_duration(
                    seconds_at(root, &["video", "durationFormatted"])
                        .or_else(|| seconds_at(root, &["video", "duration"])),
                ),
        )
    }

    fn lovetik(&self, root: &Value) -> Normalized<CanonicalMediaRecord> {
        if str_at(root, &["status"]).as_deref() != Some("ok") {
            let msg = str_at(root, &["mess"]).unwrap_or_else(|| "status not ok".to_string());
            return Normalized::NotApplicable(format!("provider error: {msg}"));
        }

        let links = root
            .get("links")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let link_url = |link: &Value| str_at(link, &["a"]);
        let is_mp4 = |link: &Value| {
            str_at(link, &["t"])
                .map(|t| t.to_lowercase().contains("mp4"))
                .unwrap_or(false)
        };
        let media = links
            .iter()
            .filter(|l| is_mp4(*l))
            .find_map(link_url)
            .or_else(|| links.iter().find_map(link_url));

        let Some(record) = self.absolute(media).and_then(CanonicalMediaRecord::new) else {
            return Normalized::NotApplicable("missing links[].a".to_string());
        };

        Normalized::Record(
            record
                .with_thumbnail(self.absolute(str_at(root, &["cover"])))
                .with_title(str_at(root, &["desc"]))
                .with_author(str_at(root, &["author"])),
        )
    }
}

impl ResponseNormalizer for MediaNormalizer {
    type Output = CanonicalMediaRecord;

    fn success_field(&self) -> &'static str {
        match self.adapter {
            MediaAdapter::Tikwm => "data.play",
            MediaAdapter::Tiklydown => "video.noWatermark",
            MediaAdapter::Lovetik => "links[].a",
        }
    }

    fn normalize(&self, body: &str) -> Normalized<CanonicalMediaRecord> {
        let root: Value = match serde_json::from_str(body) {
            Ok(root) => root,
            Err(e) => return Normalized::NotApplicable(format!("malformed JSON: {e}")),
        };
        if !root.is_object() {
            return Normalized::NotApplicable("expected a JSON object".to_string());
        }

        match self.adapter {
            MediaAdapter::Tikwm => self.tikwm(&root),
            MediaAdapter::Tiklydown => self.tiklydown(&root),
            MediaAdapter::Lovetik => self.lovetik(&root),
        }
    }
}

// ============================================================================
// Identity adapter
// ============================================================================

/// Markup pages run through the full extraction pass
#[derive(Debug, Clone)]
pub struct MarkupNormalizer {
    extractor: Arc<IdentityExtractor>,
}

impl MarkupNormalizer {
    pub fn new(extractor: Arc<IdentityExtractor>) -> Self {
        Self { extractor }
    }
}

impl ResponseNormalizer for MarkupNormalizer {
    type Output = AggregateReport;

    fn success_field(&self) -> &'static str {
        "records or owner.name"
    }

    fn normalize(&self, body: &str) -> Normalized<AggregateReport> {
        if body.trim().is_empty() {
            return Normalized::NotApplicable("empty page".to_string());
        }

        let report = self.extractor.extract(body);
        if report.records.is_empty() && !report.owner.name.is_found() {
            return Normalized::NotApplicable("no owner details or numbers in page".to_string());
        }
        Normalized::Record(report)
    }
}

// ============================================================================
// JSON helpers
// ============================================================================

/// Non-empty string at a key path; numbers are stringified
fn str_at(value: &Value, path: &[&str]) -> Option<String> {
    let leaf = path.iter().try_fold(value, |v, key| v.get(key))?;
    match leaf {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Seconds at a key path: a number, a numeric string, or `[hh:]mm:ss`
fn seconds_at(value: &Value, path: &[&str]) -> Option<u64> {
    let leaf = path.iter().try_fold(value, |v, key| v.get(key))?;
    match leaf {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => parse_clock(s.trim()),
        _ => None,
    }
}

fn parse_clock(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.split(':').try_fold(0u64, |acc, part| {
        let part: u64 = part.trim().parse().ok()?;
        acc.checked_mul(60)?.checked_add(part)
    })
}
