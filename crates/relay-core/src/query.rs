//! Inbound query types and validation
//!
//! A [`Query`] is only ever constructed through the validating constructors,
//! so anything holding one has already passed input checks.

use crate::{RelayError, Result};
use serde::Serialize;

/// Length of a canonical mobile number (`03XXXXXXXXX`)
const MOBILE_LEN: usize = 11;

/// Length of a CNIC without dashes
const CNIC_LEN: usize = 13;

/// Validated request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Query {
    Media { reference: String },
    Identity { key: IdentityKey },
}

/// Identity search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum IdentityKey {
    Cnic(String),
    Mobile(String),
}

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cnic(v) | Self::Mobile(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cnic(_) => "cnic",
            Self::Mobile(_) => "mobile",
        }
    }
}

impl Query {
    /// Validate a media reference against the accepted platform markers
    pub fn media(reference: &str, platform_markers: &[String]) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(RelayError::Validation("url parameter is required".to_string()));
        }

        let lower = reference.to_lowercase();
        let matches_platform = platform_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()));
        if !matches_platform {
            return Err(RelayError::Validation(format!(
                "url must be a link from {}",
                platform_markers.join(" or ")
            )));
        }

        Ok(Self::Media {
            reference: reference.to_string(),
        })
    }

    /// Validate identity parameters
    ///
    /// At least one must be present and every present one must be well formed.
    /// When both are supplied the CNIC is used as the search key.
    pub fn identity(cnic: Option<&str>, mobile: Option<&str>) -> Result<Self> {
        let cnic = cnic.map(str::trim).filter(|v| !v.is_empty());
        let mobile = mobile.map(str::trim).filter(|v| !v.is_empty());

        let cnic = cnic
            .map(|raw| {
                canonical_cnic(raw).ok_or_else(|| {
                    RelayError::Validation(format!("cnic must be {CNIC_LEN} digits, got '{raw}'"))
                })
            })
            .transpose()?;

        let mobile = mobile
            .map(|raw| {
                canonical_mobile(raw).ok_or_else(|| {
                    RelayError::Validation(format!(
                        "mobile must look like 03XXXXXXXXX, got '{raw}'"
                    ))
                })
            })
            .transpose()?;

        let key = match (cnic, mobile) {
            (Some(cnic), _) => IdentityKey::Cnic(cnic),
            (None, Some(mobile)) => IdentityKey::Mobile(mobile),
            (None, None) => {
                return Err(RelayError::Validation(
                    "either cnic or mobile parameter is required".to_string(),
                ))
            }
        };

        Ok(Self::Identity { key })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Media { .. } => "media",
            Self::Identity { .. } => "identity",
        }
    }

    /// The value substituted into provider requests
    pub fn search_term(&self) -> &str {
        match self {
            Self::Media { reference } => reference,
            Self::Identity { key } => key.as_str(),
        }
    }
}

/// Canonicalise a mobile number to `03XXXXXXXXX`
///
/// Accepts separators (space, dash, dot, parentheses) and the `92`/`+92`
/// country prefix. Returns `None` for anything else.
pub fn canonical_mobile(raw: &str) -> Option<String> {
    let digits = strip_separators(raw, &[' ', '-', '.', '(', ')', '+'])?;

    let local = if digits.len() == 12 && digits.starts_with("92") {
        format!("0{}", &digits[2..])
    } else if digits.len() == 10 && digits.starts_with('3') {
        format!("0{digits}")
    } else {
        digits
    };

    (local.len() == MOBILE_LEN && local.starts_with("03")).then_some(local)
}

/// Canonicalise a CNIC to 13 bare digits
pub fn canonical_cnic(raw: &str) -> Option<String> {
    let digits = strip_separators(raw, &[' ', '-'])?;
    (digits.len() == CNIC_LEN).then_some(digits)
}

fn strip_separators(raw: &str, allowed: &[char]) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !allowed.contains(&c) {
            return None;
        }
    }
    Some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn markers() -> Vec<String> {
        vec!["tiktok.com".to_string()]
    }

    #[test]
    fn test_media_requires_marker() {
        let query = Query::media("https://www.tiktok.com/@a/video/1", &markers()).unwrap();
        assert_eq!(query.kind(), "media");
        assert_eq!(query.search_term(), "https://www.tiktok.com/@a/video/1");

        assert!(matches!(
            Query::media("https://example.com/v/1", &markers()),
            Err(RelayError::Validation(_))
        ));
        assert!(matches!(
            Query::media("   ", &markers()),
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn test_media_marker_case_insensitive() {
        assert!(Query::media("https://VM.TIKTOK.COM/xyz", &markers()).is_ok());
    }

    #[test]
    fn test_identity_requires_one_param() {
        assert!(matches!(
            Query::identity(None, Some("  ")),
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn test_identity_rejects_short_mobile() {
        assert!(matches!(
            Query::identity(None, Some("12345")),
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn test_identity_validates_both_params() {
        // A good CNIC does not excuse a malformed mobile
        assert!(Query::identity(Some("3520212345671"), Some("999")).is_err());
    }

    #[test]
    fn test_identity_prefers_cnic() {
        let query = Query::identity(Some("35202-1234567-1"), Some("03001234567")).unwrap();
        assert_eq!(
            query,
            Query::Identity {
                key: IdentityKey::Cnic("3520212345671".to_string())
            }
        );
    }

    #[test]
    fn test_canonical_mobile_forms() {
        for raw in [
            "03001234567",
            "0300-1234567",
            "0300 123 4567",
            "3001234567",
            "923001234567",
            "+92 300-1234567",
        ] {
            assert_eq!(canonical_mobile(raw).as_deref(), Some("03001234567"), "{raw}");
        }
        assert_eq!(canonical_mobile("04001234567"), None);
        assert_eq!(canonical_mobile("0300123456a"), None);
    }

    #[test]
    fn test_canonical_cnic() {
        assert_eq!(canonical_cnic("35202-1234567-1").as_deref(), Some("3520212345671"));
        assert_eq!(canonical_cnic("352021234567"), None);
    }

    proptest! {
        #[test]
        fn prop_dashed_and_bare_mobile_agree(prefix in 0u32..100, rest in 0u32..10_000_000) {
            let bare = format!("03{prefix:02}{rest:07}");
            let dashed = format!("03{prefix:02}-{rest:07}");
            prop_assert_eq!(canonical_mobile(&bare), canonical_mobile(&dashed));
            prop_assert_eq!(canonical_mobile(&bare), Some(bare.clone()));
        }
    }
}
