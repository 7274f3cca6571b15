//! Provider descriptors
//!
//! A descriptor ties one configured upstream to its request shape and its
//! normalizer. The registry functions turn the ordered config lists into
//! descriptor lists the chain walks front to back.

use std::sync::Arc;

use relay_core::{FetchRequest, IdentityConfig, MediaConfig, RelayError, RequestShape, Result};
use relay_extractor::IdentityExtractor;
use url::form_urlencoded;

use crate::normalizer::{MarkupNormalizer, MediaAdapter, MediaNormalizer, ResponseNormalizer};

/// Placeholder replaced by the url-encoded search term
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// One upstream provider
#[derive(Debug, Clone)]
pub struct ProviderDescriptor<N> {
    pub name: String,
    pub endpoint_template: String,
    pub request_shape: RequestShape,
    pub normalizer: N,
}

impl<N: ResponseNormalizer> ProviderDescriptor<N> {
    pub fn new(
        name: impl Into<String>,
        endpoint_template: impl Into<String>,
        request_shape: RequestShape,
        normalizer: N,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint_template: endpoint_template.into(),
            request_shape,
            normalizer,
        }
    }

    /// Build the outbound call for a search term
    pub fn build_request(&self, term: &str) -> FetchRequest {
        let encoded: String = form_urlencoded::byte_serialize(term.as_bytes()).collect();
        let url = self.endpoint_template.replace(QUERY_PLACEHOLDER, &encoded);

        let request = match &self.request_shape {
            RequestShape::Get => FetchRequest::get(url),
            RequestShape::Form { field } => {
                let body = form_urlencoded::Serializer::new(String::new())
                    .append_pair(field, term)
                    .finish();
                FetchRequest::post(url, body)
                    .with_header("Content-Type", "application/x-www-form-urlencoded")
            }
            RequestShape::Json { field } => {
                let mut object = serde_json::Map::new();
                object.insert(field.clone(), serde_json::Value::String(term.to_string()));
                FetchRequest::post(url, serde_json::Value::Object(object).to_string())
                    .with_header("Content-Type", "application/json")
            }
        };

        request.with_header("Accept", "application/json, text/html;q=0.9, */*;q=0.8")
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Media providers in configured order
pub fn media_providers(config: &MediaConfig) -> Result<Vec<ProviderDescriptor<MediaNormalizer>>> {
    if config.providers.is_empty() {
        return Err(RelayError::Config("no media providers configured".to_string()));
    }

    config
        .providers
        .iter()
        .map(|entry| {
            let adapter: MediaAdapter = entry.adapter.parse()?;
            Ok(ProviderDescriptor::new(
                entry.name.clone(),
                entry.endpoint.clone(),
                entry.request.clone(),
                MediaNormalizer::new(adapter, &entry.endpoint),
            ))
        })
        .collect()
}

/// Identity providers in configured order, sharing one extractor
pub fn identity_providers(
    config: &IdentityConfig,
) -> Result<Vec<ProviderDescriptor<MarkupNormalizer>>> {
    if config.providers.is_empty() {
        return Err(RelayError::Config("no identity providers configured".to_string()));
    }

    let extractor = Arc::new(IdentityExtractor::from_config(config)?);
    config
        .providers
        .iter()
        .map(|entry| match entry.adapter.to_lowercase().as_str() {
            "markup" => Ok(ProviderDescriptor::new(
                entry.name.clone(),
                entry.endpoint.clone(),
                entry.request.clone(),
                MarkupNormalizer::new(Arc::clone(&extractor)),
            )),
            other => Err(RelayError::Config(format!(
                "unknown identity adapter '{other}' for provider '{}'",
                entry.name
            ))),
        })
        .collect()
}
