//! Relay Chain - Multi-provider resolution
//!
//! This crate turns a validated [`relay_core::Query`] into one canonical
//! record by walking an ordered list of upstream providers:
//! - [`ProviderDescriptor`]: endpoint, request shape and normalizer per provider
//! - [`ResponseNormalizer`]: one adapter per payload shape
//! - [`ProviderChain`]: sequential short-circuit resolution with attempt history
//! - [`ReqwestFetcher`]: the production HTTP fetch client
//!
//! Author: hephaex@gmail.com

pub mod chain;
pub mod fetch;
pub mod normalizer;
pub mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use chain::{AttemptOutcome, ChainOutcome, ChainSuccess, ProviderAttempt, ProviderChain};
pub use fetch::ReqwestFetcher;
pub use normalizer::{
    MarkupNormalizer, MediaAdapter, MediaNormalizer, Normalized, ResponseNormalizer,
};
pub use provider::{identity_providers, media_providers, ProviderDescriptor, QUERY_PLACEHOLDER};
