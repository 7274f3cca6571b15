//! Application state management
//!
//! Author: hephaex@gmail.com

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_chain::{
    identity_providers, media_providers, MarkupNormalizer, MediaNormalizer, ProviderChain,
    ProviderDescriptor, ReqwestFetcher,
};
use relay_core::config::AppConfig;
use relay_core::{HttpFetch, Result};
use serde::Serialize;
use tokio::sync::RwLock;

/// Per-endpoint request counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointMetrics {
    pub requests: u64,
    /// Response count by status code
    pub status_counts: BTreeMap<u16, u64>,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
}

impl EndpointMetrics {
    pub fn record(&mut self, status: u16, latency_us: u64) {
        self.requests += 1;
        *self.status_counts.entry(status).or_insert(0) += 1;
        self.total_latency_us = self.total_latency_us.saturating_add(latency_us);
        self.max_latency_us = self.max_latency_us.max(latency_us);
    }

    pub fn avg_latency_us(&self) -> u64 {
        if self.requests == 0 {
            0
        } else {
            self.total_latency_us / self.requests
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Provider chain over the shared fetch client
    pub chain: ProviderChain,
    /// Media providers in attempt order
    pub media_providers: Vec<ProviderDescriptor<MediaNormalizer>>,
    /// Identity providers in attempt order
    pub identity_providers: Vec<ProviderDescriptor<MarkupNormalizer>>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Chain runs that found a record
    pub chain_resolved: AtomicU64,
    /// Chain runs where every provider failed
    pub chain_exhausted: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Metrics keyed by endpoint path
    pub metrics: RwLock<BTreeMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create new application state with the production HTTP client
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::from_config(&config.http)?);
        Self::with_fetcher(config, fetcher)
    }

    /// Create application state over any fetch client
    pub fn with_fetcher(config: AppConfig, fetcher: Arc<dyn HttpFetch>) -> Result<Self> {
        config.validate()?;

        let chain = ProviderChain::new(fetcher).with_inter_attempt_delay(Duration::from_millis(
            config.http.inter_attempt_delay_ms,
        ));
        let media_providers = media_providers(&config.media)?;
        let identity_providers = identity_providers(&config.identity)?;

        Ok(Self {
            config,
            chain,
            media_providers,
            identity_providers,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            chain_resolved: AtomicU64::new(0),
            chain_exhausted: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(BTreeMap::new()),
        })
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Count one finished chain run
    pub fn record_chain_outcome(&self, resolved: bool) {
        let counter = if resolved {
            &self.chain_resolved
        } else {
            &self.chain_exhausted
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// (resolved, exhausted)
    pub fn chain_stats(&self) -> (u64, u64) {
        (
            self.chain_resolved.load(Ordering::SeqCst),
            self.chain_exhausted.load(Ordering::SeqCst),
        )
    }

    /// Record one finished request against its endpoint
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.metrics
            .write()
            .await
            .entry(endpoint)
            .or_default()
            .record(status, latency_us);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("media_providers", &self.media_providers.len())
            .field("identity_providers", &self.identity_providers.len())
            .field("request_count", &self.get_request_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_chain::testing::ScriptedFetcher;

    fn state() -> AppState {
        AppState::with_fetcher(AppConfig::default(), Arc::new(ScriptedFetcher::new())).unwrap()
    }

    #[test]
    fn test_state_builds_providers_in_order() {
        let state = state();
        assert_eq!(state.media_providers.len(), 3);
        assert_eq!(state.identity_providers[0].name, "simdb-primary");
        assert!(state.is_ready());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.identity.window_size = 0;
        assert!(AppState::with_fetcher(config, Arc::new(ScriptedFetcher::new())).is_err());
    }

    #[test]
    fn test_counters() {
        let state = state();
        state.increment_requests();
        state.record_chain_outcome(true);
        state.record_chain_outcome(false);
        state.record_chain_outcome(false);
        assert_eq!(state.get_request_count(), 1);
        assert_eq!(state.chain_stats(), (1, 2));
    }

    #[tokio::test]
    async fn test_record_request() {
        let state = state();
        state.record_request("/health".into(), 200, 100).await;
        state.record_request("/health".into(), 503, 300).await;

        let metrics = state.metrics.read().await;
        let health = &metrics["/health"];
        assert_eq!(health.requests, 2);
        assert_eq!(health.status_counts[&200u16], 1);
        assert_eq!(health.avg_latency_us(), 200);
        assert_eq!(health.max_latency_us, 300);
    }
}
