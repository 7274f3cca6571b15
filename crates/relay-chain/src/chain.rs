//! Ordered provider chain
//!
//! Walks the provider list front to back, one awaited call at a time, and
//! stops at the first provider whose normalizer produces a record. Every
//! failed attempt is kept for diagnostics.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{
    AttemptSummary, FailureKind, HttpFetch, Query, RelayError, Result, TransportError,
};
use tracing::{debug, info, warn};

use crate::normalizer::{Normalized, ResponseNormalizer};
use crate::provider::ProviderDescriptor;

/// How a single provider attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    Success(T),
    Rejected(String),
    TransportFailure(TransportError),
}

/// One attempt against one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAttempt<T> {
    pub provider: String,
    pub outcome: AttemptOutcome<T>,
}

impl<T> ProviderAttempt<T> {
    /// The record, or the diagnostic form of the failure
    pub fn into_result(self) -> std::result::Result<T, AttemptSummary> {
        let (outcome, reason) = match self.outcome {
            AttemptOutcome::Success(record) => return Ok(record),
            AttemptOutcome::Rejected(reason) => (FailureKind::Rejected, reason),
            AttemptOutcome::TransportFailure(e) => (FailureKind::TransportFailure, e.to_string()),
        };
        Err(AttemptSummary {
            provider: self.provider,
            outcome,
            reason,
        })
    }
}

/// The record from the first successful provider
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSuccess<T> {
    pub record: T,
    pub provider: String,
    /// Providers called, including the successful one
    pub attempts: usize,
    /// Failures that preceded the success, in order
    pub failures: Vec<AttemptSummary>,
}

/// Result of a chain run
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome<T> {
    Resolved(ChainSuccess<T>),
    AllFailed(Vec<AttemptSummary>),
}

impl<T> ChainOutcome<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn into_result(self) -> Result<ChainSuccess<T>> {
        match self {
            Self::Resolved(success) => Ok(success),
            Self::AllFailed(attempts) => Err(RelayError::AllProvidersExhausted { attempts }),
        }
    }
}

/// Chain run state
enum ChainState<T> {
    Pending { next: usize },
    Rejected { next: usize },
    Success { record: T, provider: String },
    Exhausted,
}

/// Sequential short-circuit resolver
#[derive(Clone)]
pub struct ProviderChain {
    fetcher: Arc<dyn HttpFetch>,
    inter_attempt_delay: Duration,
}

impl ProviderChain {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            inter_attempt_delay: Duration::ZERO,
        }
    }

    /// Pause inserted between two consecutive attempts
    pub fn with_inter_attempt_delay(mut self, delay: Duration) -> Self {
        self.inter_attempt_delay = delay;
        self
    }

    /// Try each provider in order until one yields a record
    pub async fn resolve<N>(
        &self,
        query: &Query,
        providers: &[ProviderDescriptor<N>],
    ) -> ChainOutcome<N::Output>
    where
        N: ResponseNormalizer,
    {
        let term = query.search_term();
        info!(
            "Resolving {} query across {} provider(s)",
            query.kind(),
            providers.len()
        );

        let mut failures: Vec<AttemptSummary> = Vec::new();
        let mut state = ChainState::Pending { next: 0 };

        loop {
            state = match state {
                ChainState::Pending { next } | ChainState::Rejected { next } => {
                    match providers.get(next) {
                        None => ChainState::Exhausted,
                        Some(provider) => {
                            if next > 0 && !self.inter_attempt_delay.is_zero() {
                                tokio::time::sleep(self.inter_attempt_delay).await;
                            }

                            match self.attempt(provider, term).await.into_result() {
                                Ok(record) => ChainState::Success {
                                    record,
                                    provider: provider.name.clone(),
                                },
                                Err(summary) => {
                                    warn!(
                                        "Provider {} failed ({:?}): {}",
                                        summary.provider, summary.outcome, summary.reason
                                    );
                                    failures.push(summary);
                                    ChainState::Rejected { next: next + 1 }
                                }
                            }
                        }
                    }
                }
                ChainState::Success { record, provider } => {
                    let attempts = failures.len() + 1;
                    info!("Resolved by {} after {} attempt(s)", provider, attempts);
                    return ChainOutcome::Resolved(ChainSuccess {
                        record,
                        provider,
                        attempts,
                        failures,
                    });
                }
                ChainState::Exhausted => {
                    info!("All {} provider(s) failed", failures.len());
                    return ChainOutcome::AllFailed(failures);
                }
            };
        }
    }

    async fn attempt<N>(
        &self,
        provider: &ProviderDescriptor<N>,
        term: &str,
    ) -> ProviderAttempt<N::Output>
    where
        N: ResponseNormalizer,
    {
        let request = provider.build_request(term);
        debug!("{} {} -> {}", request.method, provider.name, request.url);

        let outcome = match self.fetcher.call(request).await {
            Err(e) => AttemptOutcome::TransportFailure(e),
            Ok(response) if !response.is_success() => {
                AttemptOutcome::Rejected(format!("HTTP {}", response.status))
            }
            Ok(response) => match provider.normalizer.normalize(&response.body) {
                Normalized::Record(record) => AttemptOutcome::Success(record),
                Normalized::NotApplicable(reason) => AttemptOutcome::Rejected(format!(
                    "{reason} (expected {})",
                    provider.normalizer.success_field()
                )),
            },
        };

        ProviderAttempt {
            provider: provider.name.clone(),
            outcome,
        }
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("inter_attempt_delay", &self.inter_attempt_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{MediaAdapter, MediaNormalizer};
    use crate::testing::ScriptedFetcher;
    use relay_core::RequestShape;

    const GOOD: &str = r#"{"code":0,"data":{"play":"https://cdn.example/v.mp4"}}"#;

    fn providers(names: &[&str]) -> Vec<ProviderDescriptor<MediaNormalizer>> {
        names
            .iter()
            .map(|name| {
                let endpoint = format!("https://{name}.example/api?url={{query}}");
                ProviderDescriptor::new(
                    *name,
                    endpoint.clone(),
                    RequestShape::Get,
                    MediaNormalizer::new(MediaAdapter::Tikwm, &endpoint),
                )
            })
            .collect()
    }

    fn query() -> Query {
        Query::media("https://www.tiktok.com/@a/video/1", &["tiktok.com".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond("https://a.example", 200, GOOD)
                .respond("https://b.example", 200, GOOD),
        );
        let chain = ProviderChain::new(fetcher.clone());

        let success = chain
            .resolve(&query(), &providers(&["a", "b"]))
            .await
            .into_result()
            .unwrap();

        assert_eq!(success.provider, "a");
        assert_eq!(success.attempts, 1);
        assert!(success.failures.is_empty());
        assert_eq!(fetcher.call_count("https://a.example"), 1);
        assert_eq!(fetcher.call_count("https://b.example"), 0);
    }

    #[tokio::test]
    async fn test_failures_fall_through_in_order() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond("https://a.example", 502, "bad gateway")
                .fail("https://b.example", TransportError::Timeout(15))
                .respond("https://c.example", 200, r#"{"code":0,"data":{}}"#)
                .respond("https://d.example", 200, GOOD)
                .respond("https://e.example", 200, GOOD),
        );
        let chain = ProviderChain::new(fetcher.clone());

        let success = chain
            .resolve(&query(), &providers(&["a", "b", "c", "d", "e"]))
            .await
            .into_result()
            .unwrap();

        assert_eq!(success.provider, "d");
        assert_eq!(success.attempts, 4);
        let outcomes: Vec<(&str, FailureKind)> = success
            .failures
            .iter()
            .map(|f| (f.provider.as_str(), f.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ("a", FailureKind::Rejected),
                ("b", FailureKind::TransportFailure),
                ("c", FailureKind::Rejected),
            ]
        );
        assert_eq!(success.failures[0].reason, "HTTP 502");
        assert_eq!(fetcher.call_count("https://e.example"), 0);

        let order: Vec<String> = fetcher.calls().into_iter().map(|c| c.url).collect();
        assert!(order[0].starts_with("https://a.example"));
        assert!(order[3].starts_with("https://d.example"));
    }

    #[tokio::test]
    async fn test_exhaustion_reports_every_attempt() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond("https://a.example", 200, "<html>oops</html>")
                .fail("https://b.example", TransportError::Connect("refused".into())),
        );
        let chain = ProviderChain::new(fetcher);

        let outcome = chain.resolve(&query(), &providers(&["a", "b"])).await;
        assert!(!outcome.is_resolved());

        match outcome.into_result() {
            Err(RelayError::AllProvidersExhausted { attempts }) => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[1].outcome, FailureKind::TransportFailure);
                assert!(attempts[1].reason.contains("refused"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_provider_list_is_exhausted() {
        let chain = ProviderChain::new(Arc::new(ScriptedFetcher::new()));
        let outcome = chain
            .resolve::<MediaNormalizer>(&query(), &[])
            .await;
        assert_eq!(outcome, ChainOutcome::AllFailed(vec![]));
    }

    #[tokio::test]
    async fn test_delay_only_between_attempts() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("https://a.example", 200, GOOD));
        let chain = ProviderChain::new(fetcher).with_inter_attempt_delay(Duration::from_secs(30));

        // A single successful attempt never waits
        let started = std::time::Instant::now();
        let outcome = chain.resolve(&query(), &providers(&["a"])).await;
        assert!(outcome.is_resolved());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_attempt_into_result() {
        let ok: ProviderAttempt<u8> = ProviderAttempt {
            provider: "p".into(),
            outcome: AttemptOutcome::Success(1),
        };
        assert_eq!(ok.into_result(), Ok(1));

        let failed: ProviderAttempt<u8> = ProviderAttempt {
            provider: "p".into(),
            outcome: AttemptOutcome::TransportFailure(TransportError::Timeout(3)),
        };
        let summary = failed.into_result().unwrap_err();
        assert_eq!(summary.outcome, FailureKind::TransportFailure);
        assert_eq!(summary.reason, "request timed out after 3s");
    }
}
