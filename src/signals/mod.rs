// src/signals/mod.rs
//! Signal gathering: concurrent fan-out to the three market-data providers.
//!
//! Each provider runs under its own timeout and retry budget and writes only
//! its own slot of the bundle, so one slow or failing provider never blocks or
//! aborts the others.

pub mod providers;
pub mod text;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::config::{RetryPolicy, ValidatorConfig};
use crate::error::ProviderError;
use crate::idea::Idea;

pub use types::{
    CommunityPost, CommunitySignal, CompetitorHit, CompetitorSignal, ProviderStatus, SignalBundle,
    SignalKind, SignalSelection, SignalSlot, SubredditCount, TrendDirection, TrendSignal,
    UnavailableKind,
};

/// One external data source.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    type Output: Send;

    /// Single attempt against the upstream API.
    async fn fetch(&self, idea: &Idea) -> Result<Self::Output, ProviderError>;

    fn name(&self) -> &'static str;

    /// False when credentials are missing; the gatherer then skips the call.
    fn is_configured(&self) -> bool {
        true
    }
}

pub type DynProvider<T> = Arc<dyn SignalProvider<Output = T>>;

/// Timeout and retry budget for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl CallPolicy {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    fn clamped_to(self, budget: Duration) -> Self {
        Self {
            timeout: self.timeout.min(budget),
            retry: self.retry,
        }
    }
}

pub struct SignalGatherer {
    trends: DynProvider<TrendSignal>,
    competitors: DynProvider<CompetitorSignal>,
    community: DynProvider<CommunitySignal>,
    trends_policy: CallPolicy,
    competitors_policy: CallPolicy,
    community_policy: CallPolicy,
}

impl SignalGatherer {
    pub fn new(
        trends: DynProvider<TrendSignal>,
        competitors: DynProvider<CompetitorSignal>,
        community: DynProvider<CommunitySignal>,
    ) -> Self {
        let policy = CallPolicy::new(Duration::from_secs(12), RetryPolicy::default());
        Self {
            trends,
            competitors,
            community,
            trends_policy: policy,
            competitors_policy: policy,
            community_policy: policy,
        }
    }

    /// Production wiring: HTTP providers with the configured budgets.
    pub fn from_config(cfg: &ValidatorConfig) -> anyhow::Result<Self> {
        let trends = providers::TrendsProvider::new(cfg.trends.clone())?;
        let competitors = providers::CompetitorsProvider::new(cfg.competitors.clone())?;
        let community = providers::CommunityProvider::new(cfg.community.clone())?;
        Ok(Self::new(Arc::new(trends), Arc::new(competitors), Arc::new(community))
            .with_policies(
                CallPolicy::new(Duration::from_secs(cfg.trends.timeout_secs), cfg.trends.retry),
                CallPolicy::new(
                    Duration::from_secs(cfg.competitors.timeout_secs),
                    cfg.competitors.retry,
                ),
                CallPolicy::new(
                    Duration::from_secs(cfg.community.timeout_secs),
                    cfg.community.retry,
                ),
            ))
    }

    pub fn with_policies(
        mut self,
        trends: CallPolicy,
        competitors: CallPolicy,
        community: CallPolicy,
    ) -> Self {
        self.trends_policy = trends;
        self.competitors_policy = competitors;
        self.community_policy = community;
        self
    }

    /// Configured-ness of each provider, without any network call.
    pub fn configured(&self) -> [(SignalKind, bool); 3] {
        [
            (SignalKind::Trends, self.trends.is_configured()),
            (SignalKind::Competitors, self.competitors.is_configured()),
            (SignalKind::Community, self.community.is_configured()),
        ]
    }

    /// Run the selected providers concurrently; every slot settles within `budget`.
    pub async fn gather(
        &self,
        idea: &Idea,
        selection: SignalSelection,
        budget: Duration,
    ) -> SignalBundle {
        let started = Instant::now();
        let (trends, competitors, community) = tokio::join!(
            collect(
                self.trends.as_ref(),
                idea,
                selection.trends,
                self.trends_policy.clamped_to(budget),
            ),
            collect(
                self.competitors.as_ref(),
                idea,
                selection.competitors,
                self.competitors_policy.clamped_to(budget),
            ),
            collect(
                self.community.as_ref(),
                idea,
                selection.community,
                self.community_policy.clamped_to(budget),
            ),
        );
        let bundle = SignalBundle {
            trends,
            competitors,
            community,
        };
        info!(
            idea_id = idea.id(),
            present = bundle.present_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "signals gathered"
        );
        bundle
    }
}

async fn collect<T: Send>(
    provider: &dyn SignalProvider<Output = T>,
    idea: &Idea,
    enabled: bool,
    policy: CallPolicy,
) -> SignalSlot<T> {
    let name = provider.name();
    if !enabled {
        return SignalSlot::unavailable(UnavailableKind::NotRequested, "not requested by caller");
    }
    if !provider.is_configured() {
        debug!(provider = name, "provider skipped: missing credentials");
        return SignalSlot::unavailable(
            UnavailableKind::NotConfigured,
            format!("{name} provider is not configured"),
        );
    }

    let started = Instant::now();
    match tokio::time::timeout(policy.timeout, fetch_with_retry(provider, idea, &policy.retry))
        .await
    {
        Ok(Ok((data, attempts))) => SignalSlot::Present {
            data,
            attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
        Ok(Err(e)) => {
            warn!(error = %e, provider = name, idea_id = idea.id(), "provider failed");
            counter!("signal_provider_errors_total", "provider" => name).increment(1);
            SignalSlot::unavailable(UnavailableKind::Failed, e.to_string())
        }
        Err(_) => {
            warn!(
                provider = name,
                idea_id = idea.id(),
                timeout_ms = policy.timeout.as_millis() as u64,
                "provider timed out"
            );
            counter!("signal_provider_errors_total", "provider" => name).increment(1);
            SignalSlot::unavailable(
                UnavailableKind::TimedOut,
                format!("timed out after {}ms", policy.timeout.as_millis()),
            )
        }
    }
}

/// Retries retryable errors with exponential backoff; returns data and attempt count.
async fn fetch_with_retry<T: Send>(
    provider: &dyn SignalProvider<Output = T>,
    idea: &Idea,
    retry: &RetryPolicy,
) -> Result<(T, u32), ProviderError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        counter!("signal_provider_attempts_total", "provider" => provider.name()).increment(1);
        match provider.fetch(idea).await {
            Ok(data) => return Ok((data, attempt)),
            Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                let delay = retry.delay_after(attempt);
                warn!(
                    error = %e,
                    provider = provider.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying provider"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a retryable status `failures` times, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        status: u16,
    }

    #[async_trait]
    impl SignalProvider for Flaky {
        type Output = u32;

        async fn fetch(&self, _idea: &Idea) -> Result<u32, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(ProviderError::Status {
                    status: self.status,
                    body: "busy".into(),
                });
            }
            Ok(n)
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn idea() -> Idea {
        Idea::parse("A subscription box for left-handed scissors", &PipelineConfig::default())
            .unwrap()
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let p = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
            status: 503,
        };
        let (value, attempts) = fetch_with_retry(&p, &idea(), &fast_retry(3)).await.unwrap();
        assert_eq!(value, 3);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let p = Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
            status: 500,
        };
        let err = fetch_with_retry(&p, &idea(), &fast_retry(2)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
        assert_eq!(p.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let p = Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
            status: 401,
        };
        assert!(fetch_with_retry(&p, &idea(), &fast_retry(5)).await.is_err());
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_signal_is_not_fetched() {
        let p = Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
            status: 200,
        };
        let policy = CallPolicy::new(Duration::from_secs(1), fast_retry(1));
        let slot = collect(&p, &idea(), false, policy).await;
        assert_eq!(
            slot,
            SignalSlot::unavailable(UnavailableKind::NotRequested, "not requested by caller")
        );
        assert_eq!(p.calls.load(Ordering::SeqCst), 0);
    }
}
