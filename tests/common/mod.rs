// tests/common/mod.rs
//
// Shared fixtures for integration tests: stub providers, stub model clients,
// a schema-conformant analysis, and pipeline builders. No network access.
#![allow(dead_code)]

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use idea_validator::analyze::{AnalysisRequest, ModelClient};
use idea_validator::config::{RetryPolicy, ValidatorConfig};
use idea_validator::error::{ModelError, ProviderError};
use idea_validator::idea::Idea;
use idea_validator::signals::{
    CallPolicy, CommunitySignal, CompetitorHit, CompetitorSignal, SignalGatherer, SignalProvider,
    SubredditCount, TrendDirection, TrendSignal,
};
use idea_validator::ValidationPipeline;

pub const SCISSORS: &str = "A subscription box for left-handed scissors";

// ---------------- fixtures ----------------

pub fn conformant_analysis() -> Value {
    json!({
        "analysis_metadata": {
            "confidence_score": 0.68,
            "analysis_depth": "comprehensive",
            "data_sources_used": ["trends", "competitors", "community"]
        },
        "market_assessment": {
            "overall_score": 58,
            "verdict": "Promising with caveats",
            "market_saturation": "Low: few subscription offers for left-handed tools",
            "entry_barriers": "Low capital, but supplier access matters",
            "market_timing": "Craft subscriptions are steady, not booming"
        },
        "competitive_landscape": {
            "existing_solutions": [{
                "name": "Anything Left-Handed",
                "strengths": ["Established specialist brand"],
                "weaknesses": ["One-off purchases only"],
                "market_position": "Niche Player",
                "customer_pain_points": ["No curated discovery"],
                "differentiation_gaps": ["No recurring offer"]
            }],
            "market_gaps": ["Curated recurring delivery for left-handers"],
            "competitive_advantages": ["Community-driven curation"],
            "market_saturation_level": "Low, with a handful of specialist retailers"
        },
        "uniqueness_analysis": {
            "novelty_score": 6,
            "differentiation_factors": ["Subscription format in a retail-only niche"],
            "copycat_risk": "Medium: easy for retailers to add boxes",
            "innovation_level": "Incremental",
            "unique_value_proposition": "Tools that fit left hands, delivered monthly"
        },
        "business_viability": {
            "customer_value_proposition": "Removes the hunt for left-handed tools",
            "target_market_size": "Small: roughly 10% of crafters and students",
            "monetization_potential": "Medium via tiers and gifting",
            "pricing_strategy": "Monthly plan with annual discount",
            "customer_acquisition_cost": "Low through left-handed communities",
            "unit_economics": "Viable if churn stays under 8% monthly"
        },
        "risk_assessment": {
            "market_risks": ["Scissors alone may not sustain monthly novelty"],
            "execution_risks": ["Sourcing enough distinct products"],
            "competitive_risks": ["Specialist retailers launching boxes"],
            "mitigation_strategies": ["Broaden into left-handed stationery and kitchen tools"],
            "risk_level": "Medium"
        },
        "value_enhancement_roadmap": {
            "current_gaps": ["No proof of repeat demand"],
            "differentiation_opportunities": ["Ergonomic reviews by left-handed makers"],
            "feature_prioritization": ["Pre-order landing page before inventory"],
            "market_positioning": ["Gift-first positioning for parents of lefties"],
            "competitive_response_strategy": ["Exclusive supplier agreements"]
        },
        "strategic_recommendations": {
            "market_entry_strategy": "Pre-sell through left-handed forums and craft groups",
            "pivot_suggestions": ["One-off curated kits instead of subscriptions"],
            "success_factors": ["Low churn", "Product variety"],
            "next_steps": ["Validate with 200 waitlist sign-ups"],
            "timeline_recommendations": "Pilot in 6 weeks, first boxes in 3 months"
        }
    })
}

pub fn trend_signal() -> TrendSignal {
    TrendSignal {
        query: SCISSORS.into(),
        cleaned_query: "subscription box left-handed scissors".into(),
        timeframe: "today 12-m".into(),
        interest_score: 31,
        trend_direction: TrendDirection::Steady,
        trend_velocity: 4,
        data_points: 52,
        min_score: 18,
        max_score: 47,
        used_fallback: false,
    }
}

pub fn competitor_signal() -> CompetitorSignal {
    CompetitorSignal {
        query: SCISSORS.into(),
        search_query: format!("{SCISSORS} competitors alternatives"),
        competitor_count: 1,
        top_domains: vec!["anythingleft-handed.example".into()],
        results: vec![CompetitorHit {
            title: "Anything Left-Handed".into(),
            url: "https://anythingleft-handed.example".into(),
            domain: "anythingleft-handed.example".into(),
            snippet: "Specialist left-handed products".into(),
        }],
        used_fallback: false,
    }
}

pub fn community_signal() -> CommunitySignal {
    CommunitySignal {
        query: SCISSORS.into(),
        search_query: "subscription box left-handed scissors".into(),
        posts_last_n_days: 3,
        total_score: 120,
        total_comments: 45,
        avg_score: 40.0,
        avg_comments: 15.0,
        top_subreddits: vec![SubredditCount {
            name: "lefthanded".into(),
            posts: 3,
        }],
        sample_posts: vec![],
        used_fallback: false,
    }
}

// ---------------- stub providers ----------------

/// Returns the same data on every call and counts calls.
pub struct StaticProvider<T> {
    pub name: &'static str,
    pub data: T,
    pub calls: AtomicU32,
}

impl<T> StaticProvider<T> {
    pub fn new(name: &'static str, data: T) -> Arc<Self> {
        Arc::new(Self {
            name,
            data,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> SignalProvider for StaticProvider<T> {
    type Output = T;

    async fn fetch(&self, _idea: &Idea) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Always fails with the given HTTP status.
pub struct FailingProvider<T> {
    pub name: &'static str,
    pub status: u16,
    pub calls: AtomicU32,
    _out: PhantomData<fn() -> T>,
}

impl<T> FailingProvider<T> {
    pub fn new(name: &'static str, status: u16) -> Arc<Self> {
        Arc::new(Self {
            name,
            status,
            calls: AtomicU32::new(0),
            _out: PhantomData,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Send + 'static> SignalProvider for FailingProvider<T> {
    type Output = T;

    async fn fetch(&self, _idea: &Idea) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Status {
            status: self.status,
            body: "upstream unavailable".into(),
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Sleeps before answering; used for timeout and concurrency checks.
pub struct SlowProvider<T> {
    pub name: &'static str,
    pub delay: Duration,
    pub data: T,
}

impl<T> SlowProvider<T> {
    pub fn new(name: &'static str, delay: Duration, data: T) -> Arc<Self> {
        Arc::new(Self { name, delay, data })
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> SignalProvider for SlowProvider<T> {
    type Output = T;

    async fn fetch(&self, _idea: &Idea) -> Result<T, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.data.clone())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Reports missing credentials; must never be called.
pub struct UnconfiguredProvider<T> {
    pub name: &'static str,
    pub calls: AtomicU32,
    _out: PhantomData<fn() -> T>,
}

impl<T> UnconfiguredProvider<T> {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicU32::new(0),
            _out: PhantomData,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Send + 'static> SignalProvider for UnconfiguredProvider<T> {
    type Output = T;

    async fn fetch(&self, _idea: &Idea) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        false
    }
}

// ---------------- stub models ----------------

pub enum ModelBehavior {
    Reply(String),
    Fail(u16),
    Sleep(Duration),
}

/// Scripted model client that records every prompt it receives.
pub struct StubModel {
    pub behavior: ModelBehavior,
    pub calls: AtomicU32,
    pub last_request: Mutex<Option<AnalysisRequest>>,
}

impl StubModel {
    pub fn new(behavior: ModelBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn replying(raw: impl Into<String>) -> Arc<Self> {
        Self::new(ModelBehavior::Reply(raw.into()))
    }

    pub fn conformant() -> Arc<Self> {
        Self::replying(conformant_analysis().to_string())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.prompt.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for StubModel {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.behavior {
            ModelBehavior::Reply(raw) => Ok(raw.clone()),
            ModelBehavior::Fail(status) => Err(ModelError::Status {
                status: *status,
                body: "model error".into(),
            }),
            ModelBehavior::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok(conformant_analysis().to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

// ---------------- builders ----------------

/// Defaults with short provider budgets so failures settle quickly.
pub fn test_config() -> ValidatorConfig {
    let mut cfg = ValidatorConfig::default();
    cfg.model.api_key = "test-key".into();
    cfg.model.timeout_secs = 5;
    cfg.pipeline.deadline_secs = 10;
    cfg
}

pub fn fast_policy(timeout: Duration, attempts: u32) -> CallPolicy {
    CallPolicy::new(
        timeout,
        RetryPolicy {
            max_attempts: attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
    )
}

pub type Trends = Arc<dyn SignalProvider<Output = TrendSignal>>;
pub type Competitors = Arc<dyn SignalProvider<Output = CompetitorSignal>>;
pub type Community = Arc<dyn SignalProvider<Output = CommunitySignal>>;

pub fn gatherer(trends: Trends, competitors: Competitors, community: Community) -> SignalGatherer {
    let p = fast_policy(Duration::from_millis(300), 2);
    SignalGatherer::new(trends, competitors, community).with_policies(p, p, p)
}

pub fn pipeline_with(
    cfg: ValidatorConfig,
    trends: Trends,
    competitors: Competitors,
    community: Community,
    model: Arc<StubModel>,
) -> ValidationPipeline {
    ValidationPipeline::new(cfg, gatherer(trends, competitors, community), model)
}

/// All three providers present and a conformant model reply.
pub fn happy_pipeline(model: Arc<StubModel>) -> ValidationPipeline {
    pipeline_with(
        test_config(),
        StaticProvider::new("trends", trend_signal()),
        StaticProvider::new("competitors", competitor_signal()),
        StaticProvider::new("community", community_signal()),
        model,
    )
}
