// src/config/sources.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FROM_ENV;

fn env_marker() -> String {
    FROM_ENV.to_string()
}

/// Bounded exponential backoff for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "RetryPolicy::default_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryPolicy::default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "RetryPolicy::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    fn default_attempts() -> u32 {
        3
    }
    fn default_base_delay_ms() -> u64 {
        500
    }
    fn default_max_delay_ms() -> u64 {
        4_000
    }

    /// Sleep before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(ms.min(self.max_delay_ms))
    }

    fn sanitize(&mut self) {
        if self.max_attempts == 0 {
            self.max_attempts = 1;
        }
        if self.base_delay_ms > self.max_delay_ms {
            std::mem::swap(&mut self.base_delay_ms, &mut self.max_delay_ms);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_attempts(),
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

fn default_provider_timeout_secs() -> u64 {
    12
}

// ---------------- model ----------------

fn default_model_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model_name() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    4_000
}
fn default_model_timeout_secs() -> u64 {
    40
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Literal key, or "ENV" to read GEMINI_API_KEY.
    #[serde(default = "env_marker")]
    pub api_key: String,
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: env_marker(),
            endpoint: default_model_endpoint(),
            model: default_model_name(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn sanitize(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = default_model_timeout_secs();
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_output_tokens == 0 {
            self.max_output_tokens = default_max_output_tokens();
        }
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
    }
}

// ---------------- trends ----------------

fn default_trends_endpoint() -> String {
    "https://serpapi.com/search.json".to_string()
}
fn default_timeframes() -> Vec<String> {
    ["today 12-m", "today 3-m", "today 5-y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsConfig {
    /// Literal key, or "ENV" to read SERPAPI_API_KEY.
    #[serde(default = "env_marker")]
    pub api_key: String,
    #[serde(default = "default_trends_endpoint")]
    pub endpoint: String,
    /// Tried in order until one yields non-zero interest.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<String>,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            api_key: env_marker(),
            endpoint: default_trends_endpoint(),
            timeframes: default_timeframes(),
            timeout_secs: default_provider_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl TrendsConfig {
    pub(crate) fn sanitize(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = default_provider_timeout_secs();
        }
        self.timeframes.retain(|t| !t.trim().is_empty());
        if self.timeframes.is_empty() {
            self.timeframes = default_timeframes();
        }
        self.retry.sanitize();
    }
}

// ---------------- competitors ----------------

fn default_competitors_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}
fn default_max_results() -> u32 {
    10
}
fn default_search_depth() -> String {
    "advanced".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorsConfig {
    /// Literal key, or "ENV" to read TAVILY_API_KEY.
    #[serde(default = "env_marker")]
    pub api_key: String,
    #[serde(default = "default_competitors_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// "basic" | "advanced"
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for CompetitorsConfig {
    fn default() -> Self {
        Self {
            api_key: env_marker(),
            endpoint: default_competitors_endpoint(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
            timeout_secs: default_provider_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl CompetitorsConfig {
    pub(crate) fn sanitize(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = default_provider_timeout_secs();
        }
        self.max_results = self.max_results.clamp(1, 20);
        self.search_depth = match self.search_depth.to_ascii_lowercase().as_str() {
            "basic" => "basic".to_string(),
            _ => default_search_depth(),
        };
        self.retry.sanitize();
    }
}

// ---------------- community ----------------

fn default_community_endpoint() -> String {
    "https://www.reddit.com/search.json".to_string()
}
fn default_user_agent() -> String {
    concat!("idea-validator/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_limit() -> u32 {
    50
}
fn default_days() -> u32 {
    180
}
fn default_sort() -> String {
    "new".to_string()
}
fn default_time_filter() -> String {
    "month".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    #[serde(default = "default_community_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional OAuth bearer token; "ENV" reads REDDIT_BEARER_TOKEN. Empty uses the public API.
    #[serde(default)]
    pub bearer_token: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Posts older than this many days are ignored.
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_time_filter")]
    pub time_filter: String,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            endpoint: default_community_endpoint(),
            user_agent: default_user_agent(),
            bearer_token: String::new(),
            limit: default_limit(),
            days: default_days(),
            sort: default_sort(),
            time_filter: default_time_filter(),
            timeout_secs: default_provider_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl CommunityConfig {
    pub(crate) fn sanitize(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = default_provider_timeout_secs();
        }
        self.limit = self.limit.clamp(1, 100);
        if self.days == 0 {
            self.days = default_days();
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self.retry.sanitize();
    }
}
