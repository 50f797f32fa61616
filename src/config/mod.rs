// src/config/mod.rs
//! Service configuration: credentials and tunables for every provider.
//!
//! The config is loaded once at startup and passed into the pipeline by value,
//! so tests can build pipelines with distinct credentials side by side.

pub mod sources;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use sources::{CommunityConfig, CompetitorsConfig, ModelConfig, RetryPolicy, TrendsConfig};

pub const ENV_CONFIG_PATH: &str = "VALIDATOR_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/validator.toml";
pub const DEFAULT_JSON_PATH: &str = "config/validator.json";

/// Marker value meaning "read this secret from the environment".
pub(crate) const FROM_ENV: &str = "ENV";

fn default_deadline_secs() -> u64 {
    60
}
fn default_min_idea_chars() -> usize {
    10
}
fn default_max_idea_chars() -> usize {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound for one whole validation run (hosting platforms cap at ~60s).
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_min_idea_chars")]
    pub min_idea_chars: usize,
    #[serde(default = "default_max_idea_chars")]
    pub max_idea_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            min_idea_chars: default_min_idea_chars(),
            max_idea_chars: default_max_idea_chars(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub competitors: CompetitorsConfig,
    #[serde(default)]
    pub community: CommunityConfig,
}

impl ValidatorConfig {
    /// Load from an explicit path. Supports TOML or JSON (by extension, then by content).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading validator config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = Self::parse(&content, &ext)
            .with_context(|| format!("parsing validator config {}", path.display()))?;
        cfg.resolve_env_secrets();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $VALIDATOR_CONFIG_PATH
    /// 2) config/validator.toml
    /// 3) config/validator.json
    /// 4) built-in defaults (all secrets from the environment)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
        }
        let mut cfg = Self::default();
        cfg.resolve_env_secrets();
        cfg.sanitize();
        Ok(cfg)
    }

    fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        match hint_ext {
            "toml" => Ok(toml::from_str(s)?),
            "json" => Ok(serde_json::from_str(s)?),
            _ => {
                if let Ok(v) = serde_json::from_str(s) {
                    return Ok(v);
                }
                toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
            }
        }
    }

    /// Replace `"ENV"` placeholders with the matching environment variable
    /// (empty when unset, which marks the provider as not configured).
    pub fn resolve_env_secrets(&mut self) {
        resolve_secret(&mut self.model.api_key, "GEMINI_API_KEY");
        resolve_secret(&mut self.trends.api_key, "SERPAPI_API_KEY");
        resolve_secret(&mut self.competitors.api_key, "TAVILY_API_KEY");
        resolve_secret(&mut self.community.bearer_token, "REDDIT_BEARER_TOKEN");
    }

    /// Clamp tunables into workable ranges instead of failing startup.
    pub fn sanitize(&mut self) {
        if self.pipeline.deadline_secs == 0 {
            self.pipeline.deadline_secs = default_deadline_secs();
        }
        if self.pipeline.min_idea_chars == 0 {
            self.pipeline.min_idea_chars = 1;
        }
        if self.pipeline.max_idea_chars < self.pipeline.min_idea_chars {
            self.pipeline.max_idea_chars = default_max_idea_chars().max(self.pipeline.min_idea_chars);
        }
        self.model.sanitize();
        self.trends.sanitize();
        self.competitors.sanitize();
        self.community.sanitize();
    }

    /// Startup check: without a model key every run would fail, so refuse to boot.
    pub fn require_model_credentials(&self) -> Result<()> {
        if self.model.api_key.trim().is_empty() {
            anyhow::bail!("Missing GEMINI_API_KEY (model.api_key) for the analysis model");
        }
        Ok(())
    }
}

fn resolve_secret(slot: &mut String, var: &str) {
    if slot.trim().eq_ignore_ascii_case(FROM_ENV) {
        *slot = std::env::var(var).unwrap_or_default();
    }
}
