// src/signals/providers/community.rs
//! Community discussion volume from Reddit's search listing.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ensure_success, http_client};
use crate::config::CommunityConfig;
use crate::error::ProviderError;
use crate::idea::Idea;
use crate::signals::text::{keywords, normalize_text};
use crate::signals::{CommunityPost, CommunitySignal, SignalProvider, SubredditCount};

const QUERY_KEYWORDS: usize = 5;
const FALLBACK_KEYWORDS: usize = 3;
const TOP_SUBREDDITS: usize = 5;
const SAMPLE_POSTS: usize = 3;
const PERMALINK_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RawPost,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    permalink: String,
}

pub struct CommunityProvider {
    cfg: CommunityConfig,
    http: reqwest::Client,
}

impl CommunityProvider {
    pub fn new(cfg: CommunityConfig) -> Result<Self> {
        let http = http_client(&cfg.user_agent, Duration::from_secs(cfg.timeout_secs))?;
        Ok(Self { cfg, http })
    }

    async fn search(&self, query: &str) -> Result<Vec<RawPost>, ProviderError> {
        let limit = self.cfg.limit.to_string();
        let mut req = self.http.get(&self.cfg.endpoint).query(&[
            ("q", query),
            ("sort", self.cfg.sort.as_str()),
            ("t", self.cfg.time_filter.as_str()),
            ("limit", limit.as_str()),
            ("raw_json", "1"),
        ]);
        if !self.cfg.bearer_token.trim().is_empty() {
            req = req.bearer_auth(self.cfg.bearer_token.trim());
        }
        let resp = ensure_success(req.send().await?).await?;
        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    fn cutoff(&self) -> i64 {
        chrono::Utc::now().timestamp() - i64::from(self.cfg.days) * 86_400
    }
}

#[async_trait]
impl SignalProvider for CommunityProvider {
    type Output = CommunitySignal;

    async fn fetch(&self, idea: &Idea) -> Result<CommunitySignal, ProviderError> {
        let primary = search_query(idea.text(), QUERY_KEYWORDS);
        let posts = self.search(&primary).await?;
        let signal = summarize(idea.text(), primary.clone(), posts, self.cutoff(), false);
        if signal.posts_last_n_days > 0 {
            return Ok(signal);
        }

        let broader = search_query(idea.text(), FALLBACK_KEYWORDS);
        if broader == primary {
            return Ok(signal);
        }
        debug!(
            provider = self.name(),
            idea_id = idea.id(),
            "no recent posts, trying broader query"
        );
        let posts = self.search(&broader).await?;
        Ok(summarize(idea.text(), broader, posts, self.cutoff(), true))
    }

    fn name(&self) -> &'static str {
        "community"
    }
}

/// Leading keywords, or the first words of the idea when nothing survives filtering.
pub(crate) fn search_query(idea: &str, max_words: usize) -> String {
    let words = keywords(idea, max_words);
    if words.is_empty() {
        idea.split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        words.join(" ")
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Posts at or after `cutoff` (unix secs), in listing order.
fn summarize(
    idea: &str,
    search_query: String,
    raw: Vec<RawPost>,
    cutoff: i64,
    used_fallback: bool,
) -> CommunitySignal {
    let posts: Vec<CommunityPost> = raw
        .into_iter()
        .filter(|p| p.created_utc as i64 >= cutoff)
        .map(|p| CommunityPost {
            title: normalize_text(&p.title),
            subreddit: p.subreddit,
            score: p.score,
            num_comments: p.num_comments,
            created_utc: p.created_utc as i64,
            url: format!("{PERMALINK_BASE}{}", p.permalink),
        })
        .collect();

    let total_score: i64 = posts.iter().map(|p| p.score).sum();
    let total_comments: u64 = posts.iter().map(|p| p.num_comments).sum();
    let (avg_score, avg_comments) = if posts.is_empty() {
        (0.0, 0.0)
    } else {
        let n = posts.len() as f64;
        (
            round2(total_score as f64 / n),
            round2(total_comments as f64 / n),
        )
    };

    CommunitySignal {
        query: idea.to_string(),
        search_query,
        posts_last_n_days: posts.len(),
        total_score,
        total_comments,
        avg_score,
        avg_comments,
        top_subreddits: top_subreddits(&posts),
        sample_posts: posts.iter().take(SAMPLE_POSTS).cloned().collect(),
        used_fallback,
    }
}

/// Most active subreddits by post count; ties broken by name.
fn top_subreddits(posts: &[CommunityPost]) -> Vec<SubredditCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for p in posts.iter().filter(|p| !p.subreddit.is_empty()) {
        *counts.entry(p.subreddit.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<SubredditCount> = counts
        .into_iter()
        .map(|(name, posts)| SubredditCount {
            name: name.to_string(),
            posts,
        })
        .collect();
    ranked.sort_by(|a, b| b.posts.cmp(&a.posts).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_SUBREDDITS);
    ranked
}
