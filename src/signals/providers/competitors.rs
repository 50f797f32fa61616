// src/signals/providers/competitors.rs
//! Competitor discovery via the Tavily search API.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_user_agent, ensure_success, http_client};
use crate::config::CompetitorsConfig;
use crate::error::ProviderError;
use crate::idea::Idea;
use crate::signals::text::{keywords, normalize_text, truncate_chars};
use crate::signals::{CompetitorHit, CompetitorSignal, SignalProvider};

const SNIPPET_CHARS: usize = 200;
/// Search APIs reject very long queries; long ideas are cut before suffixing.
const MAX_IDEA_QUERY_CHARS: usize = 300;
const TOP_DOMAINS: usize = 10;

/// Encyclopedias, social networks, Q&A sites, news outlets and startup directories.
const NON_COMPETITOR_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "reddit.com",
    "medium.com",
    "quora.com",
    "stackoverflow.com",
    "github.com",
    "crunchbase.com",
    "angel.co",
    "producthunt.com",
    "techcrunch.com",
    "venturebeat.com",
    "forbes.com",
    "bloomberg.com",
    "reuters.com",
    "cnn.com",
    "bbc.com",
];

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

pub struct CompetitorsProvider {
    cfg: CompetitorsConfig,
    http: reqwest::Client,
}

impl CompetitorsProvider {
    pub fn new(cfg: CompetitorsConfig) -> Result<Self> {
        let http = http_client(default_user_agent(), Duration::from_secs(cfg.timeout_secs))?;
        Ok(Self { cfg, http })
    }

    async fn search(&self, query: &str) -> Result<Vec<CompetitorHit>, ProviderError> {
        let req = SearchRequest {
            query,
            max_results: self.cfg.max_results,
            search_depth: &self.cfg.search_depth,
            include_answer: false,
        };
        let resp = self
            .http
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.api_key)
            .json(&req)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(process_results(body.results))
    }
}

#[async_trait]
impl SignalProvider for CompetitorsProvider {
    type Output = CompetitorSignal;

    async fn fetch(&self, idea: &Idea) -> Result<CompetitorSignal, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured);
        }
        let primary = competitor_query(idea.text());
        let hits = self.search(&primary).await?;
        if !hits.is_empty() {
            return Ok(build_signal(idea.text(), primary, hits, false));
        }

        let Some(broader) = broader_query(idea.text()) else {
            return Ok(build_signal(idea.text(), primary, hits, false));
        };
        debug!(
            provider = self.name(),
            idea_id = idea.id(),
            "no competitor hits, trying broader query"
        );
        let hits = self.search(&broader).await?;
        Ok(build_signal(idea.text(), broader, hits, true))
    }

    fn name(&self) -> &'static str {
        "competitors"
    }

    fn is_configured(&self) -> bool {
        !self.cfg.api_key.trim().is_empty()
    }
}

/// Short ideas get extra context words so the search engine returns companies.
pub(crate) fn competitor_query(idea: &str) -> String {
    let idea: String = idea.chars().take(MAX_IDEA_QUERY_CHARS).collect();
    let idea = idea.trim();
    let mut query = if idea.split_whitespace().count() <= 3 {
        format!("{idea} competitors alternatives similar companies")
    } else {
        format!("{idea} competitors alternatives")
    };
    if query.split_whitespace().count() < 5 {
        query.push_str(" companies tools platforms");
    }
    query
}

fn broader_query(idea: &str) -> Option<String> {
    let words = keywords(idea, 4);
    if words.is_empty() {
        return None;
    }
    Some(format!("{} companies", words.join(" ")))
}

/// Host without `www.`, lower-cased; `None` for unparsable or dotless hosts.
pub(crate) fn extract_domain(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.contains('.') && host.len() > 2 {
        Some(host)
    } else {
        None
    }
}

pub(crate) fn is_non_competitor(domain: &str) -> bool {
    NON_COMPETITOR_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
}

fn process_results(results: Vec<SearchResult>) -> Vec<CompetitorHit> {
    results
        .into_iter()
        .filter_map(|r| {
            let title = normalize_text(&r.title);
            let url = r.url.trim().to_string();
            if title.is_empty() || url.is_empty() {
                return None;
            }
            let domain = extract_domain(&url)?;
            if is_non_competitor(&domain) {
                return None;
            }
            Some(CompetitorHit {
                title,
                url,
                domain,
                snippet: truncate_chars(&normalize_text(&r.content), SNIPPET_CHARS),
            })
        })
        .collect()
}

fn build_signal(
    idea: &str,
    search_query: String,
    results: Vec<CompetitorHit>,
    used_fallback: bool,
) -> CompetitorSignal {
    let mut top_domains: Vec<String> = Vec::new();
    for hit in &results {
        if top_domains.len() == TOP_DOMAINS {
            break;
        }
        if !top_domains.contains(&hit.domain) {
            top_domains.push(hit.domain.clone());
        }
    }
    CompetitorSignal {
        query: idea.to_string(),
        search_query,
        competitor_count: results.len(),
        top_domains,
        results,
        used_fallback,
    }
}
