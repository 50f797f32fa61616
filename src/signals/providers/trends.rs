// src/signals/providers/trends.rs
//! Search-interest trend via the SerpApi Google Trends engine.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{default_user_agent, ensure_success, http_client};
use crate::config::TrendsConfig;
use crate::error::ProviderError;
use crate::idea::Idea;
use crate::signals::text::keywords;
use crate::signals::{SignalProvider, TrendDirection, TrendSignal};

/// Google Trends handles short keyword queries far better than sentences.
const QUERY_KEYWORDS: usize = 4;
const MAX_QUERY_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    interest_over_time: Option<InterestOverTime>,
}

#[derive(Debug, Deserialize)]
struct InterestOverTime {
    #[serde(default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    #[serde(default)]
    values: Vec<TimelineValue>,
}

#[derive(Debug, Deserialize)]
struct TimelineValue {
    #[serde(default)]
    extracted_value: Option<f64>,
}

pub struct TrendsProvider {
    cfg: TrendsConfig,
    http: reqwest::Client,
}

impl TrendsProvider {
    pub fn new(cfg: TrendsConfig) -> Result<Self> {
        let http = http_client(default_user_agent(), Duration::from_secs(cfg.timeout_secs))?;
        Ok(Self { cfg, http })
    }

    async fn fetch_series(&self, query: &str, timeframe: &str) -> Result<Vec<u32>, ProviderError> {
        let resp = self
            .http
            .get(&self.cfg.endpoint)
            .query(&[
                ("engine", "google_trends"),
                ("data_type", "TIMESERIES"),
                ("q", query),
                ("date", timeframe),
                ("api_key", self.cfg.api_key.as_str()),
            ])
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        let body: SerpResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        parse_series(body)
    }
}

#[async_trait]
impl SignalProvider for TrendsProvider {
    type Output = TrendSignal;

    async fn fetch(&self, idea: &Idea) -> Result<TrendSignal, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured);
        }
        let query = clean_query(idea.text());
        let mut last: Option<TrendSignal> = None;

        for (i, timeframe) in self.cfg.timeframes.iter().enumerate() {
            let series = self.fetch_series(&query, timeframe).await?;
            let signal = build_signal(idea.text(), &query, timeframe, &series, i > 0);
            if signal.interest_score > 0 {
                return Ok(signal);
            }
            debug!(
                provider = self.name(),
                idea_id = idea.id(),
                timeframe = timeframe.as_str(),
                points = series.len(),
                "no search interest, widening timeframe"
            );
            last = Some(signal);
        }

        // Zero interest across every timeframe is still an answer.
        last.ok_or_else(|| ProviderError::NoData("no timeframes configured".to_string()))
    }

    fn name(&self) -> &'static str {
        "trends"
    }

    fn is_configured(&self) -> bool {
        !self.cfg.api_key.trim().is_empty()
    }
}

fn parse_series(body: SerpResponse) -> Result<Vec<u32>, ProviderError> {
    if let Some(err) = body.error {
        // SerpApi reports an empty result set as an error string.
        if err.to_ascii_lowercase().contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        return Err(ProviderError::Upstream(err));
    }
    let points = body
        .interest_over_time
        .map(|i| i.timeline_data)
        .unwrap_or_default();
    Ok(points
        .iter()
        .map(|p| {
            p.values
                .first()
                .and_then(|v| v.extracted_value)
                .unwrap_or(0.0)
                .clamp(0.0, 100.0) as u32
        })
        .collect())
}

/// Short keyword query for the trends engine.
pub(crate) fn clean_query(idea: &str) -> String {
    let words = keywords(idea, QUERY_KEYWORDS);
    let query = if words.is_empty() {
        idea.split_whitespace()
            .take(QUERY_KEYWORDS)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        words.join(" ")
    };
    query
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SeriesMetrics {
    pub interest: u32,
    pub direction: TrendDirection,
    pub velocity: i32,
    pub min: u32,
    pub max: u32,
}

pub(crate) fn series_metrics(series: &[u32]) -> SeriesMetrics {
    if series.is_empty() {
        return SeriesMetrics {
            interest: 0,
            direction: TrendDirection::Unknown,
            velocity: 0,
            min: 0,
            max: 0,
        };
    }
    let n = series.len();
    let mean = |s: &[u32]| s.iter().map(|v| *v as f64).sum::<f64>() / s.len() as f64;

    let (direction, velocity) = if n >= 6 {
        let half = n / 2;
        let first = mean(&series[..half]);
        let last = mean(&series[half..]);
        let direction = if last > first * 1.15 {
            TrendDirection::Rising
        } else if last < first * 0.85 {
            TrendDirection::Falling
        } else {
            TrendDirection::Steady
        };
        let velocity = if n >= 12 {
            let recent = mean(&series[n - 3..]);
            let previous = mean(&series[n - 6..n - 3]);
            if previous > 0.0 {
                ((recent - previous) / previous * 100.0) as i32
            } else {
                0
            }
        } else {
            0
        };
        (direction, velocity)
    } else {
        (TrendDirection::Steady, 0)
    };

    SeriesMetrics {
        interest: mean(series) as u32,
        direction,
        velocity,
        min: series.iter().copied().min().unwrap_or(0),
        max: series.iter().copied().max().unwrap_or(0),
    }
}

fn build_signal(
    query: &str,
    cleaned: &str,
    timeframe: &str,
    series: &[u32],
    used_fallback: bool,
) -> TrendSignal {
    let m = series_metrics(series);
    TrendSignal {
        query: query.to_string(),
        cleaned_query: cleaned.to_string(),
        timeframe: timeframe.to_string(),
        interest_score: m.interest,
        trend_direction: m.direction,
        trend_velocity: m.velocity,
        data_points: series.len(),
        min_score: m.min,
        max_score: m.max,
        used_fallback,
    }
}
