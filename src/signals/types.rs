// src/signals/types.rs
use serde::{Deserialize, Serialize};

/// The three external signal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Trends,
    Competitors,
    Community,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [
        SignalKind::Trends,
        SignalKind::Competitors,
        SignalKind::Community,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Trends => "trends",
            SignalKind::Competitors => "competitors",
            SignalKind::Community => "community",
        }
    }

    /// Human label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Trends => "Search interest trend",
            SignalKind::Competitors => "Competitor web search",
            SignalKind::Community => "Community discussion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableKind {
    NotRequested,
    NotConfigured,
    TimedOut,
    Failed,
}

/// One provider's outcome: data, or an explicit reason it is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignalSlot<T> {
    Present {
        data: T,
        attempts: u32,
        elapsed_ms: u64,
    },
    Unavailable {
        kind: UnavailableKind,
        reason: String,
    },
}

impl<T> SignalSlot<T> {
    pub fn present(data: T) -> Self {
        SignalSlot::Present {
            data,
            attempts: 1,
            elapsed_ms: 0,
        }
    }

    pub fn unavailable(kind: UnavailableKind, reason: impl Into<String>) -> Self {
        SignalSlot::Unavailable {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SignalSlot::Present { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            SignalSlot::Present { data, .. } => Some(data),
            SignalSlot::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            SignalSlot::Present { .. } => None,
            SignalSlot::Unavailable { reason, .. } => Some(reason),
        }
    }
}

/// Which signals the caller wants gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSelection {
    pub trends: bool,
    pub competitors: bool,
    pub community: bool,
}

impl Default for SignalSelection {
    fn default() -> Self {
        Self {
            trends: true,
            competitors: true,
            community: true,
        }
    }
}

/// Joined result of the three providers for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalBundle {
    pub trends: SignalSlot<TrendSignal>,
    pub competitors: SignalSlot<CompetitorSignal>,
    pub community: SignalSlot<CommunitySignal>,
}

impl SignalBundle {
    pub fn is_present(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::Trends => self.trends.is_present(),
            SignalKind::Competitors => self.competitors.is_present(),
            SignalKind::Community => self.community.is_present(),
        }
    }

    pub fn unavailable_reason(&self, kind: SignalKind) -> Option<&str> {
        match kind {
            SignalKind::Trends => self.trends.unavailable_reason(),
            SignalKind::Competitors => self.competitors.unavailable_reason(),
            SignalKind::Community => self.community.unavailable_reason(),
        }
    }

    /// Missing signals in fixed order, with their reasons.
    pub fn missing(&self) -> Vec<(SignalKind, &str)> {
        SignalKind::ALL
            .iter()
            .filter_map(|k| self.unavailable_reason(*k).map(|r| (*k, r)))
            .collect()
    }

    pub fn present_count(&self) -> usize {
        SignalKind::ALL.iter().filter(|k| self.is_present(**k)).count()
    }
}

/// Which services answered during this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub trends: bool,
    pub competitors: bool,
    pub community: bool,
    pub model: bool,
}

// ---------------- provider payloads ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Steady,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    pub query: String,
    pub cleaned_query: String,
    pub timeframe: String,
    /// Mean interest over the series (0–100).
    pub interest_score: u32,
    pub trend_direction: TrendDirection,
    /// Percent change of the last 3 points against the previous 3.
    pub trend_velocity: i32,
    pub data_points: usize,
    pub min_score: u32,
    pub max_score: u32,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorHit {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSignal {
    pub query: String,
    pub search_query: String,
    pub competitor_count: usize,
    pub top_domains: Vec<String>,
    pub results: Vec<CompetitorHit>,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubredditCount {
    pub name: String,
    pub posts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityPost {
    pub title: String,
    pub subreddit: String,
    pub score: i64,
    pub num_comments: u64,
    pub created_utc: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySignal {
    pub query: String,
    pub search_query: String,
    pub posts_last_n_days: usize,
    pub total_score: i64,
    pub total_comments: u64,
    pub avg_score: f64,
    pub avg_comments: f64,
    pub top_subreddits: Vec<SubredditCount>,
    pub sample_posts: Vec<CommunityPost>,
    pub used_fallback: bool,
}
