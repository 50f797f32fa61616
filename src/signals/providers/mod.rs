// src/signals/providers/mod.rs
//! HTTP-backed signal providers.

pub mod community;
pub mod competitors;
pub mod trends;

pub use community::CommunityProvider;
pub use competitors::CompetitorsProvider;
pub use trends::TrendsProvider;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::ProviderError;

/// Error bodies are cut to this many chars before they reach logs or responses.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Shared client builder; per-call deadlines are enforced by the gatherer.
pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .context("building provider http client")
}

/// Turn non-2xx responses into `ProviderError::Status` with a short body excerpt.
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: super::text::truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
    })
}

pub(crate) fn default_user_agent() -> &'static str {
    concat!("idea-validator/", env!("CARGO_PKG_VERSION"))
}
