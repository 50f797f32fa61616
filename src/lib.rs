// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod compose;
pub mod config;
pub mod error;
pub mod idea;
pub mod metrics;
pub mod pipeline;
pub mod signals;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ValidatorConfig;
pub use crate::error::{ErrorKind, PipelineError};
pub use crate::pipeline::{ValidationPipeline, ValidationRequest, ValidationResponse};

/// Build the production router from the default config sources.
/// Fails when the model key is missing, since no run could ever succeed.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = ValidatorConfig::load_default().context("loading validator config")?;
    cfg.require_model_credentials()?;
    let pipeline = ValidationPipeline::from_config(cfg)?;
    for (service, ok) in pipeline.service_availability() {
        info!(service, configured = ok, "service availability");
    }
    Ok(router(AppState::new(Arc::new(pipeline))))
}
