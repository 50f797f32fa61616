use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::PipelineError;
use crate::idea::{DocumentText, IdeaInput};
use crate::metrics::Metrics;
use crate::pipeline::{ValidationPipeline, ValidationRequest};
use crate::signals::SignalSelection;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ValidationPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ValidationPipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/v1/health", get(health))
        .route("/api/v1/validate", post(validate))
        .route("/api/v1/signals", post(signals))
        .with_state(state);

    let api = match Metrics::init() {
        Some(m) => api.merge(m.router()),
        None => api,
    };

    api.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
}

fn yes() -> bool {
    true
}

/// Body of `/api/v1/validate` and `/api/v1/signals`.
#[derive(Debug, Deserialize)]
struct ValidateBody {
    #[serde(default)]
    idea: Option<String>,
    #[serde(default)]
    document: Option<DocumentText>,
    #[serde(default = "yes")]
    include_trends: bool,
    #[serde(default = "yes")]
    include_competitors: bool,
    #[serde(default = "yes")]
    include_community: bool,
}

impl ValidateBody {
    fn into_request(self) -> Result<ValidationRequest, (String, PipelineError)> {
        let selection = SignalSelection {
            trends: self.include_trends,
            competitors: self.include_competitors,
            community: self.include_community,
        };
        let input = match (self.idea, self.document) {
            (Some(text), None) => IdeaInput::Text(text),
            (None, Some(doc)) => IdeaInput::Document(doc),
            (None, None) => IdeaInput::Text(String::new()),
            (Some(text), Some(_)) => {
                return Err((
                    text.trim().to_string(),
                    PipelineError::InvalidInput(
                        "provide either `idea` text or a `document`, not both".to_string(),
                    ),
                ))
            }
        };
        Ok(ValidationRequest { input, selection })
    }
}

fn parse_body(
    body: Result<Json<ValidateBody>, JsonRejection>,
) -> Result<ValidationRequest, (String, PipelineError)> {
    match body {
        Ok(Json(b)) => b.into_request(),
        Err(rej) => Err((
            String::new(),
            PipelineError::InvalidInput(format!("malformed request body: {}", rej.body_text())),
        )),
    }
}

async fn validate(
    State(state): State<AppState>,
    body: Result<Json<ValidateBody>, JsonRejection>,
) -> impl IntoResponse {
    let resp = match parse_body(body) {
        Ok(req) => state.pipeline.run(req).await,
        Err((submitted, err)) => state.pipeline.reject(submitted, err),
    };
    let status = resp
        .error
        .as_ref()
        .map(|e| e.kind.status_code())
        .unwrap_or(StatusCode::OK);
    (status, Json(resp))
}

async fn signals(
    State(state): State<AppState>,
    body: Result<Json<ValidateBody>, JsonRejection>,
) -> impl IntoResponse {
    let resp = match parse_body(body) {
        Ok(req) => state.pipeline.signals(req).await,
        Err((submitted, err)) => state.pipeline.reject_signals(submitted, err),
    };
    let status = resp
        .error
        .as_ref()
        .map(|e| e.kind.status_code())
        .unwrap_or(StatusCode::OK);
    (status, Json(resp))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Overall {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
struct HealthOut {
    status: Overall,
    services: BTreeMap<&'static str, &'static str>,
    version: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    let services = state.pipeline.service_availability();
    let up = services.iter().filter(|(_, ok)| *ok).count();
    let status = overall(up, services.len());
    Json(HealthOut {
        status,
        services: services
            .into_iter()
            .map(|(name, ok)| (name, if ok { "healthy" } else { "unavailable" }))
            .collect(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// All up: healthy. At least half: degraded. Otherwise unhealthy.
fn overall(up: usize, total: usize) -> Overall {
    if up == total {
        Overall::Healthy
    } else if up * 2 >= total {
        Overall::Degraded
    } else {
        Overall::Unhealthy
    }
}
