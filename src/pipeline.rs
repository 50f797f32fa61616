// src/pipeline.rs
//! Orchestrates one validation run:
//! Collect -> Gather -> Compose -> Request -> Validate -> (Result | Error).
//!
//! Every run is bounded by the configured deadline and always yields a
//! `ValidationResponse`; failures are carried inside it, never thrown.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyze::{quality_issues, validate_response, AnalysisResult, DynModelClient, GeminiClient};
use crate::compose::compose;
use crate::config::ValidatorConfig;
use crate::error::{ErrorPayload, ModelError, PipelineError};
use crate::idea::{Idea, IdeaInput, IdeaOrigin};
use crate::signals::{ProviderStatus, SignalBundle, SignalGatherer, SignalKind, SignalSelection};

/// One caller submission.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub input: IdeaInput,
    pub selection: SignalSelection,
}

impl ValidationRequest {
    pub fn text(idea: impl Into<String>) -> Self {
        Self {
            input: IdeaInput::Text(idea.into()),
            selection: SignalSelection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResponse {
    pub job_id: Uuid,
    pub success: bool,
    pub idea: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<IdeaOrigin>,
    pub analysis: Option<AnalysisResult>,
    pub raw_data: Option<SignalBundle>,
    pub api_status: ProviderStatus,
    pub missing_signals: Vec<SignalKind>,
    /// Seconds.
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
    pub error: Option<ErrorPayload>,
}

/// Signals-only run: no model call.
#[derive(Debug, Clone, Serialize)]
pub struct SignalsResponse {
    pub job_id: Uuid,
    pub success: bool,
    pub idea: String,
    pub raw_data: Option<SignalBundle>,
    pub api_status: ProviderStatus,
    pub missing_signals: Vec<SignalKind>,
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
    pub error: Option<ErrorPayload>,
}

pub struct ValidationPipeline {
    config: ValidatorConfig,
    gatherer: SignalGatherer,
    model: DynModelClient,
}

impl ValidationPipeline {
    pub fn new(config: ValidatorConfig, gatherer: SignalGatherer, model: DynModelClient) -> Self {
        Self {
            config,
            gatherer,
            model,
        }
    }

    /// Production wiring from a loaded config.
    pub fn from_config(config: ValidatorConfig) -> anyhow::Result<Self> {
        let gatherer = SignalGatherer::from_config(&config)?;
        let model = GeminiClient::new(config.model.clone())?;
        Ok(Self::new(config, gatherer, std::sync::Arc::new(model)))
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Credential-based availability of every external service; no network calls.
    pub fn service_availability(&self) -> Vec<(&'static str, bool)> {
        let mut out: Vec<(&'static str, bool)> = self
            .gatherer
            .configured()
            .iter()
            .map(|(k, ok)| (k.as_str(), *ok))
            .collect();
        out.push(("model", self.model.is_configured()));
        out
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.config.pipeline.deadline_secs)
    }

    pub async fn run(&self, req: ValidationRequest) -> ValidationResponse {
        let started = Instant::now();
        let job_id = Uuid::new_v4();
        counter!("validation_requests_total").increment(1);

        let submitted = submitted_text(&req.input);
        let idea = match Idea::from_input(req.input, &self.config.pipeline) {
            Ok(idea) => idea,
            Err(e) => {
                return self.finish(
                    job_id,
                    started,
                    submitted,
                    None,
                    None,
                    ProviderStatus::default(),
                    Err(e),
                )
            }
        };
        info!(
            job_id = %job_id,
            idea_id = idea.id(),
            chars = idea.text().chars().count(),
            "validation started"
        );

        let deadline = self.deadline();
        let bundle = self.gatherer.gather(&idea, req.selection, deadline).await;
        let mut status = status_of(&bundle);

        let outcome = self.analyze(&idea, &bundle, started, deadline, &mut status).await;
        let source = Some(idea.origin().clone());
        self.finish(
            job_id,
            started,
            idea.text().to_string(),
            source,
            Some(bundle),
            status,
            outcome,
        )
    }

    /// Compose, request, validate. Model errors and timeouts are classified here.
    async fn analyze(
        &self,
        idea: &Idea,
        bundle: &SignalBundle,
        started: Instant,
        deadline: Duration,
        status: &mut ProviderStatus,
    ) -> Result<AnalysisResult, PipelineError> {
        let deadline_ms = deadline.as_millis() as u64;
        let remaining = deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(PipelineError::DeadlineExceeded {
                stage: "signal gathering",
                deadline_ms,
            });
        }

        let request = compose(idea, bundle);
        let model_timeout = self.config.model.timeout();
        let deadline_bound = remaining < model_timeout;
        let limit = model_timeout.min(remaining);

        let t0 = Instant::now();
        let reply = tokio::time::timeout(limit, self.model.generate(&request)).await;
        histogram!("model_request_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let raw = match reply {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) if deadline_bound => {
                return Err(PipelineError::DeadlineExceeded {
                    stage: "model request",
                    deadline_ms,
                })
            }
            Err(_) => {
                return Err(ModelError::Timeout {
                    after_ms: limit.as_millis() as u64,
                }
                .into())
            }
        };
        status.model = true;

        let result = validate_response(&raw)?;
        let issues = quality_issues(&result);
        if !issues.is_empty() {
            counter!("analysis_quality_warnings_total").increment(issues.len() as u64);
            warn!(idea_id = idea.id(), issues = ?issues, "analysis data-quality warnings");
        }
        Ok(result)
    }

    /// Response for a submission rejected before the pipeline could parse it.
    pub fn reject(&self, submitted: String, err: PipelineError) -> ValidationResponse {
        counter!("validation_requests_total").increment(1);
        self.finish(
            Uuid::new_v4(),
            Instant::now(),
            submitted,
            None,
            None,
            ProviderStatus::default(),
            Err(err),
        )
    }

    /// Gather signals only, for callers that want raw market data.
    pub async fn signals(&self, req: ValidationRequest) -> SignalsResponse {
        let started = Instant::now();
        let submitted = submitted_text(&req.input);
        let idea = match Idea::from_input(req.input, &self.config.pipeline) {
            Ok(idea) => idea,
            Err(e) => return self.signals_response(started, submitted, None, Some(e)),
        };
        let bundle = self.gatherer.gather(&idea, req.selection, self.deadline()).await;
        self.signals_response(started, idea.text().to_string(), Some(bundle), None)
    }

    pub fn reject_signals(&self, submitted: String, err: PipelineError) -> SignalsResponse {
        self.signals_response(Instant::now(), submitted, None, Some(err))
    }

    fn signals_response(
        &self,
        started: Instant,
        idea: String,
        bundle: Option<SignalBundle>,
        err: Option<PipelineError>,
    ) -> SignalsResponse {
        let error = err.map(|e| {
            counter!("validation_failures_total", "kind" => e.kind().as_str()).increment(1);
            e.to_payload()
        });
        SignalsResponse {
            job_id: Uuid::new_v4(),
            success: error.is_none(),
            idea,
            api_status: bundle.as_ref().map(status_of).unwrap_or_default(),
            missing_signals: missing_of(bundle.as_ref()),
            raw_data: bundle,
            execution_time: seconds(started),
            timestamp: Utc::now(),
            error,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        job_id: Uuid,
        started: Instant,
        idea: String,
        source: Option<IdeaOrigin>,
        bundle: Option<SignalBundle>,
        api_status: ProviderStatus,
        outcome: Result<AnalysisResult, PipelineError>,
    ) -> ValidationResponse {
        let elapsed = started.elapsed();
        histogram!("validation_duration_ms").record(elapsed.as_secs_f64() * 1_000.0);
        let missing_signals = missing_of(bundle.as_ref());

        let (analysis, error) = match outcome {
            Ok(result) => {
                info!(
                    job_id = %job_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    missing = missing_signals.len(),
                    "validation succeeded"
                );
                (Some(result), None)
            }
            Err(e) => {
                let kind = e.kind();
                counter!("validation_failures_total", "kind" => kind.as_str()).increment(1);
                warn!(
                    job_id = %job_id,
                    kind = kind.as_str(),
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "validation failed"
                );
                (None, Some(e.to_payload()))
            }
        };

        ValidationResponse {
            job_id,
            success: error.is_none(),
            idea,
            source,
            analysis,
            raw_data: bundle,
            api_status,
            missing_signals,
            execution_time: seconds(started),
            timestamp: Utc::now(),
            error,
        }
    }
}

fn submitted_text(input: &IdeaInput) -> String {
    match input {
        IdeaInput::Text(t) => t.trim().to_string(),
        IdeaInput::Document(d) => d.text.trim().to_string(),
    }
}

fn status_of(bundle: &SignalBundle) -> ProviderStatus {
    ProviderStatus {
        trends: bundle.trends.is_present(),
        competitors: bundle.competitors.is_present(),
        community: bundle.community.is_present(),
        model: false,
    }
}

fn missing_of(bundle: Option<&SignalBundle>) -> Vec<SignalKind> {
    bundle
        .map(|b| b.missing().into_iter().map(|(k, _)| k).collect())
        .unwrap_or_default()
}

/// Elapsed seconds, millisecond precision.
fn seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1_000.0).round() / 1_000.0
}
