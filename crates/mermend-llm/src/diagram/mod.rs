mod escalate;
mod prompt;


use chrono::{Local, NaiveDate};
use mermend_core::{DiagramSource, FamilyHint, Finding, extract, repair, validate};
use tracing::{debug, info};

use crate::{GenerateBackend, GenerationError, LlmClient, LlmConfig};

// ── Public types ────────────────────────────────────────────────

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    pub description: String,
    pub family: FamilyHint,
    /// Reference date for timelines. Defaults to today.
    pub start_date: Option<NaiveDate>,
}

impl DiagramRequest {
    pub fn new(description: impl Into<String>, family: FamilyHint) -> Self {
        Self {
            description: description.into(),
            family,
            start_date: None,
        }
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    fn reference_date(&self) -> NaiveDate {
        self.start_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Whether the correction round-trip ran and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// The repaired source validated clean; no second call was made.
    NotNeeded,
    /// The model's corrected code replaced the repaired source.
    Applied,
    /// The second call failed; the repaired source was kept.
    Failed(String),
}

/// Final diagram plus whatever the validator still reports about it.
#[derive(Debug, Clone)]
pub struct DiagramResult {
    pub source: DiagramSource,
    pub findings: Vec<Finding>,
    pub escalation: Escalation,
}

/// One round-trip to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub prompt: String,
    pub raw_response: String,
    pub extracted: DiagramSource,
}

// ── Orchestration ───────────────────────────────────────────────

/// Generate a diagram with the hosted model described by `config`.
pub async fn generate_diagram(
    request: &DiagramRequest,
    config: LlmConfig,
) -> Result<DiagramResult, GenerationError> {
    let client = LlmClient::new(config);
    generate_diagram_with_backend(&client, request).await
}

/// Generate a diagram using a given backend (for testability).
///
/// Makes at most two calls. A failure of the first call is returned as-is;
/// after that the best available source is always returned.
pub async fn generate_diagram_with_backend(
    backend: &impl GenerateBackend,
    request: &DiagramRequest,
) -> Result<DiagramResult, GenerationError> {
    let system = prompt::system_prompt(request.family, request.reference_date());
    let user_msg = prompt::user_prompt(&request.description);

    info!(
        "Generating {} with {}",
        request.family,
        backend.model_name()
    );
    debug!("Generator system prompt length: {} chars", system.len());

    let raw_response = backend.generate(&user_msg, Some(&system)).await?;
    let attempt = GenerationAttempt {
        extracted: extract(&raw_response),
        prompt: user_msg,
        raw_response,
    };
    debug!("Generator raw output: {}", attempt.raw_response);

    let repaired = repair(&attempt.extracted);
    let findings = validate(&repaired.after);

    if findings.is_empty() {
        info!(
            "Generated {} lines, {} auto-fixes, no findings",
            repaired.after.len(),
            repaired.fixes.len()
        );
        return Ok(DiagramResult {
            source: repaired.after,
            findings,
            escalation: Escalation::NotNeeded,
        });
    }

    Ok(escalate::escalate(backend, repaired.after, findings).await)
}
