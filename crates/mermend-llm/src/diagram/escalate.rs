use mermend_core::{DiagramSource, Finding, extract, validate};
use tracing::{debug, info, warn};

use super::prompt::fix_prompt;
use super::{DiagramResult, Escalation, GenerationAttempt};
use crate::GenerateBackend;

/// Ask the model once to fix the findings in `repaired`.
///
/// The response is only extracted, never repaired again. Any failure keeps
/// `repaired` and its findings as the result.
pub(crate) async fn escalate(
    backend: &impl GenerateBackend,
    repaired: DiagramSource,
    findings: Vec<Finding>,
) -> DiagramResult {
    info!(
        "Escalating {} findings to {}",
        findings.len(),
        backend.model_name()
    );
    for finding in &findings {
        debug!("Finding: {}", finding);
    }

    let prompt = fix_prompt(&findings, &repaired);
    let raw_response = match backend.generate(&prompt, None).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Escalation failed, keeping repaired source: {}", e);
            return DiagramResult {
                source: repaired,
                findings,
                escalation: Escalation::Failed(e.to_string()),
            };
        }
    };

    let attempt = GenerationAttempt {
        extracted: extract(&raw_response),
        prompt,
        raw_response,
    };
    debug!("Escalation raw output: {}", attempt.raw_response);

    if attempt.extracted.is_empty() {
        warn!("Escalation returned no diagram, keeping repaired source");
        return DiagramResult {
            source: repaired,
            findings,
            escalation: Escalation::Failed("model returned no diagram code".to_string()),
        };
    }

    let remaining = validate(&attempt.extracted);
    info!(
        "Escalation applied: {} findings before, {} after",
        findings.len(),
        remaining.len()
    );

    DiagramResult {
        source: attempt.extracted,
        findings: remaining,
        escalation: Escalation::Applied,
    }
}
