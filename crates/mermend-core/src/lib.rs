//! Diagram source model plus the text-level pipeline that cleans up
//! model-generated Mermaid: extraction, line repair and validation.

mod extract;
mod repair;
mod session;
mod source;
mod validation;

pub use extract::*;
pub use repair::*;
pub use session::*;
pub use source::*;
pub use validation::*;

/// Extract, repair and validate in one go. Used for text the user pastes or
/// edits, where no model round-trip is involved.
pub fn clean(raw: &str) -> (RepairResult, Vec<Finding>) {
    let repaired = repair(&extract(raw));
    let findings = validate(&repaired.after);
    (repaired, findings)
}
