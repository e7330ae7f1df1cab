mod client;
mod error;
mod types;

pub mod diagram;

pub use client::*;
pub use error::*;
pub use types::*;

use std::future::Future;

/// The text generation service, as seen by the diagram pipeline.
///
/// Implemented by [`LlmClient`] for the hosted model and by scripted
/// backends in tests.
pub trait GenerateBackend {
    fn model_name(&self) -> &str;

    fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;
}
