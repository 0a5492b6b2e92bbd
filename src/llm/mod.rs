//! Model invocation: client seam, error taxonomy, ordered fallback.

pub mod gemini;
pub mod normalize;
pub mod parsing;
pub mod prompt;
pub mod validate;

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

/// Ordered fallback chain, most to least preferred. The first model that
/// returns usable text wins; later entries are never consulted on success.
pub const MODEL_FALLBACK_CHAIN: [&str; 3] = ["gemini-pro", "gemini-1.5-pro", "gemini-1.5-flash"];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("http error: {0}")]
    Http(String),
    #[error("model response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("all models failed: {0}")]
    Exhausted(String),
}

/// One attempt against one named model variant. Implementations perform the
/// transport; retry policy lives in `generate_with_fallback`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ModelError>;
}

/// Try each model in order until one returns text. Failures are recorded and
/// logged; if every model fails, the last error is surfaced (or a generic
/// exhausted error when the chain was empty).
pub async fn generate_with_fallback<C: ModelClient>(
    client: &C,
    models: &[&str],
    prompt: &str,
) -> Result<String, ModelError> {
    let mut last_error: Option<ModelError> = None;
    for model in models {
        match client.generate(model, prompt).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!("model {} failed: {}", model, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| ModelError::Exhausted("no models configured".to_string())))
}
