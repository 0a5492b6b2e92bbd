//! Strict contract check after normalization.
//!
//! Normalization makes the candidate well-shaped for the common failure
//! modes; this step confirms it. A failure here means the model produced
//! something normalization could not save (a wrong-typed `type` field, for
//! example), and it is always logged together with the full normalized
//! payload so silent data loss stays attributable.

use log::error;
use serde_json::Value;
use thiserror::Error;

use crate::models::AiResponse;

#[derive(Debug, Error)]
#[error("response failed schema validation: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

/// Deserialize the normalized candidate into the typed response. Logged
/// unconditionally on failure, not only in development builds.
pub fn validate_response(normalized: &Value) -> Result<AiResponse, ValidationError> {
    match serde_json::from_value::<AiResponse>(normalized.clone()) {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("validation error: {}", e);
            error!("normalized payload: {}", normalized);
            Err(ValidationError {
                reason: e.to_string(),
            })
        }
    }
}
