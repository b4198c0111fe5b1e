use std::time::Duration;

use thiserror::Error;

use crate::session::PipelineStep;
use crate::stages::StageKind;

/// Errors produced by the stages, the orchestrator and the model service seam
#[derive(Debug, Error)]
pub enum FlowError {
    /// The model service returned no usable text for a stage
    #[error("No response received from {stage} stage")]
    EmptyResponse { stage: StageKind },

    /// No JSON object could be recovered from a model reply
    #[error("Failed to parse JSON from model response. Response was: {preview}... Error: {detail}")]
    Format { preview: String, detail: String },

    /// Required credential or setting is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport or provider failure while calling the model
    #[error("Model service error: {0}")]
    Model(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    /// The answer source could not produce answers
    #[error("Answer collection failed: {0}")]
    Answers(String),

    /// An upstream output the current step depends on is absent from the record
    #[error("Session record is missing the {0} output")]
    MissingOutput(StageKind),

    /// The run was already aborted and cannot be resumed
    #[error("Pipeline run was aborted at the {step} step")]
    Aborted { step: PipelineStep },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
