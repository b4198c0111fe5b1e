//! The five model-backed stages.
//!
//! A stage is data: a fixed instruction bound to the model as its system
//! preamble, a prompt built from the stage's inputs, and a parser for the
//! reply. [`invoke`] is the only place a stage talks to the model service.

pub mod clarifier;
pub mod eval;
pub mod intake;
pub mod routing;
pub mod summary;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::model::ModelService;

pub use clarifier::{Clarifier, run_clarifier};
pub use eval::{Eval, run_eval};
pub use intake::{Intake, run_intake};
pub use routing::{Routing, run_routing};
pub use summary::{Summary, run_summary};

/// Identifies one of the model-backed stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Intake,
    Clarifier,
    Summary,
    Routing,
    Eval,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Intake => "Intake",
            StageKind::Clarifier => "Clarifier",
            StageKind::Summary => "Summary",
            StageKind::Routing => "Routing",
            StageKind::Eval => "Eval",
        };
        f.write_str(name)
    }
}

/// Descriptor of a single model-backed stage
pub trait Stage {
    type Output;

    const KIND: StageKind;

    /// Fixed role instruction sent as the system preamble on every call
    const INSTRUCTION: &'static str;

    /// Build the per-call prompt from this stage's inputs
    fn prompt(&self) -> Result<String>;

    /// Turn a non-empty model reply into the stage output
    fn parse(reply: &str) -> Result<Self::Output>;
}

/// Run `stage` against `model`: one prompt, one call, one parse.
///
/// A blank reply or a timed-out call is reported as
/// [`FlowError::EmptyResponse`]; every other error propagates unchanged.
pub async fn invoke<S: Stage>(model: &dyn ModelService, stage: S) -> Result<S::Output> {
    let prompt = stage.prompt()?;

    let reply = match model.complete(S::INSTRUCTION, &prompt).await {
        Ok(reply) => reply,
        Err(FlowError::Timeout(_)) => return Err(FlowError::EmptyResponse { stage: S::KIND }),
        Err(e) => return Err(e),
    };

    if reply.trim().is_empty() {
        return Err(FlowError::EmptyResponse { stage: S::KIND });
    }

    S::parse(&reply)
}
