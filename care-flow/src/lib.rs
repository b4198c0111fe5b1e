//! Five-stage LLM pipeline that turns a free-text symptom description into a
//! doctor-ready visit note.
//!
//! Intake → Clarifier → (answers) → Summary → Routing → Eval, each stage a
//! single model call whose reply is parsed into a fixed shape and written to
//! a [`SessionRecord`].

pub mod answers;
pub mod config;
pub mod error;
pub mod model;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod session;
pub mod stages;

// Re-export commonly used types
pub use answers::{AnswerSource, ClarifierAnswers, PlaceholderAnswers, SuppliedAnswers};
pub use config::PipelineConfig;
pub use error::{FlowError, Result};
#[cfg(feature = "rig")]
pub use model::RigModelService;
pub use model::ModelService;
pub use models::{
    Criterion, CycleRelation, DoctorRecommendation, EvalResult, IntakeResult, RoutingSuggestion,
    Score, Severity, Symptom, TestCategory,
};
pub use normalize::normalize;
pub use pipeline::{ExecutionStatus, Pipeline};
pub use session::{PipelineState, PipelineStep, RunSummary, SessionRecord};
pub use stages::{StageKind, run_clarifier, run_eval, run_intake, run_routing, run_summary};
