use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::ClarifierAnswers;
use crate::models::{EvalResult, IntakeResult, RoutingSuggestion};
use crate::stages::StageKind;

/// One step of a pipeline run: the five stages plus answer resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Intake,
    Clarifier,
    Answers,
    Summary,
    Routing,
    Eval,
}

impl From<StageKind> for PipelineStep {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Intake => PipelineStep::Intake,
            StageKind::Clarifier => PipelineStep::Clarifier,
            StageKind::Summary => PipelineStep::Summary,
            StageKind::Routing => PipelineStep::Routing,
            StageKind::Eval => PipelineStep::Eval,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Answers => f.write_str("Answers"),
            PipelineStep::Intake => StageKind::Intake.fmt(f),
            PipelineStep::Clarifier => StageKind::Clarifier.fmt(f),
            PipelineStep::Summary => StageKind::Summary.fmt(f),
            PipelineStep::Routing => StageKind::Routing.fmt(f),
            PipelineStep::Eval => StageKind::Eval.fmt(f),
        }
    }
}

/// Where a run currently stands. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Init,
    IntakeDone,
    ClarifierDone,
    AnswersResolved,
    SummaryDone,
    RoutingDone,
    /// Routing failed and was replaced by the empty suggestion
    RoutingSkipped,
    Complete,
    Aborted {
        step: PipelineStep,
    },
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Aborted { .. })
    }

    /// The step that runs next from this state, if any
    pub fn next_step(self) -> Option<PipelineStep> {
        match self {
            PipelineState::Init => Some(PipelineStep::Intake),
            PipelineState::IntakeDone => Some(PipelineStep::Clarifier),
            PipelineState::ClarifierDone => Some(PipelineStep::Answers),
            PipelineState::AnswersResolved => Some(PipelineStep::Summary),
            PipelineState::SummaryDone => Some(PipelineStep::Routing),
            PipelineState::RoutingDone | PipelineState::RoutingSkipped => Some(PipelineStep::Eval),
            PipelineState::Complete | PipelineState::Aborted { .. } => None,
        }
    }
}

/// Everything one run produced, accumulated stage by stage.
///
/// A record is owned by a single run. Outputs of stages that have not run
/// (or did not finish before an abort) stay `None` / empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    raw_text: String,
    pub intake_result: Option<IntakeResult>,
    pub clarifier_questions: Vec<String>,
    pub clarifier_answers: ClarifierAnswers,
    pub doctor_note: Option<String>,
    pub routing_result: Option<RoutingSuggestion>,
    /// Why routing was skipped, when it was
    pub routing_error: Option<String>,
    pub eval_result: Option<EvalResult>,
    state: PipelineState,
}

impl SessionRecord {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            raw_text: raw_text.into(),
            intake_result: None,
            clarifier_questions: Vec::new(),
            clarifier_answers: ClarifierAnswers::new(),
            doctor_note: None,
            routing_result: None,
            routing_error: None,
            eval_result: None,
            state: PipelineState::Init,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn advance(&mut self, state: PipelineState) {
        self.state = state;
    }

    pub fn is_complete(&self) -> bool {
        self.state == PipelineState::Complete
    }

    /// Counts reported at the end of a run
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            symptoms_extracted: self
                .intake_result
                .as_ref()
                .map_or(0, |intake| intake.symptoms.len()),
            questions_generated: self.clarifier_questions.len(),
            doctor_types_suggested: self
                .routing_result
                .as_ref()
                .map_or(0, |routing| routing.recommended_doctors.len()),
            note_score: self.eval_result.as_ref().map(|eval| eval.score.value()),
            routing_skipped: self.state == PipelineState::RoutingSkipped
                || self.routing_error.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub symptoms_extracted: usize,
    pub questions_generated: usize,
    pub doctor_types_suggested: usize,
    pub note_score: Option<u8>,
    pub routing_skipped: bool,
}
