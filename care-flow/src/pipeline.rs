use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};

use crate::answers::{AnswerSource, ClarifierAnswers};
use crate::error::{FlowError, Result};
use crate::model::ModelService;
use crate::session::{PipelineState, PipelineStep, RunSummary, SessionRecord};
use crate::stages::{StageKind, run_clarifier, run_eval, run_intake, run_routing, run_summary};

/// Outcome of a single [`Pipeline::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// More steps remain
    Continue,
    /// The run finished and the record is complete
    Completed,
}

/// Sequences the five stages over a [`SessionRecord`].
///
/// Intake, Clarifier, Summary and Eval failures abort the run. A Routing
/// failure is absorbed: the record gets the empty routing suggestion and the
/// run continues to Eval.
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn ModelService>,
}

impl Pipeline {
    pub fn new(model: Arc<dyn ModelService>) -> Self {
        Self { model }
    }

    /// Build a pipeline backed by the OpenRouter model named in `config`.
    #[cfg(feature = "rig")]
    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self::new(Arc::new(crate::model::RigModelService::new(config)))
    }

    pub fn model(&self) -> &dyn ModelService {
        self.model.as_ref()
    }

    /// Start a fresh record for `raw_text` and drive it to completion.
    pub async fn run(
        &self,
        raw_text: impl Into<String>,
        answers: &dyn AnswerSource,
    ) -> Result<SessionRecord> {
        let mut record = SessionRecord::new(raw_text);
        self.execute(&mut record, answers).await?;
        Ok(record)
    }

    /// Step `record` until it completes or a fatal error aborts it.
    ///
    /// On error the record keeps every output produced before the failure.
    pub async fn execute(
        &self,
        record: &mut SessionRecord,
        answers: &dyn AnswerSource,
    ) -> Result<RunSummary> {
        let span = info_span!("pipeline_run", session_id = %record.id);
        async move {
            info!(input_len = record.raw_text().len(), "Starting pipeline run");
            while self.step(record, answers).await? == ExecutionStatus::Continue {}
            let summary = record.summary();
            info!(
                symptoms = summary.symptoms_extracted,
                questions = summary.questions_generated,
                doctor_types = summary.doctor_types_suggested,
                score = ?summary.note_score,
                routing_skipped = summary.routing_skipped,
                "Pipeline run complete"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Execute exactly one step from the record's current state.
    ///
    /// Stepping a completed record is a no-op; stepping an aborted one fails
    /// with [`FlowError::Aborted`]. Nothing is ever retried.
    pub async fn step(
        &self,
        record: &mut SessionRecord,
        answers: &dyn AnswerSource,
    ) -> Result<ExecutionStatus> {
        let model = self.model.as_ref();

        match record.state() {
            PipelineState::Init => {
                info!(step = %PipelineStep::Intake, "Extracting symptoms");
                let outcome = run_intake(model, record.raw_text()).await;
                let intake = abort_on_error(record, PipelineStep::Intake, outcome)?;
                info!(symptoms = intake.symptoms.len(), "Intake complete");
                record.intake_result = Some(intake);
                record.advance(PipelineState::IntakeDone);
            }
            PipelineState::IntakeDone => {
                info!(step = %PipelineStep::Clarifier, "Generating follow-up questions");
                let outcome = match record.intake_result.as_ref() {
                    Some(intake) => run_clarifier(model, record.raw_text(), intake).await,
                    None => Err(FlowError::MissingOutput(StageKind::Intake)),
                };
                let questions = abort_on_error(record, PipelineStep::Clarifier, outcome)?;
                info!(questions = questions.len(), "Clarifier complete");
                record.clarifier_questions = questions;
                record.advance(PipelineState::ClarifierDone);
            }
            PipelineState::ClarifierDone => {
                let outcome = if record.clarifier_questions.is_empty() {
                    Ok(ClarifierAnswers::new())
                } else {
                    answers.answers(&record.clarifier_questions).await
                };
                let resolved = abort_on_error(record, PipelineStep::Answers, outcome)?;
                info!(answers = resolved.len(), "Answers resolved");
                record.clarifier_answers = resolved;
                record.advance(PipelineState::AnswersResolved);
            }
            PipelineState::AnswersResolved => {
                info!(step = %PipelineStep::Summary, "Writing visit note");
                let outcome = match record.intake_result.as_ref() {
                    Some(intake) => {
                        run_summary(model, record.raw_text(), intake, &record.clarifier_answers)
                            .await
                    }
                    None => Err(FlowError::MissingOutput(StageKind::Intake)),
                };
                let note = abort_on_error(record, PipelineStep::Summary, outcome)?;
                info!(note_len = note.len(), "Summary complete");
                record.doctor_note = Some(note);
                record.advance(PipelineState::SummaryDone);
            }
            PipelineState::SummaryDone => {
                info!(step = %PipelineStep::Routing, "Suggesting doctor types and test categories");
                let outcome = match record.intake_result.as_ref() {
                    Some(intake) => run_routing(model, record.raw_text(), intake).await,
                    None => Err(FlowError::MissingOutput(StageKind::Intake)),
                };
                match outcome {
                    Ok(routing) => {
                        info!(
                            doctor_types = routing.recommended_doctors.len(),
                            test_categories = routing.possible_test_categories.len(),
                            "Routing complete"
                        );
                        record.routing_result = Some(routing);
                        record.routing_error = None;
                        record.advance(PipelineState::RoutingDone);
                    }
                    Err(e) => {
                        warn!(error = %e, "Routing failed, continuing with empty guidance");
                        record.routing_result = Some(Default::default());
                        record.routing_error = Some(e.to_string());
                        record.advance(PipelineState::RoutingSkipped);
                    }
                }
            }
            PipelineState::RoutingDone | PipelineState::RoutingSkipped => {
                info!(step = %PipelineStep::Eval, "Evaluating visit note");
                let outcome = match record.doctor_note.as_deref() {
                    Some(note) => run_eval(model, note).await,
                    None => Err(FlowError::MissingOutput(StageKind::Summary)),
                };
                let eval = abort_on_error(record, PipelineStep::Eval, outcome)?;
                info!(score = eval.score.value(), missing = eval.missing_fields.len(), "Eval complete");
                record.eval_result = Some(eval);
                record.advance(PipelineState::Complete);
                return Ok(ExecutionStatus::Completed);
            }
            PipelineState::Complete => return Ok(ExecutionStatus::Completed),
            PipelineState::Aborted { step } => return Err(FlowError::Aborted { step }),
        }

        Ok(ExecutionStatus::Continue)
    }
}

/// Move `record` to the aborted state when `outcome` is a failure.
fn abort_on_error<T>(record: &mut SessionRecord, step: PipelineStep, outcome: Result<T>) -> Result<T> {
    outcome.inspect_err(|e| {
        error!(step = %step, error = %e, "Pipeline step failed, aborting run");
        record.advance(PipelineState::Aborted { step });
    })
}
