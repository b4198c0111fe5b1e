use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use care_flow::answers::{NO_ANSWER, PLACEHOLDER_PREFIX};
use care_flow::stages::{clarifier, eval, intake, routing, summary};
use care_flow::{
    AnswerSource, ClarifierAnswers, Criterion, ExecutionStatus, FlowError, ModelService, Pipeline,
    PipelineState, PipelineStep, PlaceholderAnswers, Severity, SuppliedAnswers,
};

const HEADACHE: &str =
    "I've had headaches every afternoon for two weeks, moderate pain, worse with screen time.";

const INTAKE_REPLY: &str = r#"```json
{
  "symptoms": [
    {
      "name": "headache",
      "severity": "moderate",
      "frequency": "every afternoon",
      "since_when": "2 weeks ago",
      "cycle_related": "unknown",
      "notes": "worse with screen time"
    }
  ]
}
```"#;

const CLARIFIER_REPLY: &str = r#"{"questions": [
  "How long does each headache usually last?",
  "Does anything besides screen time seem to trigger them?",
  "Do the headaches affect your work or sleep?"
]}"#;

const NOTE: &str = "CHIEF COMPLAINT:
Daily afternoon headaches for two weeks.

HISTORY OF PRESENT ILLNESS:
- Onset: About 2 weeks ago
- Pattern: Every afternoon
- Severity: Moderate
- Associated factors: Worse with screen time

IMPACT ON DAILY LIFE:
Not yet described.

QUESTIONS PATIENT WANTS TO ASK DOCTOR:
None mentioned.";

const ROUTING_REPLY: &str = r#"Here is the guidance:
{"recommended_doctors": [{"type": "Primary Care Physician", "reason": "Initial evaluation"}],
 "possible_test_categories": [{"category": "Eye examinations", "purpose": "Screen-related strain"}],
 "urgency_note": "Not urgent unless symptoms become severe."}"#;

const EVAL_REPLY: &str = r#"{"score": 8, "missing_fields": ["severity_impact"],
 "suggested_improvement": "Describe how the headaches affect work and sleep."}"#;

const DIAGNOSTIC_TERMS: [&str; 4] = ["migraine", "diagnosis", "tension-type", "prescribe"];

/// Answers each stage with a canned reply, keyed by the stage instruction.
struct ScriptedModel {
    replies: HashMap<&'static str, Result<String, String>>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl ScriptedModel {
    fn happy_path() -> Self {
        Self {
            replies: HashMap::from([
                (intake::INSTRUCTION, Ok(INTAKE_REPLY.to_string())),
                (clarifier::INSTRUCTION, Ok(CLARIFIER_REPLY.to_string())),
                (summary::INSTRUCTION, Ok(format!("\n{NOTE}\n"))),
                (routing::INSTRUCTION, Ok(ROUTING_REPLY.to_string())),
                (eval::INSTRUCTION, Ok(EVAL_REPLY.to_string())),
            ]),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn replying(mut self, instruction: &'static str, reply: &str) -> Self {
        self.replies.insert(instruction, Ok(reply.to_string()));
        self
    }

    fn failing(mut self, instruction: &'static str, message: &str) -> Self {
        self.replies.insert(instruction, Err(message.to_string()));
        self
    }

    fn stages_called(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(instruction, _)| stage_name(instruction))
            .collect()
    }

    fn prompt_for(&self, instruction: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(i, _)| *i == instruction)
            .map(|(_, p)| p.clone())
    }
}

fn stage_name(instruction: &str) -> &'static str {
    match instruction {
        i if i == intake::INSTRUCTION => "intake",
        i if i == clarifier::INSTRUCTION => "clarifier",
        i if i == summary::INSTRUCTION => "summary",
        i if i == routing::INSTRUCTION => "routing",
        i if i == eval::INSTRUCTION => "eval",
        _ => "unknown",
    }
}

#[async_trait]
impl ModelService for ScriptedModel {
    async fn complete(&self, instruction: &str, prompt: &str) -> care_flow::Result<String> {
        let (key, reply) = self
            .replies
            .get_key_value(instruction)
            .ok_or_else(|| FlowError::Model("unexpected instruction".into()))?;
        self.calls.lock().unwrap().push((*key, prompt.to_string()));
        reply.clone().map_err(FlowError::Model)
    }
}

/// Counts how often it is consulted
#[derive(Default)]
struct CountingAnswers {
    calls: AtomicUsize,
}

#[async_trait]
impl AnswerSource for CountingAnswers {
    async fn answers(&self, questions: &[String]) -> care_flow::Result<ClarifierAnswers> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(questions.iter().map(|q| (q.clone(), "yes")).collect())
    }
}

fn pipeline(model: &Arc<ScriptedModel>) -> Pipeline {
    Pipeline::new(model.clone())
}

#[tokio::test]
async fn headache_scenario_runs_end_to_end() {
    let model = Arc::new(ScriptedModel::happy_path());
    let record = pipeline(&model)
        .run(HEADACHE, &PlaceholderAnswers)
        .await
        .unwrap();

    assert_eq!(
        model.stages_called(),
        ["intake", "clarifier", "summary", "routing", "eval"]
    );
    assert_eq!(record.state(), PipelineState::Complete);
    assert_eq!(record.raw_text(), HEADACHE);

    let intake = record.intake_result.as_ref().unwrap();
    assert_eq!(intake.symptoms.len(), 1);
    let headache = &intake.symptoms[0];
    assert_eq!(headache.name, "headache");
    assert_eq!(headache.severity, Severity::Moderate);
    assert_eq!(headache.frequency, "every afternoon");
    assert_eq!(headache.onset, "2 weeks ago");

    assert!((2..=5).contains(&record.clarifier_questions.len()));
    assert_eq!(record.clarifier_answers.len(), record.clarifier_questions.len());
    for question in &record.clarifier_questions {
        let answer = record.clarifier_answers.get(question).unwrap();
        assert_eq!(answer, format!("{PLACEHOLDER_PREFIX}{question}"));
    }

    let note = record.doctor_note.as_deref().unwrap();
    assert_eq!(note, NOTE);
    for header in summary::SECTION_HEADERS {
        assert!(note.contains(header), "note is missing {header}");
    }
    let lowered = note.to_lowercase();
    for term in DIAGNOSTIC_TERMS {
        assert!(!lowered.contains(term), "note mentions {term}");
    }

    let eval = record.eval_result.as_ref().unwrap();
    assert!(eval.score.value() <= 10);
    let labels: Vec<&str> = Criterion::ALL.iter().map(|c| c.label()).collect();
    for field in &eval.missing_fields {
        assert!(labels.contains(&field.as_str()), "unexpected label {field}");
    }

    let summary = record.summary();
    assert_eq!(summary.symptoms_extracted, 1);
    assert_eq!(summary.questions_generated, 3);
    assert_eq!(summary.doctor_types_suggested, 1);
    assert_eq!(summary.note_score, Some(8));
    assert!(!summary.routing_skipped);
}

#[tokio::test]
async fn downstream_prompts_carry_upstream_outputs() {
    let model = Arc::new(ScriptedModel::happy_path());
    pipeline(&model)
        .run(HEADACHE, &PlaceholderAnswers)
        .await
        .unwrap();

    let clarifier_prompt = model.prompt_for(clarifier::INSTRUCTION).unwrap();
    assert!(clarifier_prompt.contains(HEADACHE));
    assert!(clarifier_prompt.contains(r#""since_when": "2 weeks ago""#));

    let summary_prompt = model.prompt_for(summary::INSTRUCTION).unwrap();
    assert!(summary_prompt.contains(
        "Q: How long does each headache usually last?\n\
         A: Demo answer for: How long does each headache usually last?"
    ));

    let eval_prompt = model.prompt_for(eval::INSTRUCTION).unwrap();
    assert!(eval_prompt.contains(NOTE));
}

#[tokio::test]
async fn no_questions_means_no_answers_and_no_prompting() {
    let model = Arc::new(ScriptedModel::happy_path().replying(clarifier::INSTRUCTION, r#"{"questions": []}"#));
    let answers = CountingAnswers::default();

    let record = pipeline(&model).run(HEADACHE, &answers).await.unwrap();

    assert!(record.clarifier_questions.is_empty());
    assert!(record.clarifier_answers.is_empty());
    assert_eq!(answers.calls.load(Ordering::SeqCst), 0);
    assert!(record.doctor_note.is_some());
    assert!(record.is_complete());
}

#[tokio::test]
async fn routing_failure_is_absorbed() {
    let model = Arc::new(ScriptedModel::happy_path().replying(routing::INSTRUCTION, "I cannot help with that."));

    let record = pipeline(&model)
        .run(HEADACHE, &PlaceholderAnswers)
        .await
        .unwrap();

    let routing = record.routing_result.as_ref().unwrap();
    assert!(routing.is_empty());
    assert!(record.routing_error.as_deref().unwrap().contains("Failed to parse JSON"));
    assert!(record.eval_result.is_some());
    assert!(record.is_complete());
    assert!(record.summary().routing_skipped);
    assert_eq!(record.summary().doctor_types_suggested, 0);
}

#[tokio::test]
async fn routing_transport_error_is_absorbed_too() {
    let model = Arc::new(ScriptedModel::happy_path().failing(routing::INSTRUCTION, "connection reset"));

    let record = pipeline(&model)
        .run(HEADACHE, &PlaceholderAnswers)
        .await
        .unwrap();

    assert_eq!(record.routing_result, Some(Default::default()));
    assert!(record.eval_result.is_some());
}

#[tokio::test]
async fn fatal_failures_abort_and_keep_earlier_outputs() {
    let cases = [
        (intake::INSTRUCTION, PipelineStep::Intake),
        (clarifier::INSTRUCTION, PipelineStep::Clarifier),
        (summary::INSTRUCTION, PipelineStep::Summary),
        (eval::INSTRUCTION, PipelineStep::Eval),
    ];

    for (instruction, step) in cases {
        let model = Arc::new(ScriptedModel::happy_path().replying(instruction, "   "));
        let pipeline = pipeline(&model);
        let mut record = care_flow::SessionRecord::new(HEADACHE);

        let err = pipeline
            .execute(&mut record, &PlaceholderAnswers)
            .await
            .unwrap_err();

        assert!(
            matches!(err, FlowError::EmptyResponse { .. }),
            "{step}: unexpected error {err:?}"
        );
        assert_eq!(record.state(), PipelineState::Aborted { step });

        let reached = |later: PipelineStep| (step as u8) > (later as u8);
        assert_eq!(record.intake_result.is_some(), reached(PipelineStep::Intake), "{step}");
        assert_eq!(record.doctor_note.is_some(), reached(PipelineStep::Summary), "{step}");
        assert_eq!(record.routing_result.is_some(), reached(PipelineStep::Routing), "{step}");
        assert!(record.eval_result.is_none(), "{step}");
    }
}

#[tokio::test]
async fn aborted_record_is_never_retried() {
    let model = Arc::new(ScriptedModel::happy_path().replying(intake::INSTRUCTION, "not json"));
    let pipeline = pipeline(&model);
    let mut record = care_flow::SessionRecord::new(HEADACHE);

    let first = pipeline.execute(&mut record, &PlaceholderAnswers).await.unwrap_err();
    assert!(matches!(first, FlowError::Format { .. }));

    let second = pipeline.step(&mut record, &PlaceholderAnswers).await.unwrap_err();
    assert!(matches!(second, FlowError::Aborted { step: PipelineStep::Intake }));
    assert_eq!(model.stages_called(), ["intake"]);
}

#[tokio::test]
async fn step_advances_one_state_at_a_time() {
    let model = Arc::new(ScriptedModel::happy_path());
    let pipeline = pipeline(&model);
    let mut record = care_flow::SessionRecord::new(HEADACHE);

    let expected = [
        PipelineState::IntakeDone,
        PipelineState::ClarifierDone,
        PipelineState::AnswersResolved,
        PipelineState::SummaryDone,
        PipelineState::RoutingDone,
    ];
    for state in expected {
        let status = pipeline.step(&mut record, &PlaceholderAnswers).await.unwrap();
        assert_eq!(status, ExecutionStatus::Continue);
        assert_eq!(record.state(), state);
    }

    let status = pipeline.step(&mut record, &PlaceholderAnswers).await.unwrap();
    assert_eq!(status, ExecutionStatus::Completed);
    assert_eq!(record.state(), PipelineState::Complete);

    let again = pipeline.step(&mut record, &PlaceholderAnswers).await.unwrap();
    assert_eq!(again, ExecutionStatus::Completed);
    assert_eq!(model.stages_called().len(), 5);
}

#[tokio::test]
async fn supplied_answers_fill_missing_questions_with_default() {
    let model = Arc::new(ScriptedModel::happy_path());
    let answers: SuppliedAnswers = [(
        "How long does each headache usually last?",
        "Two to three hours",
    )]
    .into_iter()
    .collect();

    let record = pipeline(&model).run(HEADACHE, &answers).await.unwrap();

    assert_eq!(
        record.clarifier_answers.get("How long does each headache usually last?"),
        Some("Two to three hours")
    );
    assert_eq!(
        record.clarifier_answers.get("Do the headaches affect your work or sleep?"),
        Some(NO_ANSWER)
    );
    let summary_prompt = model.prompt_for(summary::INSTRUCTION).unwrap();
    assert!(summary_prompt.contains("A: Two to three hours"));
}

#[tokio::test]
async fn routing_result_survives_a_json_round_trip() {
    let model = Arc::new(ScriptedModel::happy_path());
    let record = pipeline(&model)
        .run(HEADACHE, &PlaceholderAnswers)
        .await
        .unwrap();

    let rendered = serde_json::to_string_pretty(&record).unwrap();
    let parsed: care_flow::SessionRecord = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed.state(), PipelineState::Complete);
    assert_eq!(parsed.clarifier_answers, record.clarifier_answers);

    let before = record.routing_result.unwrap();
    let after = parsed.routing_result.unwrap();
    assert_eq!(before.recommended_doctors.len(), after.recommended_doctors.len());
    assert_eq!(before.possible_test_categories.len(), after.possible_test_categories.len());
    for (a, b) in before.recommended_doctors.iter().zip(&after.recommended_doctors) {
        assert_eq!(a.doctor_type, b.doctor_type);
    }
    for (a, b) in before
        .possible_test_categories
        .iter()
        .zip(&after.possible_test_categories)
    {
        assert_eq!(a.category, b.category);
    }
}
