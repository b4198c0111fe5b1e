//! Presentation of a finished (or aborted) session record. Nothing here
//! talks to the model.

use care_flow::{
    EvalResult, IntakeResult, PipelineState, PipelineStep, RoutingSuggestion, RunSummary,
    SessionRecord,
};

const RULE_WIDTH: usize = 80;

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

fn banner(out: &mut String, title: &str) {
    line(out, "-".repeat(RULE_WIDTH));
    line(out, title);
    line(out, "-".repeat(RULE_WIDTH));
}

fn pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unrenderable: {e}>"))
}

pub fn render_intake(intake: &IntakeResult) -> String {
    let mut out = String::new();
    line(&mut out, "INTAKE JSON:");
    line(&mut out, pretty_json(intake));
    out
}

pub fn render_questions(questions: &[String]) -> String {
    let mut out = String::new();
    line(&mut out, "CLARIFIER QUESTIONS:");
    if questions.is_empty() {
        line(&mut out, "(No questions generated)");
    }
    for (i, q) in questions.iter().enumerate() {
        line(&mut out, format!("{}. {q}", i + 1));
    }
    out
}

pub fn render_routing(routing: Option<&RoutingSuggestion>, error: Option<&str>) -> String {
    let mut out = String::new();
    line(&mut out, "ROUTING GUIDANCE:");

    let routing = match routing {
        Some(routing) if !routing.is_empty() => routing,
        _ => {
            line(&mut out, "(routing guidance unavailable)");
            if let Some(error) = error {
                line(&mut out, format!("Reason: {error}"));
            }
            return out;
        }
    };

    if !routing.recommended_doctors.is_empty() {
        line(&mut out, "");
        line(&mut out, "Recommended Doctor Types:");
        for (i, doctor) in routing.recommended_doctors.iter().enumerate() {
            let name = if doctor.doctor_type.is_empty() { "Unknown" } else { doctor.doctor_type.as_str() };
            line(&mut out, format!("{}. {name}", i + 1));
            if !doctor.reason.is_empty() {
                line(&mut out, format!("   Reason: {}", doctor.reason));
            }
        }
    }

    if !routing.possible_test_categories.is_empty() {
        line(&mut out, "");
        line(&mut out, "Possible Test Categories:");
        for (i, test) in routing.possible_test_categories.iter().enumerate() {
            let name = if test.category.is_empty() { "Unknown" } else { test.category.as_str() };
            line(&mut out, format!("{}. {name}", i + 1));
            if !test.purpose.is_empty() {
                line(&mut out, format!("   Purpose: {}", test.purpose));
            }
        }
    }

    if !routing.urgency_note.is_empty() {
        line(&mut out, "");
        line(&mut out, &routing.urgency_note);
    }
    out
}

pub fn render_eval(eval: &EvalResult) -> String {
    let mut out = String::new();
    line(&mut out, "EVAL JSON:");
    line(&mut out, pretty_json(eval));
    out
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    line(&mut out, "Summary:");
    line(&mut out, format!("  - Symptoms extracted: {}", summary.symptoms_extracted));
    line(&mut out, format!("  - Questions generated: {}", summary.questions_generated));
    line(&mut out, format!("  - Doctor types suggested: {}", summary.doctor_types_suggested));
    let score = summary
        .note_score
        .map_or_else(|| "N/A".to_string(), |s| s.to_string());
    line(&mut out, format!("  - Note quality score: {score}/10"));
    out
}

/// Step-by-step report of everything the record holds, in pipeline order.
pub fn render_record(record: &SessionRecord) -> String {
    let mut out = String::new();
    line(&mut out, "=".repeat(RULE_WIDTH));
    line(&mut out, "CARE-FLOW VISIT NOTE PIPELINE");
    line(&mut out, "=".repeat(RULE_WIDTH));

    banner(&mut out, "STEP 1: INTAKE");
    line(&mut out, "RAW INPUT:");
    line(&mut out, record.raw_text());
    line(&mut out, "");
    if let Some(intake) = &record.intake_result {
        out.push_str(&render_intake(intake));
    }

    match record.state() {
        PipelineState::Init | PipelineState::IntakeDone => {}
        PipelineState::Aborted { step: PipelineStep::Intake } => {}
        PipelineState::Aborted { step: PipelineStep::Clarifier } => {
            banner(&mut out, "STEP 2: CLARIFIER");
            line(&mut out, "(Clarifier failed, no questions available)");
        }
        _ => {
            banner(&mut out, "STEP 2: CLARIFIER");
            out.push_str(&render_questions(&record.clarifier_questions));
        }
    }

    if record.doctor_note.is_some() || !record.clarifier_answers.is_empty() {
        banner(&mut out, "STEP 3: ANSWERS");
        if record.clarifier_answers.is_empty() {
            line(&mut out, "(No answers needed)");
        }
        for (q, a) in record.clarifier_answers.iter() {
            line(&mut out, format!("Q: {q}"));
            line(&mut out, format!("A: {a}"));
            line(&mut out, "");
        }
    }

    if let Some(note) = &record.doctor_note {
        banner(&mut out, "STEP 4: SUMMARY");
        line(&mut out, "DOCTOR NOTE:");
        line(&mut out, note);
    }

    if record.routing_result.is_some() || record.routing_error.is_some() {
        banner(&mut out, "STEP 5: ROUTING");
        out.push_str(&render_routing(
            record.routing_result.as_ref(),
            record.routing_error.as_deref(),
        ));
    }

    if let Some(eval) = &record.eval_result {
        banner(&mut out, "STEP 6: EVAL");
        out.push_str(&render_eval(eval));
    }

    line(&mut out, "=".repeat(RULE_WIDTH));
    match record.state() {
        PipelineState::Complete => line(&mut out, "PIPELINE COMPLETE"),
        PipelineState::Aborted { step } => line(&mut out, format!("PIPELINE ABORTED AT {step}")),
        _ => line(&mut out, "PIPELINE INCOMPLETE"),
    }
    line(&mut out, "=".repeat(RULE_WIDTH));
    out.push_str(&render_summary(&record.summary()));
    out
}

pub fn render_json(record: &SessionRecord) -> serde_json::Result<String> {
    serde_json::to_string_pretty(record)
}
