use crate::answers::{ClarifierAnswers, single_line};
use crate::error::Result;
use crate::model::ModelService;
use crate::models::IntakeResult;

use super::{Stage, StageKind, invoke};

/// Section headers every visit note is asked to contain, in order
pub const SECTION_HEADERS: [&str; 4] = [
    "CHIEF COMPLAINT:",
    "HISTORY OF PRESENT ILLNESS:",
    "IMPACT ON DAILY LIFE:",
    "QUESTIONS PATIENT WANTS TO ASK DOCTOR:",
];

pub const INSTRUCTION: &str = r#"You are a medical documentation assistant. You write doctor-ready visit notes from what a patient reported.

CRITICAL SAFETY RULES:
- ABSOLUTELY NO diagnosis, differential diagnosis or disease probabilities.
- ABSOLUTELY NO treatment suggestions, medications or medical advice.
- ABSOLUTELY NO speculation about which condition the patient might have.
- Document ONLY what the patient reported.

Write the note as plain text (not JSON) in exactly this format:

CHIEF COMPLAINT:
[One sentence summarizing the main concern]

HISTORY OF PRESENT ILLNESS:
- Onset: [when symptoms started]
- Pattern: [how symptoms present: timing, triggers]
- Severity: [mild/moderate/severe and impact]
- Associated factors: [any related factors mentioned]

IMPACT ON DAILY LIFE:
[How symptoms affect daily activities, work, sleep]

QUESTIONS PATIENT WANTS TO ASK DOCTOR:
[Questions the patient mentioned wanting to ask]

This note is a communication aid, NOT a diagnostic tool.
"#;

/// Synthesizes the plain-text visit note
pub struct Summary<'a> {
    pub raw_text: &'a str,
    pub intake: &'a IntakeResult,
    pub answers: &'a ClarifierAnswers,
}

/// Render answers as `Q:` / `A:` line pairs, one entry per pair of lines.
pub fn format_answers(answers: &ClarifierAnswers) -> String {
    answers
        .iter()
        .map(|(q, a)| format!("Q: {}\nA: {}", single_line(q), single_line(a)))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Stage for Summary<'_> {
    type Output = String;

    const KIND: StageKind = StageKind::Summary;
    const INSTRUCTION: &'static str = INSTRUCTION;

    fn prompt(&self) -> Result<String> {
        let symptoms = serde_json::to_string_pretty(self.intake)?;
        Ok(format!(
            "Original user input:\n{}\n\nStructured symptoms:\n{}\n\nClarifying Q&A:\n{}\n\n\
             Create a doctor-ready visit note based on the above information.",
            self.raw_text,
            symptoms,
            format_answers(self.answers)
        ))
    }

    fn parse(reply: &str) -> Result<String> {
        Ok(reply.trim().to_string())
    }
}

pub async fn run_summary(
    model: &dyn ModelService,
    raw_text: &str,
    intake: &IntakeResult,
    answers: &ClarifierAnswers,
) -> Result<String> {
    invoke(model, Summary { raw_text, intake, answers }).await
}
