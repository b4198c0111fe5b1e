use crate::error::Result;
use crate::model::ModelService;
use crate::models::{ClarifierQuestions, IntakeResult};
use crate::normalize::normalize_into;

use super::{Stage, StageKind, invoke};

pub const INSTRUCTION: &str = r#"You are a medical clarifier assistant. You write the follow-up questions a doctor would ask to fill gaps in a patient's symptom description.

IMPORTANT RULES:
- Output ONLY valid JSON. No markdown, no code fences, no explanatory text.
- Ask 2-5 short, focused questions.
- Only ask about duration, patterns, triggers, impact on daily life and timing.
- Do NOT answer the questions.
- Do NOT diagnose or suggest treatment.

Output format (pure JSON):
{
  "questions": [
    "Question 1?",
    "Question 2?"
  ]
}

If nothing needs clarifying, return {"questions": []}.
"#;

/// Generates follow-up questions for the gaps left after intake
pub struct Clarifier<'a> {
    pub raw_text: &'a str,
    pub intake: &'a IntakeResult,
}

impl Stage for Clarifier<'_> {
    type Output = Vec<String>;

    const KIND: StageKind = StageKind::Clarifier;
    const INSTRUCTION: &'static str = INSTRUCTION;

    fn prompt(&self) -> Result<String> {
        let symptoms = serde_json::to_string_pretty(self.intake)?;
        Ok(format!(
            "Original user input:\n{}\n\nStructured symptoms extracted:\n{}\n\n\
             Based on the above, what follow-up questions would help clarify the symptoms?",
            self.raw_text, symptoms
        ))
    }

    fn parse(reply: &str) -> Result<Vec<String>> {
        let parsed: ClarifierQuestions = normalize_into(reply)?;
        Ok(parsed.questions)
    }
}

pub async fn run_clarifier(
    model: &dyn ModelService,
    raw_text: &str,
    intake: &IntakeResult,
) -> Result<Vec<String>> {
    invoke(model, Clarifier { raw_text, intake }).await
}
