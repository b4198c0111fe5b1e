use crate::error::Result;
use crate::model::ModelService;
use crate::models::EvalResult;
use crate::normalize::normalize_into;

use super::{Stage, StageKind, invoke};

pub const INSTRUCTION: &str = r#"You are an evaluation assistant. You judge whether a medical visit note is complete, clear and ready for a doctor.

Evaluation criteria, with the label to use when one is missing or violated:
1. chief_complaint: the chief complaint is clearly stated.
2. onset_duration: onset and duration are included.
3. severity_impact: severity and impact on daily life are described.
4. pattern_triggers: patterns, triggers or associated factors are mentioned.
5. no_speculation: the note is free of diagnostic speculation and treatment advice.

IMPORTANT RULES:
- Output ONLY valid JSON. No markdown, no code fences, no explanatory text.
- "score" is an integer from 0 to 10 (10 = excellent, 0 = poor).
- "missing_fields" lists only labels from the criteria above.
- "suggested_improvement" is one paragraph of specific, constructive feedback.

Output format (pure JSON):
{
  "score": 8,
  "missing_fields": ["onset_duration"],
  "suggested_improvement": "One paragraph of specific feedback on how to improve the note."
}

If the note meets every criterion, return an empty missing_fields list and a score of 10.
"#;

/// Grades a visit note against the fixed criteria
pub struct Eval<'a> {
    pub doctor_note: &'a str,
}

impl Stage for Eval<'_> {
    type Output = EvalResult;

    const KIND: StageKind = StageKind::Eval;
    const INSTRUCTION: &'static str = INSTRUCTION;

    fn prompt(&self) -> Result<String> {
        Ok(format!(
            "Evaluate the following visit note:\n\n{}\n\nProvide your evaluation in the specified JSON format.",
            self.doctor_note
        ))
    }

    fn parse(reply: &str) -> Result<EvalResult> {
        normalize_into(reply)
    }
}

pub async fn run_eval(model: &dyn ModelService, doctor_note: &str) -> Result<EvalResult> {
    invoke(model, Eval { doctor_note }).await
}
