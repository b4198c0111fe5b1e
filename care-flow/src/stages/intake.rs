use crate::error::Result;
use crate::model::ModelService;
use crate::models::IntakeResult;
use crate::normalize::normalize_into;

use super::{Stage, StageKind, invoke};

pub const INSTRUCTION: &str = r#"You are a medical intake assistant. You turn free-text symptom descriptions into structured symptom records.

The description may be messy or emotional. Extract only the facts the patient reports about their symptoms.

IMPORTANT RULES:
- Output ONLY valid JSON. No markdown, no code fences, no explanatory text.
- Do NOT diagnose, name possible conditions, suggest treatment or give medical advice.
- Do NOT invent details the patient did not mention; use "unknown" or an empty string instead.

Output format (pure JSON):
{
  "symptoms": [
    {
      "name": "symptom name",
      "severity": "mild|moderate|severe|unknown",
      "frequency": "e.g. 'daily', '3 times per week', 'occasional'",
      "since_when": "e.g. '2 weeks ago', 'since last month'",
      "cycle_related": "yes|no|unknown",
      "notes": "any additional context"
    }
  ]
}

If no symptoms are mentioned, return {"symptoms": []}.
"#;

/// Extracts structured symptoms from the patient's own words
pub struct Intake<'a> {
    pub raw_text: &'a str,
}

impl Stage for Intake<'_> {
    type Output = IntakeResult;

    const KIND: StageKind = StageKind::Intake;
    const INSTRUCTION: &'static str = INSTRUCTION;

    fn prompt(&self) -> Result<String> {
        Ok(self.raw_text.to_string())
    }

    fn parse(reply: &str) -> Result<IntakeResult> {
        normalize_into(reply)
    }
}

pub async fn run_intake(model: &dyn ModelService, raw_text: &str) -> Result<IntakeResult> {
    invoke(model, Intake { raw_text }).await
}
