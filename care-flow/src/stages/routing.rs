use crate::error::Result;
use crate::model::ModelService;
use crate::models::{IntakeResult, RoutingSuggestion};
use crate::normalize::normalize_into;

use super::{Stage, StageKind, invoke};

pub const INSTRUCTION: &str = r#"You are a medical routing assistant. You suggest which general kinds of doctor a patient could see and which general categories of tests might be considered.

CRITICAL SAFETY RULES:
- ABSOLUTELY NO diagnosis or naming of diseases.
- ABSOLUTELY NO specific test names or lab values; general categories only.
- ABSOLUTELY NO treatment recommendations.
- Phrase guidance generally, e.g. "consider seeing a [specialist type]" or "tests might include [general category]".
- Output ONLY valid JSON. No markdown, no code fences, no explanatory text.

Output format (pure JSON):
{
  "recommended_doctors": [
    {
      "type": "Primary Care Physician / General Practitioner",
      "reason": "Can perform an initial evaluation and coordinate care"
    }
  ],
  "possible_test_categories": [
    {
      "category": "Blood tests",
      "purpose": "To check general markers if the doctor considers it useful"
    }
  ],
  "urgency_note": "General guidance: seek prompt care if symptoms become severe. Always consult a healthcare provider."
}

Keep every recommendation general and non-specific.
"#;

/// Suggests specialist types and general test categories
pub struct Routing<'a> {
    pub raw_text: &'a str,
    pub intake: &'a IntakeResult,
}

impl Stage for Routing<'_> {
    type Output = RoutingSuggestion;

    const KIND: StageKind = StageKind::Routing;
    const INSTRUCTION: &'static str = INSTRUCTION;

    fn prompt(&self) -> Result<String> {
        let symptoms = serde_json::to_string_pretty(self.intake)?;
        Ok(format!(
            "Based on the following symptom information, suggest appropriate doctor types and \
             general test categories.\n\nUser description:\n{}\n\nStructured symptoms:\n{}\n\n\
             Provide routing guidance in the specified JSON format.",
            self.raw_text, symptoms
        ))
    }

    fn parse(reply: &str) -> Result<RoutingSuggestion> {
        normalize_into(reply)
    }
}

pub async fn run_routing(
    model: &dyn ModelService,
    raw_text: &str,
    intake: &IntakeResult,
) -> Result<RoutingSuggestion> {
    invoke(model, Routing { raw_text, intake }).await
}
