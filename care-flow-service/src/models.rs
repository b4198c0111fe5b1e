use std::collections::HashMap;

use care_flow::{ClarifierAnswers, IntakeResult, RunSummary, SessionRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub raw_text: String,
}

/// Input shared by the clarifier and routing stages
#[derive(Debug, Deserialize)]
pub struct SymptomsRequest {
    pub raw_text: String,
    pub intake: IntakeResult,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub raw_text: String,
    pub intake: IntakeResult,
    #[serde(default)]
    pub answers: ClarifierAnswers,
}

#[derive(Debug, Deserialize)]
pub struct EvalRequest {
    pub doctor_note: String,
}

/// Full run. Without `answers` every clarifier question gets a placeholder.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub raw_text: String,
    pub answers: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub doctor_note: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub session: SessionRecord,
    pub summary: RunSummary,
}
