use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Read a field the model may send as `null` as its default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lower-cased label of a string value; anything else yields `None`.
fn label_of<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(|s| s.trim().to_ascii_lowercase()))
}

/// Reported intensity of a symptom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    #[default]
    Unknown,
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match label_of(deserializer)?.as_deref() {
            Some("mild") => Severity::Mild,
            Some("moderate") => Severity::Moderate,
            Some("severe") => Severity::Severe,
            _ => Severity::Unknown,
        })
    }
}

/// Whether the patient ties a symptom to their menstrual cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleRelation {
    Yes,
    No,
    #[default]
    Unknown,
}

impl<'de> Deserialize<'de> for CycleRelation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match label_of(deserializer)?.as_deref() {
            Some("yes") => CycleRelation::Yes,
            Some("no") => CycleRelation::No,
            _ => CycleRelation::Unknown,
        })
    }
}

/// One extracted symptom. Entries keep extraction order and may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: Severity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub frequency: String,
    #[serde(rename = "since_when", alias = "onset", default, deserialize_with = "null_as_default")]
    pub onset: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cycle_related: CycleRelation,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub symptoms: Vec<Symptom>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClarifierQuestions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecommendation {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub doctor_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCategory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub purpose: String,
}

/// Advisory routing guidance. The default value is the empty shape used when
/// the routing stage fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingSuggestion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommended_doctors: Vec<DoctorRecommendation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub possible_test_categories: Vec<TestCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urgency_note: String,
}

impl RoutingSuggestion {
    pub fn is_empty(&self) -> bool {
        self.recommended_doctors.is_empty()
            && self.possible_test_categories.is_empty()
            && self.urgency_note.is_empty()
    }
}

/// The five criteria a visit note is graded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    ChiefComplaint,
    OnsetDuration,
    SeverityImpact,
    PatternTriggers,
    NoSpeculation,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::ChiefComplaint,
        Criterion::OnsetDuration,
        Criterion::SeverityImpact,
        Criterion::PatternTriggers,
        Criterion::NoSpeculation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Criterion::ChiefComplaint => "chief_complaint",
            Criterion::OnsetDuration => "onset_duration",
            Criterion::SeverityImpact => "severity_impact",
            Criterion::PatternTriggers => "pattern_triggers",
            Criterion::NoSpeculation => "no_speculation",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

/// Quality score bounded to `0..=10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 10;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Score(value as u8))
        } else {
            Err(format!("score {value} is outside 0..={}", Self::MAX))
        }
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> Self {
        i64::from(score.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub score: Score,
    #[serde(default, deserialize_with = "null_as_default")]
    pub missing_fields: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_improvement: String,
}

impl EvalResult {
    /// Missing-field labels that name one of the known criteria
    pub fn missing_criteria(&self) -> Vec<Criterion> {
        self.missing_fields
            .iter()
            .filter_map(|f| Criterion::from_label(f))
            .collect()
    }

    /// Labels the model reported that are not known criteria
    pub fn unrecognized_fields(&self) -> Vec<&str> {
        self.missing_fields
            .iter()
            .filter(|f| Criterion::from_label(f).is_none())
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn symptom_reads_since_when_and_folds_unknown_enums() {
        let symptom: Symptom = serde_json::from_value(json!({
            "name": "headache",
            "severity": "excruciating",
            "frequency": "every afternoon",
            "since_when": "2 weeks ago",
            "cycle_related": "maybe"
        }))
        .unwrap();

        assert_eq!(symptom.severity, Severity::Unknown);
        assert_eq!(symptom.cycle_related, CycleRelation::Unknown);
        assert_eq!(symptom.onset, "2 weeks ago");
        assert_eq!(symptom.notes, "");

        let out = serde_json::to_value(&symptom).unwrap();
        assert_eq!(out["since_when"], json!("2 weeks ago"));
    }

    #[test]
    fn symptom_tolerates_nulls_and_a_missing_name() {
        let symptom: Symptom = serde_json::from_value(json!({
            "severity": null,
            "frequency": "daily",
            "since_when": null,
            "cycle_related": null,
            "notes": null
        }))
        .unwrap();

        assert_eq!(symptom.name, "");
        assert_eq!(symptom.severity, Severity::Unknown);
        assert_eq!(symptom.frequency, "daily");
        assert_eq!(symptom.onset, "");
        assert_eq!(symptom.notes, "");
    }

    #[test]
    fn enum_labels_match_regardless_of_case() {
        let symptom: Symptom = serde_json::from_value(json!({
            "name": "cramps",
            "severity": " SEVERE ",
            "cycle_related": "Yes"
        }))
        .unwrap();
        assert_eq!(symptom.severity, Severity::Severe);
        assert_eq!(symptom.cycle_related, CycleRelation::Yes);

        let moderate: Severity = serde_json::from_value(json!("Moderate")).unwrap();
        assert_eq!(moderate, Severity::Moderate);
        assert_eq!(serde_json::to_value(moderate).unwrap(), json!("moderate"));
        assert_eq!(serde_json::from_value::<Severity>(json!(3)).unwrap(), Severity::Unknown);
    }

    #[test]
    fn routing_and_eval_tolerate_null_fields() {
        let routing: RoutingSuggestion = serde_json::from_value(json!({
            "recommended_doctors": [{"type": null, "reason": "Initial evaluation"}],
            "possible_test_categories": null,
            "urgency_note": null
        }))
        .unwrap();
        assert_eq!(routing.recommended_doctors[0].doctor_type, "");
        assert!(routing.possible_test_categories.is_empty());

        let eval: EvalResult = serde_json::from_value(json!({
            "score": 9,
            "missing_fields": null,
            "suggested_improvement": null
        }))
        .unwrap();
        assert!(eval.missing_fields.is_empty());
        assert_eq!(eval.suggested_improvement, "");
    }

    #[test]
    fn score_rejects_out_of_range_values() {
        assert!(serde_json::from_value::<Score>(json!(10)).is_ok());
        assert!(serde_json::from_value::<Score>(json!(11)).is_err());
        assert!(serde_json::from_value::<Score>(json!(-1)).is_err());
        assert!(serde_json::from_value::<Score>(json!(7.5)).is_err());
    }

    #[test]
    fn missing_fields_split_into_known_and_unknown() {
        let eval = EvalResult {
            score: Score::try_from(6).unwrap(),
            missing_fields: vec!["Onset_Duration".into(), "medication list".into()],
            suggested_improvement: String::new(),
        };
        assert_eq!(eval.missing_criteria(), vec![Criterion::OnsetDuration]);
        assert_eq!(eval.unrecognized_fields(), vec!["medication list"]);
    }

    #[test]
    fn routing_defaults_to_empty_shape() {
        let routing: RoutingSuggestion = serde_json::from_value(json!({})).unwrap();
        assert!(routing.is_empty());
        assert_eq!(routing, RoutingSuggestion::default());
    }
}
