use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// Prefix of the placeholder answer generated when no human is present
pub const PLACEHOLDER_PREFIX: &str = "Demo answer for: ";

/// Answer recorded for a question the caller left unanswered
pub const NO_ANSWER: &str = "(No answer provided)";

/// Insertion-ordered question → answer mapping with unique questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClarifierAnswers {
    entries: Vec<(String, String)>,
}

impl ClarifierAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an answer. Re-answering a question replaces the value in place
    /// and returns the previous one.
    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<String>) -> Option<String> {
        let question = question.into();
        let answer = answer.into();
        match self.entries.iter_mut().find(|(q, _)| *q == question) {
            Some((_, existing)) => Some(std::mem::replace(existing, answer)),
            None => {
                self.entries.push((question, answer));
                None
            }
        }
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(q, _)| q == question)
            .map(|(_, a)| a.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }
}

impl<Q: Into<String>, A: Into<String>> FromIterator<(Q, A)> for ClarifierAnswers {
    fn from_iter<I: IntoIterator<Item = (Q, A)>>(iter: I) -> Self {
        let mut answers = ClarifierAnswers::new();
        for (q, a) in iter {
            answers.insert(q, a);
        }
        answers
    }
}

impl Serialize for ClarifierAnswers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ClarifierAnswers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AnswersVisitor;

        impl<'de> Visitor<'de> for AnswersVisitor {
            type Value = ClarifierAnswers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of question strings to answer strings")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> std::result::Result<Self::Value, M::Error> {
                let mut answers = ClarifierAnswers::new();
                while let Some((question, answer)) = map.next_entry::<String, String>()? {
                    answers.insert(question, answer);
                }
                Ok(answers)
            }
        }

        deserializer.deserialize_map(AnswersVisitor)
    }
}

/// Collapse every whitespace run (newlines included) into one space.
///
/// Applied to question and answer text before it is embedded in a prompt so
/// that one entry can never spill over into the `Q:` / `A:` line structure.
/// Braces and other characters pass through untouched: prompts are built by
/// concatenation and never re-templated.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capability to answer the clarifier's follow-up questions.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Return one answer per question, keyed by the question text.
    async fn answers(&self, questions: &[String]) -> Result<ClarifierAnswers>;
}

/// Generates a fixed placeholder for every question so the rest of the
/// pipeline can run without a human.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAnswers;

impl PlaceholderAnswers {
    pub fn placeholder_for(question: &str) -> String {
        format!("{PLACEHOLDER_PREFIX}{}", single_line(question))
    }
}

#[async_trait]
impl AnswerSource for PlaceholderAnswers {
    async fn answers(&self, questions: &[String]) -> Result<ClarifierAnswers> {
        Ok(questions
            .iter()
            .map(|q| (q.clone(), Self::placeholder_for(q)))
            .collect())
    }
}

/// Answers supplied up front by the caller.
///
/// Values are used verbatim. Questions missing from the mapping, or answered
/// with blank text, get [`NO_ANSWER`]; entries for questions the clarifier
/// did not ask are dropped.
#[derive(Debug, Clone, Default)]
pub struct SuppliedAnswers {
    answers: HashMap<String, String>,
}

impl SuppliedAnswers {
    pub fn new(answers: HashMap<String, String>) -> Self {
        Self { answers }
    }

    fn lookup(&self, question: &str) -> Option<&str> {
        self.answers
            .get(question)
            .or_else(|| self.answers.get(question.trim()))
            .map(String::as_str)
            .filter(|a| !a.trim().is_empty())
    }
}

impl<Q: Into<String>, A: Into<String>> FromIterator<(Q, A)> for SuppliedAnswers {
    fn from_iter<I: IntoIterator<Item = (Q, A)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(q, a)| (q.into(), a.into())).collect())
    }
}

#[async_trait]
impl AnswerSource for SuppliedAnswers {
    async fn answers(&self, questions: &[String]) -> Result<ClarifierAnswers> {
        Ok(questions
            .iter()
            .map(|q| (q.clone(), self.lookup(q).unwrap_or(NO_ANSWER).to_string()))
            .collect())
    }
}
