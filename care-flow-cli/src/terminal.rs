//! Human input over stdin.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use care_flow::answers::NO_ANSWER;
use care_flow::{AnswerSource, ClarifierAnswers, FlowError};

pub const QUIT: &str = "quit";

/// What the user typed at the symptom prompt
#[derive(Debug, PartialEq, Eq)]
pub enum SymptomInput {
    Text(String),
    Empty,
    Quit,
    /// Input closed before anything was typed
    Eof,
}

/// Read lines until a blank line; `quit` on its own line ends the session.
pub fn read_symptoms(reader: &mut impl BufRead) -> io::Result<SymptomInput> {
    let mut lines = Vec::new();
    let mut read_any = false;
    for line in reader.lines() {
        let line = line?;
        read_any = true;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(QUIT) {
            return Ok(SymptomInput::Quit);
        }
        if trimmed.is_empty() {
            break;
        }
        lines.push(line);
    }

    if !read_any {
        Ok(SymptomInput::Eof)
    } else if lines.is_empty() {
        Ok(SymptomInput::Empty)
    } else {
        Ok(SymptomInput::Text(lines.join("\n")))
    }
}

/// Ask each question in turn; a blank reply records [`NO_ANSWER`].
pub fn ask_questions(
    questions: &[String],
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> io::Result<ClarifierAnswers> {
    let mut answers = ClarifierAnswers::new();
    let total = questions.len();

    for (i, question) in questions.iter().enumerate() {
        writeln!(writer, "\nQuestion {}/{total}:", i + 1)?;
        writeln!(writer, "   {question}")?;
        write!(writer, "   Your answer: ")?;
        writer.flush()?;

        let mut reply = String::new();
        reader.read_line(&mut reply)?;
        let reply = reply.trim();
        let answer = if reply.is_empty() { NO_ANSWER } else { reply };
        answers.insert(question.clone(), answer);
    }

    Ok(answers)
}

/// Prompts the person at the terminal for every clarifier question
pub struct TerminalAnswers;

#[async_trait]
impl AnswerSource for TerminalAnswers {
    async fn answers(&self, questions: &[String]) -> care_flow::Result<ClarifierAnswers> {
        let questions = questions.to_vec();
        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let stdout = io::stdout();
            ask_questions(&questions, &mut stdin.lock(), &mut stdout.lock())
        })
        .await
        .map_err(|e| FlowError::Answers(e.to_string()))?
        .map_err(|e| FlowError::Answers(e.to_string()))
    }
}
