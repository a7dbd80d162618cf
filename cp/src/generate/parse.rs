//! Parsing of raw model output into questions and ideas

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::GenerationError;
use crate::domain::Idea;

/// Leading list markers: `1.`, `1)`, `-`, `*`, `•`
const LIST_MARKER: &str = r"^\s*(?:\d+\s*[.)]|[-*•])\s*";

/// A flat JSON object; idea objects never nest
const JSON_OBJECT: &str = r"\{[^{}]*\}";

/// Lines this short are headings or noise, not questions
const MIN_QUESTION_CHARS: usize = 10;

/// Extract up to `count` questions from a one-per-line response
pub fn parse_questions(text: &str, count: usize) -> Result<Vec<String>, GenerationError> {
    debug!(len = text.len(), %count, "parse_questions: called");
    let marker = Regex::new(LIST_MARKER).map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;

    let questions: Vec<String> = text
        .lines()
        .map(|line| marker.replace(line, "").trim().trim_matches('*').trim().to_string())
        .filter(|line| line.chars().count() > MIN_QUESTION_CHARS)
        // Preambles and headings introduce a list rather than ask anything
        .filter(|line| !line.ends_with(':'))
        .take(count)
        .collect();

    if questions.is_empty() {
        return Err(GenerationError::MalformedOutput(
            "response contained no questions".to_string(),
        ));
    }
    debug!(question_count = questions.len(), "parse_questions: parsed");
    Ok(questions)
}

#[derive(Debug, Deserialize)]
struct RawIdea {
    title: String,
    #[serde(default)]
    summary: String,
}

/// Extract every `{"title": ..., "summary": ...}` object from a response
///
/// Objects that fail to parse or lack a title are skipped; shape validation
/// is left to the curator.
pub fn parse_ideas(text: &str) -> Result<Vec<Idea>, GenerationError> {
    debug!(len = text.len(), "parse_ideas: called");
    let object = Regex::new(JSON_OBJECT).map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;

    let ideas: Vec<Idea> = object
        .find_iter(text)
        .filter_map(|m| match serde_json::from_str::<RawIdea>(m.as_str()) {
            Ok(raw) => Some(Idea::new(raw.title, raw.summary)),
            Err(e) => {
                debug!(error = %e, "parse_ideas: skipping unparseable object");
                None
            }
        })
        .collect();

    if ideas.is_empty() {
        return Err(GenerationError::MalformedOutput(
            "response contained no idea objects".to_string(),
        ));
    }
    debug!(idea_count = ideas.len(), "parse_ideas: parsed");
    Ok(ideas)
}
