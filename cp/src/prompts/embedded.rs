//! Embedded fallback prompts
//!
//! Compiled into the binary and used when no template file is found.

pub const QUESTIONS_FIRST: &str = include_str!("../../prompts/questions-first.pmt");
pub const QUESTIONS_FOLLOW_UP: &str = include_str!("../../prompts/questions-follow-up.pmt");
pub const IDEAS: &str = include_str!("../../prompts/ideas.pmt");
pub const ANSWER: &str = include_str!("../../prompts/answer.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "questions-first" => Some(QUESTIONS_FIRST),
        "questions-follow-up" => Some(QUESTIONS_FOLLOW_UP),
        "ideas" => Some(IDEAS),
        "answer" => Some(ANSWER),
        _ => None,
    }
}
