//! Salesperson persona that answers questions from the context file

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Answer, AnswerCollector, QuestionSlot};
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{self, AnswerPrompt, PromptLoader};

const SALES_PERSONA: &str = "You are a friendly, honest salesperson who only states facts you were given.";

/// Longest answer the prompt asks for
pub const DEFAULT_ANSWER_CHARS: usize = 100;

/// Answers with an LLM grounded in the product knowledge text
///
/// Any failure (render, call, timeout, empty reply) becomes a skip, so an
/// unreliable answerer can never put a bogus answer into history.
pub struct SalesAnswerer {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    knowledge: String,
    max_chars: usize,
    max_tokens: u32,
    call_timeout: Duration,
}

impl SalesAnswerer {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, knowledge: String, call_timeout: Duration) -> Self {
        Self {
            client,
            prompts,
            knowledge,
            max_chars: DEFAULT_ANSWER_CHARS,
            max_tokens: 512,
            call_timeout,
        }
    }

    async fn answer(&self, slot: QuestionSlot<'_>) -> Result<String, String> {
        let prompt = self
            .prompts
            .render(
                prompts::ANSWER,
                &AnswerPrompt {
                    subject: slot.subject.to_string(),
                    knowledge: self.knowledge.clone(),
                    question: slot.question.to_string(),
                    max_chars: self.max_chars,
                },
            )
            .map_err(|e| e.to_string())?;

        let request = CompletionRequest {
            system_prompt: SALES_PERSONA.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
        };

        let response = tokio::time::timeout(self.call_timeout, self.client.complete(request))
            .await
            .map_err(|_| format!("timed out after {:?}", self.call_timeout))?
            .map_err(|e| e.to_string())?;

        Ok(response.content.unwrap_or_default())
    }
}

#[async_trait]
impl AnswerCollector for SalesAnswerer {
    async fn ask(&self, slot: QuestionSlot<'_>) -> Answer {
        debug!(number = slot.number, total = slot.total, question = %slot.question, "SalesAnswerer::ask: called");
        match self.answer(slot).await {
            Ok(text) => Answer::from_input(&text),
            Err(e) => {
                warn!(error = %e, question = %slot.question, "Sales answerer failed, skipping question");
                Answer::Skip
            }
        }
    }
}
