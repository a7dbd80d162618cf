//! LLM-backed question and idea generation

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::parse::{parse_ideas, parse_questions};
use super::{GenerationError, IdeaGenerator, IdeaRequest, QuestionGenerator, QuestionPhase, QuestionRequest};
use crate::config::LlmConfig;
use crate::curator::CuratorConfig;
use crate::domain::Idea;
use crate::llm::{self, CompletionRequest, LlmClient, Message, StopReason};
use crate::prompts::{self, HistoryItem, IdeaPrompt, PromptLoader, QuestionPrompt};

const CUSTOMER_PERSONA: &str = "You are a thoughtful customer researching a product before buying it.";
const STRATEGIST_PERSONA: &str = "You are a content strategist who turns customer questions into articles that sell.";

/// Generator that prompts an LLM playing the customer
///
/// Without a client every call fails with `Unavailable`, so a missing API key
/// degrades the session instead of aborting it.
pub struct LlmGenerator {
    client: Option<Arc<dyn LlmClient>>,
    unavailable_reason: String,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
    summary_min_chars: usize,
    summary_max_chars: usize,
}

impl LlmGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        let curator = CuratorConfig::default();
        Self {
            client: Some(client),
            unavailable_reason: String::new(),
            prompts,
            max_tokens,
            summary_min_chars: curator.summary_min_chars,
            summary_max_chars: curator.summary_max_chars,
        }
    }

    /// A generator that always reports `reason` as unavailable
    pub fn unconfigured(reason: impl Into<String>, prompts: Arc<PromptLoader>) -> Self {
        let curator = CuratorConfig::default();
        Self {
            client: None,
            unavailable_reason: reason.into(),
            prompts,
            max_tokens: 0,
            summary_min_chars: curator.summary_min_chars,
            summary_max_chars: curator.summary_max_chars,
        }
    }

    /// Build from config, degrading to `unconfigured` when no client can be made
    pub fn from_config(config: &LlmConfig, prompts: Arc<PromptLoader>) -> Self {
        debug!(provider = %config.provider, "LlmGenerator::from_config: called");
        match llm::create_client(config) {
            Ok(client) => Self::new(client, prompts, config.max_tokens),
            Err(e) => {
                warn!(error = %e, "LLM not configured, generation will be unavailable");
                Self::unconfigured(e.to_string(), prompts)
            }
        }
    }

    /// Summary bounds stated in the idea prompt
    pub fn with_summary_bounds(mut self, min: usize, max: usize) -> Self {
        self.summary_min_chars = min;
        self.summary_max_chars = max;
        self
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// Send one prompt, returning the text and why generation stopped
    async fn ask(&self, persona: &str, prompt: String) -> Result<(String, StopReason), GenerationError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| GenerationError::Unavailable(self.unavailable_reason.clone()))?;

        let request = CompletionRequest {
            system_prompt: persona.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
        };

        let response = client.complete(request).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "ask: completed"
        );
        if response.stop_reason == StopReason::MaxTokens {
            warn!(max_tokens = self.max_tokens, "LLM response hit max-tokens and was cut off");
        }

        let text = response
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::MalformedOutput("empty response".to_string()))?;
        Ok((text, response.stop_reason))
    }

    fn render<T: serde::Serialize>(&self, template: &str, context: &T) -> Result<String, GenerationError> {
        self.prompts
            .render(template, context)
            .map_err(|e| GenerationError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl QuestionGenerator for LlmGenerator {
    async fn generate_questions(&self, request: &QuestionRequest) -> Result<Vec<String>, GenerationError> {
        debug!(subject = %request.subject, count = request.count, phase = ?request.phase, "generate_questions: called");
        let template = match request.phase {
            QuestionPhase::FirstRound => prompts::QUESTIONS_FIRST,
            QuestionPhase::FollowUp => prompts::QUESTIONS_FOLLOW_UP,
        };
        let prompt = self.render(
            template,
            &QuestionPrompt {
                subject: request.subject.clone(),
                count: request.count,
                history: request.history.iter().map(HistoryItem::from).collect(),
                seed_context: request.seed_context.clone(),
            },
        )?;

        let (text, stop_reason) = self.ask(CUSTOMER_PERSONA, prompt).await?;
        // A cut-off response ends in a partial question
        let text = match (stop_reason, text.trim_end().rsplit_once('\n')) {
            (StopReason::MaxTokens, Some((complete, _partial))) => complete,
            _ => text.as_str(),
        };
        let questions = parse_questions(text, request.count)?;
        info!("Generated {} questions for '{}'", questions.len(), request.subject);
        Ok(questions)
    }
}

#[async_trait]
impl IdeaGenerator for LlmGenerator {
    async fn generate_ideas(&self, request: &IdeaRequest) -> Result<Vec<Idea>, GenerationError> {
        debug!(subject = %request.subject, count = request.count, "generate_ideas: called");
        let prompt = self.render(
            prompts::IDEAS,
            &IdeaPrompt {
                subject: request.subject.clone(),
                count: request.count,
                history: request.history.iter().map(HistoryItem::from).collect(),
                existing_titles: request.existing_titles.clone(),
                summary_min: self.summary_min_chars,
                summary_max: self.summary_max_chars,
            },
        )?;

        let (text, _) = self.ask(STRATEGIST_PERSONA, prompt).await?;
        let ideas = parse_ideas(&text)?;
        info!("Generated {} candidate ideas for '{}'", ideas.len(), request.subject);
        Ok(ideas)
    }
}
