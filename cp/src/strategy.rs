//! Question Strategy - decides what to ask in each round

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::Session;
use crate::generate::{GenerationError, QuestionGenerator, QuestionPhase, QuestionRequest};
use crate::similarity;

/// Question similarity at or above which a question is a near-verbatim repeat
///
/// Stricter than the idea-title threshold: questions built on the same
/// template ("What is the X of this product?") differ in one word and must
/// all survive. Avoiding topics already covered is left to the prompt.
pub const DEFAULT_REPEAT_THRESHOLD: f64 = 0.90;

/// Where the strategy is in a session's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyPhase {
    /// No round has completed yet
    FirstRound,
    /// At least one round completed
    FollowUp,
    /// Session ended; no more questions
    Terminated,
}

#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub questions_per_round: usize,
    /// Similarity at or above which a generated question is dropped as a repeat
    pub repeat_threshold: f64,
    pub call_timeout: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            questions_per_round: 5,
            repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
            call_timeout: Duration::from_secs(120),
        }
    }
}

pub struct QuestionStrategy {
    generator: Arc<dyn QuestionGenerator>,
    config: StrategyConfig,
    phase: StrategyPhase,
    seed_context: Option<String>,
}

impl QuestionStrategy {
    pub fn new(generator: Arc<dyn QuestionGenerator>, config: StrategyConfig) -> Self {
        Self {
            generator,
            config,
            phase: StrategyPhase::FirstRound,
            seed_context: None,
        }
    }

    /// Pass seed text to every question request
    pub fn with_seed_context(mut self, seed_context: Option<String>) -> Self {
        self.seed_context = seed_context;
        self
    }

    pub fn phase(&self) -> StrategyPhase {
        self.phase
    }

    /// Align the phase with a (possibly resumed) session
    pub fn sync(&mut self, session: &Session) {
        if self.phase == StrategyPhase::Terminated {
            return;
        }
        self.phase = if session.round_count() == 0 {
            StrategyPhase::FirstRound
        } else {
            StrategyPhase::FollowUp
        };
        debug!(phase = ?self.phase, rounds = session.round_count(), "QuestionStrategy::sync: called");
    }

    /// Produce the next batch of questions
    ///
    /// Returns an empty batch once terminated. Generated questions that repeat
    /// an answered question, or an earlier one in the batch, are dropped.
    pub async fn next_questions(&self, session: &Session) -> Result<Vec<String>, GenerationError> {
        let phase = match self.phase {
            StrategyPhase::Terminated => {
                debug!("next_questions: terminated, no questions");
                return Ok(vec![]);
            }
            StrategyPhase::FirstRound => QuestionPhase::FirstRound,
            StrategyPhase::FollowUp => QuestionPhase::FollowUp,
        };

        let request = QuestionRequest {
            subject: session.subject().to_string(),
            history: match phase {
                QuestionPhase::FirstRound => vec![],
                QuestionPhase::FollowUp => session.qa_history().to_vec(),
            },
            count: self.config.questions_per_round,
            phase,
            seed_context: self.seed_context.clone(),
        };
        debug!(?phase, history_len = request.history.len(), "next_questions: called");

        let generated = tokio::time::timeout(self.config.call_timeout, self.generator.generate_questions(&request))
            .await
            .map_err(|_| GenerationError::Timeout(self.config.call_timeout))??;

        let questions = self.drop_repeats(session, generated);
        info!(count = questions.len(), ?phase, "Question batch ready");
        Ok(questions)
    }

    fn drop_repeats(&self, session: &Session, generated: Vec<String>) -> Vec<String> {
        let threshold = self.config.repeat_threshold;
        let mut kept: Vec<String> = Vec::new();

        for question in generated {
            let question = question.trim();
            if question.is_empty() {
                continue;
            }
            let answered = session
                .qa_history()
                .iter()
                .any(|qa| similarity::is_duplicate(question, &qa.question, threshold));
            let repeated = kept.iter().any(|k| similarity::is_duplicate(question, k, threshold));
            if answered || repeated {
                debug!(%question, answered, "drop_repeats: dropping repeated question");
                continue;
            }
            kept.push(question.to_string());
        }

        kept.truncate(self.config.questions_per_round);
        kept
    }

    /// Record that a round was committed
    pub fn complete_round(&mut self) {
        if self.phase == StrategyPhase::FirstRound {
            debug!("complete_round: FirstRound -> FollowUp");
            self.phase = StrategyPhase::FollowUp;
        }
    }

    pub fn terminate(&mut self) {
        debug!("terminate: called");
        self.phase = StrategyPhase::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QaEntry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed batch and records each request
    struct ScriptedQuestions {
        batch: Vec<String>,
        delay: Option<Duration>,
        seen: Mutex<Vec<QuestionRequest>>,
    }

    impl ScriptedQuestions {
        fn new(batch: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                batch: batch.iter().map(|q| q.to_string()).collect(),
                delay: None,
                seen: Mutex::new(vec![]),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                batch: vec!["What is it?".to_string()],
                delay: Some(delay),
                seen: Mutex::new(vec![]),
            })
        }

        fn last(&self) -> QuestionRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl QuestionGenerator for ScriptedQuestions {
        async fn generate_questions(&self, request: &QuestionRequest) -> Result<Vec<String>, GenerationError> {
            self.seen.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.batch.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl QuestionGenerator for Failing {
        async fn generate_questions(&self, _request: &QuestionRequest) -> Result<Vec<String>, GenerationError> {
            Err(GenerationError::Unavailable("offline".to_string()))
        }
    }

    fn answered_session() -> Session {
        let mut session = Session::new("Wireless Headphones").unwrap();
        session
            .record_round(
                vec![QaEntry::new(1, "What is the battery life of these headphones?", "30 hours").unwrap()],
                vec![],
            )
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_first_round_sends_subject_only() {
        let generator = ScriptedQuestions::new(&["What is it?", "Who is it for?"]);
        let strategy = QuestionStrategy::new(generator.clone(), StrategyConfig::default());
        let session = Session::new("Wireless Headphones").unwrap();

        let questions = strategy.next_questions(&session).await.unwrap();

        assert_eq!(questions.len(), 2);
        let request = generator.last();
        assert_eq!(request.phase, QuestionPhase::FirstRound);
        assert!(request.history.is_empty());
        assert_eq!(request.count, 5);
    }

    #[tokio::test]
    async fn test_follow_up_drops_answered_and_batch_repeats() {
        let generator = ScriptedQuestions::new(&[
            "What is the battery life of these headphones?",
            "Do they come with a warranty?",
            "Do they come with a warranty??",
            "How do they compare with earbuds?",
        ]);
        let mut strategy = QuestionStrategy::new(generator.clone(), StrategyConfig::default());
        let session = answered_session();
        strategy.sync(&session);
        assert_eq!(strategy.phase(), StrategyPhase::FollowUp);

        let questions = strategy.next_questions(&session).await.unwrap();

        assert_eq!(
            questions,
            vec!["Do they come with a warranty?", "How do they compare with earbuds?"]
        );
        assert_eq!(generator.last().history.len(), 1);
    }

    #[tokio::test]
    async fn test_same_template_questions_all_survive() {
        let batch = [
            "What colors are available for this product?",
            "What sizes are available for this product?",
            "What is the price of this product?",
            "What is the weight of this product?",
            "What is the warranty of this product?",
        ];
        let mut session = Session::new("Trail Shoes").unwrap();
        session
            .record_round(
                vec![QaEntry::new(1, "What is the material of this product?", "Recycled mesh").unwrap()],
                vec![],
            )
            .unwrap();
        let mut strategy = QuestionStrategy::new(ScriptedQuestions::new(&batch), StrategyConfig::default());
        strategy.sync(&session);

        let questions = strategy.next_questions(&session).await.unwrap();

        assert_eq!(questions, batch.to_vec());
    }

    #[tokio::test]
    async fn test_batch_truncated_to_count() {
        let generator = ScriptedQuestions::new(&["What is it?", "Who is it for?", "Where to buy?"]);
        let config = StrategyConfig {
            questions_per_round: 2,
            ..StrategyConfig::default()
        };
        let strategy = QuestionStrategy::new(generator, config);

        let questions = strategy.next_questions(&Session::new("X").unwrap()).await.unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let mut strategy = QuestionStrategy::new(ScriptedQuestions::new(&["What is it?"]), StrategyConfig::default());
        assert_eq!(strategy.phase(), StrategyPhase::FirstRound);

        strategy.complete_round();
        assert_eq!(strategy.phase(), StrategyPhase::FollowUp);

        strategy.terminate();
        strategy.sync(&answered_session());
        assert_eq!(strategy.phase(), StrategyPhase::Terminated);
        assert!(strategy.next_questions(&answered_session()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failure_surfaces() {
        let strategy = QuestionStrategy::new(Arc::new(Failing), StrategyConfig::default());
        let err = strategy.next_questions(&Session::new("X").unwrap()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generator_times_out() {
        let config = StrategyConfig {
            call_timeout: Duration::from_secs(1),
            ..StrategyConfig::default()
        };
        let strategy = QuestionStrategy::new(ScriptedQuestions::slow(Duration::from_secs(10)), config);

        let err = strategy.next_questions(&Session::new("X").unwrap()).await.unwrap_err();
        assert_eq!(err, GenerationError::Timeout(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_seed_context_forwarded() {
        let generator = ScriptedQuestions::new(&["What is it?"]);
        let strategy = QuestionStrategy::new(generator.clone(), StrategyConfig::default())
            .with_seed_context(Some("Foldable design".to_string()));

        strategy.next_questions(&Session::new("X").unwrap()).await.unwrap();
        assert_eq!(generator.last().seed_context.as_deref(), Some("Foldable design"));
    }
}
