//! Session Orchestrator - drives resume-or-create and the round loop

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::autosave::AutosaveScheduler;
use crate::collect::{Answer, AnswerCollector, QuestionSlot};
use crate::curator::{self, Curation, CuratorConfig};
use crate::domain::{Idea, QaEntry, Session, SessionSummary, ValidationError};
use crate::generate::{GenerationError, IdeaGenerator, IdeaRequest};
use crate::state::{SaveOutcome, SessionWriter, SharedSession};
use crate::store::{SessionStore, StoreError};
use crate::strategy::QuestionStrategy;

/// Decision when a saved session exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Resume,
    Fresh,
    Quit,
}

/// Decision when the saved session cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryChoice {
    Fresh,
    Quit,
}

/// What to do next in the round loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Round answered by the operator
    Round,
    /// Round answered by the salesperson persona
    AutoRound,
    Save,
    Quit,
}

/// How a round ended
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Answers and curated ideas were committed
    Completed {
        round: u32,
        answered: usize,
        skipped: usize,
        curation: Curation,
        /// Set when idea generation failed; the answers were still kept
        idea_error: Option<GenerationError>,
    },
    /// Every question was skipped; the session is unchanged
    NothingAnswered { skipped: usize },
    /// No questions to ask; the session is unchanged
    NoQuestions { error: Option<GenerationError> },
    /// The round could not start
    Refused { reason: String },
    /// The round was rejected when committing; the session is unchanged
    Rejected(ValidationError),
}

/// Progress reported back to the operator
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RoundStarted { round: u32, automated: bool },
    RoundFinished(RoundOutcome),
    Saved { location: String, outcome: SaveOutcome },
    SaveFailed { location: String, error: StoreError },
    InvalidSubject(ValidationError),
    /// Ctrl-C outside a prompt; the session is saved and the loop ends
    Interrupted,
}

/// The human (or script) steering a session
#[async_trait]
pub trait Operator: Send + Sync {
    /// A saved session exists: resume it or start over?
    async fn choose_resume(&self, summary: &SessionSummary) -> ResumeChoice;

    /// The saved session is corrupt: start fresh or quit?
    async fn recover_corrupt(&self, error: &StoreError) -> RecoveryChoice;

    /// Subject for a new session; `None` quits
    async fn subject(&self) -> Option<String>;

    async fn next_action(&self, summary: &SessionSummary) -> Action;

    fn report(&self, event: &SessionEvent);
}

/// Load the saved session or create a new one
///
/// Returns `Ok(None)` when the operator quits. A fresh session never touches
/// the old snapshot; it is only replaced by the first save.
pub async fn resume_or_create(store: &SessionStore, operator: &dyn Operator) -> Result<Option<SharedSession>, StoreError> {
    debug!(location = %store.location(), "resume_or_create: called");
    match store.load() {
        Ok(Some(session)) => match operator.choose_resume(&SessionStore::summarize(&session)).await {
            ResumeChoice::Resume => {
                info!(subject = %session.subject(), rounds = session.round_count(), "Resuming session");
                return Ok(Some(SharedSession::loaded(session)));
            }
            ResumeChoice::Fresh => debug!("resume_or_create: operator chose a fresh session"),
            ResumeChoice::Quit => return Ok(None),
        },
        Ok(None) => debug!("resume_or_create: no saved session"),
        Err(e) if e.is_corrupt() => {
            warn!(error = %e, "Saved session is corrupt");
            if operator.recover_corrupt(&e).await == RecoveryChoice::Quit {
                return Ok(None);
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to read saved session");
            return Err(e);
        }
    }

    while let Some(subject) = operator.subject().await {
        match Session::new(subject) {
            Ok(session) => {
                info!(subject = %session.subject(), "Starting new session");
                return Ok(Some(SharedSession::fresh(session)));
            }
            Err(e) => operator.report(&SessionEvent::InvalidSubject(e)),
        }
    }
    Ok(None)
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub ideas_per_round: usize,
    pub curator: CuratorConfig,
    pub autosave_interval: Duration,
    /// Upper bound on each idea generation call
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ideas_per_round: 10,
            curator: CuratorConfig::default(),
            autosave_interval: Duration::from_secs(300),
            call_timeout: Duration::from_secs(120),
        }
    }
}

/// Runs rounds against one session until the operator quits
pub struct Orchestrator {
    session: SharedSession,
    writer: SessionWriter,
    autosave: AutosaveScheduler,
    strategy: QuestionStrategy,
    ideas: Arc<dyn IdeaGenerator>,
    answerer: Arc<dyn AnswerCollector>,
    auto_answerer: Result<Arc<dyn AnswerCollector>, String>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        session: SharedSession,
        writer: SessionWriter,
        strategy: QuestionStrategy,
        ideas: Arc<dyn IdeaGenerator>,
        answerer: Arc<dyn AnswerCollector>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            autosave: AutosaveScheduler::new(writer.clone()),
            session,
            writer,
            strategy,
            ideas,
            answerer,
            auto_answerer: Err("AI-to-AI rounds are not configured".to_string()),
            config,
        }
    }

    /// Answerer for AI-to-AI rounds, or the reason such rounds are refused
    pub fn with_auto_answerer(mut self, auto_answerer: Result<Arc<dyn AnswerCollector>, String>) -> Self {
        self.auto_answerer = auto_answerer;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Run until the operator quits or Ctrl-C is pressed
    ///
    /// Autosave runs for the whole loop. On quit the scheduler is stopped and
    /// the session saved once more; a failure of that last save is returned.
    pub async fn run(&mut self, operator: &dyn Operator) -> Result<(), StoreError> {
        self.run_until(operator, interrupted()).await
    }

    /// Run until the operator quits or `shutdown` resolves
    ///
    /// A round still in progress when `shutdown` resolves is abandoned before
    /// its commit, so the session is unchanged by it. Either way the session
    /// is saved before returning.
    pub async fn run_until(
        &mut self,
        operator: &dyn Operator,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), StoreError> {
        debug!("Orchestrator::run_until: called");
        let snapshot = self.session.snapshot().await;
        self.strategy.sync(&snapshot.session);
        self.autosave.start(self.session.clone(), self.config.autosave_interval);

        tokio::pin!(shutdown);
        loop {
            let flow = tokio::select! {
                flow = self.step(operator) => flow,
                _ = &mut shutdown => {
                    warn!("Interrupted, ending session");
                    operator.report(&SessionEvent::Interrupted);
                    ControlFlow::Break(())
                }
            };
            if flow.is_break() {
                break;
            }
        }

        info!("Ending session");
        self.autosave.stop().await;
        self.strategy.terminate();
        self.save(operator).await.map(|_| ())
    }

    /// Ask for and carry out one action
    async fn step(&mut self, operator: &dyn Operator) -> ControlFlow<()> {
        let summary = self.session.read(|s| s.summary()).await;
        match operator.next_action(&summary).await {
            Action::Round => {
                let answerer = self.answerer.clone();
                let outcome = self.run_round(answerer, false, operator).await;
                operator.report(&SessionEvent::RoundFinished(outcome));
            }
            Action::AutoRound => {
                let outcome = match self.auto_answerer.clone() {
                    Ok(answerer) => self.run_round(answerer, true, operator).await,
                    Err(reason) => RoundOutcome::Refused { reason },
                };
                operator.report(&SessionEvent::RoundFinished(outcome));
            }
            Action::Save => {
                // Failure is reported; the loop continues
                let _ = self.save(operator).await;
            }
            Action::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Persist the current session through the writer
    pub async fn save(&self, operator: &dyn Operator) -> Result<SaveOutcome, StoreError> {
        let snapshot = self.session.snapshot().await;
        let location = self.writer.location().to_string();
        match self.writer.save(snapshot).await {
            Ok(outcome) => {
                info!(?outcome, "Saved session to {}", location);
                operator.report(&SessionEvent::Saved {
                    location,
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(error) => {
                error!(error = %error, "Failed to save session to {}", location);
                operator.report(&SessionEvent::SaveFailed {
                    location,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// One round: questions, answers, ideas, curation, commit
    ///
    /// The session changes only at the final commit, and only when at least
    /// one question was answered.
    pub async fn run_round(
        &mut self,
        answerer: Arc<dyn AnswerCollector>,
        automated: bool,
        operator: &dyn Operator,
    ) -> RoundOutcome {
        let session = self.session.snapshot().await.session;
        let round = session.next_round();
        debug!(%round, automated, "run_round: called");
        operator.report(&SessionEvent::RoundStarted { round, automated });

        let questions = match self.strategy.next_questions(&session).await {
            Ok(questions) if questions.is_empty() => return RoundOutcome::NoQuestions { error: None },
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, "Question generation failed");
                return RoundOutcome::NoQuestions { error: Some(e) };
            }
        };

        let total = questions.len();
        let mut entries = Vec::with_capacity(total);
        let mut skipped = 0;
        for (index, question) in questions.iter().enumerate() {
            let slot = QuestionSlot {
                subject: session.subject(),
                number: index + 1,
                total,
                question,
            };
            match answerer.ask(slot).await {
                Answer::Text(answer) => match QaEntry::new(round, question.as_str(), answer) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        debug!(error = %e, "run_round: dropping invalid entry");
                        skipped += 1;
                    }
                },
                Answer::Skip => skipped += 1,
            }
        }

        if entries.is_empty() {
            info!(%round, skipped, "Round not counted: every question was skipped");
            return RoundOutcome::NothingAnswered { skipped };
        }

        let (candidates, idea_error) = self.generate_ideas(&session, &entries).await;
        let curation = curator::curate(&candidates, session.ideas(), &self.config.curator);

        let answered = entries.len();
        match self.session.record_round(entries, curation.accepted.clone()).await {
            Ok(round) => {
                self.strategy.complete_round();
                info!(%round, answered, skipped, ideas = curation.accepted.len(), "Round committed");
                RoundOutcome::Completed {
                    round,
                    answered,
                    skipped,
                    curation,
                    idea_error,
                }
            }
            Err(e) => {
                error!(error = %e, "Round rejected at commit");
                RoundOutcome::Rejected(e)
            }
        }
    }

    /// Ask for ideas over the history as it will be after this round
    async fn generate_ideas(&self, session: &Session, entries: &[QaEntry]) -> (Vec<Idea>, Option<GenerationError>) {
        let mut history = session.qa_history().to_vec();
        history.extend_from_slice(entries);

        let request = IdeaRequest {
            subject: session.subject().to_string(),
            history,
            existing_titles: session.ideas().iter().map(|i| i.title.clone()).collect(),
            count: self.config.ideas_per_round,
        };

        match tokio::time::timeout(self.config.call_timeout, self.ideas.generate_ideas(&request)).await {
            Ok(Ok(candidates)) => (candidates, None),
            Ok(Err(e)) => {
                warn!(error = %e, "Idea generation failed, keeping answers only");
                (vec![], Some(e))
            }
            Err(_) => {
                warn!(timeout = ?self.config.call_timeout, "Idea generation timed out, keeping answers only");
                (vec![], Some(GenerationError::Timeout(self.config.call_timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{QuestionGenerator, QuestionRequest};
    use crate::store::MemoryStorage;
    use crate::strategy::StrategyConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    struct FixedQuestions(Vec<String>);

    #[async_trait]
    impl QuestionGenerator for FixedQuestions {
        async fn generate_questions(&self, _request: &QuestionRequest) -> Result<Vec<String>, GenerationError> {
            Ok(self.0.clone())
        }
    }

    struct FixedIdeas {
        ideas: Result<Vec<Idea>, GenerationError>,
        seen: Mutex<Vec<IdeaRequest>>,
    }

    #[async_trait]
    impl IdeaGenerator for FixedIdeas {
        async fn generate_ideas(&self, request: &IdeaRequest) -> Result<Vec<Idea>, GenerationError> {
            self.seen.lock().unwrap().push(request.clone());
            self.ideas.clone()
        }
    }

    struct ScriptedAnswers(Mutex<VecDeque<Answer>>);

    #[async_trait]
    impl AnswerCollector for ScriptedAnswers {
        async fn ask(&self, _slot: QuestionSlot<'_>) -> Answer {
            self.0.lock().unwrap().pop_front().unwrap_or(Answer::Skip)
        }
    }

    #[derive(Default)]
    struct ScriptedOperator {
        actions: Mutex<VecDeque<Action>>,
        events: Mutex<Vec<SessionEvent>>,
    }

    impl ScriptedOperator {
        fn with_actions(actions: &[Action]) -> Self {
            Self {
                actions: Mutex::new(actions.iter().copied().collect()),
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<SessionEvent> {
            self.events.lock().unwrap().clone()
        }

        fn outcomes(&self) -> Vec<RoundOutcome> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    SessionEvent::RoundFinished(outcome) => Some(outcome),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Operator for ScriptedOperator {
        async fn choose_resume(&self, _summary: &SessionSummary) -> ResumeChoice {
            ResumeChoice::Resume
        }

        async fn recover_corrupt(&self, _error: &StoreError) -> RecoveryChoice {
            RecoveryChoice::Fresh
        }

        async fn subject(&self) -> Option<String> {
            Some("Wireless Headphones".to_string())
        }

        async fn next_action(&self, _summary: &SessionSummary) -> Action {
            self.actions.lock().unwrap().pop_front().unwrap_or(Action::Quit)
        }

        fn report(&self, event: &SessionEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn long_idea(title: &str) -> Idea {
        Idea::new(title, "s".repeat(120))
    }

    fn questions(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Question number {i} about the product?")).collect()
    }

    fn answers(script: &[Option<&str>]) -> Arc<ScriptedAnswers> {
        Arc::new(ScriptedAnswers(Mutex::new(
            script
                .iter()
                .map(|a| a.map_or(Answer::Skip, |t| Answer::Text(t.to_string())))
                .collect(),
        )))
    }

    struct Harness {
        orchestrator: Orchestrator,
        storage: Arc<MemoryStorage>,
        ideas: Arc<FixedIdeas>,
    }

    fn harness(
        question_batch: Vec<String>,
        ideas: Result<Vec<Idea>, GenerationError>,
        answerer: Arc<ScriptedAnswers>,
    ) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let session = SharedSession::fresh(Session::new("Wireless Headphones").unwrap());
        let writer = SessionWriter::spawn(SessionStore::new(storage.clone()), session.baseline());
        let ideas = Arc::new(FixedIdeas {
            ideas,
            seen: Mutex::new(vec![]),
        });
        let strategy = QuestionStrategy::new(Arc::new(FixedQuestions(question_batch)), StrategyConfig::default());
        let orchestrator = Orchestrator::new(
            session,
            writer,
            strategy,
            ideas.clone(),
            answerer,
            OrchestratorConfig::default(),
        );
        Harness {
            orchestrator,
            storage,
            ideas,
        }
    }

    #[tokio::test]
    async fn test_three_answers_two_skips() {
        let answerer = answers(&[Some("For music"), None, Some("Everyone"), None, Some("Online")]);
        let mut h = harness(questions(5), Ok(vec![long_idea("Why Wireless Headphones Win")]), answerer.clone());
        let operator = ScriptedOperator::default();

        let outcome = h.orchestrator.run_round(answerer, false, &operator).await;

        assert!(matches!(outcome, RoundOutcome::Completed { round: 1, answered: 3, skipped: 2, .. }));
        let session = h.orchestrator.session().snapshot().await.session;
        assert_eq!(session.qa_history().len(), 3);
        assert_eq!(session.round_count(), 1);
        assert_eq!(session.ideas().len(), 1);
        assert!(session.qa_history().iter().all(|qa| qa.round == 1));
    }

    #[tokio::test]
    async fn test_idea_generator_sees_extended_history() {
        let answerer = answers(&[Some("For music"), Some("Everyone")]);
        let mut h = harness(questions(2), Ok(vec![]), answerer.clone());
        let operator = ScriptedOperator::default();

        h.orchestrator.run_round(answerer, false, &operator).await;

        let seen = h.ideas.seen.lock().unwrap();
        assert_eq!(seen[0].history.len(), 2);
        assert_eq!(seen[0].count, 10);
    }

    #[tokio::test]
    async fn test_all_skipped_leaves_session_untouched() {
        let answerer = answers(&[None, None]);
        let mut h = harness(questions(2), Ok(vec![long_idea("Unused")]), answerer.clone());
        let operator = ScriptedOperator::default();
        let before = h.orchestrator.session().revision().await;

        let outcome = h.orchestrator.run_round(answerer, false, &operator).await;

        assert_eq!(outcome, RoundOutcome::NothingAnswered { skipped: 2 });
        assert_eq!(h.orchestrator.session().revision().await, before);
        assert!(h.ideas.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idea_failure_keeps_answers() {
        let answerer = answers(&[Some("For music")]);
        let failure = GenerationError::MalformedOutput("no ideas".to_string());
        let mut h = harness(questions(1), Err(failure.clone()), answerer.clone());
        let operator = ScriptedOperator::default();

        let outcome = h.orchestrator.run_round(answerer, false, &operator).await;

        match outcome {
            RoundOutcome::Completed { idea_error, curation, .. } => {
                assert_eq!(idea_error, Some(failure));
                assert!(curation.accepted.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let session = h.orchestrator.session().snapshot().await.session;
        assert_eq!(session.round_count(), 1);
        assert!(session.ideas().is_empty());
    }

    #[tokio::test]
    async fn test_curation_applied_against_batch() {
        let answerer = answers(&[Some("For music")]);
        let batch = vec![long_idea("How X Works"), long_idea("how x works!!"), Idea::new("Short", "too short")];
        let mut h = harness(questions(1), Ok(batch), answerer.clone());
        let operator = ScriptedOperator::default();

        let outcome = h.orchestrator.run_round(answerer, false, &operator).await;

        let RoundOutcome::Completed { curation, .. } = outcome else {
            panic!("round should complete");
        };
        assert_eq!(curation.duplicates, 1);
        assert_eq!(curation.invalid, 1);
        let session = h.orchestrator.session().snapshot().await.session;
        assert_eq!(session.ideas().len(), 1);
        assert_eq!(session.ideas()[0].title, "How X Works");
    }

    #[tokio::test]
    async fn test_no_questions_reported() {
        let answerer = answers(&[]);
        let mut h = harness(vec![], Ok(vec![]), answerer.clone());
        let operator = ScriptedOperator::default();

        let outcome = h.orchestrator.run_round(answerer, false, &operator).await;
        assert_eq!(outcome, RoundOutcome::NoQuestions { error: None });
    }

    #[tokio::test]
    async fn test_auto_round_refused_without_answerer() {
        let mut h = harness(questions(1), Ok(vec![]), answers(&[]));
        let operator = ScriptedOperator::with_actions(&[Action::AutoRound]);

        h.orchestrator.run(&operator).await.unwrap();

        assert!(matches!(operator.outcomes()[0], RoundOutcome::Refused { .. }));
        let persisted: Session = serde_json::from_slice(&h.storage.contents().unwrap()).unwrap();
        assert_eq!(persisted.round_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_round_uses_auto_answerer() {
        let h = harness(questions(2), Ok(vec![]), answers(&[]));
        let mut orchestrator = h
            .orchestrator
            .with_auto_answerer(Ok(answers(&[Some("It plays music"), Some("Anyone")]) as Arc<dyn AnswerCollector>));
        let operator = ScriptedOperator::with_actions(&[Action::AutoRound]);

        orchestrator.run(&operator).await.unwrap();

        assert!(matches!(operator.outcomes()[0], RoundOutcome::Completed { answered: 2, .. }));
        assert!(operator.events().contains(&SessionEvent::RoundStarted { round: 1, automated: true }));
    }

    #[tokio::test]
    async fn test_save_then_quit_persists_twice() {
        let answerer = answers(&[Some("For music")]);
        let mut h = harness(questions(1), Ok(vec![]), answerer);
        let operator = ScriptedOperator::with_actions(&[Action::Round, Action::Save, Action::Quit]);

        h.orchestrator.run(&operator).await.unwrap();

        assert_eq!(h.storage.write_count(), 2);
        let saves = operator
            .events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::Saved { .. }))
            .count();
        assert_eq!(saves, 2);
        let persisted: Session = serde_json::from_slice(&h.storage.contents().unwrap()).unwrap();
        assert_eq!(persisted.round_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_final_save_is_returned() {
        let mut h = harness(questions(1), Ok(vec![]), answers(&[]));
        h.storage.fail_next_writes(1);
        let operator = ScriptedOperator::with_actions(&[Action::Quit]);

        let err = h.orchestrator.run(&operator).await.unwrap_err();

        assert!(matches!(err, StoreError::StorageWriteFailure(_)));
        assert!(operator
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::SaveFailed { .. })));
    }

    #[tokio::test]
    async fn test_failed_explicit_save_keeps_loop_running() {
        let answerer = answers(&[Some("For music")]);
        let mut h = harness(questions(1), Ok(vec![]), answerer);
        h.storage.fail_next_writes(1);
        let operator = ScriptedOperator::with_actions(&[Action::Save, Action::Round]);

        h.orchestrator.run(&operator).await.unwrap();

        assert!(matches!(operator.outcomes()[0], RoundOutcome::Completed { .. }));
        assert_eq!(h.storage.write_count(), 1);
    }

    /// Hands out one batch per round
    struct BatchedQuestions(Mutex<VecDeque<Vec<String>>>);

    #[async_trait]
    impl QuestionGenerator for BatchedQuestions {
        async fn generate_questions(&self, _request: &QuestionRequest) -> Result<Vec<String>, GenerationError> {
            Ok(self.0.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    /// Answers from a script; once it runs out, fires `stop` and never answers
    struct StallingAnswers {
        script: Mutex<VecDeque<Answer>>,
        stop: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl AnswerCollector for StallingAnswers {
        async fn ask(&self, _slot: QuestionSlot<'_>) -> Answer {
            let next = self.script.lock().unwrap().pop_front();
            if let Some(answer) = next {
                return answer;
            }
            if let Some(stop) = self.stop.lock().unwrap().take() {
                let _ = stop.send(());
            }
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_shutdown_mid_round_saves_committed_rounds() {
        let (stop_tx, stop_rx) = oneshot::channel();
        let answerer = Arc::new(StallingAnswers {
            script: Mutex::new(VecDeque::from([Answer::Text("About 30 hours".to_string())])),
            stop: Mutex::new(Some(stop_tx)),
        });
        let batches = BatchedQuestions(Mutex::new(VecDeque::from([
            vec!["How long does the battery last?".to_string()],
            vec!["Which colors can I choose from?".to_string()],
        ])));

        let storage = Arc::new(MemoryStorage::new());
        let session = SharedSession::fresh(Session::new("Wireless Headphones").unwrap());
        let writer = SessionWriter::spawn(SessionStore::new(storage.clone()), session.baseline());
        let strategy = QuestionStrategy::new(Arc::new(batches), StrategyConfig::default());
        let mut orchestrator = Orchestrator::new(
            session,
            writer,
            strategy,
            Arc::new(FixedIdeas {
                ideas: Ok(vec![]),
                seen: Mutex::new(vec![]),
            }),
            answerer,
            OrchestratorConfig::default(),
        );
        let operator = ScriptedOperator::with_actions(&[Action::Round, Action::Round]);

        let shutdown = async move {
            let _ = stop_rx.await;
        };
        tokio::time::timeout(Duration::from_secs(5), orchestrator.run_until(&operator, shutdown))
            .await
            .expect("run_until should return after shutdown")
            .unwrap();

        // Only the final save wrote; the abandoned second round left no trace
        assert_eq!(storage.write_count(), 1);
        let persisted: Session = serde_json::from_slice(&storage.contents().unwrap()).unwrap();
        assert_eq!(persisted.round_count(), 1);
        assert_eq!(persisted.qa_history()[0].answer, "About 30 hours");

        let events = operator.events();
        assert!(events.contains(&SessionEvent::Interrupted));
        assert!(events.iter().any(|e| matches!(e, SessionEvent::Saved { .. })));
    }

    #[tokio::test]
    async fn test_resume_or_create_paths() {
        let operator = ScriptedOperator::default();

        // Nothing saved: new session with the operator's subject
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let shared = resume_or_create(&store, &operator).await.unwrap().unwrap();
        assert_eq!(shared.baseline(), None);
        assert_eq!(shared.read(|s| s.subject().to_string()).await, "Wireless Headphones");

        // Saved session: resumed as-is
        let mut saved = Session::new("Trail Shoes").unwrap();
        saved
            .record_round(vec![QaEntry::new(1, "Why?", "Grip").unwrap()], vec![])
            .unwrap();
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage);
        store.save(&saved).unwrap();
        let shared = resume_or_create(&store, &operator).await.unwrap().unwrap();
        assert_eq!(shared.baseline(), Some(0));
        assert_eq!(shared.read(|s| s.round_count()).await, 1);

        // Corrupt snapshot: fresh session, old bytes untouched
        let storage = Arc::new(MemoryStorage::with_bytes("{not json"));
        let store = SessionStore::new(storage.clone());
        let shared = resume_or_create(&store, &operator).await.unwrap().unwrap();
        assert_eq!(shared.read(|s| s.round_count()).await, 0);
        assert_eq!(storage.contents().unwrap(), b"{not json");
    }
}
