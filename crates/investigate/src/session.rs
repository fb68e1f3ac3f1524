use extract::{Category, Extraction, Extractor, InvestigationError, Locale, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::history::{History, HistoryEntry};
use crate::merge::{MergePolicy, merge_results, merge_sources};
use crate::path::InvestigationPath;
use crate::store::{HistoryStore, StoreError};
use crate::transcript::{AnalysisData, ChatMessage, MessageBody, Sender, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Querying,
    Ready,
    Error,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Investigation(#[from] InvestigationError),

    #[error("cannot {action} while {phase:?}")]
    InvalidTransition { action: &'static str, phase: Phase },

    #[error("no saved investigation for {0}")]
    UnknownHistoryEntry(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            SessionError::Investigation(e) => e.user_message(locale),
            other => InvestigationError::Unknown(other.to_string()).user_message(locale),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub locale: Locale,
    pub merge_policy: MergePolicy,
}

/// An item picked on the relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub category: Category,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    /// The lead was already the current query; nothing was sent
    Unchanged,
}

/// The query in flight and the path it will commit on success.
#[derive(Debug, Clone)]
struct PendingQuery {
    query: String,
    path: InvestigationPath,
    fresh: bool,
}

/// One investigation session: the pivot path, the displayed report, the
/// conversation with the model and the saved history.
///
/// All mutation goes through the transition methods. `submit` holds
/// `&mut self` across the inference call, so at most one request is ever in
/// flight.
pub struct Session {
    extractor: Extractor,
    store: Arc<dyn HistoryStore>,
    config: SessionConfig,
    phase: Phase,
    path: InvestigationPath,
    conversation: Vec<Turn>,
    analysis: Option<AnalysisData>,
    selected: Option<Uuid>,
    pending: Option<PendingQuery>,
    last_error: Option<InvestigationError>,
    highlight: Option<Highlight>,
    history: History,
    transcript: Transcript,
}

impl Session {
    /// A session with empty history. See [`Session::open`] to read the store.
    pub fn new(extractor: Extractor, store: Arc<dyn HistoryStore>, config: SessionConfig) -> Self {
        let mut session = Self {
            extractor,
            store,
            config,
            phase: Phase::Idle,
            path: InvestigationPath::default(),
            conversation: Vec::new(),
            analysis: None,
            selected: None,
            pending: None,
            last_error: None,
            highlight: None,
            history: History::default(),
            transcript: Transcript::default(),
        };
        session.greet();
        session
    }

    /// A session with history read from `store`. Unreadable history is
    /// dropped rather than failing startup.
    pub async fn open(extractor: Extractor, store: Arc<dyn HistoryStore>, config: SessionConfig) -> Self {
        let history = History::load(store.as_ref()).await;
        let mut session = Self::new(extractor, store, config);
        session.history = history;
        session
    }

    fn greet(&mut self) {
        let greeting = self.config.locale.greeting().to_string();
        self.transcript.push(Sender::Bot, MessageBody::Text(greeting));
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Querying
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    pub fn path(&self) -> &InvestigationPath {
        &self.path
    }

    pub fn conversation(&self) -> &[Turn] {
        &self.conversation
    }

    /// The latest committed report of this investigation.
    pub fn analysis(&self) -> Option<&AnalysisData> {
        self.analysis.as_ref()
    }

    /// The report on screen: a message picked from the transcript, or the
    /// latest one.
    pub fn displayed(&self) -> Option<&AnalysisData> {
        self.selected
            .and_then(|id| self.transcript.find(id))
            .and_then(ChatMessage::analysis)
            .or(self.analysis.as_ref())
    }

    pub fn last_error(&self) -> Option<&InvestigationError> {
        self.last_error.as_ref()
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Begin a fresh investigation of `target`.
    pub fn start_new(&mut self, target: &str) -> Result<(), SessionError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(InvestigationError::EmptyTarget.into());
        }
        if self.phase == Phase::Querying {
            return Err(SessionError::InvalidTransition { action: "start a new investigation", phase: self.phase });
        }

        self.conversation.clear();
        self.analysis = None;
        self.selected = None;
        self.path = InvestigationPath::default();
        self.begin(PendingQuery {
            query: target.to_string(),
            path: InvestigationPath::rooted(target),
            fresh: true,
        });
        Ok(())
    }

    /// Follow `lead` from the current report. Returns `false` without
    /// touching anything when `lead` is already the current query.
    pub fn pivot(&mut self, lead: &str) -> Result<bool, SessionError> {
        let lead = lead.trim();
        if lead.is_empty() {
            return Err(InvestigationError::EmptyTarget.into());
        }

        let can_pivot = match self.phase {
            Phase::Ready => true,
            Phase::Error => self.analysis.is_some(),
            Phase::Idle | Phase::Querying => false,
        };
        if !can_pivot {
            return Err(SessionError::InvalidTransition { action: "pivot", phase: self.phase });
        }

        if self.path.is_current(lead) {
            info!(lead, "Lead is already the current query, skipping");
            return Ok(false);
        }

        self.begin(PendingQuery {
            query: lead.to_string(),
            path: self.path.moved_to_end(lead),
            fresh: false,
        });
        Ok(true)
    }

    fn begin(&mut self, pending: PendingQuery) {
        self.highlight = None;
        self.last_error = None;
        self.transcript.push(Sender::User, MessageBody::Text(pending.query.clone()));
        self.transcript.push(Sender::Bot, MessageBody::Loading);
        self.pending = Some(pending);
        self.phase = Phase::Querying;
    }

    /// Commit the in-flight query's report.
    pub async fn on_success(&mut self, extraction: Extraction) -> Result<&AnalysisData, SessionError> {
        let Some(pending) = self.pending.take() else {
            return Err(SessionError::InvalidTransition { action: "complete a query", phase: self.phase });
        };

        let policy = self.config.merge_policy;
        let previous = self.analysis.take();
        let results = merge_results(previous.as_ref().map(|a| &a.results), extraction.result, policy);
        let sources = merge_sources(
            previous.as_ref().map(|a| a.sources.as_slice()).unwrap_or_default(),
            extraction.sources,
            policy,
        );

        self.conversation.push(extraction.user_turn);
        self.conversation.push(extraction.model_turn);
        self.path = pending.path;

        let data = AnalysisData {
            results,
            sources,
            target: pending.query,
            investigation_path: self.path.clone(),
        };

        self.transcript.replace_last(MessageBody::Analysis {
            note: self.config.locale.analysis_done().to_string(),
            data: data.clone(),
        });
        self.selected = None;
        self.phase = Phase::Ready;

        info!(
            root = self.path.root().unwrap_or_default(),
            steps = self.path.len(),
            fresh = pending.fresh,
            categories = data.results.non_empty_categories().count(),
            "Investigation step completed"
        );

        if let Some(entry) = HistoryEntry::new(self.path.clone(), data.results.clone(), data.sources.clone()) {
            self.history.upsert(entry);
            self.persist_history().await;
        }

        Ok(&*self.analysis.insert(data))
    }

    /// Record a failed query. The path and the displayed report stay as they
    /// were before the query started.
    pub fn on_failure(&mut self, error: InvestigationError) {
        let pending = self.pending.take();
        warn!(
            error = %error,
            query = pending.as_ref().map(|p| p.query.as_str()).unwrap_or_default(),
            "Investigation step failed"
        );

        let message = error.user_message(self.config.locale);
        self.transcript.replace_last(MessageBody::Error(message));
        self.last_error = Some(error);
        self.phase = Phase::Error;
    }

    /// Leave the error state.
    pub fn dismiss_error(&mut self) {
        if self.phase == Phase::Error {
            self.phase = if self.analysis.is_some() { Phase::Ready } else { Phase::Idle };
        }
        self.last_error = None;
    }

    /// Run one query: a new investigation when none is in progress, a pivot
    /// otherwise.
    pub async fn submit(&mut self, query: &str) -> Result<SubmitOutcome, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InvestigationError::EmptyTarget.into());
        }

        if self.conversation.is_empty() {
            self.start_new(query)?;
        } else if !self.pivot(query)? {
            return Ok(SubmitOutcome::Unchanged);
        }

        self.run_query(query).await
    }

    /// Deep search on a report item: always a pivot, never a new investigation.
    pub async fn deep_search(&mut self, lead: &str) -> Result<SubmitOutcome, SessionError> {
        if !self.pivot(lead)? {
            return Ok(SubmitOutcome::Unchanged);
        }
        self.run_query(lead.trim()).await
    }

    /// Send the staged query and settle the session with its outcome.
    async fn run_query(&mut self, query: &str) -> Result<SubmitOutcome, SessionError> {
        let span = info_span!("investigate", query, step = self.path.len() + 1);
        let outcome = self
            .extractor
            .extract(query, &self.conversation)
            .instrument(span)
            .await;

        match outcome {
            Ok(extraction) => {
                self.on_success(extraction).await?;
                Ok(SubmitOutcome::Completed)
            }
            Err(error) => {
                self.on_failure(error.clone());
                Err(error.into())
            }
        }
    }

    /// Show a saved investigation. The conversation is not restored, so the
    /// next query starts a new investigation.
    pub fn open_history(&mut self, root: &str) -> Result<&AnalysisData, SessionError> {
        if self.phase == Phase::Querying {
            return Err(SessionError::InvalidTransition { action: "open history", phase: self.phase });
        }
        let entry = self
            .history
            .get(root)
            .cloned()
            .ok_or_else(|| SessionError::UnknownHistoryEntry(root.to_string()))?;

        self.reset_state();
        self.transcript.clear();

        let data = AnalysisData {
            target: entry.investigation_path.current().unwrap_or(&entry.target).to_string(),
            results: entry.results,
            sources: entry.sources,
            investigation_path: entry.investigation_path,
        };
        self.path = data.investigation_path.clone();

        self.transcript.push(Sender::User, MessageBody::Text(entry.target.clone()));
        self.transcript.push(
            Sender::Bot,
            MessageBody::Analysis {
                note: self.config.locale.loaded_from_history(&entry.target),
                data: data.clone(),
            },
        );
        self.phase = Phase::Ready;

        Ok(&*self.analysis.insert(data))
    }

    /// Display the report carried by an earlier message.
    pub fn select_message(&mut self, id: Uuid) -> Option<&AnalysisData> {
        self.transcript.find(id)?.analysis()?;
        self.selected = Some(id);
        self.highlight = None;
        self.displayed()
    }

    pub fn set_highlight(&mut self, category: Category, text: impl Into<String>) {
        self.highlight = Some(Highlight { category, text: text.into() });
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    /// Drop the current investigation and greet again.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Querying {
            return Err(SessionError::InvalidTransition { action: "reset", phase: self.phase });
        }
        self.reset_state();
        self.transcript.clear();
        self.greet();
        Ok(())
    }

    fn reset_state(&mut self) {
        self.phase = Phase::Idle;
        self.path = InvestigationPath::default();
        self.conversation.clear();
        self.analysis = None;
        self.selected = None;
        self.pending = None;
        self.last_error = None;
        self.highlight = None;
    }

    pub async fn clear_history(&mut self) -> Result<(), SessionError> {
        self.history.clear();
        self.store.clear().await?;
        info!("Investigation history cleared");
        Ok(())
    }

    async fn persist_history(&self) {
        if let Err(e) = self.store.save(self.history.entries()).await {
            warn!(error = %e, "Failed to persist investigation history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use extract::{ErrorKind, InferenceClient, InferenceReply, InferenceRequest, PromptOptions};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers with queued replies and records every request.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<InferenceReply, InvestigationError>>>,
        requests: Mutex<Vec<InferenceRequest>>,
        spans: Mutex<Vec<Option<&'static str>>>,
    }

    impl ScriptedClient {
        fn reply(self: Arc<Self>, json: &str) -> Arc<Self> {
            self.replies.lock().unwrap().push_back(Ok(InferenceReply {
                text: json.to_string(),
                citations: None,
            }));
            self
        }

        fn fail(self: Arc<Self>, error: InvestigationError) -> Arc<Self> {
            self.replies.lock().unwrap().push_back(Err(error));
            self
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InvestigationError> {
            self.requests.lock().unwrap().push(request.clone());
            self.spans
                .lock()
                .unwrap()
                .push(tracing::Span::current().metadata().map(|m| m.name()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(InvestigationError::Unknown("no scripted reply".into())))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn session_with(client: Arc<ScriptedClient>, store: Arc<MemoryStore>, policy: MergePolicy) -> Session {
        let extractor = Extractor::new(client, PromptOptions::default());
        let config = SessionConfig { locale: Locale::En, merge_policy: policy };
        Session::new(extractor, store, config)
    }

    fn session(client: Arc<ScriptedClient>) -> (Session, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (session_with(client, store.clone(), MergePolicy::Replace), store)
    }

    #[tokio::test]
    async fn test_first_query_enters_ready_and_saves_history() {
        let client = Arc::new(ScriptedClient::default()).reply(r#"{"summary": "dev", "emails": ["a@x.com"]}"#);
        let (mut session, store) = session(client.clone());
        assert_eq!(session.phase(), Phase::Idle);

        let outcome = session.submit("ivan").await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Completed);
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.path().steps(), ["ivan"]);
        assert_eq!(session.analysis().unwrap().results.emails, vec!["a@x.com"]);
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(client.request_count(), 1);
        assert_eq!(session.history().len(), 1);
        assert!(store.raw().unwrap().contains("\"ivan\""));
    }

    #[tokio::test]
    async fn test_blank_query_sends_nothing() {
        let client = Arc::new(ScriptedClient::default());
        let (mut session, store) = session(client.clone());

        let err = session.submit("   ").await.unwrap_err();

        assert!(matches!(err, SessionError::Investigation(InvestigationError::EmptyTarget)));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(client.request_count(), 0);
        assert!(store.raw().is_none());
    }

    #[tokio::test]
    async fn test_pivot_to_current_lead_is_noop() {
        let client = Arc::new(ScriptedClient::default()).reply(r#"{"summary": "s"}"#);
        let (mut session, _) = session(client.clone());
        session.submit("ivan").await.unwrap();
        let transcript_len = session.transcript().messages().len();

        let outcome = session.submit("ivan").await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Unchanged);
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.path().steps(), ["ivan"]);
        assert_eq!(client.request_count(), 1);
        assert_eq!(session.transcript().messages().len(), transcript_len);
    }

    #[tokio::test]
    async fn test_pivot_sends_history_and_overwrites_entry() {
        let client = Arc::new(ScriptedClient::default())
            .reply(r#"{"summary": "first"}"#)
            .reply(r#"{"summary": "second"}"#);
        let (mut session, _) = session(client.clone());

        session.submit("ivan").await.unwrap();
        session.deep_search("ivan@example.com").await.unwrap();

        assert_eq!(session.path().steps(), ["ivan", "ivan@example.com"]);
        assert_eq!(session.analysis().unwrap().target, "ivan@example.com");
        assert_eq!(client.requests.lock().unwrap()[1].turns.len(), 3);
        assert_eq!(session.history().len(), 1);
        let entry = session.history().get("ivan").unwrap();
        assert_eq!(entry.results.summary, "second");
        assert_eq!(entry.investigation_path.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_and_deep_search_run_inside_investigate_span() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = Arc::new(ScriptedClient::default())
            .reply(r#"{"summary": "first"}"#)
            .reply(r#"{"summary": "second"}"#);
        let (mut session, _) = session(client.clone());

        session.submit("ivan").await.unwrap();
        session.deep_search("  a@x.com  ").await.unwrap();

        assert_eq!(*client.spans.lock().unwrap(), vec![Some("investigate"), Some("investigate")]);
        assert_eq!(session.path().steps(), ["ivan", "a@x.com"]);
    }

    #[tokio::test]
    async fn test_failed_pivot_keeps_previous_state() {
        let client = Arc::new(ScriptedClient::default())
            .reply(r#"{"summary": "kept"}"#)
            .fail(InvestigationError::ServiceUnavailable("offline".into()));
        let (mut session, _) = session(client.clone());
        session.submit("ivan").await.unwrap();

        let err = session.submit("a@x.com").await.unwrap_err();

        assert!(matches!(err, SessionError::Investigation(InvestigationError::ServiceUnavailable(_))));
        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.path().steps(), ["ivan"]);
        assert_eq!(session.analysis().unwrap().results.summary, "kept");
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.last_error().unwrap().kind(), ErrorKind::ServiceUnavailable);
        match &session.transcript().last().unwrap().body {
            MessageBody::Error(text) => assert!(text.contains("internet connection")),
            other => panic!("expected error message, got {:?}", other),
        }

        session.dismiss_error();
        assert_eq!(session.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_failed_first_query_returns_to_idle() {
        let client = Arc::new(ScriptedClient::default()).reply("no json at all");
        let (mut session, store) = session(client);

        let err = session.submit("ivan").await.unwrap_err();

        assert!(matches!(err, SessionError::Investigation(InvestigationError::MalformedResponse(_))));
        assert!(session.analysis().is_none());
        assert!(store.raw().is_none());
        session.dismiss_error();
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_transitions_rejected_while_querying() {
        let (mut session, _) = session(Arc::new(ScriptedClient::default()));
        session.start_new("ivan").unwrap();
        assert!(session.is_busy());

        assert!(matches!(
            session.start_new("olena"),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(session.pivot("x"), Err(SessionError::InvalidTransition { .. })));
        assert!(session.reset().is_err());
    }

    #[tokio::test]
    async fn test_pivot_requires_a_result() {
        let (mut session, _) = session(Arc::new(ScriptedClient::default()));
        assert!(matches!(session.pivot("x"), Err(SessionError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_union_policy_accumulates_across_pivots() {
        let client = Arc::new(ScriptedClient::default())
            .reply(r#"{"summary": "a", "emails": ["a@x.com"]}"#)
            .reply(r#"{"summary": "b", "emails": ["b@x.com"]}"#);
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(client, store, MergePolicy::Union);

        session.submit("ivan").await.unwrap();
        session.submit("a@x.com").await.unwrap();

        assert_eq!(session.analysis().unwrap().results.emails, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_open_history_then_new_query_starts_fresh() {
        let client = Arc::new(ScriptedClient::default())
            .reply(r#"{"summary": "saved"}"#)
            .reply(r#"{"summary": "fresh"}"#);
        let store = Arc::new(MemoryStore::new());
        let mut first = session_with(client.clone(), store.clone(), MergePolicy::Replace);
        first.submit("ivan").await.unwrap();

        let extractor = Extractor::new(client.clone(), PromptOptions::default());
        let mut session = Session::open(extractor, store, SessionConfig::default()).await;
        assert_eq!(session.history().len(), 1);

        let data = session.open_history("ivan").unwrap();
        assert_eq!(data.results.summary, "saved");
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.open_history("nobody").is_err());

        session.submit("olena").await.unwrap();
        assert_eq!(session.path().steps(), ["olena"]);
        assert_eq!(client.requests.lock().unwrap()[1].turns.len(), 1);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_select_message_and_highlight() {
        let client = Arc::new(ScriptedClient::default())
            .reply(r#"{"summary": "one"}"#)
            .reply(r#"{"summary": "two"}"#);
        let (mut session, _) = session(client);
        session.submit("ivan").await.unwrap();
        let first_id = session.transcript().last().unwrap().id;
        session.submit("lead").await.unwrap();

        session.set_highlight(Category::Emails, "a@x.com");
        let shown = session.select_message(first_id).unwrap();
        assert_eq!(shown.results.summary, "one");
        assert!(session.highlight().is_none());
        assert_eq!(session.analysis().unwrap().results.summary, "two");
    }

    #[tokio::test]
    async fn test_clear_history_empties_slot() {
        let client = Arc::new(ScriptedClient::default()).reply(r#"{"summary": "s"}"#);
        let (mut session, store) = session(client);
        session.submit("ivan").await.unwrap();

        session.clear_history().await.unwrap();

        assert!(session.history().is_empty());
        assert!(store.raw().is_none());
    }

    #[tokio::test]
    async fn test_reset_greets_again() {
        let client = Arc::new(ScriptedClient::default()).reply(r#"{"summary": "s"}"#);
        let (mut session, _) = session(client);
        session.submit("ivan").await.unwrap();

        session.reset().unwrap();

        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.path().is_empty());
        assert_eq!(session.transcript().messages().len(), 1);
    }
}
