use anyhow::{Context, Result};
use extract::Category;
use investigate::{AnalysisData, MessageBody, Phase, Sender, Session, SubmitOutcome};
use report::{ActiveFilter, ExportDocument, GraphLayout};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::commands::{self, Command, HELP};
use crate::config::AppConfig;

#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// Interactive front end over one [`Session`].
pub struct Repl {
    session: Session,
    config: AppConfig,
    filter: ActiveFilter,
}

impl Repl {
    pub fn new(session: Session, config: AppConfig) -> Self {
        Self {
            session,
            config,
            filter: ActiveFilter::All,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn run(&mut self) -> Result<()> {
        if let Some(greeting) = self.session.transcript().last().and_then(|m| match &m.body {
            MessageBody::Text(text) => Some(text.clone()),
            _ => None,
        }) {
            println!("{}\n(:help lists commands)", greeting);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().context("Failed to flush stdout")?;

            let Some(line) = lines.next_line().await.context("Failed to read input")? else {
                break;
            };

            let command = match commands::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            match self.execute(command).await {
                Flow::Quit => break,
                Flow::Continue(text) if text.is_empty() => {}
                Flow::Continue(text) => println!("{}", text.trim_end()),
            }
        }
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> Flow {
        debug!(?command, phase = ?self.session.phase(), "Executing command");
        let output = match command {
            Command::Query(query) => self.submit(&query).await,
            Command::New(target) => match self.session.reset() {
                Ok(()) => {
                    self.filter = ActiveFilter::All;
                    self.submit(&target).await
                }
                Err(e) => e.user_message(self.session.locale()),
            },
            Command::Dig { category, index } => self.dig(category, index).await,
            Command::Filter(None) => self.list_filters(),
            Command::Filter(Some(filter)) => {
                self.filter = filter;
                self.report_text()
            }
            Command::Show => self.report_text(),
            Command::Graph(path) => self.graph(path.as_deref()).await,
            Command::Select(node_id) => self.select(&node_id),
            Command::Path => self.session.path().steps().join(" -> "),
            Command::Messages => self.list_messages(),
            Command::View(n) => self.view(n),
            Command::History => self.list_history(),
            Command::Load(root) => match self.session.open_history(&root) {
                Ok(_) => {
                    self.filter = ActiveFilter::All;
                    self.report_text()
                }
                Err(e) => e.user_message(self.session.locale()),
            },
            Command::ClearHistory => match self.session.clear_history().await {
                Ok(()) => "History cleared.".to_string(),
                Err(e) => e.user_message(self.session.locale()),
            },
            Command::Export(dir) => self.export(dir).await,
            Command::Share => self.share(),
            Command::Advanced(query) => match query.build() {
                Some(query) => self.submit(&query).await,
                None => "Enter at least one word in one of the groups.".to_string(),
            },
            Command::Reset => match self.session.reset() {
                Ok(()) => {
                    self.filter = ActiveFilter::All;
                    self.session.locale().greeting().to_string()
                }
                Err(e) => e.user_message(self.session.locale()),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return Flow::Quit,
        };
        Flow::Continue(output)
    }

    async fn submit(&mut self, query: &str) -> String {
        match self.session.submit(query).await {
            Ok(SubmitOutcome::Completed) => self.report_text(),
            Ok(SubmitOutcome::Unchanged) => format!("\"{}\" is already the current lead.", query.trim()),
            Err(e) => e.user_message(self.session.locale()),
        }
    }

    async fn dig(&mut self, category: Category, index: usize) -> String {
        let Some(lead) = self
            .session
            .displayed()
            .and_then(|data| data.results.item_texts(category).get(index).map(|s| s.to_string()))
        else {
            return format!("No item {} in {}.", index + 1, category);
        };

        match self.session.deep_search(&lead).await {
            Ok(SubmitOutcome::Completed) => self.report_text(),
            Ok(SubmitOutcome::Unchanged) => format!("\"{}\" is already the current lead.", lead),
            Err(e) => e.user_message(self.session.locale()),
        }
    }

    fn displayed(&self) -> Option<&AnalysisData> {
        self.session.displayed()
    }

    fn report_text(&self) -> String {
        let Some(data) = self.displayed() else {
            return "No report yet. Type a target to start.".to_string();
        };
        let locale = self.session.locale();
        let sections = report::render_sections(
            &data.results,
            &data.sources,
            self.filter,
            self.session.highlight(),
            locale,
        );

        let mut out = String::new();
        let _ = writeln!(out, "# {}", data.investigation_path.steps().join(" -> "));
        if let Some(name) = data.results.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = writeln!(out, "# {}", name);
        }
        let _ = writeln!(out);
        if data.results.is_empty() && data.sources.is_empty() {
            out.push_str("The report is empty.\n");
        }
        out.push_str(&report::render_text(&sections));
        if self.session.phase() == Phase::Error {
            if let Some(error) = self.session.last_error() {
                let _ = writeln!(out, "! {}", error.user_message(locale));
            }
        }
        out
    }

    fn list_filters(&self) -> String {
        let Some(data) = self.displayed() else {
            return "No report yet.".to_string();
        };
        let locale = self.session.locale();
        let mut out = format!("  {} [all]\n", locale.all_filter());
        for option in report::filters(&data.results, locale) {
            let active = if self.filter == ActiveFilter::Only(option.category) { '*' } else { ' ' };
            let _ = writeln!(out, "{} {} ({}) [{}]", active, option.label, option.count, option.category);
        }
        out
    }

    fn layout(&self) -> Option<GraphLayout> {
        let data = self.displayed()?;
        Some(report::layout(
            &data.target,
            &data.results,
            self.session.highlight(),
            self.session.locale(),
            &self.config.graph,
        ))
    }

    async fn graph(&self, path: Option<&Path>) -> String {
        let Some(layout) = self.layout() else {
            return "No report yet.".to_string();
        };

        match path {
            Some(path) => match tokio::fs::write(path, report::render_svg(&layout)).await {
                Ok(()) => format!("Graph written to {}", path.display()),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Failed to write graph");
                    format!("Could not write {}: {}", path.display(), e)
                }
            },
            None => {
                let mut out = String::new();
                for node in layout.nodes() {
                    let mark = if node.highlighted { '*' } else { ' ' };
                    let _ = writeln!(out, "{} {:<36} {}", mark, node.id, node.label);
                }
                let _ = write!(out, "{} edges", layout.edge_count());
                out
            }
        }
    }

    fn select(&mut self, node_id: &str) -> String {
        let Some(highlight) = self.layout().and_then(|layout| layout.select(node_id)) else {
            return format!("{} is not a selectable graph node.", node_id);
        };
        let category = highlight.category;
        self.session.set_highlight(highlight.category, highlight.text);
        self.filter = ActiveFilter::Only(category);
        self.report_text()
    }

    fn list_messages(&self) -> String {
        let mut out = String::new();
        for (i, message) in self.session.transcript().messages().iter().enumerate() {
            let who = match message.sender {
                Sender::User => "you",
                Sender::Bot => "bot",
            };
            let body = match &message.body {
                MessageBody::Text(text) => text.clone(),
                MessageBody::Loading => "...".to_string(),
                MessageBody::Analysis { note, data } => format!("{} [report: {}]", note, data.target),
                MessageBody::Error(text) => format!("! {}", text),
            };
            let _ = writeln!(out, "{:>3}. {}: {}", i + 1, who, body);
        }
        out
    }

    fn view(&mut self, n: usize) -> String {
        let message = n.checked_sub(1).and_then(|i| self.session.transcript().messages().get(i));
        let Some(id) = message.map(|m| m.id) else {
            return format!("No message {}.", n);
        };
        match self.session.select_message(id) {
            Some(_) => self.report_text(),
            None => format!("Message {} carries no report.", n),
        }
    }

    fn list_history(&self) -> String {
        let history = self.session.history();
        if history.is_empty() {
            return "No saved investigations.".to_string();
        }
        let mut out = String::new();
        for entry in history.entries() {
            let saved = entry
                .saved_at()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{:<32} {}  {} step(s)",
                entry.target,
                saved,
                entry.investigation_path.len()
            );
        }
        out
    }

    async fn export(&self, dir: Option<PathBuf>) -> String {
        let Some(data) = self.displayed() else {
            return "Nothing to export yet.".to_string();
        };
        let dir = dir.unwrap_or_else(|| self.config.report.export_dir.clone());
        match ExportDocument::new(&data.target, &data.results, &data.sources).write_to(&dir).await {
            Ok(path) => format!("Report saved to {}", path.display()),
            Err(e) => {
                warn!(error = %e, dir = %dir.display(), "Export failed");
                format!("Could not export the report: {}", e)
            }
        }
    }

    fn share(&self) -> String {
        let Some(data) = self.displayed() else {
            return "Nothing to share yet.".to_string();
        };
        let message = report::share_message(&data.target, &data.results.summary, self.session.locale());
        let page = self.config.report.share_page_url.as_deref().unwrap_or_default();
        report::telegram_share_url(page, &message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use extract::{
        Extractor, InferenceClient, InferenceReply, InferenceRequest, InvestigationError, Locale,
        PromptOptions,
    };
    use investigate::{MemoryStore, SessionConfig};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct QueuedClient {
        replies: Mutex<VecDeque<String>>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceClient for QueuedClient {
        async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InvestigationError> {
            let last = request.turns.last().map(|t| t.text.clone()).unwrap_or_default();
            self.queries.lock().unwrap().push(last);
            match self.replies.lock().unwrap().pop_front() {
                Some(text) => Ok(InferenceReply { text, citations: None }),
                None => Err(InvestigationError::ServiceUnavailable("offline".into())),
            }
        }

        fn model_name(&self) -> &str {
            "queued"
        }
    }

    fn repl(replies: &[&str]) -> (Repl, Arc<QueuedClient>) {
        let client = Arc::new(QueuedClient {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            queries: Mutex::new(Vec::new()),
        });
        let extractor = Extractor::new(client.clone(), PromptOptions { locale: Locale::En, ..Default::default() });
        let config = SessionConfig { locale: Locale::En, ..Default::default() };
        let session = Session::new(extractor, Arc::new(MemoryStore::new()), config);
        (Repl::new(session, AppConfig::default()), client)
    }

    fn text(flow: Flow) -> String {
        match flow {
            Flow::Continue(text) => text,
            Flow::Quit => panic!("unexpected quit"),
        }
    }

    const REPORT: &str = r#"{"summary": "Developer", "emails": ["ivan@example.com", "dev@example.com"]}"#;

    #[tokio::test]
    async fn test_query_prints_report() {
        let (mut repl, _) = repl(&[REPORT]);

        let out = text(repl.execute(Command::Query("ivan".into())).await);

        assert!(out.starts_with("# ivan\n"));
        assert!(out.contains("Developer"));
        assert!(out.contains("2. dev@example.com"));
    }

    #[tokio::test]
    async fn test_dig_pivots_on_item_text() {
        let (mut repl, client) = repl(&[REPORT, r#"{"summary": "Second"}"#]);
        repl.execute(Command::Query("ivan".into())).await;

        let out = text(repl.execute(Command::Dig { category: Category::Emails, index: 1 }).await);

        assert!(out.starts_with("# ivan -> dev@example.com"));
        assert!(client.queries.lock().unwrap()[1].contains("dev@example.com"));
        let missing = text(repl.execute(Command::Dig { category: Category::Emails, index: 5 }).await);
        assert_eq!(missing, "No item 6 in emails.");
    }

    #[tokio::test]
    async fn test_failure_shows_localized_message() {
        let (mut repl, _) = repl(&[REPORT]);
        repl.execute(Command::Query("ivan".into())).await;

        let out = text(repl.execute(Command::Query("lead".into())).await);

        assert!(out.contains("internet connection"));
        let shown = text(repl.execute(Command::Show).await);
        assert!(shown.starts_with("# ivan\n"));
        assert!(shown.contains("Developer"));
    }

    #[tokio::test]
    async fn test_select_highlights_and_filters() {
        let (mut repl, _) = repl(&[REPORT]);
        repl.execute(Command::Query("ivan".into())).await;

        let out = text(repl.execute(Command::Select("data-node-emails-0".into())).await);

        assert!(out.contains(">  1. ivan@example.com"));
        assert!(!out.contains("Developer"));
        let graph = text(repl.execute(Command::Graph(None)).await);
        assert!(graph.contains("* data-node-emails-0"));
        let bad = text(repl.execute(Command::Select("target-node".into())).await);
        assert!(bad.contains("not a selectable"));
    }

    #[tokio::test]
    async fn test_export_and_share() {
        let (mut repl, _) = repl(&[REPORT]);
        assert_eq!(text(repl.execute(Command::Share).await), "Nothing to share yet.");
        repl.execute(Command::Query("Ivan Dev".into())).await;
        let dir = tempfile::tempdir().unwrap();

        let out = text(repl.execute(Command::Export(Some(dir.path().to_path_buf()))).await);

        assert!(out.contains("DeepSearch_report_ivan_dev.json"));
        assert!(dir.path().join("DeepSearch_report_ivan_dev.json").exists());
        let share = text(repl.execute(Command::Share).await);
        assert!(share.starts_with("https://t.me/share/url?url=&text="));
    }

    #[tokio::test]
    async fn test_history_load_and_quit() {
        let (mut repl, _) = repl(&[REPORT]);
        repl.execute(Command::Query("ivan".into())).await;

        assert!(text(repl.execute(Command::History).await).starts_with("ivan"));
        text(repl.execute(Command::Reset).await);
        assert!(repl.session().analysis().is_none());
        assert!(text(repl.execute(Command::Load("ivan".into())).await).contains("Developer"));
        assert_eq!(repl.execute(Command::Quit).await, Flow::Quit);
    }
}
