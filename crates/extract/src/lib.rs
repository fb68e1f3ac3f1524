pub mod error;
pub mod llm;
pub mod locale;
pub mod normalizer;
pub mod parser;
pub mod prompt;
pub mod schema;

pub use error::{ErrorKind, InvestigationError};
pub use llm::{GeminiClient, GeminiConfig, InferenceClient, InferenceReply, InferenceRequest, Role, Turn};
pub use locale::Locale;
pub use normalizer::{EntityNormalizer, canonical_name};
pub use parser::{ParsedReply, parse_reply};
pub use prompt::PromptOptions;
pub use schema::{
    Category, DataBreach, Entity, ForumMention, InvestigationResult, LeakedDocument, PhoneInfo,
    RegistryMention, SocialProfile, SourceReference, TelegramActivity, TelegramKind, WebMention,
};

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// One answered query: the decoded report plus the turn pair to append to
/// the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub result: InvestigationResult,
    pub sources: Vec<SourceReference>,
    pub user_turn: Turn,
    pub model_turn: Turn,
}

/// Prompt -> inference -> parse, for a single query.
#[derive(Clone)]
pub struct Extractor {
    client: Arc<dyn InferenceClient>,
    options: PromptOptions,
}

impl Extractor {
    pub fn new(client: Arc<dyn InferenceClient>, options: PromptOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &PromptOptions {
        &self.options
    }

    /// Investigate `query`, continuing the conversation in `prior`.
    pub async fn extract(&self, query: &str, prior: &[Turn]) -> Result<Extraction, InvestigationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InvestigationError::EmptyTarget);
        }

        let request = prompt::build_request(query, prior, &self.options);
        let started = Instant::now();

        let reply = self.client.generate(&request).await?;

        info!(
            model = self.client.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_len = reply.text.len(),
            "Inference call finished"
        );

        let parsed = parse_reply(&reply.text, reply.citations)?;

        let user_turn = request
            .turns
            .last()
            .cloned()
            .unwrap_or_else(|| Turn::user(query));

        Ok(Extraction {
            result: parsed.result,
            sources: parsed.sources,
            user_turn,
            model_turn: Turn::model(reply.text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedClient {
        reply: Result<InferenceReply, InvestigationError>,
        seen: Mutex<Vec<InferenceRequest>>,
    }

    #[async_trait]
    impl InferenceClient for CannedClient {
        async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InvestigationError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn extractor(reply: Result<InferenceReply, InvestigationError>) -> (Extractor, Arc<CannedClient>) {
        let client = Arc::new(CannedClient { reply, seen: Mutex::new(Vec::new()) });
        (Extractor::new(client.clone(), PromptOptions::default()), client)
    }

    #[tokio::test]
    async fn test_extract_returns_report_and_turns() {
        let (extractor, client) = extractor(Ok(InferenceReply {
            text: "```json\n{\"summary\": \"found\", \"emails\": [\"a@b.c\"]}\n```".into(),
            citations: None,
        }));

        let extraction = extractor.extract("  ivan  ", &[]).await.unwrap();

        assert_eq!(extraction.result.summary, "found");
        assert!(extraction.sources.is_empty());
        assert_eq!(extraction.user_turn.role, Role::User);
        assert!(extraction.user_turn.text.contains("\"ivan\""));
        assert_eq!(extraction.model_turn.role, Role::Model);
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_never_reaches_the_client() {
        let (extractor, client) = extractor(Ok(InferenceReply { text: "{}".into(), citations: None }));

        let err = extractor.extract("   ", &[]).await.unwrap_err();

        assert_eq!(err, InvestigationError::EmptyTarget);
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_failure_passes_through() {
        let (extractor, _) = extractor(Err(InvestigationError::ServiceUnavailable("quota".into())));
        let err = extractor.extract("ivan", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }
}
