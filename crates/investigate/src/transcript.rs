use extract::{InvestigationResult, SourceReference};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::path::InvestigationPath;

/// A report as displayed: results, citations and where in the pivot chain
/// they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub results: InvestigationResult,
    pub sources: Vec<SourceReference>,
    /// The query this report answers (last element of the path)
    pub target: String,
    pub investigation_path: InvestigationPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    /// Placeholder for the request in flight
    Loading,
    Analysis { note: String, data: AnalysisData },
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub body: MessageBody,
}

impl ChatMessage {
    pub fn analysis(&self) -> Option<&AnalysisData> {
        match &self.body {
            MessageBody::Analysis { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// The dialogue shown next to the report.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn push(&mut self, sender: Sender, body: MessageBody) -> Uuid {
        let id = Uuid::new_v4();
        self.messages.push(ChatMessage { id, sender, body });
        id
    }

    /// Swap the body of the newest message, typically the loading
    /// placeholder. Returns its id, or `None` on an empty transcript.
    pub fn replace_last(&mut self, body: MessageBody) -> Option<Uuid> {
        let last = self.messages.last_mut()?;
        last.body = body;
        Some(last.id)
    }

    pub fn find(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
