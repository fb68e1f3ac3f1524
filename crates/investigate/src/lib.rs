pub mod history;
pub mod merge;
pub mod path;
pub mod session;
pub mod store;
pub mod transcript;

pub use history::{History, HistoryEntry};
pub use merge::{MergePolicy, merge_results, merge_sources};
pub use path::InvestigationPath;
pub use session::{Highlight, Phase, Session, SessionConfig, SessionError, SubmitOutcome};
pub use store::{HistoryStore, JsonFileStore, MemoryStore, StoreError};
pub use transcript::{AnalysisData, ChatMessage, MessageBody, Sender, Transcript};
