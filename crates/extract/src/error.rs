use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;

/// Every way an investigation step can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvestigationError {
    #[error("target is empty")]
    EmptyTarget,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("investigation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyTarget,
    MalformedResponse,
    ServiceUnavailable,
    Unknown,
}

impl InvestigationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvestigationError::EmptyTarget => ErrorKind::EmptyTarget,
            InvestigationError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            InvestigationError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            InvestigationError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The one message shown to the user for this failure.
    pub fn user_message(&self, locale: Locale) -> String {
        match (self, locale) {
            (InvestigationError::EmptyTarget, Locale::Uk) => {
                "Будь ласка, введіть ціль для аналізу.".to_string()
            }
            (InvestigationError::EmptyTarget, Locale::En) => {
                "Please enter a target to investigate.".to_string()
            }
            (InvestigationError::MalformedResponse(_), Locale::Uk) => {
                "ШІ повернув відповідь у неочікуваному форматі. Це може бути тимчасовою проблемою. Будь ласка, спробуйте виконати запит ще раз або трохи змінити його.".to_string()
            }
            (InvestigationError::MalformedResponse(_), Locale::En) => {
                "The AI returned a response in an unexpected format. This may be temporary. Please retry the query or rephrase it slightly.".to_string()
            }
            (InvestigationError::ServiceUnavailable(_), Locale::Uk) => {
                "Не вдалося зв'язатися з аналітичною службою. Перевірте ваше інтернет-з'єднання та спробуйте знову.".to_string()
            }
            (InvestigationError::ServiceUnavailable(_), Locale::En) => {
                "Could not reach the investigation service. Check your internet connection and try again.".to_string()
            }
            (InvestigationError::Unknown(detail), Locale::Uk) => format!(
                "Сталася непередбачувана помилка. Якщо проблема не зникає, спробуйте перезапустити програму. Деталі: {}",
                detail
            ),
            (InvestigationError::Unknown(detail), Locale::En) => format!(
                "An unexpected error occurred. If the problem persists, restart the application. Details: {}",
                detail
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_message_carries_raw_text() {
        let err = InvestigationError::Unknown("history slot is read-only".into());
        assert!(err.user_message(Locale::En).contains("history slot is read-only"));
        assert!(err.user_message(Locale::Uk).contains("history slot is read-only"));
    }

    #[test]
    fn test_malformed_and_unavailable_are_distinct() {
        let malformed = InvestigationError::MalformedResponse("no braces".into());
        let unavailable = InvestigationError::ServiceUnavailable("timeout".into());
        assert_ne!(malformed.kind(), unavailable.kind());
        assert_ne!(malformed.user_message(Locale::En), unavailable.user_message(Locale::En));
    }
}
