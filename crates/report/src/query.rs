use serde::{Deserialize, Serialize};

/// Word groups of the advanced search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedQuery {
    /// Every word must appear
    pub all_words: String,
    /// At least one word must appear
    pub any_words: String,
    /// None of the words may appear
    pub none_words: String,
}

fn quoted(words: &str) -> impl Iterator<Item = String> + '_ {
    words.split_whitespace().map(|w| format!("\"{}\"", w))
}

impl AdvancedQuery {
    /// The combined query, or `None` when every group is blank.
    pub fn build(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::with_capacity(3);

        let all: Vec<String> = quoted(&self.all_words).collect();
        if !all.is_empty() {
            parts.push(all.join(" AND "));
        }

        let any: Vec<String> = quoted(&self.any_words).collect();
        if !any.is_empty() {
            parts.push(format!("({})", any.join(" OR ")));
        }

        let none: Vec<String> = quoted(&self.none_words).map(|w| format!("NOT {}", w)).collect();
        if !none.is_empty() {
            parts.push(none.join(" "));
        }

        (!parts.is_empty()).then(|| parts.join(" "))
    }
}
