use serde::{Deserialize, Serialize};

/// Chain of pivots from the root target to the current lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvestigationPath(Vec<String>);

impl InvestigationPath {
    pub fn rooted(target: impl Into<String>) -> Self {
        Self(vec![target.into()])
    }

    pub fn from_steps(steps: Vec<String>) -> Self {
        Self(steps)
    }

    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn current(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn is_current(&self, lead: &str) -> bool {
        self.current() == Some(lead)
    }

    /// Path with `lead` at the end. An earlier occurrence is moved rather
    /// than duplicated, except the root, which always stays first: pivoting
    /// back to the root lists it twice, `[root, .., root]`.
    pub fn moved_to_end(&self, lead: &str) -> Self {
        if self.is_current(lead) {
            return self.clone();
        }

        let mut steps: Vec<String> = self
            .0
            .iter()
            .enumerate()
            .filter(|(idx, step)| *idx == 0 || step.as_str() != lead)
            .map(|(_, step)| step.clone())
            .collect();
        steps.push(lead.to_string());
        Self(steps)
    }

    pub fn steps(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(steps: &[&str]) -> InvestigationPath {
        InvestigationPath::from_steps(steps.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_new_lead_is_appended() {
        let moved = path(&["ivan"]).moved_to_end("ivan@example.com");
        assert_eq!(moved, path(&["ivan", "ivan@example.com"]));
        assert_eq!(moved.root(), Some("ivan"));
        assert_eq!(moved.current(), Some("ivan@example.com"));
    }

    #[test]
    fn test_repeated_lead_moves_to_end() {
        let moved = path(&["ivan", "a@x.com", "ivan.dev"]).moved_to_end("a@x.com");
        assert_eq!(moved, path(&["ivan", "ivan.dev", "a@x.com"]));
    }

    #[test]
    fn test_requerying_root_keeps_it_first() {
        let moved = path(&["ivan", "a@x.com"]).moved_to_end("ivan");
        assert_eq!(moved, path(&["ivan", "a@x.com", "ivan"]));
        assert_eq!(moved.root(), Some("ivan"));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let json = serde_json::to_string(&path(&["a", "b"])).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
    }
}
