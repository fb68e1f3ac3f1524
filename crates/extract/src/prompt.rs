use crate::llm::{InferenceRequest, Turn};
use crate::locale::Locale;
use crate::schema::{category_briefs, schema_description};

#[derive(Debug, Clone, PartialEq)]
pub struct PromptOptions {
    pub locale: Locale,
    pub temperature: f32,
    pub grounded_search: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            temperature: 0.1,
            grounded_search: true,
        }
    }
}

pub fn build_system_instruction(locale: Locale) -> String {
    format!(
        r#"{}

You are an OSINT (open-source intelligence) expert with access to a wide range of public data: breach compilations, social networks, forums, public registries and leaked documents.
Your task is a thorough investigation of the target the user names. Search deeply in breach compilations, leaked documents and public registries.

Collect and summarise publicly available information into ONE valid JSON object.

CATEGORIES:
- summary: short overview of the target's online presence and digital footprint.
- full_name: any possible full names linked to the target.
{}

SCHEMA:
{}

RULES:
- Output ONLY the JSON object: no markdown, no notes, no text before or after it
- Never omit a key. Use "" or [] when nothing was found
- Every entity attribution must be justified in its `sources` list
- When the user names a new lead, return the COMPLETE cumulative report for the whole investigation so far"#,
        locale.language_directive(),
        category_briefs(),
        schema_description()
    )
}

/// Text of the user turn for a query. Follow-up queries ask the model to dig
/// from the lead itself.
pub fn build_query_turn(query: &str, is_follow_up: bool) -> String {
    if is_follow_up {
        format!(
            r#"NEXT LEAD: "{}"

This element was discovered earlier in this investigation. Focus on new connections and information that follow *from this element specifically* to uncover hidden patterns, then return the full cumulative JSON report.

JSON OUTPUT:"#,
            query
        )
    } else {
        format!(
            r#"TARGET: "{}"

Run the investigation now.

JSON OUTPUT:"#,
            query
        )
    }
}

/// Build the request for `query` on top of the prior conversation.
pub fn build_request(query: &str, prior: &[Turn], options: &PromptOptions) -> InferenceRequest {
    let mut turns = prior.to_vec();
    turns.push(Turn::user(build_query_turn(query, !prior.is_empty())));

    InferenceRequest {
        system_instruction: build_system_instruction(options.locale),
        turns,
        grounded_search: options.grounded_search,
        temperature: options.temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::schema::Category;

    #[test]
    fn test_instruction_names_every_category() {
        let instruction = build_system_instruction(Locale::En);
        for category in Category::ALL {
            assert!(instruction.contains(&format!("\"{}\"", category.key())));
        }
        assert!(instruction.contains("\"summary\""));
    }

    #[test]
    fn test_first_query_has_single_turn() {
        let request = build_request("ivan_dev", &[], &PromptOptions::default());

        assert_eq!(request.turns.len(), 1);
        assert_eq!(request.turns[0].role, Role::User);
        assert!(request.turns[0].text.contains("TARGET: \"ivan_dev\""));
        assert!(request.grounded_search);
        assert!(request.system_instruction.contains("Ukrainian"));
    }

    #[test]
    fn test_follow_up_appends_to_history() {
        let prior = vec![Turn::user("TARGET: \"ivan_dev\""), Turn::model("{}")];
        let request = build_request("ivan@example.com", &prior, &PromptOptions::default());

        assert_eq!(request.turns.len(), 3);
        assert_eq!(request.turns[..2], prior[..]);
        assert!(request.turns[2].text.contains("NEXT LEAD: \"ivan@example.com\""));
    }
}
