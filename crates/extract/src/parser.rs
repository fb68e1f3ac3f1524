use tracing::{debug, warn};

use crate::error::InvestigationError;
use crate::normalizer::fold_entities;
use crate::schema::{InvestigationResult, SourceReference};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub result: InvestigationResult,
    pub sources: Vec<SourceReference>,
}

/// Slice from the first `{` to the last `}` of a reply.
///
/// Tolerates prose or code fences around the object. Braces inside string
/// values that are left unbalanced are not handled.
pub fn extract_json_object(text: &str) -> Result<&str, InvestigationError> {
    let first = text.find('{');
    let last = text.rfind('}');

    match (first, last) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(InvestigationError::MalformedResponse(
            "no JSON object found in the response".to_string(),
        )),
    }
}

/// Turn the model's raw reply into a report plus its citations.
pub fn parse_reply(
    text: &str,
    citations: Option<Vec<SourceReference>>,
) -> Result<ParsedReply, InvestigationError> {
    let json = extract_json_object(text.trim())?;

    let mut result: InvestigationResult = serde_json::from_str(json).map_err(|e| {
        warn!(error = %e, len = json.len(), "Failed to decode report JSON");
        InvestigationError::MalformedResponse(format!("the AI returned malformed JSON: {}", e))
    })?;

    let before = result.associated_entities.len();
    result.associated_entities = fold_entities(result.associated_entities);
    if result.associated_entities.len() != before {
        debug!(
            before,
            after = result.associated_entities.len(),
            "Folded duplicate entities"
        );
    }

    let sources = citations
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.uri.trim().is_empty())
        .collect();

    Ok(ParsedReply { result, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const REPORT: &str = r#"{"summary": "Active developer", "emails": ["ivan@example.com"], "associated_entities": [{"name": "Ivan"}, {"name": "ivan", "emails": ["b@x.com"]}]}"#;

    #[test]
    fn test_object_inside_prose_equals_object_alone() {
        let wrapped = format!("Here is the report:\n```json\n{}\n```\nHope it helps.", REPORT);

        let from_prose = parse_reply(&wrapped, None).unwrap();
        let alone = parse_reply(REPORT, None).unwrap();

        assert_eq!(from_prose, alone);
        assert_eq!(alone.result.emails, vec!["ivan@example.com"]);
        assert!(alone.sources.is_empty());
    }

    #[test]
    fn test_no_braces_is_malformed() {
        let err = parse_reply("I could not find anything.", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let err = parse_reply("} backwards {", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_reply("{\"summary\": \"cut off", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let err = parse_reply("{summary: nope}", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_entities_are_folded_by_name() {
        let parsed = parse_reply(REPORT, None).unwrap();
        assert_eq!(parsed.result.associated_entities.len(), 1);
        assert_eq!(parsed.result.associated_entities[0].emails, vec!["b@x.com"]);
    }

    #[test]
    fn test_citations_without_uri_are_dropped() {
        let citations = vec![
            SourceReference { uri: "https://example.com/a".into(), title: "A".into() },
            SourceReference { uri: " ".into(), title: "blank".into() },
        ];
        let parsed = parse_reply(REPORT, Some(citations)).unwrap();
        assert_eq!(parsed.sources.len(), 1);
        assert_eq!(parsed.sources[0].title, "A");
    }
}
