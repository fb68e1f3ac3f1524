use extract::{InvestigationResult, SourceReference};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text { text: String },
    Link { text: String, url: String },
}

/// Host of `uri` without a leading `www.`, lower-cased.
pub fn host_of(uri: &str) -> Option<String> {
    let parsed = Url::parse(uri.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Turns domain mentions inside free text into links.
#[derive(Debug, Clone)]
pub struct Linkifier {
    domains: Vec<String>,
    pattern: Option<Regex>,
}

impl Linkifier {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| d.contains('.'))
            .collect();
        domains.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        domains.dedup();

        // Longest first so "docs.example.com" wins over "example.com".
        let pattern = if domains.is_empty() {
            None
        } else {
            let alternation = domains.iter().map(|d| regex::escape(d)).collect::<Vec<_>>().join("|");
            RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
                .case_insensitive(true)
                .build()
                .ok()
        };

        Self { domains, pattern }
    }

    /// Known domains: hosts of the grounding citations, citation titles that
    /// are bare domains, associated domains and every URL in the report.
    ///
    /// Grounded citations point at a redirect service, so the cited site is
    /// usually only visible in the title.
    pub fn for_report(result: &InvestigationResult, sources: &[SourceReference]) -> Self {
        let bare = |name: &str| host_of(&format!("https://{}", name.trim()));
        let hosts = sources
            .iter()
            .flat_map(|s| [host_of(&s.uri), bare(&s.title)])
            .chain(result.associated_domains.iter().map(|d| bare(d)))
            .chain(result.item_urls().into_iter().map(host_of))
            .flatten();
        Self::new(hosts)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn segments(&self, text: &str) -> Vec<Segment> {
        let Some(pattern) = &self.pattern else {
            return vec![Segment::Text { text: text.to_string() }];
        };

        let mut segments = Vec::new();
        let mut last = 0;
        for m in pattern.find_iter(text) {
            if m.start() > last {
                segments.push(Segment::Text { text: text[last..m.start()].to_string() });
            }
            segments.push(Segment::Link {
                text: m.as_str().to_string(),
                url: format!("https://{}", m.as_str().to_lowercase()),
            });
            last = m.end();
        }
        if last < text.len() {
            segments.push(Segment::Text { text: text[last..].to_string() });
        }
        segments
    }
}
