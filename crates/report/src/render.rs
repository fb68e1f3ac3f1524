use extract::{Category, InvestigationResult, Locale, SourceReference};
use investigate::Highlight;
use serde::Serialize;
use std::fmt::Write;

use crate::breaches::{YearCount, breach_histogram, render_histogram, should_chart};
use crate::filters::{ActiveFilter, effective_filter};
use crate::links::{Linkifier, Segment};

/// One row of a category section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedItem {
    /// Canonical text; what a deep search pivots on
    pub text: String,
    pub url: Option<String>,
    pub detail: Vec<Segment>,
    pub highlighted: bool,
}

impl RenderedItem {
    /// Value placed on the clipboard by the copy action.
    pub fn copy_value(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.text)
    }

    pub fn detail_text(&self) -> String {
        self.detail
            .iter()
            .map(|s| match s {
                Segment::Text { text } | Segment::Link { text, .. } => text.as_str(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum Section {
    Summary {
        title: &'static str,
        text: String,
    },
    Category {
        category: Category,
        title: &'static str,
        items: Vec<RenderedItem>,
        /// Only set when there is more than one year to show
        histogram: Option<Vec<YearCount>>,
    },
    Sources {
        title: &'static str,
        sources: Vec<SourceReference>,
    },
}

fn plain(text: impl Into<String>) -> Vec<Segment> {
    let text = text.into();
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![Segment::Text { text }]
    }
}

fn non_empty(url: &str) -> Option<String> {
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}

fn category_items(result: &InvestigationResult, category: Category, linkifier: &Linkifier) -> Vec<RenderedItem> {
    let row = |text: &str, url: Option<String>, detail: Vec<Segment>| RenderedItem {
        text: text.to_string(),
        url,
        detail,
        highlighted: false,
    };

    match category {
        Category::AssociatedEntities => result
            .associated_entities
            .iter()
            .map(|e| row(&e.name, None, linkifier.segments(&e.sources.join("; "))))
            .map(|mut item| {
                if item.detail_text().is_empty() {
                    item.detail.clear();
                }
                item
            })
            .collect(),
        Category::SocialProfiles => result
            .social_profiles
            .iter()
            .map(|p| {
                let detail = match (&p.bio, p.followers) {
                    (Some(bio), Some(n)) => format!("{} · {} · {}", p.platform, bio, n),
                    (Some(bio), None) => format!("{} · {}", p.platform, bio),
                    (None, Some(n)) => format!("{} · {}", p.platform, n),
                    (None, None) => p.platform.clone(),
                };
                row(&p.username, non_empty(&p.url), plain(detail))
            })
            .collect(),
        Category::Emails => result.emails.iter().map(|e| row(e, None, Vec::new())).collect(),
        Category::TelegramActivity => result
            .telegram_activity
            .iter()
            .map(|t| row(&t.username, non_empty(&t.url), plain(t.description.clone().unwrap_or_default())))
            .collect(),
        Category::AssociatedDomains => result
            .associated_domains
            .iter()
            .map(|d| row(d, None, Vec::new()))
            .collect(),
        Category::DataBreaches => result
            .data_breaches
            .iter()
            .map(|b| row(&b.name, None, plain(b.compromised_data.join(", "))))
            .collect(),
        Category::RegistryMentions => result
            .registry_mentions
            .iter()
            .map(|r| row(&r.registry_name, r.url.as_deref().and_then(non_empty), plain(r.record_details.clone())))
            .collect(),
        Category::PhoneInfo => result
            .phone_info
            .iter()
            .map(|p| row(&p.number, None, plain(p.associated_names.join(", "))))
            .collect(),
        Category::ForumMentions => result
            .forum_mentions
            .iter()
            .map(|f| row(&f.forum_name, non_empty(&f.url), plain(f.post_snippet.clone())))
            .collect(),
        Category::LeakedDocuments => result
            .leaked_documents
            .iter()
            .map(|d| row(&d.source, non_empty(&d.url), plain(d.snippet.clone())))
            .collect(),
        Category::WebMentions => result
            .web_mentions
            .iter()
            .map(|m| row(&m.title, non_empty(&m.url), plain(m.snippet.clone())))
            .collect(),
    }
}

/// The sections visible under `filter`. Summary and sources only appear
/// under the "all" filter; empty categories never appear.
pub fn render_sections(
    result: &InvestigationResult,
    sources: &[SourceReference],
    filter: ActiveFilter,
    highlight: Option<&Highlight>,
    locale: Locale,
) -> Vec<Section> {
    let filter = effective_filter(filter, result);
    let linkifier = Linkifier::for_report(result, sources);
    let mut sections = Vec::new();

    if filter.is_all() && !result.summary.trim().is_empty() {
        sections.push(Section::Summary {
            title: locale.summary_title(),
            text: result.summary.clone(),
        });
    }

    for category in result.non_empty_categories().filter(|c| filter.shows(*c)) {
        let mut items = category_items(result, category, &linkifier);
        if let Some(h) = highlight.filter(|h| h.category == category) {
            for item in items.iter_mut().filter(|i| i.text == h.text) {
                item.highlighted = true;
            }
        }

        let histogram = match category {
            Category::DataBreaches => {
                Some(breach_histogram(&result.data_breaches)).filter(|h| should_chart(h))
            }
            _ => None,
        };

        sections.push(Section::Category {
            category,
            title: locale.category_label(category),
            items,
            histogram,
        });
    }

    if filter.is_all() && !sources.is_empty() {
        sections.push(Section::Sources {
            title: locale.sources_title(),
            sources: sources.to_vec(),
        });
    }

    sections
}

/// Plain-text rendering for the terminal. Items are numbered from 1 within
/// each section; the highlighted item is marked with `>`.
pub fn render_text(sections: &[Section]) -> String {
    let mut out = String::new();
    for section in sections {
        match section {
            Section::Summary { title, text } => {
                let _ = writeln!(out, "== {} ==\n{}\n", title, text.trim());
            }
            Section::Category { category, title, items, histogram } => {
                let _ = writeln!(out, "== {} ({}) [{}] ==", title, items.len(), category);
                if let Some(histogram) = histogram {
                    out.push_str(&render_histogram(histogram, 20));
                }
                for (i, item) in items.iter().enumerate() {
                    let marker = if item.highlighted { '>' } else { ' ' };
                    let _ = write!(out, "{} {:>2}. {}", marker, i + 1, item.text);
                    if let Some(url) = &item.url {
                        let _ = write!(out, " <{}>", url);
                    }
                    out.push('\n');
                    let detail = item.detail_text();
                    if !detail.is_empty() {
                        let _ = writeln!(out, "       {}", detail);
                    }
                }
                out.push('\n');
            }
            Section::Sources { title, sources } => {
                let _ = writeln!(out, "== {} ==", title);
                for source in sources {
                    let title = if source.title.is_empty() { &source.uri } else { &source.title };
                    let _ = writeln!(out, "  - {} <{}>", title, source.uri);
                }
                out.push('\n');
            }
        }
    }
    out
}
