use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decodes `null` the same way as a missing key, so every field of a report
/// is always present after decoding.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Follower counts come back as numbers, numeric strings or prose ("1.2k").
/// Anything that is not a plain count is dropped.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().replace([',', ' '], "").parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub platform: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebMention {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBreach {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compromised_data: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForumMention {
    #[serde(default, deserialize_with = "null_as_default")]
    pub forum_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub post_snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeakedDocument {
    /// Paste site or dump the document was found on
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryMention {
    #[serde(default, deserialize_with = "null_as_default")]
    pub registry_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub record_details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub associated_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelegramKind {
    Channel,
    Group,
    User,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelegramActivity {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: TelegramKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A real-world person or persona the model attributes several data points to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub emails: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_numbers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub social_profiles: Vec<SocialProfile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domains: Vec<String>,
    /// Free-text justifications for why each datum belongs to this entity
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
}

impl Entity {
    /// Fold another record of the same entity into this one.
    pub fn absorb(&mut self, other: Entity) {
        extend_unique(&mut self.emails, other.emails);
        extend_unique(&mut self.phone_numbers, other.phone_numbers);
        extend_unique(&mut self.social_profiles, other.social_profiles);
        extend_unique(&mut self.domains, other.domains);
        extend_unique(&mut self.sources, other.sources);
    }
}

/// A grounding citation returned next to the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceReference {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// Parsed report for one query, or for several merged queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub associated_entities: Vec<Entity>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub social_profiles: Vec<SocialProfile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub emails: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub telegram_activity: Vec<TelegramActivity>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub associated_domains: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_breaches: Vec<DataBreach>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub registry_mentions: Vec<RegistryMention>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_info: Vec<PhoneInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub forum_mentions: Vec<ForumMention>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub leaked_documents: Vec<LeakedDocument>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub web_mentions: Vec<WebMention>,
}

impl InvestigationResult {
    pub fn len_of(&self, category: Category) -> usize {
        match category {
            Category::AssociatedEntities => self.associated_entities.len(),
            Category::SocialProfiles => self.social_profiles.len(),
            Category::Emails => self.emails.len(),
            Category::TelegramActivity => self.telegram_activity.len(),
            Category::AssociatedDomains => self.associated_domains.len(),
            Category::DataBreaches => self.data_breaches.len(),
            Category::RegistryMentions => self.registry_mentions.len(),
            Category::PhoneInfo => self.phone_info.len(),
            Category::ForumMentions => self.forum_mentions.len(),
            Category::LeakedDocuments => self.leaked_documents.len(),
            Category::WebMentions => self.web_mentions.len(),
        }
    }

    /// The canonical text of every item in a category: the value a deep
    /// search pivots on and the label a graph leaf shows.
    pub fn item_texts(&self, category: Category) -> Vec<&str> {
        match category {
            Category::AssociatedEntities => {
                self.associated_entities.iter().map(|e| e.name.as_str()).collect()
            }
            Category::SocialProfiles => {
                self.social_profiles.iter().map(|p| p.username.as_str()).collect()
            }
            Category::Emails => self.emails.iter().map(String::as_str).collect(),
            Category::TelegramActivity => {
                self.telegram_activity.iter().map(|t| t.username.as_str()).collect()
            }
            Category::AssociatedDomains => {
                self.associated_domains.iter().map(String::as_str).collect()
            }
            Category::DataBreaches => self.data_breaches.iter().map(|b| b.name.as_str()).collect(),
            Category::RegistryMentions => {
                self.registry_mentions.iter().map(|r| r.registry_name.as_str()).collect()
            }
            Category::PhoneInfo => self.phone_info.iter().map(|p| p.number.as_str()).collect(),
            Category::ForumMentions => {
                self.forum_mentions.iter().map(|f| f.forum_name.as_str()).collect()
            }
            Category::LeakedDocuments => {
                self.leaked_documents.iter().map(|d| d.source.as_str()).collect()
            }
            Category::WebMentions => self.web_mentions.iter().map(|m| m.title.as_str()).collect(),
        }
    }

    /// Categories holding at least one item, in display order.
    pub fn non_empty_categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.len_of(*c) > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty() && self.non_empty_categories().next().is_none()
    }

    /// Every URL carried by the report's items.
    pub fn item_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        urls.extend(self.social_profiles.iter().map(|p| p.url.as_str()));
        urls.extend(self.telegram_activity.iter().map(|t| t.url.as_str()));
        urls.extend(self.registry_mentions.iter().filter_map(|r| r.url.as_deref()));
        urls.extend(self.forum_mentions.iter().map(|f| f.url.as_str()));
        urls.extend(self.leaked_documents.iter().map(|d| d.url.as_str()));
        urls.extend(self.web_mentions.iter().map(|m| m.url.as_str()));
        urls.retain(|u| !u.is_empty());
        urls
    }
}

/// Append the items of `src` that `dst` does not already hold, keeping order.
pub fn extend_unique<T: PartialEq>(dst: &mut Vec<T>, src: Vec<T>) {
    for item in src {
        if !dst.contains(&item) {
            dst.push(item);
        }
    }
}

/// Report categories, in the fixed order used by the filter bar and the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AssociatedEntities,
    SocialProfiles,
    Emails,
    TelegramActivity,
    AssociatedDomains,
    DataBreaches,
    RegistryMentions,
    PhoneInfo,
    ForumMentions,
    LeakedDocuments,
    WebMentions,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::AssociatedEntities,
        Category::SocialProfiles,
        Category::Emails,
        Category::TelegramActivity,
        Category::AssociatedDomains,
        Category::DataBreaches,
        Category::RegistryMentions,
        Category::PhoneInfo,
        Category::ForumMentions,
        Category::LeakedDocuments,
        Category::WebMentions,
    ];

    /// JSON key of the category inside a report
    pub fn key(self) -> &'static str {
        match self {
            Category::AssociatedEntities => "associated_entities",
            Category::SocialProfiles => "social_profiles",
            Category::Emails => "emails",
            Category::TelegramActivity => "telegram_activity",
            Category::AssociatedDomains => "associated_domains",
            Category::DataBreaches => "data_breaches",
            Category::RegistryMentions => "registry_mentions",
            Category::PhoneInfo => "phone_info",
            Category::ForumMentions => "forum_mentions",
            Category::LeakedDocuments => "leaked_documents",
            Category::WebMentions => "web_mentions",
        }
    }

    /// Shape of one item, as shown to the model.
    fn item_shape(self) -> &'static str {
        match self {
            Category::AssociatedEntities => {
                r#"{ "name": "string", "emails": ["string"], "phone_numbers": ["string"], "social_profiles": [{ "platform": "string", "username": "string", "url": "string" }], "domains": ["string"], "sources": ["string"] }"#
            }
            Category::SocialProfiles => {
                r#"{ "platform": "string", "username": "string", "url": "string", "followers": 0, "bio": "string" }"#
            }
            Category::Emails | Category::AssociatedDomains => r#""string""#,
            Category::TelegramActivity => {
                r#"{ "type": "channel|group|user|unknown", "username": "string", "url": "string", "description": "string" }"#
            }
            Category::DataBreaches => {
                r#"{ "name": "string", "compromised_data": ["string"], "date": "YYYY-MM-DD" }"#
            }
            Category::RegistryMentions => {
                r#"{ "registry_name": "string", "record_details": "string", "url": "string" }"#
            }
            Category::PhoneInfo => r#"{ "number": "string", "associated_names": ["string"] }"#,
            Category::ForumMentions => {
                r#"{ "forum_name": "string", "url": "string", "post_snippet": "string" }"#
            }
            Category::LeakedDocuments => {
                r#"{ "source": "string", "url": "string", "snippet": "string" }"#
            }
            Category::WebMentions => r#"{ "title": "string", "url": "string", "snippet": "string" }"#,
        }
    }

    /// What the model should look for in this category.
    pub fn brief(self) -> &'static str {
        match self {
            Category::AssociatedEntities => {
                "Distinct real people or personas behind the findings. Group every email, phone, domain and profile under the entity it belongs to and justify each attribution in `sources`."
            }
            Category::SocialProfiles => {
                "Social network accounts (Twitter/X, LinkedIn, Instagram, ...) with platform, username and URL."
            }
            Category::Emails => "Email addresses linked to the target.",
            Category::TelegramActivity => {
                "Telegram channels, groups or users linked to the target, with username and URL."
            }
            Category::AssociatedDomains => "Websites or domains linked to the target.",
            Category::DataBreaches => {
                "Known data breaches the target (especially an email or username) appears in: breach name, types of compromised data and breach date."
            }
            Category::RegistryMentions => {
                "Official or public registries (business registers, WHOIS records, professional licences): registry name, record details and URL when available."
            }
            Category::PhoneInfo => {
                "If the target is a phone number: names associated with it (for example from contact-sharing apps)."
            }
            Category::ForumMentions => {
                "Forum posts or profiles mentioning the target: forum name, direct link and a snippet."
            }
            Category::LeakedDocuments => {
                "Mentions in leaked documents on paste sites such as Pastebin: source, URL and snippet."
            }
            Category::WebMentions => {
                "General mentions on websites, blogs or news articles: title, URL and a short snippet."
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// The output-schema description embedded in the prompt. Built from
/// [`Category::ALL`], so the prompt always names every key the decoder fills.
pub fn schema_description() -> String {
    let mut out = String::from("{\n  \"summary\": \"string\",\n  \"full_name\": \"string\"");
    for category in Category::ALL {
        out.push_str(&format!(",\n  \"{}\": [{}]", category.key(), category.item_shape()));
    }
    out.push_str("\n}");
    out
}

/// One line per category explaining what to collect.
pub fn category_briefs() -> String {
    Category::ALL
        .iter()
        .map(|c| format!("- {}: {}", c.key(), c.brief()))
        .collect::<Vec<_>>()
        .join("\n")
}
