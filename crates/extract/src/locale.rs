use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::schema::Category;

/// Language of report values and of user-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Uk,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uk" | "ua" | "ukrainian" => Ok(Locale::Uk),
            "en" | "english" => Ok(Locale::En),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

impl Locale {
    /// Instruction telling the model which language to write values in.
    pub fn language_directive(self) -> &'static str {
        match self {
            Locale::Uk => {
                "IMPORTANT: all analysis and every free-text JSON value (summary, compromised_data, snippets, sources, ...) MUST be written in Ukrainian. JSON keys stay in English exactly as given in the schema."
            }
            Locale::En => {
                "All free-text JSON values must be written in English. JSON keys stay exactly as given in the schema."
            }
        }
    }

    pub fn category_label(self, category: Category) -> &'static str {
        match (self, category) {
            (Locale::Uk, Category::AssociatedEntities) => "Пов'язані особи",
            (Locale::Uk, Category::SocialProfiles) => "Соціальні мережі",
            (Locale::Uk, Category::Emails) => "Email",
            (Locale::Uk, Category::TelegramActivity) => "Telegram",
            (Locale::Uk, Category::AssociatedDomains) => "Домени",
            (Locale::Uk, Category::DataBreaches) => "Витоки даних",
            (Locale::Uk, Category::RegistryMentions) => "Реєстри",
            (Locale::Uk, Category::PhoneInfo) => "Телефон",
            (Locale::Uk, Category::ForumMentions) => "Форуми",
            (Locale::Uk, Category::LeakedDocuments) => "Документи",
            (Locale::Uk, Category::WebMentions) => "Згадки в мережі",
            (Locale::En, Category::AssociatedEntities) => "Associated entities",
            (Locale::En, Category::SocialProfiles) => "Social profiles",
            (Locale::En, Category::Emails) => "Email",
            (Locale::En, Category::TelegramActivity) => "Telegram",
            (Locale::En, Category::AssociatedDomains) => "Domains",
            (Locale::En, Category::DataBreaches) => "Data breaches",
            (Locale::En, Category::RegistryMentions) => "Registries",
            (Locale::En, Category::PhoneInfo) => "Phone",
            (Locale::En, Category::ForumMentions) => "Forums",
            (Locale::En, Category::LeakedDocuments) => "Documents",
            (Locale::En, Category::WebMentions) => "Web mentions",
        }
    }

    /// Shorter titles used on graph nodes.
    pub fn graph_label(self, category: Category) -> &'static str {
        match (self, category) {
            (Locale::Uk, Category::AssociatedEntities) => "Особи",
            (Locale::Uk, Category::SocialProfiles) => "Соц. мережі",
            (Locale::Uk, Category::Emails) => "Emails",
            (Locale::Uk, Category::DataBreaches) => "Витоки",
            (Locale::Uk, Category::PhoneInfo) => "Телефони",
            (Locale::Uk, Category::WebMentions) => "Згадки",
            (Locale::En, Category::AssociatedEntities) => "People",
            (Locale::En, Category::SocialProfiles) => "Social",
            (Locale::En, Category::Emails) => "Emails",
            (Locale::En, Category::DataBreaches) => "Breaches",
            (Locale::En, Category::PhoneInfo) => "Phones",
            (Locale::En, Category::WebMentions) => "Mentions",
            (locale, other) => locale.category_label(other),
        }
    }

    pub fn summary_title(self) -> &'static str {
        match self {
            Locale::Uk => "Зведення",
            Locale::En => "Summary",
        }
    }

    pub fn sources_title(self) -> &'static str {
        match self {
            Locale::Uk => "Джерела",
            Locale::En => "Sources",
        }
    }

    pub fn all_filter(self) -> &'static str {
        match self {
            Locale::Uk => "Всі",
            Locale::En => "All",
        }
    }

    pub fn more_items(self, remaining: usize) -> String {
        match self {
            Locale::Uk => format!("+ {} ще...", remaining),
            Locale::En => format!("+ {} more...", remaining),
        }
    }

    pub fn greeting(self) -> &'static str {
        match self {
            Locale::Uk => {
                "Вітаю! Я — DeepSearch аналітик. Введіть ціль (наприклад, ім'я користувача, email, домен), щоб почати аналіз."
            }
            Locale::En => {
                "Hi! I am the DeepSearch analyst. Enter a target (username, email, domain, phone) to start an investigation."
            }
        }
    }

    pub fn analysis_done(self) -> &'static str {
        match self {
            Locale::Uk => "Аналіз завершено.",
            Locale::En => "Analysis complete.",
        }
    }

    pub fn loaded_from_history(self, target: &str) -> String {
        match self {
            Locale::Uk => format!("Аналіз для «{}» завантажено з історії.", target),
            Locale::En => format!("Analysis for \"{}\" loaded from history.", target),
        }
    }

    pub fn share_message(self, target: &str, summary: &str) -> String {
        match self {
            Locale::Uk => format!(
                "*DeepSearch: Звіт по запиту \"{}\"*\n\n*Зведення:*\n{}\n\n_Згенеровано DeepSearch._",
                target, summary
            ),
            Locale::En => format!(
                "*DeepSearch: report for \"{}\"*\n\n*Summary:*\n{}\n\n_Generated by DeepSearch._",
                target, summary
            ),
        }
    }
}
