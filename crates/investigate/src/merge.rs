use extract::schema::extend_unique;
use extract::{EntityNormalizer, InvestigationResult, SourceReference};
use serde::{Deserialize, Serialize};

/// How a pivot's report combines with what is already displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// The new report replaces the old one. The model receives the whole
    /// conversation and is asked for a cumulative report.
    #[default]
    Replace,
    /// Category lists are unioned; entities are matched by canonical name.
    Union,
}

pub fn merge_results(
    previous: Option<&InvestigationResult>,
    incoming: InvestigationResult,
    policy: MergePolicy,
) -> InvestigationResult {
    let Some(previous) = previous else {
        return incoming;
    };
    if policy == MergePolicy::Replace {
        return incoming;
    }

    let mut merged = previous.clone();

    if !incoming.summary.trim().is_empty() {
        merged.summary = incoming.summary;
    }
    if incoming.full_name.as_deref().is_some_and(|n| !n.trim().is_empty()) {
        merged.full_name = incoming.full_name;
    }

    let mut normalizer = EntityNormalizer::seeded(merged.associated_entities);
    normalizer.extend(incoming.associated_entities);
    merged.associated_entities = normalizer.into_entities();

    extend_unique(&mut merged.social_profiles, incoming.social_profiles);
    extend_unique(&mut merged.emails, incoming.emails);
    extend_unique(&mut merged.telegram_activity, incoming.telegram_activity);
    extend_unique(&mut merged.associated_domains, incoming.associated_domains);
    extend_unique(&mut merged.data_breaches, incoming.data_breaches);
    extend_unique(&mut merged.registry_mentions, incoming.registry_mentions);
    extend_unique(&mut merged.phone_info, incoming.phone_info);
    extend_unique(&mut merged.forum_mentions, incoming.forum_mentions);
    extend_unique(&mut merged.leaked_documents, incoming.leaked_documents);
    extend_unique(&mut merged.web_mentions, incoming.web_mentions);

    merged
}

pub fn merge_sources(
    previous: &[SourceReference],
    incoming: Vec<SourceReference>,
    policy: MergePolicy,
) -> Vec<SourceReference> {
    match policy {
        MergePolicy::Replace => incoming,
        MergePolicy::Union => {
            let mut merged = previous.to_vec();
            extend_unique(&mut merged, incoming);
            merged
        }
    }
}
