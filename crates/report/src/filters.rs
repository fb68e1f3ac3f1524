use extract::{Category, InvestigationResult, Locale};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One entry of the filter bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub category: Category,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveFilter {
    #[default]
    All,
    Only(Category),
}

impl ActiveFilter {
    pub fn shows(self, category: Category) -> bool {
        match self {
            ActiveFilter::All => true,
            ActiveFilter::Only(c) => c == category,
        }
    }

    pub fn is_all(self) -> bool {
        self == ActiveFilter::All
    }
}

impl fmt::Display for ActiveFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveFilter::All => f.write_str("all"),
            ActiveFilter::Only(c) => write!(f, "{}", c),
        }
    }
}

impl FromStr for ActiveFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(ActiveFilter::All),
            other => other.parse().map(ActiveFilter::Only),
        }
    }
}

/// The filter bar for `result`: every non-empty category with its exact
/// item count, in the fixed display order.
pub fn filters(result: &InvestigationResult, locale: Locale) -> Vec<FilterOption> {
    result
        .non_empty_categories()
        .map(|category| FilterOption {
            category,
            label: locale.category_label(category),
            count: result.len_of(category),
        })
        .collect()
}

/// An active filter whose category has emptied (e.g. after a pivot) falls
/// back to "all".
pub fn effective_filter(active: ActiveFilter, result: &InvestigationResult) -> ActiveFilter {
    match active {
        ActiveFilter::Only(c) if result.len_of(c) == 0 => ActiveFilter::All,
        other => other,
    }
}
