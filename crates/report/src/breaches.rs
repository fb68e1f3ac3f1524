use chrono::{DateTime, Datelike, NaiveDate};
use extract::DataBreach;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("static regex"));

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

/// Year of a breach date, or `None` when the date is missing or unreadable.
pub fn breach_year(date: &str) -> Option<i32> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.year());
    }
    if let Some(d) = DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(date, f).ok()) {
        return Some(d.year());
    }
    // "2019-03", "March 2019", "~2016"
    YEAR.find(date).and_then(|m| m.as_str().parse().ok())
}

/// Breach counts per year, ascending. Breaches without a usable date are
/// left out.
pub fn breach_histogram(breaches: &[DataBreach]) -> Vec<YearCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in breaches.iter().filter_map(|b| breach_year(&b.date)) {
        *counts.entry(year).or_insert(0) += 1;
    }
    counts.into_iter().map(|(year, count)| YearCount { year, count }).collect()
}

/// A single bar tells nothing the list does not.
pub fn should_chart(histogram: &[YearCount]) -> bool {
    histogram.len() > 1
}

/// Horizontal bar chart for the terminal.
pub fn render_histogram(histogram: &[YearCount], width: usize) -> String {
    let max = histogram.iter().map(|b| b.count).max().unwrap_or(0);
    let mut out = String::new();
    for bucket in histogram {
        let bar = if max == 0 { 0 } else { (bucket.count * width).div_ceil(max) };
        out.push_str(&format!("{} | {} {}\n", bucket.year, "█".repeat(bar), bucket.count));
    }
    out
}
