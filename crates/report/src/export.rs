use extract::{InvestigationResult, SourceReference};
use regex::Regex;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static regex"));

/// Every character outside ASCII letters and digits becomes `_`, then the
/// whole name is lower-cased.
pub fn sanitize_filename(target: &str) -> String {
    NON_ALPHANUMERIC.replace_all(target, "_").to_lowercase()
}

pub fn export_filename(target: &str) -> String {
    let sanitized = sanitize_filename(target);
    let stem = if sanitized.is_empty() { "export" } else { sanitized.as_str() };
    format!("DeepSearch_report_{}.json", stem)
}

/// The downloadable report document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub investigation_target: &'a str,
    pub results: &'a InvestigationResult,
    pub sources: &'a [SourceReference],
}

impl<'a> ExportDocument<'a> {
    pub fn new(target: &'a str, results: &'a InvestigationResult, sources: &'a [SourceReference]) -> Self {
        Self { investigation_target: target, results, sources }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn filename(&self) -> String {
        export_filename(self.investigation_target)
    }

    /// Write the document into `dir` and return the file path.
    pub async fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let json = self.to_json().map_err(io::Error::other)?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.filename());
        tokio::fs::write(&path, json).await?;
        info!(path = %path.display(), "Report exported");
        Ok(path)
    }
}
