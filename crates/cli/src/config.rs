use anyhow::{Context, Result};
use extract::{GeminiConfig, Locale, PromptOptions};
use investigate::{MergePolicy, SessionConfig};
use report::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "deepsearch";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inference: GeminiConfig,
    pub prompt: PromptConfig,
    pub storage: StorageConfig,
    pub report: ReportConfig,
    pub graph: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub temperature: f32,
    pub grounded_search: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to `<data dir>/deepsearch/history.json`
    pub history_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub locale: Locale,
    pub merge_policy: MergePolicy,
    pub export_dir: PathBuf,
    /// Page linked from share messages
    pub share_page_url: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        let defaults = PromptOptions::default();
        Self {
            temperature: defaults.temperature,
            grounded_search: defaults.grounded_search,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            merge_policy: MergePolicy::default(),
            export_dir: PathBuf::from("."),
            share_page_url: None,
        }
    }
}

impl AppConfig {
    /// Read `path`, or the default config file when it exists, or fall back
    /// to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn history_path(&self) -> PathBuf {
        self.storage.history_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR)))
                .join("history.json")
        })
    }

    /// Inference settings with the API key taken from the environment.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .context("No API key found. Set GEMINI_API_KEY (or API_KEY) in the environment or .env")?;

        Ok(GeminiConfig { api_key, ..self.inference.clone() })
    }

    pub fn prompt_options(&self) -> PromptOptions {
        PromptOptions {
            locale: self.report.locale,
            temperature: self.prompt.temperature,
            grounded_search: self.prompt.grounded_search,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            locale: self.report.locale,
            merge_policy: self.report.merge_policy,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [inference]
            model = "gemini-2.5-pro"

            [report]
            locale = "en"
            merge_policy = "union"

            [graph]
            leaf_radius = 80.0
            "#,
        )
        .unwrap();

        assert_eq!(config.inference.model, "gemini-2.5-pro");
        assert_eq!(config.inference.timeout_secs, GeminiConfig::default().timeout_secs);
        assert_eq!(config.session_config().locale, Locale::En);
        assert_eq!(config.session_config().merge_policy, MergePolicy::Union);
        assert_eq!(config.graph.leaf_radius, 80.0);
        assert_eq!(config.graph.category_radius, LayoutConfig::default().category_radius);
        assert!((config.prompt_options().temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_api_key_is_not_written_back() {
        let config = AppConfig::from_toml("[inference]\napi_key = \"leaked\"\n").unwrap();
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("leaked"));
    }

    #[test]
    fn test_explicit_history_path() {
        let config = AppConfig::from_toml("[storage]\nhistory_path = \"/tmp/h.json\"\n").unwrap();
        assert_eq!(config.history_path(), PathBuf::from("/tmp/h.json"));
        assert!(AppConfig::default().history_path().ends_with("history.json"));
    }

    #[test]
    fn test_load_reads_file_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\nlocale = \"uk\"\n").unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap().report.locale, Locale::Uk);

        std::fs::write(&path, "[report]\nlocale = \"klingon\"\n").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
