use anyhow::{Context, Result};
use mermend_llm::LlmConfig;
use mermend_render::{RenderConfig, Theme};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mermend.toml";

/// Environment variable that overrides `[llm] api_key`.
pub const API_KEY_ENV: &str = "MERMEND_API_KEY";

// ── Config types ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub llm: LlmSection,
    pub render: RenderSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub kroki_url: Option<String>,
    pub mermaid_ink_url: Option<String>,
    pub theme: Option<Theme>,
    pub timeout_secs: Option<u64>,
}

// ── Config loading ──────────────────────────────────────────────

/// Load `path`, or `mermend.toml` from the working directory if it exists.
/// An explicit path that cannot be read is an error; a missing default file
/// is not.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => parse_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                parse_file(default)
            } else {
                Ok(FileConfig::default())
            }
        }
    }
}

fn parse_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml_edit::de::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

impl FileConfig {
    /// Precedence: flag, then environment, then file, then built-in default.
    pub fn llm_config(&self, env_api_key: Option<String>, model: Option<&str>) -> LlmConfig {
        let defaults = LlmConfig::default();
        LlmConfig {
            base_url: self.llm.endpoint.clone().unwrap_or(defaults.base_url),
            api_key: env_api_key
                .filter(|key| !key.trim().is_empty())
                .or_else(|| self.llm.api_key.clone()),
            model: model
                .map(String::from)
                .or_else(|| self.llm.model.clone())
                .unwrap_or(defaults.model),
            temperature: self.llm.temperature.or(defaults.temperature),
            max_tokens: self.llm.max_tokens.or(defaults.max_tokens),
            timeout: self
                .llm
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn render_config(&self, theme: Option<Theme>) -> RenderConfig {
        let defaults = RenderConfig::default();
        RenderConfig {
            kroki_url: self.render.kroki_url.clone().unwrap_or(defaults.kroki_url),
            mermaid_ink_url: self
                .render
                .mermaid_ink_url
                .clone()
                .unwrap_or(defaults.mermaid_ink_url),
            theme: theme.or(self.render.theme).unwrap_or(defaults.theme),
            timeout: self
                .render
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}
