use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

use crate::ai::{ClientSettings, RequestOptions, DEFAULT_ADAPTER};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Validate)]
#[serde(default)]
pub struct Config {
    #[validate]
    pub ai: AIConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[serde(default)]
pub struct AIConfig {
    #[validate(length(min = 1, message = "Adapter cannot be empty"))]
    pub adapter: String,
    #[validate(range(min = 1, max = 100000, message = "max_tokens must be between 1 and 100000"))]
    pub max_tokens: u32,
    #[validate(range(min = 0.0, max = 2.0, message = "temperature must be between 0 and 2"))]
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    #[validate(url(message = "anthropic_base_url must be a URL"))]
    pub anthropic_base_url: Option<String>,
    #[validate(url(message = "openai_base_url must be a URL"))]
    pub openai_base_url: Option<String>,
}

impl Default for AIConfig {
    fn default() -> Self {
        let options = RequestOptions::default();
        Self {
            adapter: DEFAULT_ADAPTER.to_string(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            frequency_penalty: options.frequency_penalty,
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_base_url: None,
            openai_base_url: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub color_output: bool,
    pub theme: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color_output: true,
            theme: "dark".to_string(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to load config at {:?}", path))
    }

    /// Load `path`, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Client settings with credentials from the environment first, then
    /// from this file.
    pub fn client_settings(&self) -> ClientSettings {
        self.client_settings_with(|name| std::env::var(name).ok())
    }

    pub fn client_settings_with(&self, lookup: impl Fn(&str) -> Option<String>) -> ClientSettings {
        let env = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        ClientSettings {
            openai_api_key: env("OPENAI_API_KEY").or_else(|| self.ai.openai_api_key.clone()),
            anthropic_api_key: env("ANTHROPIC_API_KEY")
                .or_else(|| self.ai.anthropic_api_key.clone()),
            openai_base_url: env("OPENAI_BASE_URL").or_else(|| self.ai.openai_base_url.clone()),
            anthropic_base_url: env("ANTHROPIC_BASE_URL")
                .or_else(|| self.ai.anthropic_base_url.clone()),
            options: RequestOptions {
                max_tokens: self.ai.max_tokens,
                temperature: self.ai.temperature,
                frequency_penalty: self.ai.frequency_penalty,
            },
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("dev", "commitcraft", "commitcraft")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
