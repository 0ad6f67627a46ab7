use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::proposal::{DEFAULT_PREVIEW_CHARS, OnInvalid, ProposalOptions, UnknownStrategy};

pub(crate) const DEFAULT_CONFIG_FILENAME: &str = "pagesmith.toml";
pub(crate) const ENV_CONFIG_FILE: &str = "PAGESMITH_CONFIG";
pub(crate) const ENV_BASE_URL: &str = "PAGESMITH_BASE_URL";
pub(crate) const ENV_MODEL: &str = "PAGESMITH_MODEL";
pub(crate) const ENV_ON_INVALID: &str = "PAGESMITH_ON_INVALID";
pub(crate) const ENV_TIMEOUT_MS: &str = "API_TIMEOUT_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config `{}` is not valid TOML: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{var}: {source}")]
    Strategy {
        var: &'static str,
        source: UnknownStrategy,
    },

    #[error("{var} must be a positive integer, got `{value}`")]
    NotANumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub stream: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 4000,
            timeout_ms: 120_000,
            stream: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProposalSettings {
    pub on_invalid: OnInvalid,
    pub preview_chars: usize,
}

impl Default for ProposalSettings {
    fn default() -> Self {
        Self {
            on_invalid: OnInvalid::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

impl ProposalSettings {
    pub fn options(&self) -> ProposalOptions {
        ProposalOptions {
            on_invalid: self.on_invalid,
            preview_chars: self.preview_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub project_name: String,
    /// Directory the preview sink writes `current.html` / `proposal.html` into.
    pub preview_dir: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            project_name: "My Site".to_string(),
            preview_dir: PathBuf::from(".pagesmith"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorSettings,
    pub proposal: ProposalSettings,
    pub session: SessionSettings,
}

impl Config {
    /// Defaults, then the config file (explicit path, `$PAGESMITH_CONFIG`, or
    /// `./pagesmith.toml` when present), then environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(ENV_CONFIG_FILE).map(PathBuf::from))
            .or_else(|| {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                fallback.is_file().then_some(fallback)
            });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.generator.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.generator.model = model.trim().to_string();
        }
        if let Some(raw) = non_empty(ENV_ON_INVALID) {
            self.proposal.on_invalid = raw.parse().map_err(|source| ConfigError::Strategy {
                var: ENV_ON_INVALID,
                source,
            })?;
        }
        if let Some(raw) = non_empty(ENV_TIMEOUT_MS) {
            self.generator.timeout_ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::NotANumber {
                    var: ENV_TIMEOUT_MS,
                    value: raw,
                })?;
        }
        Ok(())
    }
}
