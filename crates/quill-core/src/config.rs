use crate::error::QuillError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which built-in tools start out active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Every built-in tool plus TokenStats.
    #[default]
    Coder,
    /// Read-mostly: no editing, no shell, no runtime tool definition.
    Planner,
}

impl Profile {
    /// Names enabled when a session starts.
    pub fn initial_tools(self) -> Vec<&'static str> {
        match self {
            Profile::Coder => {
                let mut tools = quill_tools::BUILTIN_TOOLS.to_vec();
                tools.push(crate::token_stats::TOKEN_STATS);
                tools
            }
            Profile::Planner => quill_tools::PLANNER_TOOLS.to_vec(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Coder => write!(f, "coder"),
            Profile::Planner => write!(f, "planner"),
        }
    }
}

impl FromStr for Profile {
    type Err = QuillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coder" => Ok(Profile::Coder),
            "planner" => Ok(Profile::Planner),
            other => Err(QuillError::Config(format!(
                "unknown profile '{other}' (expected coder or planner)"
            ))),
        }
    }
}

/// Serialized settings from ~/.quill/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: String,
    /// `None` keeps the provider's default model.
    pub model: Option<String>,
    pub ollama_base_url: String,
    pub api_keys: HashMap<String, String>,
    pub profile: Profile,
    pub system_prompt: Option<String>,
    pub max_iterations: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            ollama_base_url: quill_provider::DEFAULT_OLLAMA_BASE_URL.to_string(),
            api_keys: HashMap::new(),
            profile: Profile::Coder,
            system_prompt: None,
            max_iterations: None,
        }
    }
}

impl Config {
    /// Apply `PROVIDER`, `MODEL_ID` and `OLLAMA_API_BASE` from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(provider) = non_empty("PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = non_empty("MODEL_ID") {
            self.model = Some(model);
        }
        if let Some(base) = non_empty("OLLAMA_API_BASE") {
            self.ollama_base_url = base;
        }
    }

    /// API key for `provider`: `<PROVIDER>_API_KEY` wins over the config file.
    pub fn api_key(&self, provider: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let env_var = format!("{}_API_KEY", provider.to_uppercase());
        lookup(&env_var)
            .or_else(|| self.api_keys.get(provider).cloned())
            .filter(|key| !key.is_empty())
    }
}

/// Directory holding quill's config and usage files (`~/.quill`).
pub fn quill_home() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".quill");
    path
}

/// Helper struct for storing the location to read/write global settings
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::at(quill_home().join("config.json"))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the user's saved config, or fall back to defaults.
    pub fn load(&self) -> Config {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Config::default(),
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring invalid config file");
                Config::default()
            }
        }
    }

    /// Save the user's config back to disk
    pub fn save(&self, config: &Config) -> Result<(), QuillError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
