//! Process configuration.
//!
//! Loaded once at start from an optional TOML file, then overridden by a few
//! environment variables. Every field has a default so an empty file (or no
//! file at all) yields a runnable service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// File used when no `--config` path is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "campus-agent.toml";

/// Instruction given to every agent unless configured otherwise.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é um assistente de um sistema de gerenciamento de usuários";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub checkpoint: CheckpointConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60,
            single_flight: false,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub temperature: f32,
    /// Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub ollama_host: String,
    pub ollama_port: u16,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: crate::llm::openai::DEFAULT_MODEL.into(),
            temperature: 0.0,
            api_key: None,
            ollama_host: "http://localhost".into(),
            ollama_port: 11434,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub kind: CheckpointKind,
    pub dir: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            kind: CheckpointKind::Memory,
            dir: PathBuf::from(".campus-agent/threads"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Timeout for each outbound tool request. None waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if present, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `CAMPUS_AGENT_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("CAMPUS_AGENT_BIND") {
            self.server.bind = bind;
        }
        if let Some(url) = lookup("CAMPUS_AGENT_REGISTRY_URL") {
            self.registry.base_url = url;
        }
        if let Some(model) = lookup("CAMPUS_AGENT_MODEL") {
            self.llm.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.base_url.trim().is_empty() {
            return Err(ConfigError::MissingConfig("registry.base_url".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingConfig("llm.model".into()));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "agent.max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
