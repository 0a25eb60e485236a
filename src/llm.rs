pub mod traits;
pub mod openai;
pub mod ollama;
pub mod tokens;
pub mod error;

use std::sync::Arc;

use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;
use tokens::TokenUsage;

use crate::config::{LlmConfig, LlmProvider};
use traits::LLM;

/// Result of a text generation from an LLM.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GenerateResult {
    pub tokens: TokenUsage,
    pub generation: String,
    /// Optional structured tool calls the LLM signaled during this generation.
    /// Each entry contains the tool name and the arguments object the LLM wants
    /// the agent to pass when invoking that tool.
    #[serde(default)]
    pub tool_calls: Vec<CallInfo>,
}

/// Structured information about a single tool call requested by the LLM.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CallInfo {
    /// Provider-assigned id, echoed back on the tool response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: JsonValue,
}

/// Result type for LLM operations.
pub type LLMResult<T> = std::result::Result<T, error::LLMError>;

/// Build the configured provider with its fixed model and temperature.
pub fn from_config(config: &LlmConfig) -> Arc<dyn LLM> {
    match config.provider {
        LlmProvider::OpenAI => {
            let client = match config.api_key.as_deref() {
                Some(key) => openai::OpenAI::with_api_key(key),
                None => openai::OpenAI::new(),
            };
            let options = openai::CompletionOptions {
                model: config.model.clone(),
                temperature: Some(config.temperature),
                ..Default::default()
            };
            Arc::new(client.with_options(options))
        }
        LlmProvider::Ollama => {
            let client = ollama::OllamaClient::new(config.ollama_host.clone(), config.ollama_port);
            let options = ollama::ModelOptions::default().temperature(config.temperature);
            Arc::new(
                ollama::Ollama::new(Arc::new(client))
                    .with_model(config.model.clone())
                    .with_options(options),
            )
        }
    }
}

/// Extract `{"tool_calls": [{name, args}]}` from free-form generation text.
///
/// Used by providers without native function calling; the agent asks the
/// model to embed this JSON in its answer.
pub fn parse_tool_calls(generation: &str) -> Vec<CallInfo> {
    let parsed = serde_json::from_str::<JsonValue>(generation).ok().or_else(|| {
        let start = generation.find('{')?;
        let end = generation.rfind('}')?;
        if start > end {
            return None;
        }
        serde_json::from_str::<JsonValue>(&generation[start..=end]).ok()
    });

    let Some(parsed) = parsed else {
        return Vec::new();
    };
    let Some(entries) = parsed.get("tool_calls").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let name = obj.get("name")?.as_str()?.to_string();
            let args = obj.get("args").cloned().unwrap_or_else(|| serde_json::json!({}));
            Some(CallInfo { id: None, name, args })
        })
        .collect()
}
