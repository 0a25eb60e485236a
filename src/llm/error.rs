use super::ollama::OllamaError;
use super::openai::OpenAIError;


#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Ollama error: {0}")]
    OllamaError(#[from] OllamaError),

    #[error("OpenAI error: {0}")]
    OpenAIError(#[from] OpenAIError),

    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
