
use std::sync::Arc;
use futures::{
    FutureExt,
    future::BoxFuture,
};


use crate::message::Message;
use crate::message::MessageRole as MsgRole;
use crate::tools::schema::ToolSchema;

use crate::llm::{
    traits::LLM,
    tokens::TokenUsage,
    GenerateResult,
    LLMResult,
    parse_tool_calls,
};

/// Default model name used when no model is specified.
/// Adjust this to match the model name you have installed in your local Ollama.
/// Common names: "llama3.2", "llama3", "llama2", or custom names from `ollama list`.
pub const DEFAULT_MODEL: &str = "llama3.2";

pub use ollama_rs::{
    error::OllamaError,
    Ollama as OllamaClient,
    models::ModelOptions,
    generation::chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
};


#[derive(Debug, Clone)]
pub struct Ollama {
    pub(crate) client: Arc<OllamaClient>,
    pub(crate) model: String,
    pub(crate) options: Option<ModelOptions>,
}
impl Ollama {
    /// Create an `Ollama` wrapper using the provided client and the default model.
    ///
    /// If your local Ollama uses a different default model name, change
    /// `DEFAULT_MODEL` or call `Ollama::with_model`.
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            options: None,
        }
    }

    /// Create an `Ollama` wrapper with an explicit model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create an `Ollama` wrapper with additional generation options.
    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    fn generate_request(&self, messages: &[Message]) -> ChatMessageRequest {
        let mapped_messages = messages.iter().map(|message| message.into()).collect();
        let request = ChatMessageRequest::new(self.model.clone(), mapped_messages);
        match self.options.clone() {
            Some(options) => request.options(options),
            None => request,
        }
    }


}

impl Default for Ollama {
    fn default() -> Self {
        let client = Arc::new(OllamaClient::default());
        Ollama::new(client)
    }
}




impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            MsgRole::System | MsgRole::Developer => MessageRole::System,
            MsgRole::User => MessageRole::User,
            MsgRole::Assistant => MessageRole::Assistant,
            MsgRole::Tool => MessageRole::Tool,
        };
        ChatMessage::new(role, message.content.clone())
    }
}


impl LLM for Ollama {
    // Tools are described in the prompt by the agent; `_tools` is not forwarded.
    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        _tools: &'a [ToolSchema],
    ) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let request = self.generate_request(messages);
            let response = self.client.send_chat_messages(request).await?;
            let generation = response.message.content.clone();

            let tokens = response
                .final_data
                .map(|final_data| {
                    TokenUsage::new(final_data.prompt_eval_count as u32, final_data.eval_count as u32)
                })
                .unwrap_or_default();

            let tool_calls = parse_tool_calls(&generation);
            Ok(GenerateResult { tokens, generation, tool_calls })
        }
        .boxed()
    }
}
