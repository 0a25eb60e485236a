use crate::message::Message;
use crate::llm::{LLMResult, GenerateResult};
use crate::tools::schema::ToolSchema;
use futures::future::BoxFuture;

/// Core LLM trait. Uses BoxFuture with an explicit lifetime so implementations
/// can borrow the input `&[Message]` instead of cloning the conversation.
pub trait LLM: Send + Sync {
    /// Produce a generation result. `tools` lists what the model may call.
    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolSchema],
    ) -> BoxFuture<'a, LLMResult<GenerateResult>>;

    /// Whether `tools` is sent through a native function-calling API.
    ///
    /// When false the agent describes tools in the prompt instead and the
    /// provider parses calls out of the generated text.
    fn native_tools(&self) -> bool {
        false
    }
}
