

use super::types::AgentExecuteResult;

/// Trait describing runtime operations an agent can perform.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    /// Call the LLM with a prompt and return the generation result.
    async fn call_llm(&self, prompt: &str) -> AgentExecuteResult;

    /// Run `prompt` as the next user turn of a persisted thread.
    ///
    /// The thread's transcript is loaded before the run and saved, extended
    /// with this turn, only if the run succeeds.
    async fn invoke(&self, thread_id: &str, prompt: &str) -> AgentExecuteResult;
}
