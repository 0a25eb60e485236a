//! Routes one user message through a freshly assembled agent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::error::AgentError;
use crate::agent::traits::AgentRunner;
use crate::agent::types::Agent;
use crate::checkpoint::Checkpointer;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::llm::traits::LLM;
use crate::tools::{ToolDescriptor, compile};

/// What the caller gets back for a handled message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub message: String,
}

/// Assembles LLM, compiled tools and persistence into an agent per message.
///
/// Compiled tools are never reused: each call compiles the descriptors it is
/// given, so a refreshed tool set takes effect on the next message.
pub struct MessageDispatcher {
    llm: Arc<dyn LLM>,
    checkpointer: Arc<dyn Checkpointer>,
    http: reqwest::Client,
    config: AgentConfig,
}

impl MessageDispatcher {
    pub fn new(
        llm: Arc<dyn LLM>,
        checkpointer: Arc<dyn Checkpointer>,
        http: reqwest::Client,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            checkpointer,
            http,
            config,
        }
    }

    /// Run `message` as the next turn of `session_id` using `tools`.
    pub async fn handle(
        &self,
        session_id: &str,
        message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Reply> {
        let agent = self.create_agent(tools).await?;
        let result = agent.invoke(session_id, message).await.inspect_err(|e| {
            tracing::error!(session_id, error = %e, "agent run failed");
        })?;
        tracing::info!(
            session_id,
            total_tokens = result.tokens.total_tokens,
            "message handled"
        );
        Ok(Reply {
            message: result.generation,
        })
    }

    async fn create_agent(&self, tools: &[ToolDescriptor]) -> Result<Agent> {
        self.checkpointer.setup().await.map_err(|e| {
            tracing::error!(error = %e, "checkpoint store setup failed");
            AgentError::Construction(e.to_string())
        })?;

        let compiled = compile(tools, &self.http)?;

        let mut agent = Agent::new(
            "campus-agent",
            self.llm.clone(),
            Some(self.config.max_iterations),
        );
        agent.set_system_prompt(self.config.system_prompt.clone());
        agent.set_checkpointer(self.checkpointer.clone());
        for tool in compiled {
            agent.register_tool(None, Arc::new(tool));
        }
        tracing::debug!(tools = agent.tools.len(), "agent assembled");
        Ok(agent)
    }
}
