//! Common imports for embedding the agent service.

pub use crate::agent::traits::AgentRunner;
pub use crate::agent::types::{Agent, AgentResult};
pub use crate::cache::ToolCache;
pub use crate::checkpoint::{Checkpointer, FileCheckpointer, MemoryCheckpointer};
pub use crate::config::AppConfig;
pub use crate::dispatcher::{MessageDispatcher, Reply};
pub use crate::error::{Error, Result};
pub use crate::llm::traits::LLM;
pub use crate::llm::{CallInfo, GenerateResult};
pub use crate::message::{Message, MessageRole};
pub use crate::registry::{DescriptorSource, RegistryClient};
pub use crate::server::{AppState, build_router, spawn_server};
pub use crate::tools::traits::Tool;
pub use crate::tools::{CompiledTool, ToolDescriptor, compile};
