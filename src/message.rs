
use serde::{Serialize, Deserialize};

use crate::llm::CallInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,           // System message
    User,             // User input
    Assistant,        // AI response
    Tool,             // Tool execution response
    Developer,        // Developer message, compatible with OpenAI
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,  // Name used for tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<CallInfo>,
}


impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Assistant turn that asked for tools to be run.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<CallInfo>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(MessageRole::Assistant, content)
        }
    }

    pub fn tool_res(
        name: impl Into<String>,
        call_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            tool_call_id: call_id,
            ..Self::new(MessageRole::Tool, content)
        }
    }

    pub fn developer(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Developer, content)
    }

    /// Whether this message belongs in a persisted transcript.
    ///
    /// System and developer prompts are rebuilt on every run.
    pub fn is_transcript(&self) -> bool {
        !matches!(self.role, MessageRole::System | MessageRole::Developer)
    }
}
