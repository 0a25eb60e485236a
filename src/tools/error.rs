#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unsupported parameter class '{clazz}' for parameter '{param}' of tool '{tool}'")]
    UnsupportedParameterClass {
        tool: String,
        param: String,
        clazz: String,
    },

    #[error("Invalid descriptor for tool '{tool}': {reason}")]
    InvalidDescriptor { tool: String, reason: String },

    #[error("Tool execution error in '{name}': {reason}")]
    ExecutionError { name: String, reason: String },

    #[error("Tool '{0}' is declarative only and cannot be invoked")]
    NotInvocable(String),

    #[error("Tool parameters do not match: {0}")]
    ParamsNotMatched(String),
}

impl ToolError {
    pub(crate) fn execution(name: &str, reason: impl std::fmt::Display) -> Self {
        ToolError::ExecutionError {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
