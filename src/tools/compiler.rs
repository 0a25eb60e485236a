use std::collections::HashSet;

use serde_json::{Map, Value};

use super::descriptor::ToolDescriptor;
use super::error::ToolError;
use super::request::{HttpInvoker, placeholders};
use super::schema::{ArgSchema, parameters_json_schema, validate_args};
use super::traits::Tool;

/// A tool built at runtime from a registry descriptor.
///
/// Request-backed descriptors carry an [`HttpInvoker`]; declarative ones only
/// describe themselves to the model and refuse to run.
#[derive(Debug, Clone)]
pub struct CompiledTool {
    name: String,
    description: String,
    args: Vec<ArgSchema>,
    invoker: Option<HttpInvoker>,
}

impl CompiledTool {
    pub fn from_descriptor(
        descriptor: &ToolDescriptor,
        client: &reqwest::Client,
    ) -> Result<Self, ToolError> {
        let tool = descriptor.name.as_str();
        let args = descriptor
            .parameters
            .iter()
            .map(|(name, spec)| ArgSchema::from_parameter(tool, name, spec))
            .collect::<Result<Vec<_>, _>>()?;

        let invoker = if descriptor.is_request {
            for placeholder in placeholders(&descriptor.url) {
                if !descriptor.parameters.contains_key(placeholder) {
                    tracing::warn!(
                        tool,
                        placeholder,
                        url = %descriptor.url,
                        "url placeholder has no declared parameter; it will be sent literally"
                    );
                }
            }
            Some(HttpInvoker::new(
                client.clone(),
                descriptor.method,
                descriptor.url.clone(),
            ))
        } else {
            None
        };

        Ok(Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            args,
            invoker,
        })
    }

    pub fn is_invocable(&self) -> bool {
        self.invoker.is_some()
    }

    /// Validate call arguments without invoking anything.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, ToolError> {
        validate_args(&self.args, input)
    }

    pub fn parameters_json_schema(&self) -> Value {
        parameters_json_schema(&self.args)
    }
}

#[async_trait::async_trait]
impl Tool for CompiledTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args(&self) -> Vec<ArgSchema> {
        self.args.clone()
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        let invoker = self
            .invoker
            .as_ref()
            .ok_or_else(|| ToolError::NotInvocable(self.name.clone()))?;
        let values = self.validate(&input)?;
        invoker.invoke(&self.name, &self.args, values).await
    }
}

/// Compile every descriptor. Any descriptor that fails aborts the whole set.
pub fn compile(
    descriptors: &[ToolDescriptor],
    client: &reqwest::Client,
) -> Result<Vec<CompiledTool>, ToolError> {
    let mut seen = HashSet::new();
    descriptors
        .iter()
        .map(|descriptor| {
            if !seen.insert(descriptor.name.as_str()) {
                tracing::warn!(tool = %descriptor.name, "duplicate tool name; the later one wins");
            }
            CompiledTool::from_descriptor(descriptor, client).inspect_err(|e| {
                tracing::error!(tool = %descriptor.name, error = %e, "failed to compile tool");
            })
        })
        .collect()
}
