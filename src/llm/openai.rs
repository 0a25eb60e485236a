// 参考：https://github.com/64bit/async-openai/blob/main/examples/tool-call/src/main.rs
pub use async_openai::{
    Client, config::{Config, OpenAIConfig}, error::OpenAIError,
};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObjectArgs,
};
use serde::{Serialize, Deserialize};
use futures::{FutureExt, future::BoxFuture};

use crate::message::{Message, MessageRole};
use crate::tools::schema::{ToolSchema, parameters_json_schema};
use crate::llm::{
    traits::LLM,
    tokens::TokenUsage,
    error::LLMError,
    CallInfo,
    GenerateResult,
    LLMResult,
};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// A unique identifier representing your end-user, which will help OpenAI to monitor and detect abuse. [Learn more](https://platform.openai.com/docs/usage-policies/end-user-ids).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: Some(0.0),
            user: None,
        }
    }
}

pub struct OpenAI{
    pub client:Client<OpenAIConfig>,
    pub options:CompletionOptions

}

impl OpenAI {
    /// Client configured from the environment (`OPENAI_API_KEY`).
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            options: CompletionOptions::default(),
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> LLMResult<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(request_message)
            .collect::<LLMResult<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(self.options.model.clone()).messages(messages);
        if let Some(temperature) = self.options.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }
        if let Some(user) = self.options.user.as_ref() {
            builder.user(user.clone());
        }
        if !tools.is_empty() {
            let tools = tools
                .iter()
                .map(tool_definition)
                .collect::<LLMResult<Vec<_>>>()?;
            builder.tools(tools);
        }
        Ok(builder.build()?)
    }
}

impl Default for OpenAI {
    fn default() -> Self {
        Self::new()
    }
}

fn request_message(message: &Message) -> LLMResult<ChatCompletionRequestMessage> {
    let content = message.content.as_str();
    let mapped: ChatCompletionRequestMessage = match message.role {
        MessageRole::System | MessageRole::Developer => {
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()?
                .into()
        }
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            builder.content(content);
            if !message.tool_calls.is_empty() {
                let calls = message
                    .tool_calls
                    .iter()
                    .map(|call| -> LLMResult<ChatCompletionMessageToolCall> {
                        Ok(ChatCompletionMessageToolCall {
                            id: call.id.clone().unwrap_or_else(|| call.name.clone()),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: serde_json::to_string(&call.args)?,
                            },
                        })
                    })
                    .collect::<LLMResult<Vec<_>>>()?;
                builder.tool_calls(calls);
            }
            builder.build()?.into()
        }
        MessageRole::Tool => {
            let call_id = message
                .tool_call_id
                .clone()
                .or_else(|| message.name.clone())
                .unwrap_or_default();
            ChatCompletionRequestToolMessageArgs::default()
                .content(content)
                .tool_call_id(call_id)
                .build()?
                .into()
        }
    };
    Ok(mapped)
}

fn tool_definition(schema: &ToolSchema) -> LLMResult<ChatCompletionTool> {
    let function = FunctionObjectArgs::default()
        .name(schema.name.clone())
        .description(schema.description.clone())
        .parameters(parameters_json_schema(&schema.args))
        .build()?;
    Ok(ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(function)
        .build()?)
}

fn call_arguments(raw: &str) -> LLMResult<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    Ok(serde_json::from_str(raw)?)
}

impl LLM for OpenAI {
    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolSchema],
    ) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let request = self.build_request(messages, tools)?;
            let response = self.client.chat().create(request).await?;

            let tokens = response
                .usage
                .map(|usage| TokenUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                })
                .unwrap_or_default();

            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LLMError::InvalidResponse("response has no choices".into()))?;

            let tool_calls = choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| -> LLMResult<CallInfo> {
                    Ok(CallInfo {
                        id: Some(call.id),
                        args: call_arguments(&call.function.arguments)?,
                        name: call.function.name,
                    })
                })
                .collect::<LLMResult<Vec<_>>>()?;

            Ok(GenerateResult {
                tokens,
                generation: choice.message.content.unwrap_or_default(),
                tool_calls,
            })
        }
        .boxed()
    }

    fn native_tools(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{ArgSchema, ParamKind, Presence};
    use serde_json::json;

    #[test]
    fn request_carries_fixed_model_temperature_and_tools() {
        let llm = OpenAI::with_api_key("sk-test");
        let tools = vec![ToolSchema {
            name: "getUser".into(),
            description: "Fetch a user".into(),
            args: vec![ArgSchema {
                name: "id".into(),
                kind: ParamKind::Number,
                presence: Presence::Required,
                description: "user id".into(),
            }],
        }];
        let messages = vec![
            Message::system("be brief"),
            Message::user("who is 7?"),
            Message::assistant_with_calls(
                "",
                vec![CallInfo { id: Some("c1".into()), name: "getUser".into(), args: json!({ "id": 7 }) }],
            ),
            Message::tool_res("getUser", Some("c1".into()), r#"{"name":"Ana"}"#),
        ];

        let request = llm.build_request(&messages, &tools).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 4);
        assert_eq!(body["messages"][3]["tool_call_id"], "c1");
        assert_eq!(body["tools"][0]["function"]["name"], "getUser");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"], json!(["id"]));
    }

    #[test]
    fn no_tools_means_no_tools_field() {
        let llm = OpenAI::with_api_key("sk-test");
        let request = llm.build_request(&[Message::user("hi")], &[]).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn empty_arguments_are_an_empty_object() {
        assert_eq!(call_arguments("").unwrap(), json!({}));
        assert_eq!(call_arguments(r#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
    }
}
