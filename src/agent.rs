use std::collections::HashMap;
use std::sync::Arc;
use crate::checkpoint::Checkpointer;
use crate::llm::traits::LLM;
use crate::message::Message;
use crate::tools::{
    traits::Tool,
    schema::ToolSchema,
};
use serde_json::json;


pub mod types;
pub mod error;
pub mod traits;

use traits::AgentRunner;
use types::{Agent,AgentResult,AgentExecuteResult};
use error::AgentError;


impl Agent {
    /// Create a new Agent with the provided name and LLM. Tools start empty.
    pub fn new(name: impl Into<String>, llm: Arc<dyn LLM>,max_iterations:Option<usize>) -> Self {
        Self {
            name: name.into(),
            llm,
            tools: HashMap::new(),
            system_prompt: None,
            checkpointer: None,
            max_iterations: max_iterations.unwrap_or(100) ,
        }
    }

    /// Register a tool under the given name. Replaces any existing tool with the same name. Returns &mut Self for chaining.
    pub fn register_tool(&mut self, name: Option<&str>, tool: Arc<dyn Tool>) -> &mut Self {
        // If no name is provided, use the tool's own name.
        let name = name.unwrap_or_else(|| tool.name()).to_string();
        self.tools.insert(name, tool);
        self
    }

    /// Set or replace the agent's system prompt.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    /// Persist conversations in `checkpointer`.
    pub fn set_checkpointer(&mut self, checkpointer: Arc<dyn Checkpointer>) {
        self.checkpointer = Some(checkpointer);
    }

    // generate system prompt
    pub fn generate_system_prompt(&self) -> Vec<Message> {
        let mut msgs = Vec::new();
        if let Some(prompt) = self.system_prompt.as_ref() {
            msgs.push(Message::system(prompt.clone()));
        }
        if !self.tools.is_empty() && !self.llm.native_tools() {
        msgs.push(Message::developer(
            format!("I also provide some tools for you to choose from. If you want to call a tool, please include the following JSON format in your response: {}

            IMPORTANT: After you have completed the task by calling all necessary tools, you MUST return a final response WITHOUT any tool_calls. Simply provide a summary or confirmation message to indicate completion. Do NOT continue calling tools after the task is done.",
                json!({
                    "tool_calls": [
                        {
                            "name": "tool_name",
                            "args": {
                                "param1": "value1",
                                "param2": "value2"
                            }
                        }
                    ]
                }))
            ));
        }
        msgs
    }

    /// Schemas of the registered tools, ordered by registered name.
    pub fn tool_schemas(&self) -> Vec<ToolSchema> {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| ToolSchema {
                name: name.clone(),
                ..self.tools[name].schema()
            })
            .collect()
    }

    // 生成工具提示
    pub fn generate_tools_prompt(&self) -> Vec<Message> {
        if self.llm.native_tools() {
            return Vec::new();
        }
        self.tool_schemas()
            .iter()
            .filter_map(|schema| serde_json::to_string(schema).ok())
            .map(Message::system)
            .collect()
    }

    fn prompt_messages(&self) -> Vec<Message> {
        let mut msgs = self.generate_system_prompt();
        msgs.extend(self.generate_tools_prompt());
        msgs
    }

    /// Main loop: call LLM, check for tool calls, execute tools, repeat.
    ///
    /// Returns the result together with every message of the run.
    async fn run(&self, mut msgs: Vec<Message>) -> Result<(AgentResult, Vec<Message>), AgentError> {
        let schemas = self.tool_schemas();
        let native = self.llm.native_tools();
        let mut result = AgentResult::default();
        let mut counter: usize = 0;

        while counter < self.max_iterations {
            let res = self.llm.generate(&msgs, &schemas).await?;
            result.tokens.add(&res.tokens);
            counter += 1;

            if res.tool_calls.is_empty() {
                msgs.push(Message::assistant(res.generation));
                result.generation = msgs.last().map(|m| m.content.clone()).unwrap_or_default();
                tracing::debug!(agent = %self.name, iterations = counter, "agent produced final answer");
                return Ok((result, msgs));
            }

            let calls = res.tool_calls;
            msgs.push(Message::assistant_with_calls(res.generation, calls.clone()));
            for call_info in calls {
                let name = &call_info.name;
                let tool_impl = self
                    .tools
                    .get(name)
                    .ok_or_else(|| AgentError::ToolNotFound(name.clone()))?;
                tracing::info!(agent = %self.name, tool = %name, "calling tool");
                let tool_result = tool_impl.run(call_info.args.clone()).await.inspect_err(|e| {
                    tracing::error!(agent = %self.name, tool = %name, error = %e, "tool call failed");
                })?;
                let content = if native {
                    tool_result
                } else {
                    format!("Tool {} returned: {}", name, tool_result)
                };
                msgs.push(Message::tool_res(name, call_info.id.clone(), content));
            }
        }
        Err(AgentError::MaxIterationsExceeded(self.max_iterations))
    }
}



#[async_trait::async_trait]
impl AgentRunner for Agent {
    async fn call_llm(&self, prompt: &str) -> AgentExecuteResult {
        let mut msgs = self.prompt_messages();
        msgs.push(Message::user(prompt.to_string()));
        let (result, _) = self.run(msgs).await?;
        Ok(result)
    }

    async fn invoke(&self, thread_id: &str, prompt: &str) -> AgentExecuteResult {
        let history = match self.checkpointer.as_ref() {
            Some(store) => store.load(thread_id).await?,
            None => Vec::new(),
        };
        tracing::debug!(agent = %self.name, thread_id, history = history.len(), "resuming thread");

        let mut msgs = self.prompt_messages();
        msgs.extend(history);
        msgs.push(Message::user(prompt.to_string()));

        let (result, msgs) = self.run(msgs).await?;

        if let Some(store) = self.checkpointer.as_ref() {
            let transcript: Vec<Message> = msgs.into_iter().filter(Message::is_transcript).collect();
            store.save(thread_id, &transcript).await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointer;
    use crate::llm::testing::ScriptedLLM;
    use crate::llm::{CallInfo, GenerateResult};
    use crate::message::MessageRole;
    use crate::tools::error::ToolError;
    use crate::tools::schema::ArgSchema;

    struct Echo;

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input back"
        }
        fn args(&self) -> Vec<ArgSchema> {
            Vec::new()
        }
        async fn run(&self, input: serde_json::Value) -> Result<String, ToolError> {
            Ok(input.to_string())
        }
    }

    fn call(name: &str) -> GenerateResult {
        GenerateResult {
            tool_calls: vec![CallInfo {
                id: Some("call-1".into()),
                name: name.into(),
                args: json!({ "x": 1 }),
            }],
            ..Default::default()
        }
    }

    fn answer(text: &str) -> GenerateResult {
        GenerateResult {
            generation: text.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn runs_tool_then_answers() {
        let llm = Arc::new(ScriptedLLM::native(vec![call("echo"), answer("done")]));
        let mut agent = Agent::new("test", llm.clone(), Some(5));
        agent.register_tool(None, Arc::new(Echo));

        let res = agent.call_llm("go").await.unwrap();
        assert_eq!(res.generation, "done");

        let seen = llm.requests();
        assert_eq!(seen.len(), 2);
        let tool_msg = seen[1].last().unwrap();
        assert_eq!(tool_msg.role, MessageRole::Tool);
        assert_eq!(tool_msg.content, r#"{"x":1}"#);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));
    }

    #[tokio::test]
    async fn prompt_based_providers_get_tool_descriptions() {
        let llm = Arc::new(ScriptedLLM::prompt_based(vec![answer("hi")]));
        let mut agent = Agent::new("test", llm.clone(), None);
        agent.set_system_prompt("be nice");
        agent.register_tool(None, Arc::new(Echo));

        agent.call_llm("hello").await.unwrap();
        let first = &llm.requests()[0];
        assert_eq!(first[0].content, "be nice");
        assert_eq!(first[1].role, MessageRole::Developer);
        assert!(first[2].content.contains("\"echo\""));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let llm = Arc::new(ScriptedLLM::native(vec![call("missing")]));
        let agent = Agent::new("test", llm, Some(3));
        let err = agent.call_llm("go").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(ref n) if n == "missing"));
    }

    #[tokio::test]
    async fn iteration_cap_is_enforced() {
        let llm = Arc::new(ScriptedLLM::native(vec![call("echo"), call("echo"), call("echo")]));
        let mut agent = Agent::new("test", llm, Some(2));
        agent.register_tool(None, Arc::new(Echo));
        let err = agent.call_llm("loop").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterationsExceeded(2)));
    }

    #[tokio::test]
    async fn invoke_persists_and_resumes_threads() {
        let llm = Arc::new(ScriptedLLM::native(vec![answer("first"), answer("second")]));
        let store = Arc::new(MemoryCheckpointer::new());
        let mut agent = Agent::new("test", llm.clone(), None);
        agent.set_system_prompt("sys");
        agent.set_checkpointer(store.clone());

        agent.invoke("thread-a", "one").await.unwrap();
        let res = agent.invoke("thread-a", "two").await.unwrap();
        assert_eq!(res.generation, "second");

        let transcript = store.load("thread-a").await.unwrap();
        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "first", "two", "second"]);

        // The second request saw the first exchange after the system prompt.
        let second = &llm.requests()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn failed_run_saves_nothing() {
        let llm = Arc::new(ScriptedLLM::native(vec![call("missing")]));
        let store = Arc::new(MemoryCheckpointer::new());
        let mut agent = Agent::new("test", llm, None);
        agent.set_checkpointer(store.clone());

        assert!(agent.invoke("t", "go").await.is_err());
        assert!(store.load("t").await.unwrap().is_empty());
    }
}
