use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::prompt_template::load_prompt;
use crate::providers::base::Provider;
use crate::providers::configs::{default_model_name, ModelSettings};
use crate::tools::{
    self, ExplainCodeRequest, GenerateCodeRequest, EXPLAIN_CODE, GENERATE_CODE,
};

const AGENT_PROMPT: &str = include_str!("prompts/agent.md");

lazy_static! {
    static ref WRITE_INSTRUCTION: Regex =
        Regex::new(r"(?s)^\s*Write\s+(?P<language>\S.*?)\s+code\s+to:\s*(?P<task>.*)$").unwrap();
    static ref EXPLAIN_INSTRUCTION: Regex =
        Regex::new(r"(?s)^\s*Explain\s+the\s+following\s+(?P<language>\S.*?)\s+code:[ \t]*\r?\n(?P<code>.*)$")
            .unwrap();
    // bundled forms take a single language token with no space around the commas
    static ref BUNDLED_WRITE: Regex =
        Regex::new(r"(?s)^(?P<language>[A-Za-z][A-Za-z0-9_+#.\-]*),(?P<task>\S.*)$").unwrap();
    static ref BUNDLED_EXPLAIN: Regex =
        Regex::new(r"(?s)^explain,(?P<language>[A-Za-z][A-Za-z0-9_+#.\-]*),(?P<code>.*\S.*)$")
            .unwrap();
}

/// What a free-form instruction asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GenerateCode(GenerateCodeRequest),
    ExplainCode(ExplainCodeRequest),
    Unrecognized(String),
}

impl Request {
    /// Classify an instruction locally.
    ///
    /// Recognized shapes are `explain,<language>,<code>`, `<language>,<task>`,
    /// `Write <language> code to: <task>` and
    /// `Explain the following <language> code:\n<code>`. The bundled shapes need a
    /// single token language and no space after the comma, so prose such as
    /// `"Rust, what is a lifetime?"` stays unrecognized.
    pub fn parse(instruction: &str) -> AgentResult<Self> {
        if instruction.trim().is_empty() {
            return Err(AgentError::InvalidInstruction(
                "instruction is empty".to_string(),
            ));
        }

        if let Some(caps) = BUNDLED_EXPLAIN.captures(instruction) {
            return Ok(Request::ExplainCode(ExplainCodeRequest::new(
                &caps["language"],
                &caps["code"],
            )));
        }

        if let Some(caps) = WRITE_INSTRUCTION.captures(instruction) {
            let request = GenerateCodeRequest::new(&caps["language"], caps["task"].trim());
            request.validate()?;
            return Ok(Request::GenerateCode(request));
        }

        if let Some(caps) = EXPLAIN_INSTRUCTION.captures(instruction) {
            let request = ExplainCodeRequest::new(&caps["language"], &caps["code"]);
            request.validate()?;
            return Ok(Request::ExplainCode(request));
        }

        if let Some(caps) = BUNDLED_WRITE
            .captures(instruction)
            .filter(|caps| !caps["language"].eq_ignore_ascii_case("explain"))
        {
            return Ok(Request::GenerateCode(GenerateCodeRequest::new(
                &caps["language"],
                caps["task"].trim(),
            )));
        }

        Ok(Request::Unrecognized(instruction.to_string()))
    }

    /// Turn a tool call chosen by the model into a request
    pub fn from_tool_call(call: &ToolCall) -> AgentResult<Self> {
        fn arguments<T: serde::de::DeserializeOwned>(call: &ToolCall) -> AgentResult<T> {
            serde_json::from_value(call.arguments.clone()).map_err(|e| {
                AgentError::InvalidParameters(format!("arguments for {}: {}", call.name, e))
            })
        }

        match call.name.as_str() {
            GENERATE_CODE => {
                let request: GenerateCodeRequest = arguments(call)?;
                request.validate()?;
                Ok(Request::GenerateCode(request))
            }
            EXPLAIN_CODE => {
                let request: ExplainCodeRequest = arguments(call)?;
                request.validate()?;
                Ok(Request::ExplainCode(request))
            }
            other => Err(AgentError::ToolNotFound(other.to_string())),
        }
    }
}

/// One step of the agent's reasoning, kept for the verbose trace
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AgentStep {
    Thought(String),
    Action { tool: String, input: Value },
    Observation(String),
    ParseError(String),
}

impl fmt::Display for AgentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStep::Thought(thought) => write!(f, "Thought: {}", thought),
            AgentStep::Action { tool, input } => write!(f, "Action: {} {}", tool, input),
            AgentStep::Observation(observation) => write!(f, "Observation: {}", observation),
            AgentStep::ParseError(error) => write!(f, "Could not parse tool call: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutput {
    /// The final answer
    pub text: String,
    pub steps: Vec<AgentStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Overrides the default model for every call the agent makes
    pub model: Option<String>,
    /// Return the intermediate steps in `AgentOutput::steps`
    pub verbose: bool,
    /// How many malformed tool calls are answered with a retry before giving up
    pub max_parse_retries: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            verbose: false,
            max_parse_retries: 1,
        }
    }
}

impl AgentConfig {
    pub fn model_name(&self) -> String {
        self.model.clone().unwrap_or_else(default_model_name)
    }
}

struct Trace {
    verbose: bool,
    steps: Vec<AgentStep>,
}

impl Trace {
    fn new(verbose: bool) -> Self {
        Self {
            verbose,
            steps: Vec::new(),
        }
    }

    fn record(&mut self, step: AgentStep) {
        tracing::debug!("{}", step);
        if self.verbose {
            self.steps.push(step);
        }
    }
}

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
}

/// Agent decides, per instruction, which tool to run or whether to answer directly
pub struct Agent {
    provider: Box<dyn Provider>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Handle one free-form instruction and produce the final answer
    pub async fn reply(&self, instruction: &str) -> Result<AgentOutput> {
        self.run(Request::parse(instruction)?).await
    }

    /// Handle a request whose tool is already known, or hand an unrecognized one
    /// to the model
    pub async fn run(&self, request: Request) -> Result<AgentOutput> {
        let mut trace = Trace::new(self.config.verbose);

        let text = match request {
            Request::Unrecognized(text) => {
                trace.record(AgentStep::Thought(
                    "no local match, asking the model to choose".to_string(),
                ));
                self.choose_and_run(&text, &mut trace).await?
            }
            request => {
                trace.record(AgentStep::Thought(
                    "the instruction names a tool and its arguments".to_string(),
                ));
                self.act(&request, &mut trace).await?
            }
        };

        Ok(AgentOutput {
            text,
            steps: trace.steps,
        })
    }

    async fn act(&self, request: &Request, trace: &mut Trace) -> Result<String> {
        let model = self.config.model_name();
        let provider = self.provider.as_ref();
        let output = match request {
            Request::GenerateCode(request) => {
                trace.record(AgentStep::Action {
                    tool: GENERATE_CODE.to_string(),
                    input: json!(request),
                });
                tools::generate_code(provider, request, &model).await?
            }
            Request::ExplainCode(request) => {
                trace.record(AgentStep::Action {
                    tool: EXPLAIN_CODE.to_string(),
                    input: json!(request),
                });
                tools::explain_code(provider, request, &model).await?
            }
            Request::Unrecognized(text) => {
                return Err(AgentError::ToolNotFound(format!("no tool handles {:?}", text)).into())
            }
        };
        trace.record(AgentStep::Observation(output.clone()));
        Ok(output)
    }

    fn system_prompt(&self) -> AgentResult<String> {
        let tools: Vec<ToolInfo> = tools::tools()
            .into_iter()
            .map(|tool| ToolInfo {
                name: tool.name,
                description: tool.description,
            })
            .collect();
        let mut context = HashMap::new();
        context.insert("tools", tools);
        load_prompt(AGENT_PROMPT, &context).map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Let the model pick a tool or answer directly, retrying malformed tool calls
    async fn choose_and_run(&self, instruction: &str, trace: &mut Trace) -> Result<String> {
        let settings = ModelSettings::new(self.config.model_name()).with_temperature(0.0);
        let system = self.system_prompt()?;
        let tools = tools::tools();
        let mut messages = vec![Message::user().with_text(instruction)];
        let mut failures = 0;

        loop {
            let completion = self
                .provider
                .complete(&settings, &system, &messages, &tools)
                .await?;

            let chosen = match completion.message.tool_requests().first() {
                None => {
                    trace.record(AgentStep::Thought("answering directly".to_string()));
                    return Ok(completion.text());
                }
                Some(tool_request) => match &tool_request.tool_call {
                    Ok(call) => Request::from_tool_call(call),
                    Err(e) => Err(e.clone()),
                },
            };

            match chosen {
                Ok(request) => return self.act(&request, trace).await,
                Err(error) => {
                    failures += 1;
                    trace.record(AgentStep::ParseError(error.to_string()));
                    if failures > self.config.max_parse_retries {
                        return Ok(format!(
                            "Agent stopped: could not parse the tool invocation after {} attempt(s). Last error: {}",
                            failures, error
                        ));
                    }
                    messages.push(Message::user().with_text(format!(
                        "Your tool call could not be used: {}. Call {} or {} with valid arguments, or answer directly.",
                        error, GENERATE_CODE, EXPLAIN_CODE
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    fn agent_with(provider: &MockProvider, config: AgentConfig) -> Agent {
        Agent::new(Box::new(provider.clone()), config)
    }

    fn config() -> AgentConfig {
        AgentConfig {
            model: Some("test-model".to_string()),
            verbose: true,
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_parse_bundled_write() {
        let request = Request::parse("python,reverse a string").unwrap();
        assert_eq!(
            request,
            Request::GenerateCode(GenerateCodeRequest::new("python", "reverse a string"))
        );
    }

    #[test]
    fn test_parse_bundled_explain() {
        let request = Request::parse("explain,javascript,function f(){return 1}").unwrap();
        assert_eq!(
            request,
            Request::ExplainCode(ExplainCodeRequest::new(
                "javascript",
                "function f(){return 1}"
            ))
        );
    }

    #[test]
    fn test_parse_bundled_accepts_any_language_token() {
        for (language, task) in [("fortran", "compute primes"), ("C++17", "sort a vector")] {
            assert_eq!(
                Request::parse(&format!("{},{}", language, task)).unwrap(),
                Request::GenerateCode(GenerateCodeRequest::new(language, task))
            );
        }
    }

    #[test]
    fn test_parse_bundled_explain_missing_code() {
        for text in ["explain,javascript", "explain,javascript,   "] {
            assert_eq!(
                Request::parse(text).unwrap(),
                Request::Unrecognized(text.to_string())
            );
        }
    }

    #[test]
    fn test_parse_form_templates() {
        let request = Request::parse("Write c++ code to: print the numbers 1 to 10").unwrap();
        assert_eq!(
            request,
            Request::GenerateCode(GenerateCodeRequest::new("c++", "print the numbers 1 to 10"))
        );

        let code = "def f(x):\n    return x * 2\n";
        let request =
            Request::parse(&format!("Explain the following python code:\n{}", code)).unwrap();
        assert_eq!(
            request,
            Request::ExplainCode(ExplainCodeRequest::new("python", code))
        );
    }

    #[test]
    fn test_parse_free_text_is_unrecognized() {
        for text in [
            "Hello, how are you?",
            "What is the difference between a list and a tuple?",
            "zig reverse a string",
            "Rust, what is a lifetime?",
            "Explain, in simple terms, what a closure is",
            "Explain, please",
            "Explain,please",
        ] {
            assert_eq!(
                Request::parse(text).unwrap(),
                Request::Unrecognized(text.to_string())
            );
        }
    }

    #[test]
    fn test_parse_empty_instruction() {
        assert!(matches!(
            Request::parse("   "),
            Err(AgentError::InvalidInstruction(_))
        ));
    }

    #[test]
    fn test_from_tool_call() {
        let call = ToolCall::new(
            GENERATE_CODE,
            json!({"language": "rust", "task": "parse a csv file"}),
        );
        assert_eq!(
            Request::from_tool_call(&call).unwrap(),
            Request::GenerateCode(GenerateCodeRequest::new("rust", "parse a csv file"))
        );

        let call = ToolCall::new(EXPLAIN_CODE, json!({"language": "rust"}));
        assert!(matches!(
            Request::from_tool_call(&call),
            Err(AgentError::InvalidParameters(_))
        ));

        let call = ToolCall::new("run_shell", json!({}));
        assert!(matches!(
            Request::from_tool_call(&call),
            Err(AgentError::ToolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_dispatches_locally() -> Result<()> {
        let provider =
            MockProvider::new(vec![Message::assistant().with_text("print('hi')")]);
        let agent = agent_with(&provider, config());

        let output = agent.reply("python,print hi").await?;
        assert_eq!(output.text, "print('hi')");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].tools.is_empty());
        assert_eq!(calls[0].settings.model, "test-model");
        assert!(matches!(output.steps[1], AgentStep::Action { ref tool, .. } if tool == GENERATE_CODE));
        assert_eq!(
            output.steps.last(),
            Some(&AgentStep::Observation("print('hi')".to_string()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_run_invalid_request_makes_no_call() {
        let provider = MockProvider::new(vec![]);
        let agent = agent_with(&provider, config());

        let request = Request::GenerateCode(GenerateCodeRequest::new("python", "  "));
        assert!(agent.run(request).await.is_err());
        assert!(agent.reply("").await.is_err());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_typed_request_skips_tool_selection() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant()
            .with_text("program primes\nend program primes")]);
        let agent = agent_with(&provider, config());

        let output = agent
            .run(Request::GenerateCode(GenerateCodeRequest::new(
                "fortran",
                "compute the first 10 primes",
            )))
            .await?;
        assert_eq!(output.text, "program primes\nend program primes");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].tools.is_empty());
        assert!(calls[0].system.contains("fortran"));
        assert_eq!(calls[0].settings.temperature, Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_steps_only_returned_when_verbose() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant().with_text("SELECT 1;")]);
        let agent = agent_with(
            &provider,
            AgentConfig {
                verbose: false,
                ..config()
            },
        );

        let output = agent.reply("sql,select one").await?;
        assert_eq!(output.text, "SELECT 1;");
        assert!(output.steps.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reply_direct_answer() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_text("A tuple is immutable, a list is not.")
        ]);
        let agent = agent_with(&provider, config());

        let output = agent.reply("What is the difference between a list and a tuple?").await?;
        assert_eq!(output.text, "A tuple is immutable, a list is not.");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tools.len(), 2);
        assert!(calls[0].system.contains("generate_code"));
        assert!(calls[0].system.contains("explain_code"));
        Ok(())
    }

    #[tokio::test]
    async fn test_reply_model_selects_tool() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new(
                    GENERATE_CODE,
                    json!({"language": "zig", "task": "reverse a string"}),
                )),
            ),
            Message::assistant().with_text("const std = @import(\"std\");"),
        ]);
        let agent = agent_with(&provider, config());

        let output = agent.reply("zig reverse a string").await?;
        assert_eq!(output.text, "const std = @import(\"std\");");

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].system.contains("zig"));
        assert_eq!(calls[1].messages[0].text(), "reverse a string");
        assert_eq!(calls[1].settings.model, "test-model");
        Ok(())
    }

    #[tokio::test]
    async fn test_reply_retries_malformed_tool_call_once() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "call_1",
                Err(AgentError::InvalidParameters("bad json".to_string())),
            ),
            Message::assistant().with_tool_request(
                "call_2",
                Ok(ToolCall::new(
                    EXPLAIN_CODE,
                    json!({"language": "sql", "code": "SELECT 1"}),
                )),
            ),
            Message::assistant().with_text("It selects the number one."),
        ]);
        let agent = agent_with(&provider, config());

        let output = agent.reply("what does SELECT 1 do").await?;
        assert_eq!(output.text, "It selects the number one.");

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].messages.len(), 2);
        assert!(calls[1].messages[1].text().contains("bad json"));
        assert!(output
            .steps
            .iter()
            .any(|step| matches!(step, AgentStep::ParseError(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_reply_gives_up_after_retries() -> Result<()> {
        let bad_call = || {
            Message::assistant().with_tool_request(
                "call",
                Ok(ToolCall::new("delete_everything", json!({}))),
            )
        };
        let provider = MockProvider::new(vec![bad_call(), bad_call(), bad_call()]);
        let agent = agent_with(&provider, config());

        let output = agent.reply("do something").await?;
        assert!(output.text.starts_with("Agent stopped"));
        assert!(output.text.contains("delete_everything"));
        assert_eq!(provider.calls().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reply_without_retries() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant().with_tool_request(
            "call",
            Err(AgentError::ToolNotFound("bad name".to_string())),
        )]);
        let agent = agent_with(
            &provider,
            AgentConfig {
                max_parse_retries: 0,
                ..config()
            },
        );

        let output = agent.reply("do something").await?;
        assert!(output.text.starts_with("Agent stopped"));
        assert_eq!(provider.calls().len(), 1);
        Ok(())
    }
}
