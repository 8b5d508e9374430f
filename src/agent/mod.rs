//! Agent Execution Loop
//!
//! One `Agent` drives one bounded conversation/tool-call loop against an LLM
//! provider. The transcript is the agent's entire working memory: system
//! message (environment preamble + role prompt), caller-supplied history,
//! the action prompt, then alternating assistant turns and tool results.
//!
//! Termination: an assistant turn with no tool calls either ends the run
//! directly (`json_output`) or is judged by the continuation oracle; hitting
//! the iteration ceiling fails the run but still returns the full history.
//!
//! Recoverable provider errors inside the loop are logged and the loop moves
//! to the next iteration; there is no backoff, so a persistently failing
//! provider burns the iteration budget and surfaces as an exhaustion
//! failure. Auth-class failures end the run immediately.

pub mod continuation;
pub mod environment;

pub use continuation::{ContinuationOracle, HeuristicOracle, ModelOracle, SharedOracle};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::agent::{CONTINUE_PROMPT, MAX_ITERATIONS};
use crate::llm::{KeyPool, ProviderConfig, SharedProvider, ToolSchema, create_provider};
use crate::tools::ToolRegistry;
use crate::types::{AgentResult, ChatMessage, Result};

/// Per-call options for [`Agent::execute`]
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Prior transcript inserted between the system message and the action
    pub history: Vec<ChatMessage>,
    /// Prepend the environment preamble to the system message
    pub with_env: bool,
    /// Terminate on the first tool-free assistant turn; the reply is assumed
    /// to be complete structured output
    pub json_output: bool,
    /// Offer the registry's tools to the model
    pub with_tools: bool,
}

impl ExecuteOptions {
    /// Defaults for an exploring agent: environment + tools, free-text output
    pub fn exploring() -> Self {
        Self {
            history: Vec::new(),
            with_env: true,
            json_output: false,
            with_tools: true,
        }
    }

    /// Structured-output call: tools available, first tool-free reply wins
    pub fn structured() -> Self {
        Self {
            json_output: true,
            ..Self::exploring()
        }
    }

    /// Isolated text transform: no environment, no tools
    pub fn text_only() -> Self {
        Self {
            history: Vec::new(),
            with_env: false,
            json_output: false,
            with_tools: false,
        }
    }
}

/// One conversation-and-tool-call loop against one LLM provider
pub struct Agent {
    provider: SharedProvider,
    registry: Arc<dyn ToolRegistry>,
    oracle: SharedOracle,
    repo_root: PathBuf,
    cancel: CancellationToken,
}

impl Agent {
    /// Construct an agent, drawing the next API key from the pool.
    /// Key rotation happens here, once per construction.
    pub fn new(
        config: &ProviderConfig,
        pool: &KeyPool,
        registry: Arc<dyn ToolRegistry>,
        repo_root: &Path,
    ) -> Result<Self> {
        let provider = create_provider(config, pool)?;
        let oracle: SharedOracle = Arc::new(ModelOracle::new(provider.clone()));
        Ok(Self {
            provider,
            registry,
            oracle,
            repo_root: repo_root.to_path_buf(),
            cancel: CancellationToken::new(),
        })
    }

    /// Construct over an existing provider (tests, shared stubs)
    pub fn with_provider(
        provider: SharedProvider,
        registry: Arc<dyn ToolRegistry>,
        repo_root: &Path,
    ) -> Self {
        let oracle: SharedOracle = Arc::new(ModelOracle::new(provider.clone()));
        Self {
            provider,
            registry,
            oracle,
            repo_root: repo_root.to_path_buf(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the continuation oracle
    pub fn with_oracle(mut self, oracle: SharedOracle) -> Self {
        self.oracle = oracle;
        self
    }

    /// Thread an external abort signal into provider and tool calls.
    /// Cancelling stops in-flight calls; the loop itself still runs until
    /// it yields or exhausts its iteration budget.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the loop. Never returns `Err`: failures are encoded in the
    /// `AgentResult` so callers always get the transcript for diagnosis.
    pub async fn execute(
        &self,
        action_prompt: &str,
        role_prompt: &str,
        opts: ExecuteOptions,
    ) -> AgentResult {
        let system = if opts.with_env {
            format!(
                "{}\n{}",
                environment::build_preamble(&self.repo_root),
                role_prompt
            )
        } else {
            role_prompt.to_string()
        };

        let mut history = Vec::with_capacity(opts.history.len() + 2);
        history.push(ChatMessage::system(system));
        history.extend(opts.history);
        history.push(ChatMessage::user(action_prompt));

        let tools: Vec<ToolSchema> = if opts.with_tools {
            self.registry.list_tools()
        } else {
            Vec::new()
        };

        debug!(
            "Agent run starting: {} tools, json_output={}",
            tools.len(),
            opts.json_output
        );

        for iteration in 1..=MAX_ITERATIONS {
            let reply = match self.provider.chat(&history, &tools, &self.cancel).await {
                Ok(reply) => reply,
                Err(e) if e.is_absorbable() => {
                    // The next iteration retries with the unchanged
                    // transcript. No backoff; a persistently failing
                    // provider burns the iteration budget.
                    warn!("Provider error on iteration {}: {}", iteration, e);
                    continue;
                }
                Err(e) => {
                    // Auth failures, malformed requests, cancellation:
                    // retrying cannot help
                    warn!("Unrecoverable provider error on iteration {}: {}", iteration, e);
                    return AgentResult::failed(e.to_string(), iteration, history);
                }
            };

            history.push(reply.clone());

            if reply.requests_tools() {
                for call in &reply.tool_calls {
                    let content = self.run_tool(&call.name, call.arguments.clone()).await;
                    history.push(ChatMessage::tool(call.id.clone(), content));
                }
                continue;
            }

            if opts.json_output {
                info!("Agent run complete after {} iterations (structured)", iteration);
                return AgentResult::succeeded(reply.content, iteration, history);
            }

            if self.oracle.should_continue(&reply.content, &self.cancel).await {
                debug!("Oracle voted continue on iteration {}", iteration);
                history.push(ChatMessage::user(CONTINUE_PROMPT));
                continue;
            }

            info!("Agent run complete after {} iterations", iteration);
            return AgentResult::succeeded(reply.content, iteration, history);
        }

        warn!("Agent exhausted {} iterations without yielding", MAX_ITERATIONS);
        AgentResult::failed(
            format!(
                "agent did not yield within the {} iteration ceiling",
                MAX_ITERATIONS
            ),
            MAX_ITERATIONS,
            history,
        )
    }

    /// Execute one tool call, always producing displayable content.
    /// Unknown tool names become a textual result so the model can
    /// self-correct instead of killing the loop.
    async fn run_tool(&self, name: &str, args: serde_json::Value) -> String {
        let Some(tool) = self.registry.get_tool(name) else {
            warn!("Model requested unknown tool '{}'", name);
            return format!(
                "Error: tool '{}' not found. Available tools: {}",
                name,
                self.registry
                    .list_tools()
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        };

        debug!("Executing tool '{}'", name);
        let output = tool.execute(args, &self.cancel).await;
        if !output.success {
            warn!("Tool '{}' reported failure", name);
        }
        output.content
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider and stub tools shared by agent and pipeline tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;

    use crate::llm::{ChatProvider, ToolSchema};
    use crate::tools::{Tool, ToolOutput};
    use crate::types::{ChatMessage, Result};

    /// Replays a fixed script of assistant replies; repeats the final reply
    /// once the script is exhausted.
    pub struct ScriptedProvider {
        script: Mutex<VecDeque<ChatMessage>>,
        fallback: ChatMessage,
        pub calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn new(script: Vec<ChatMessage>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: ChatMessage::assistant("(script exhausted)"),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn repeating(reply: ChatMessage) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: reply,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSchema],
            _cancel: &CancellationToken,
        ) -> Result<ChatMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| self.fallback.clone()))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    /// Tool that records invocations and echoes a fixed payload
    pub struct StubTool {
        pub tool_name: &'static str,
        pub payload: &'static str,
        pub invocations: AtomicUsize,
    }

    impl StubTool {
        pub fn new(tool_name: &'static str, payload: &'static str) -> Self {
            Self {
                tool_name,
                payload,
                invocations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.tool_name
        }

        fn description(&self) -> &str {
            "stub tool for tests"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: Value, _cancel: &CancellationToken) -> ToolOutput {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            ToolOutput::ok(self.payload)
        }
    }

    /// Oracle with a fixed verdict
    pub struct FixedOracle(pub bool);

    #[async_trait]
    impl super::ContinuationOracle for FixedOracle {
        async fn should_continue(&self, _last_turn: &str, _cancel: &CancellationToken) -> bool {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FixedOracle, ScriptedProvider, StubTool};
    use super::*;
    use crate::tools::StaticRegistry;
    use crate::types::{Role, ToolCall, transcript_is_correlated};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn agent_with(
        provider: ScriptedProvider,
        registry: StaticRegistry,
        oracle_continue: bool,
    ) -> Agent {
        Agent::with_provider(
            Arc::new(provider),
            Arc::new(registry),
            Path::new("/tmp/does-not-matter"),
        )
        .with_oracle(Arc::new(FixedOracle(oracle_continue)))
    }

    #[tokio::test]
    async fn test_yield_on_first_reply() {
        let provider = ScriptedProvider::new(vec![ChatMessage::assistant("done")]);
        let agent = agent_with(provider, StaticRegistry::new(), false);

        let result = agent
            .execute("analyze", "you are an analyst", ExecuteOptions::text_only())
            .await;

        assert!(result.success);
        assert_eq!(result.content, "done");
        assert_eq!(result.iterations, 1);
        // system + user + assistant
        assert_eq!(result.history.len(), 3);
    }

    #[tokio::test]
    async fn test_json_output_terminates_immediately() {
        let provider = ScriptedProvider::new(vec![ChatMessage::assistant(r#"{"ok": true}"#)]);
        // Oracle says continue, but json_output must win
        let agent = agent_with(provider, StaticRegistry::new(), true);

        let mut opts = ExecuteOptions::text_only();
        opts.json_output = true;
        let result = agent.execute("emit json", "role", opts).await;

        assert!(result.success);
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn test_iteration_ceiling_exhaustion() {
        // Provider never yields: every reply is judged "continue"
        let provider = ScriptedProvider::repeating(ChatMessage::assistant("more to do"));
        let agent = agent_with(provider, StaticRegistry::new(), true);

        let result = agent
            .execute("never ends", "role", ExecuteOptions::text_only())
            .await;

        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(result.error.as_ref().unwrap().contains("iteration ceiling"));
        assert_eq!(result.iterations, MAX_ITERATIONS);
        // Each iteration appends assistant + synthetic user, after the
        // initial system + user seed.
        assert_eq!(result.history.len(), 2 + 2 * MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let tool = Arc::new(StubTool::new("read_file", "fn main() {}"));
        let registry = StaticRegistry::new().with_tool(tool.clone());

        let provider = ScriptedProvider::new(vec![
            ChatMessage::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "read_file".into(),
                    arguments: json!({"path": "src/main.rs"}),
                }],
            ),
            ChatMessage::assistant("the entry point is main()"),
        ]);

        let agent = agent_with(provider, registry, false);
        let result = agent
            .execute("find the entry point", "role", ExecuteOptions::exploring())
            .await;

        assert!(result.success);
        assert_eq!(tool.invocations.load(Ordering::SeqCst), 1);
        assert!(transcript_is_correlated(&result.history));

        let tool_msg = result
            .history
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_msg.content, "fn main() {}");
    }

    #[tokio::test]
    async fn test_unknown_tool_keeps_loop_alive() {
        let provider = ScriptedProvider::new(vec![
            ChatMessage::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "summon_demon".into(),
                    arguments: json!({}),
                }],
            ),
            ChatMessage::assistant("recovered"),
        ]);

        let agent = agent_with(provider, StaticRegistry::new(), false);
        let result = agent
            .execute("go", "role", ExecuteOptions::exploring())
            .await;

        assert!(result.success);
        assert_eq!(result.content, "recovered");

        let tool_msg = result
            .history
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_msg.content.contains("not found"));
        assert!(transcript_is_correlated(&result.history));
    }

    #[tokio::test]
    async fn test_unrecoverable_provider_error_fails_fast() {
        use crate::llm::{ChatProvider, ToolSchema};
        use crate::types::{ErrorCategory, ProviderError, Result as LensResult};
        use async_trait::async_trait;
        use tokio_util::sync::CancellationToken;

        struct AuthFailProvider;

        #[async_trait]
        impl ChatProvider for AuthFailProvider {
            async fn chat(
                &self,
                _messages: &[ChatMessage],
                _tools: &[ToolSchema],
                _cancel: &CancellationToken,
            ) -> LensResult<ChatMessage> {
                Err(ProviderError::new(ErrorCategory::Auth, "invalid api key").into())
            }

            fn name(&self) -> &str {
                "authfail"
            }

            fn model(&self) -> &str {
                "stub"
            }
        }

        let agent = Agent::with_provider(
            Arc::new(AuthFailProvider),
            Arc::new(StaticRegistry::new()),
            Path::new("/tmp"),
        )
        .with_oracle(Arc::new(FixedOracle(false)));

        let result = agent
            .execute("go", "role", ExecuteOptions::text_only())
            .await;

        assert!(!result.success);
        assert_eq!(result.iterations, 1);
        assert!(result.error.unwrap().contains("AUTH"));
    }

    #[tokio::test]
    async fn test_continue_pushes_synthetic_user_turn() {
        let provider = ScriptedProvider::new(vec![
            ChatMessage::assistant("Next, I will check the tests."),
            ChatMessage::assistant("All checked."),
        ]);
        let agent = Agent::with_provider(
            Arc::new(provider),
            Arc::new(StaticRegistry::new()),
            Path::new("/tmp"),
        )
        .with_oracle(Arc::new(HeuristicOracle));

        let result = agent
            .execute("inspect", "role", ExecuteOptions::text_only())
            .await;

        assert!(result.success);
        assert_eq!(result.iterations, 2);
        let synthetic = result
            .history
            .iter()
            .filter(|m| m.role == Role::User && m.content == CONTINUE_PROMPT)
            .count();
        assert_eq!(synthetic, 1);
    }
}
