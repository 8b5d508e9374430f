//! Continuation Oracle
//!
//! When an assistant turn requests no tools, something has to decide whether
//! the agent announced more work (keep speaking) or is done (yield). The
//! decision is a pluggable trait so model-backed and rule-based
//! implementations are interchangeable and independently testable.
//!
//! Oracles only ever see the last assistant turn, never the transcript.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::extract::extract_typed;
use crate::llm::SharedProvider;
use crate::types::ChatMessage;

/// Decides whether the agent should keep speaking without new user input
#[async_trait]
pub trait ContinuationOracle: Send + Sync {
    /// `true` to push a synthetic continue turn, `false` to yield.
    /// Must not fail: an undecidable turn yields. `cancel` is the running
    /// agent's abort signal; model-backed oracles pass it to their own
    /// provider call.
    async fn should_continue(&self, last_turn: &str, cancel: &CancellationToken) -> bool;
}

pub type SharedOracle = Arc<dyn ContinuationOracle>;

// =============================================================================
// Model-Backed Oracle
// =============================================================================

const ORACLE_PROMPT: &str = "\
You are judging one assistant message from an autonomous coding agent.\n\
Decide whether the agent intends to keep working without user input.\n\
Answer CONTINUE if the message announces a next action, asks itself a \
question it plans to answer, or describes remaining planned work.\n\
Answer YIELD if the message is a final answer, asks the user a direct \
question, or has nothing further planned.\n\
Respond with JSON only: {\"continue\": true} or {\"continue\": false}.";

#[derive(Debug, Deserialize)]
struct OracleVerdict {
    #[serde(rename = "continue")]
    keep_going: bool,
}

/// Classifies the last turn with an isolated, tool-free model call
pub struct ModelOracle {
    provider: SharedProvider,
}

impl ModelOracle {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ContinuationOracle for ModelOracle {
    async fn should_continue(&self, last_turn: &str, cancel: &CancellationToken) -> bool {
        let messages = vec![
            ChatMessage::system(ORACLE_PROMPT),
            ChatMessage::user(last_turn),
        ];

        match self.provider.chat(&messages, &[], cancel).await {
            Ok(reply) => match extract_typed::<OracleVerdict>(&reply.content) {
                Ok(verdict) => {
                    debug!("Continuation oracle verdict: continue={}", verdict.keep_going);
                    verdict.keep_going
                }
                Err(e) => {
                    warn!("Continuation oracle reply unparseable, yielding: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Continuation oracle call failed, yielding: {}", e);
                false
            }
        }
    }
}

// =============================================================================
// Rule-Based Oracle
// =============================================================================

/// Cheap keyword heuristic; useful for tests and offline runs
#[derive(Debug, Default)]
pub struct HeuristicOracle;

impl HeuristicOracle {
    const CONTINUE_MARKERS: &'static [&'static str] = &[
        "next, i will",
        "next i will",
        "i'll now",
        "i will now",
        "let me now",
        "proceeding to",
        "moving on to",
        "remaining steps",
    ];
}

#[async_trait]
impl ContinuationOracle for HeuristicOracle {
    async fn should_continue(&self, last_turn: &str, _cancel: &CancellationToken) -> bool {
        let lower = last_turn.to_lowercase();

        // A direct question to the user always yields
        if lower.trim_end().ends_with('?') {
            return false;
        }

        Self::CONTINUE_MARKERS
            .iter()
            .any(|marker| lower.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatProvider, ToolSchema};
    use crate::types::{LensError, Result};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_heuristic_yields_on_question() {
        let oracle = HeuristicOracle;
        let cancel = CancellationToken::new();
        assert!(!oracle.should_continue("Should I also update the docs?", &cancel).await);
    }

    #[tokio::test]
    async fn test_heuristic_continues_on_announced_action() {
        let oracle = HeuristicOracle;
        let cancel = CancellationToken::new();
        assert!(
            oracle
                .should_continue("The parser is done. Next, I will wire up the CLI.", &cancel)
                .await
        );
    }

    #[tokio::test]
    async fn test_heuristic_yields_on_plain_answer() {
        let oracle = HeuristicOracle;
        let cancel = CancellationToken::new();
        assert!(!oracle.should_continue("The entry point is src/main.rs.", &cancel).await);
    }

    #[test]
    fn test_verdict_parsing() {
        let verdict: OracleVerdict = extract_typed(r#"{"continue": true}"#).unwrap();
        assert!(verdict.keep_going);
    }

    /// Observes whether the caller's abort signal reached the chat call
    struct CancelAwareProvider {
        saw_cancelled: AtomicBool,
    }

    #[async_trait]
    impl ChatProvider for CancelAwareProvider {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSchema],
            cancel: &CancellationToken,
        ) -> Result<ChatMessage> {
            if cancel.is_cancelled() {
                self.saw_cancelled.store(true, Ordering::SeqCst);
                return Err(LensError::Cancelled("oracle call aborted".to_string()));
            }
            Ok(ChatMessage::assistant(r#"{"continue": true}"#))
        }

        fn name(&self) -> &str {
            "cancel-aware"
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_model_oracle_threads_abort_signal() {
        let provider = Arc::new(CancelAwareProvider {
            saw_cancelled: AtomicBool::new(false),
        });
        let oracle = ModelOracle::new(provider.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        // The aborted call is undecidable, so the oracle yields
        assert!(!oracle.should_continue("Next, I will continue.", &cancel).await);
        assert!(provider.saw_cancelled.load(Ordering::SeqCst));
    }
}
