//! Scripted language model

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use calmate_domain::{CalmateError, Result};

use crate::agent::ports::{AgentMessage, LanguageModel, ModelReply, ToolSpec};

#[derive(Default)]
struct ModelState {
    replies: VecDeque<Result<ModelReply>>,
    requests: Vec<Vec<AgentMessage>>,
}

/// Returns queued replies in order and records every conversation it is
/// sent. Running out of replies is a `LanguageModel` error.
#[derive(Default)]
pub struct ScriptedLanguageModel {
    state: Mutex<ModelState>,
}

impl ScriptedLanguageModel {
    /// Model with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ModelState> {
        // Test utility: panic on poisoned mutex to fail tests early
        self.state.lock().expect("mutex poisoned")
    }

    /// Queue the next reply.
    pub fn push_reply(&self, reply: ModelReply) {
        self.state().replies.push_back(Ok(reply));
    }

    /// Queue a failing completion.
    pub fn push_error(&self, error: CalmateError) {
        self.state().replies.push_back(Err(error));
    }

    /// Messages sent on each completion call.
    pub fn requests(&self) -> Vec<Vec<AgentMessage>> {
        self.state().requests.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn complete(&self, messages: &[AgentMessage], _tools: &[ToolSpec]) -> Result<ModelReply> {
        let mut state = self.state();
        state.requests.push(messages.to_vec());
        state
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(CalmateError::LanguageModel("no scripted reply left".into())))
    }
}
