//! Tool-calling agent loop

use std::sync::Arc;

use calmate_domain::constants::DEFAULT_MAX_TOOL_ROUNDS;
use calmate_domain::{AccessToken, CalmateError, ChatRole, ChatTurn, Result};
use tracing::{debug, info, warn};

use super::ports::{AgentMessage, LanguageModel, ModelReply};
use super::tools::CalendarToolbox;
use crate::clock::Clock;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that manages the user's Outlook calendar. \
Use the available tools to create, find, update and delete events and to manage attendees and \
locations. Times are ISO-8601 without offset and interpreted in UTC unless the user says \
otherwise. Before updating or deleting an event you have not seen yet, look it up with \
find_event or get_events to obtain its ID. Confirm what you did in one or two sentences.";

/// Conversational calendar agent
pub struct CalendarAgent {
    model: Arc<dyn LanguageModel>,
    toolbox: CalendarToolbox,
    clock: Arc<dyn Clock>,
    max_tool_rounds: usize,
}

impl CalendarAgent {
    /// Agent with the default tool-round limit.
    pub fn new(model: Arc<dyn LanguageModel>, toolbox: CalendarToolbox, clock: Arc<dyn Clock>) -> Self {
        Self { model, toolbox, clock, max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS }
    }

    /// Model calls allowed to request tools before giving up.
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds.max(1);
        self
    }

    /// Answer `query` given the earlier `history`, running calendar tools
    /// with `token` as the model requests them.
    pub async fn respond(
        &self,
        token: &AccessToken,
        history: &[ChatTurn],
        query: &str,
    ) -> Result<String> {
        let tools = self.toolbox.manifest();
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(AgentMessage::System(format!(
            "{SYSTEM_PROMPT}\nThe current date and time is {} UTC.",
            self.clock.now().format("%A, %Y-%m-%d %H:%M")
        )));
        messages.extend(history.iter().map(|turn| match turn.role {
            ChatRole::User => AgentMessage::User(turn.content.clone()),
            ChatRole::Assistant => {
                AgentMessage::Assistant { content: Some(turn.content.clone()), tool_calls: Vec::new() }
            }
        }));
        messages.push(AgentMessage::User(query.to_string()));

        for round in 0..self.max_tool_rounds {
            match self.model.complete(&messages, &tools).await? {
                ModelReply::Message(text) => {
                    info!(rounds = round, "Agent produced final reply");
                    return Ok(text);
                }
                ModelReply::ToolCalls { content, calls } => {
                    debug!(round, count = calls.len(), "Model requested tools");
                    messages.push(AgentMessage::Assistant { content, tool_calls: calls.clone() });
                    for call in calls {
                        let output = match self.toolbox.invoke(token, &call).await {
                            Ok(text) => text,
                            Err(err) => {
                                warn!(tool = %call.name, error = %err, "Calendar tool failed");
                                format!("Error: {err}")
                            }
                        };
                        messages.push(AgentMessage::Tool { call_id: call.id, content: output });
                    }
                }
            }
        }

        Err(CalmateError::LanguageModel(format!(
            "no final reply after {} tool rounds",
            self.max_tool_rounds
        )))
    }
}
