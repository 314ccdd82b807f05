use std::sync::Arc;

use crate::error::Result;
use crate::models::{ChatTurn, CompletionRequest};
use crate::relay::RelayClient;

/// Running conversation relayed turn by turn.
pub struct ChatSession {
    relay: Arc<dyn RelayClient>,
    system_prompt: Option<String>,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(relay: Arc<dyn RelayClient>) -> Self {
        Self {
            relay,
            system_prompt: None,
            history: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> &ChatTurn {
        self.history.push(ChatTurn::user(content));
        &self.history[self.history.len() - 1]
    }

    /// Add a user turn, relay the whole history and append the reply.
    /// On failure the user turn stays so the caller can resend.
    pub async fn send(&mut self, content: impl Into<String>) -> Result<String> {
        self.add_user_message(content);
        self.resend().await
    }

    /// Relay the current history as is.
    pub async fn resend(&mut self) -> Result<String> {
        let mut request = CompletionRequest::new(self.history.clone());
        request.system_prompt = self.system_prompt.clone();

        let result = self.relay.complete(&request).await?;
        self.history.push(ChatTurn::assistant(result.content.clone()));
        Ok(result.content)
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
