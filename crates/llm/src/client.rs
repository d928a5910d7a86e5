//! `HttpLlmClient` — the one concrete [`LlmClient`] the core ships with
//! (spec.md §6 "EXTERNAL INTERFACES" [EXPANDED]).

use std::time::Duration;

use aiq_core::{CancelToken, ChatReply, LlmClient, Message, ToolDefinition};
use async_trait::async_trait;
use thiserror::Error;

use crate::wire::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};

/// Backoff schedule between retry attempts, per spec.md §6: "3 attempts,
/// 500 ms → 2 s → 8 s".
const RETRY_BACKOFF: &[Duration] =
    &[Duration::from_millis(500), Duration::from_secs(2), Duration::from_secs(8)];

const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call cancelled")]
    Cancelled,
    #[error("llm request failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },
    #[error("llm returned no choices")]
    EmptyResponse,
}

pub struct HttpLlmClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    /// Sampling temperature for the main conversational call. Compression
    /// calls in `aiq-prompt` build their own request at temperature 0 and
    /// do not go through this client.
    temperature: f32,
}

impl HttpLlmClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(&self, messages: &[Message], tool_definitions: &[ToolDefinition]) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: tool_definitions.iter().map(ToolDefinition::to_openai_schema).collect(),
            temperature: self.temperature,
        }
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, reqwest::Error> {
        let mut builder = self.client.post(&self.url).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder.send().await?.error_for_status()?;
        response.json::<ChatCompletionResponse>().await
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(
        &self,
        messages: &[Message],
        tool_definitions: &[ToolDefinition],
        cancel: &CancelToken,
    ) -> anyhow::Result<ChatReply> {
        let request = self.build_request(messages, tool_definitions);

        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled.into());
            }
            match self.send_once(&request).await {
                Ok(response) => {
                    let choice = response.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
                    let finish_reason = choice.finish_reason.unwrap_or_else(|| "stop".to_string());
                    let tool_calls = choice
                        .message
                        .tool_calls
                        .into_iter()
                        .map(|wire| wire.into_core())
                        .collect::<Vec<_>>();
                    tracing::debug!(attempt, finish_reason = %finish_reason, tool_call_count = tool_calls.len(), "llm call succeeded");
                    return Ok(ChatReply { content: choice.message.content, tool_calls, finish_reason });
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "llm call failed");
                    last_err = Some(err);
                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::select! {
                            _ = tokio::time::sleep(RETRY_BACKOFF[attempt]) => {}
                            _ = wait_for_cancel(cancel) => return Err(LlmError::Cancelled.into()),
                        }
                    }
                }
            }
        }

        Err(LlmError::Exhausted { attempts: MAX_ATTEMPTS, source: last_err.expect("loop ran at least once") }.into())
    }
}

/// Poll the cancellation token while a retry backoff sleep is in flight.
async fn wait_for_cancel(cancel: &CancelToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiq_core::ToolParam;

    #[test]
    fn build_request_carries_model_and_tools() {
        let client = HttpLlmClient::new("http://localhost/v1/chat/completions", "", "llama3.1:8b");
        let messages = vec![Message::user("hi")];
        let tools = vec![ToolDefinition {
            name: "execute_sql".into(),
            description: "run sql".into(),
            params: vec![ToolParam::required("sql", "statement")],
            risk_level: None,
        }];
        let request = client.build_request(&messages, &tools);
        assert_eq!(request.model, "llama3.1:8b");
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.messages.len(), 1);
    }
}
