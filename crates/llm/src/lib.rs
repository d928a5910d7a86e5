pub mod client;
pub mod wire;

pub use client::{HttpLlmClient, LlmError};
pub use wire::{ChatCompletionRequest, ChatCompletionResponse, WireMessage, WireRole, WireToolCall};
