use serde::Serialize;

use crate::types::Message;

/// Sampling temperature sent with every request.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Body of a streaming chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest<'a> {
    /// The model to complete with.
    pub model: &'a str,

    /// The full transcript, replayed verbatim.
    pub messages: &'a [Message],

    /// Sampling temperature.
    pub temperature: f32,

    /// Always true; greg only consumes streamed responses.
    pub stream: bool,
}

impl<'a> ChatRequest<'a> {
    /// Create a new streaming request for `messages`.
    pub fn new(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages,
            temperature: DEFAULT_TEMPERATURE,
            stream: true,
        }
    }
}
