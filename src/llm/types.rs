//! LLM communication types
//!
//! This module defines the types used for LLM request/response communication,
//! independent of any specific provider implementation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions
    System,
    /// User message
    User,
    /// Assistant (LLM) response
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Text content of the message
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Content of a response as the provider delivered it
///
/// Providers return plain strings, lists of fragments (strings or keyed
/// objects with a `text` field), or a single keyed object. `text()` is the
/// one place where these shapes are flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// No content at all
    Empty,
    /// Plain text
    Text(String),
    /// Ordered list of fragments
    Parts(Vec<Value>),
    /// Single keyed payload
    Keyed(Map<String, Value>),
}

impl MessageContent {
    /// Flattens the content into a single string
    pub fn text(&self) -> String {
        match self {
            MessageContent::Empty => String::new(),
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(part_text)
                .collect::<Vec<_>>()
                .join(" "),
            MessageContent::Keyed(map) => keyed_text(map),
        }
    }

    /// Returns true if flattening would produce an empty string
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Empty => true,
            MessageContent::Text(text) => text.is_empty(),
            _ => self.text().is_empty(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<Value> for MessageContent {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => MessageContent::Empty,
            Value::String(text) => MessageContent::Text(text),
            Value::Array(parts) => MessageContent::Parts(parts),
            Value::Object(map) => MessageContent::Keyed(map),
            other => MessageContent::Text(other.to_string()),
        }
    }
}

fn part_text(part: &Value) -> Option<String> {
    match part {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => match map.get("text") {
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(part.to_string()),
        },
        other => Some(other.to_string()),
    }
}

fn keyed_text(map: &Map<String, Value>) -> String {
    if let Some(text) = map.get("text") {
        return match text {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
    }
    if let Some(inner) = map.get("content") {
        return MessageContent::from(inner.clone()).text();
    }
    Value::Object(map.clone()).to_string()
}

/// Request to send to the LLM
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Temperature for response generation (0.0 - 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences to end generation
    pub stop_sequences: Option<Vec<String>>,
}

impl LLMRequest {
    /// Creates a new request with messages
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            stop_sequences: None,
        }
    }

    /// Sets the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets stop sequences
    pub fn with_stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(sequences);
        self
    }
}

/// Response from the LLM
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Content of the response
    pub content: MessageContent,
    /// Time taken for the request
    pub response_time: Duration,
}

impl LLMResponse {
    /// Creates a new response with plain text content
    pub fn text(content: impl Into<String>, response_time: Duration) -> Self {
        Self {
            content: MessageContent::Text(content.into()),
            response_time,
        }
    }

    /// Creates a new response with structured content
    pub fn with_content(content: MessageContent, response_time: Duration) -> Self {
        Self {
            content,
            response_time,
        }
    }

    /// Content flattened into a single string
    pub fn content_text(&self) -> String {
        self.content.text()
    }
}
