//! LLM client abstraction layer
//!
//! This module provides a trait-based abstraction for LLM communication,
//! allowing different backends (GenAI, Mock) to be used interchangeably, and
//! the retry decorator every pipeline call goes through.

mod client;
mod error;
mod genai;
mod mock;
mod retry;
mod selector;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use self::genai::{GenAIClient, API_BASE_URL_ENV};
pub use mock::{MockLLMClient, MockResponse};
pub use retry::{RetryPolicy, RetryingLLMClient};
pub use selector::{provider_has_credentials, select_llm_client, SelectedClient};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageContent, MessageRole};
