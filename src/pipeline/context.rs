//! Long-lived dependencies shared by every stage of a run

use std::sync::Arc;

use crate::llm::{BackendError, ChatMessage, LLMClient, LLMRequest, RetryingLLMClient};
use crate::progress::{ProgressEvent, ProgressHandler};

use super::config::PipelineConfig;

pub struct PipelineContext {
    /// Client every stage talks to, already wrapped in the retry policy
    pub llm_client: Arc<dyn LLMClient>,

    pub config: PipelineConfig,

    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl PipelineContext {
    /// Wraps `llm_client` with the retry policy from `config`
    pub fn new(llm_client: Arc<dyn LLMClient>, config: PipelineConfig) -> Self {
        let retrying: Arc<dyn LLMClient> =
            Arc::new(RetryingLLMClient::new(llm_client, config.retry.clone()));
        Self {
            llm_client: retrying,
            config,
            progress_handler: None,
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn report(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    /// Request carrying the configured generation limits
    pub fn request(&self, messages: Vec<ChatMessage>) -> LLMRequest {
        let request = LLMRequest::new(messages).with_max_tokens(self.config.max_tokens);
        match self.config.temperature {
            Some(temperature) => request.with_temperature(temperature),
            None => request,
        }
    }

    /// Sends `messages` and returns the response flattened to text
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, BackendError> {
        let response = self.llm_client.chat(self.request(messages)).await?;
        Ok(response.content_text())
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("llm_client", &self.llm_client.name())
            .field("config", &self.config)
            .field("progress_handler", &self.progress_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse, RetryPolicy};
    use crate::progress::NoOpHandler;

    #[tokio::test]
    async fn test_complete_applies_limits() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("hello"));
        let config = PipelineConfig::new()
            .with_max_tokens(1024)
            .with_temperature(0.3)
            .with_retry(RetryPolicy::immediate(1));
        let context = PipelineContext::new(mock.clone(), config);

        let text = context.complete(vec![ChatMessage::user("hi")]).await.unwrap();

        assert_eq!(text, "hello");
        let requests = mock.requests();
        let request = &requests[0];
        assert_eq!(request.max_tokens, Some(1024));
        assert_eq!(request.temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_client_is_retried() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 1 }));
        mock.add_response(MockResponse::text("ok"));
        let context = PipelineContext::new(
            mock.clone(),
            PipelineConfig::new().with_retry(RetryPolicy::immediate(3)),
        );

        let text = context.complete(vec![ChatMessage::user("hi")]).await.unwrap();

        assert_eq!(text, "ok");
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_with_progress() {
        let context = PipelineContext::new(Arc::new(MockLLMClient::new()), PipelineConfig::new())
            .with_progress(Arc::new(NoOpHandler));
        assert!(context.progress_handler.is_some());
        context.report(ProgressEvent::StageStarted {
            stage: "analyse".to_string(),
        });
    }
}
