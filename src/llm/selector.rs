use crate::config::SmithConfig;
use crate::llm::{GenAIClient, LLMClient};
use anyhow::{Context, Result};
use genai::adapter::AdapterKind;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SelectedClient {
    pub client: Arc<dyn LLMClient>,
    pub provider: AdapterKind,
    pub description: String,
}

/// Builds the client for the configured provider
///
/// Cloud providers need their API key in the environment; Ollama needs a
/// reachable local server.
pub async fn select_llm_client(config: &SmithConfig) -> Result<SelectedClient> {
    let provider = config.provider;

    if provider == AdapterKind::Ollama {
        if !is_ollama_available().await {
            anyhow::bail!(
                "Ollama is not reachable. Start it with `ollama serve` or set OLLAMA_HOST, \
                 or choose a cloud provider with --backend"
            );
        }
    } else if !provider_has_credentials(provider) {
        let var = provider.default_key_env_name().unwrap_or("API key");
        anyhow::bail!("No credentials for {}: set {}", provider.as_str(), var);
    }

    let client = GenAIClient::new(provider, config.model.clone(), config.request_timeout())
        .await
        .with_context(|| format!("Failed to initialize {}", provider.as_str()))?;

    info!("Using provider: {} ({})", provider.as_str(), config.model);
    Ok(SelectedClient {
        client: Arc::new(client),
        provider,
        description: format!("{} ({})", provider.as_str(), config.model),
    })
}

/// Check if provider has available credentials
pub fn provider_has_credentials(provider: AdapterKind) -> bool {
    match provider.default_key_env_name() {
        None => true,
        Some(env_var) => std::env::var(env_var).is_ok(),
    }
}

/// Check if Ollama is running locally
async fn is_ollama_available() -> bool {
    let base_url =
        std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string());

    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));

    match reqwest::Client::new()
        .get(&url)
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .await
    {
        Ok(resp) => {
            let available = resp.status().is_success();
            debug!("Ollama availability check: {}", available);
            available
        }
        Err(e) => {
            debug!("Ollama not available: {}", e);
            false
        }
    }
}
