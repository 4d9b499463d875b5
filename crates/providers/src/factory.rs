//! Provider construction from configuration.

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RetryingProvider;
use pricelens_core::error::ProviderError;
use pricelens_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured completion provider, wrapped in its retry policy.
///
/// Fails with `NotConfigured` when no API key is available for a provider
/// that needs one.
pub fn build_from_config(
    config: &pricelens_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let api_key = match api_key {
        Some(key) => key,
        None if is_local(name) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}' (set api_key or OPENAI_API_KEY)"
            )));
        }
    };

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let inner = Arc::new(OpenAiCompatProvider::new(
        name,
        base_url,
        api_key,
        Duration::from_secs(config.completion.timeout_secs),
    ));

    Ok(Arc::new(RetryingProvider::new(
        inner,
        config.completion.retry_policy(),
    )))
}

/// The model to request, honouring a per-provider override.
pub fn model_for(config: &pricelens_config::AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.model.clone())
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricelens_config::{AppConfig, ProviderConfig};

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn missing_key_is_not_configured() {
        let config = AppConfig::default();
        match build_from_config(&config) {
            Err(ProviderError::NotConfigured(msg)) => assert!(msg.contains("openai")),
            Err(other) => panic!("Expected NotConfigured, got: {other:?}"),
            Ok(_) => panic!("Expected NotConfigured, got a provider"),
        }
    }

    #[test]
    fn builds_with_top_level_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }

    #[test]
    fn per_provider_model_override() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                default_model: Some("gpt-4o-mini".into()),
                ..ProviderConfig::default()
            },
        );
        assert_eq!(model_for(&config), "gpt-4o-mini");
        assert_eq!(model_for(&AppConfig::default()), "gpt-3.5-turbo-0125");
    }
}
