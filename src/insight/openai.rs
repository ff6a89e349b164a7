//! OpenAI-compatible backend.
//!
//! Works with api.openai.com and with any server that implements the OpenAI chat completions
//! API (vLLM, LocalAI, llama-server and similar).

use crate::config::InsightConfig;
use crate::error::Res;
use crate::insight::{InsightGenerator, Prompt};
use anyhow::{bail, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Sends prompts to `{base_url}/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiInsight {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiInsight {
    /// Create a backend without an API key.
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            temperature: InsightConfig::default().temperature,
            max_tokens: InsightConfig::default().max_tokens,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Create from the config, reading the API key from the environment variable it names. A
    /// missing key is allowed because local servers often do not need one.
    pub fn from_config(config: &InsightConfig) -> Self {
        let mut backend = Self::new(&config.base_url, &config.model);
        backend.temperature = config.temperature;
        backend.max_tokens = config.max_tokens;
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => backend.with_api_key(key.trim()),
            _ => {
                warn!(
                    "{} is not set, calling {} without an API key",
                    config.api_key_env, backend.base_url
                );
                backend
            }
        }
    }
}

#[async_trait::async_trait]
impl InsightGenerator for OpenAiInsight {
    async fn complete(&self, prompt: &Prompt) -> Res<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user().to_string(),
                },
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            stream: false,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        trace!("POST {url} with model {}", self.model);
        let mut req_builder = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("the completion API returned {status}: {}", body.trim());
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse the completion API response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("the completion API returned no choices")
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
