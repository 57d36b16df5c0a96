//! Natural-language summaries of probe results through hosted LLM providers.
//!
//! [`Summarizer::summarize`] never fails: missing credentials, unknown
//! providers and provider errors all come back as a human-readable string
//! that can be shown in place of a summary.

use crate::error::{Result, ScanError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const GOOGLE_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiProvider {
    Google,
    OpenAi,
    DeepSeek,
}

impl AiProvider {
    /// Parse the provider names accepted on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "google" => Some(AiProvider::Google),
            "openai" => Some(AiProvider::OpenAi),
            "deepseek" => Some(AiProvider::DeepSeek),
            _ => None,
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AiProvider::Google => "Google AI",
            AiProvider::OpenAi => "OpenAI",
            AiProvider::DeepSeek => "Deepseek",
        })
    }
}

pub struct Summarizer {
    client: Client,
    openai_base_url: String,
    deepseek_base_url: String,
    google_base_url: String,
}

impl Summarizer {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build HTTP client with custom timeout, using default client");
                Client::new()
            });

        Self {
            client,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            deepseek_base_url: DEEPSEEK_BASE_URL.to_string(),
            google_base_url: GOOGLE_BASE_URL.to_string(),
        }
    }

    /// Point a provider at a different endpoint (proxies, tests)
    pub fn with_base_url(mut self, provider: AiProvider, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        match provider {
            AiProvider::Google => self.google_base_url = base_url,
            AiProvider::OpenAi => self.openai_base_url = base_url,
            AiProvider::DeepSeek => self.deepseek_base_url = base_url,
        }
        self
    }

    pub async fn summarize(&self, prompt: &str, provider: &str, api_key: &str) -> String {
        if api_key.is_empty() {
            return "AI analysis disabled. Please provide an API key.".to_string();
        }

        let Some(parsed) = AiProvider::parse(provider) else {
            return format!(
                "Error: Unknown AI provider '{}'. Supported providers are 'google', 'openai', and 'deepseek'.",
                provider
            );
        };

        match self.complete(parsed, prompt, api_key).await {
            Ok(Some(text)) => text,
            Ok(None) => format!("Error: Received an empty response from {}.", parsed),
            Err(e) => {
                warn!(provider = %parsed, error = %e, "Summary request failed");
                format!("Error from {}: {}", parsed, e)
            }
        }
    }

    async fn complete(&self, provider: AiProvider, prompt: &str, api_key: &str) -> Result<Option<String>> {
        debug!(provider = %provider, prompt_len = prompt.len(), "Requesting summary");
        match provider {
            AiProvider::OpenAi => {
                self.chat_completion(&self.openai_base_url, OPENAI_MODEL, prompt, api_key)
                    .await
            }
            AiProvider::DeepSeek => {
                self.chat_completion(&self.deepseek_base_url, DEEPSEEK_MODEL, prompt, api_key)
                    .await
            }
            AiProvider::Google => self.generate_content(prompt, api_key).await,
        }
    }

    /// OpenAI-compatible `/chat/completions`
    async fn chat_completion(
        &self,
        base_url: &str,
        model: &str,
        prompt: &str,
        api_key: &str,
    ) -> Result<Option<String>> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Provider(format!("{} {}", status, body.trim())));
        }

        let parsed: ChatResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty()))
    }

    /// Gemini `generateContent`
    async fn generate_content(&self, prompt: &str, api_key: &str) -> Result<Option<String>> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.google_base_url.trim_end_matches('/'),
                GOOGLE_MODEL
            ))
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Provider(format!("{} {}", status, body.trim())));
        }

        let parsed: GeminiResponse = response.json().await?;
        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|text| !text.is_empty()))
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    #[tokio::test]
    async fn test_missing_api_key() {
        let summary = Summarizer::new().summarize("hi", "openai", "").await;
        assert_eq!(summary, "AI analysis disabled. Please provide an API key.");
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let summary = Summarizer::new().summarize("hi", "skynet", "key").await;
        assert!(summary.starts_with("Error: Unknown AI provider 'skynet'."));
    }

    #[tokio::test]
    async fn test_openai_chat_completion() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-3.5-turbo"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Looks like nginx."}}]
            })))
            .mount(&mock_server)
            .await;

        let summarizer = Summarizer::new().with_base_url(AiProvider::OpenAi, mock_server.uri());
        let summary = summarizer.summarize("analyze", "openai", "sk-test").await;

        assert_eq!(summary, "Looks like nginx.");
    }

    #[tokio::test]
    async fn test_deepseek_uses_its_own_model() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "deepseek-chat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .mount(&mock_server)
            .await;

        let summarizer = Summarizer::new().with_base_url(AiProvider::DeepSeek, mock_server.uri());
        assert_eq!(summarizer.summarize("p", "DeepSeek", "k").await, "ok");
    }

    #[tokio::test]
    async fn test_google_generate_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash-latest:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Gemini says hi"}]}}]
            })))
            .mount(&mock_server)
            .await;

        let summarizer = Summarizer::new().with_base_url(AiProvider::Google, mock_server.uri());
        assert_eq!(
            summarizer.summarize("p", "google", "g-key").await,
            "Gemini says hi"
        );
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let summarizer = Summarizer::new().with_base_url(AiProvider::OpenAi, mock_server.uri());
        assert_eq!(
            summarizer.summarize("p", "openai", "k").await,
            "Error: Received an empty response from OpenAI."
        );
    }

    #[tokio::test]
    async fn test_provider_error_becomes_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&mock_server)
            .await;

        let summarizer = Summarizer::new().with_base_url(AiProvider::OpenAi, mock_server.uri());
        let summary = summarizer.summarize("p", "openai", "bad").await;

        assert!(summary.starts_with("Error from OpenAI:"), "got: {}", summary);
        assert!(summary.contains("401"));
        assert!(summary.contains("invalid api key"));
    }
}
