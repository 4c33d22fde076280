//! LLM completion providers.
//!
//! The orchestrator only needs `generate(prompt) -> text`. Two HTTP
//! providers are available (Gemini `generateContent` and any
//! OpenAI-compatible `/chat/completions` endpoint) plus a scripted mock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thali_core::config::{LlmConfig, LlmProvider};
use tracing::{debug, warn};

use crate::error::ChatError;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_COMPAT_BASE_URL: &str = "https://api.openai.com/v1";

/// Text completion provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Run `client.generate` with an upper bound on wall time.
///
/// An elapsed timeout is reported as [`ChatError::LlmTimeout`].
pub async fn generate_with_timeout(
    client: &dyn LlmClient,
    prompt: &str,
    timeout: Duration,
) -> Result<String, ChatError> {
    match tokio::time::timeout(timeout, client.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ChatError::LlmTimeout(timeout.as_secs())),
    }
}

/// Build the provider selected by `config`, reading the API key from the
/// environment variable it names.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, ChatError> {
    let api_key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ChatError::Config(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => {
            let mut client = GeminiClient::new(api_key, config)?;
            if let Some(ref base_url) = config.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(client)
        }
        LlmProvider::OpenaiCompat => {
            let mut client = OpenAiCompatClient::new(api_key, config)?;
            if let Some(ref base_url) = config.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(client)
        }
    };
    debug!(provider = %config.provider, model = %config.model, "LLM client built");
    Ok(client)
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ChatError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()?)
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChatError::Llm(format!("HTTP {}: {}", status, body)))
}

// =============================================================================
// Gemini
// =============================================================================

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self, ChatError> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        });

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: GeminiResponse = error_for_status(response).await?.json().await?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ChatError::Llm("response contained no text".to_string()));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

/// Client for any `/chat/completions` endpoint (OpenAI, Groq, local servers).
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatClient {
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self, ChatError> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: OPENAI_COMPAT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: ChatCompletionResponse = error_for_status(response).await?.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ChatError::Llm("response contained no text".to_string()))
    }

    fn name(&self) -> &str {
        "openai_compat"
    }
}

// =============================================================================
// MockLlm
// =============================================================================

/// Scripted LLM for tests and offline runs.
///
/// Queued replies are returned in order; once the queue is empty every call
/// gets the fallback reply. Every prompt is recorded.
#[derive(Debug, Default)]
pub struct MockLlm {
    queue: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<Result<String, String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockLlm {
    /// Always answers `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(Ok(reply.into())),
            ..Self::default()
        }
    }

    /// Always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: Some(Err(message.into())),
            ..Self::default()
        }
    }

    /// Queue a reply ahead of the fallback.
    pub fn push_reply(self, reply: impl Into<String>) -> Self {
        lock(&self.queue).push_back(Ok(reply.into()));
        self
    }

    /// Queue a failure ahead of the fallback.
    pub fn push_failure(self, message: impl Into<String>) -> Self {
        lock(&self.queue).push_back(Err(message.into()));
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        lock(&self.prompts).push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = lock(&self.queue).pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => {
                warn!(error = %message, "Mock LLM failure");
                Err(ChatError::Llm(message))
            }
            None => Err(ChatError::Llm("no scripted reply".to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: LlmProvider, model: &str) -> LlmConfig {
        LlmConfig {
            provider,
            model: model.to_string(),
            ..LlmConfig::default()
        }
    }

    // ---- Gemini ----

    #[tokio::test]
    async fn test_gemini_generate() {
        let server = MockServer::start().await;
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Try the " }, { "text": "biryani." }] }
            }]
        });
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "what's good?" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key", &config(LlmProvider::Gemini, "gemini-2.5-flash"))
            .unwrap()
            .with_base_url(server.uri());
        let answer = client.generate("what's good?").await.unwrap();
        assert_eq!(answer, "Try the biryani.");
    }

    #[tokio::test]
    async fn test_gemini_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k", &config(LlmProvider::Gemini, "gemini-2.5-flash"))
            .unwrap()
            .with_base_url(server.uri());
        let err = client.generate("hi").await.unwrap_err();
        match err {
            ChatError::Llm(msg) => assert!(msg.contains("429")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gemini_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k", &config(LlmProvider::Gemini, "gemini-2.5-flash"))
            .unwrap()
            .with_base_url(server.uri());
        assert!(matches!(client.generate("hi").await, Err(ChatError::Llm(_))));
    }

    #[tokio::test]
    async fn test_gemini_transport_error_hides_api_key() {
        // Bind then release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let client = GeminiClient::new(
            "sk-live-do-not-log",
            &config(LlmProvider::Gemini, "gemini-2.5-flash"),
        )
        .unwrap()
        .with_base_url(format!("http://127.0.0.1:{port}"));
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
        let msg = err.to_string();
        assert!(!msg.contains("sk-live-do-not-log"), "key leaked: {msg}");
        assert!(!msg.contains("127.0.0.1"), "url leaked: {msg}");
    }

    // ---- OpenAI-compatible ----

    #[tokio::test]
    async fn test_openai_compat_generate() {
        let server = MockServer::start().await;
        let body = json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "We have naan." } }]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({ "model": "llama-3.1-8b-instant" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(
            "secret",
            &config(LlmProvider::OpenaiCompat, "llama-3.1-8b-instant"),
        )
        .unwrap()
        .with_base_url(server.uri());
        assert_eq!(client.generate("bread?").await.unwrap(), "We have naan.");
    }

    #[tokio::test]
    async fn test_openai_compat_no_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new("k", &config(LlmProvider::OpenaiCompat, "m"))
            .unwrap()
            .with_base_url(server.uri());
        assert!(matches!(client.generate("hi").await, Err(ChatError::Llm(_))));
    }

    // ---- Factory ----

    #[test]
    fn test_build_llm_client_missing_key() {
        let cfg = LlmConfig {
            api_key_env: "THALI_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(build_llm_client(&cfg), Err(ChatError::Config(_))));
    }

    // ---- Timeout ----

    #[tokio::test]
    async fn test_timeout_maps_to_llm_timeout() {
        let mock = MockLlm::with_reply("late").with_delay(Duration::from_millis(500));
        let result = generate_with_timeout(&mock, "hi", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ChatError::LlmTimeout(_))));
    }

    #[tokio::test]
    async fn test_within_timeout() {
        let mock = MockLlm::with_reply("on time");
        let result = generate_with_timeout(&mock, "hi", Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), "on time");
    }

    // ---- Mock ----

    #[tokio::test]
    async fn test_mock_queue_then_fallback() {
        let mock = MockLlm::with_reply("default")
            .push_reply("first")
            .push_failure("quota");
        assert_eq!(mock.generate("a").await.unwrap(), "first");
        assert!(mock.generate("b").await.is_err());
        assert_eq!(mock.generate("c").await.unwrap(), "default");
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_without_script_fails() {
        let mock = MockLlm::default();
        assert!(matches!(mock.generate("x").await, Err(ChatError::Llm(_))));
    }
}
