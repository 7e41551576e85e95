//! Minimal OpenAI-compatible chat completion client.
//!
//! Only what description generation needs: one user message in, one
//! completion text out. No retries, no streaming.

use std::time::{Duration, Instant};

use copydesk_shared::{CopydeskError, OpenAiConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("Copydesk/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Connection settings for [`CompletionClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    /// Whole-request timeout. `None` leaves the HTTP client default.
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&OpenAiConfig::default())
    }
}

impl From<&OpenAiConfig> for ClientOptions {
    fn from(config: &OpenAiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Chat completion client bound to one API key.
#[derive(Clone)]
pub struct CompletionClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    /// Build a client. The key is used as a bearer token on every request.
    pub fn new(api_key: impl Into<String>, options: &ClientOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| {
            CopydeskError::Network(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `prompt` as a single user message and return the trimmed text of
    /// the first choice.
    pub async fn complete(&self, model: &str, prompt: &str, temperature: f64) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![Message::user(prompt)],
            temperature,
        };
        self.chat_completion(&request).await
    }

    /// Post a chat completion request and return the first choice's text.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<String> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "completion request failed");
                CopydeskError::Network(format!("{url}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(%status, error = %body, "completion API error");
            return Err(CopydeskError::Completion(format!("HTTP {status}: {body}")));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| CopydeskError::Completion(format!("invalid response body: {e}")))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CopydeskError::Completion("response contained no completion".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );

        Ok(content.trim().to_string())
    }
}
