use std::time::Duration;

use pkb_core::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

/// Connection settings shared by the embedding and completion clients.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiClient {
    /// Create a client for an OpenAI-compatible API rooted at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let rest = base_url
            .strip_prefix("https://")
            .or_else(|| base_url.strip_prefix("http://"));
        let host = rest.and_then(|r| r.split('/').next()).unwrap_or("");
        if host.is_empty() || host.contains('@') || host.contains(char::is_whitespace) {
            return Err(AppError::new(
                "AI_PROVIDER_CONFIG_INVALID",
                "Provider base URL must be an http(s) URL with a host",
            )
            .with_details(format!("base_url={base_url}")));
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::new(
                "AI_PROVIDER_CONFIG_INVALID",
                "Provider API key is missing (set OPENAI_API_KEY)",
            ));
        }

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn authorization(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    pub(crate) fn post(&self, path: &str) -> ureq::Request {
        ureq::post(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))
            .timeout(self.timeout)
            .set("Authorization", &self.authorization())
            .set("Content-Type", "application/json")
    }
}

/// Map a failed provider call onto `AppError`. Rate limits, server errors and transport failures
/// are marked retryable; the caller decides whether to retry.
pub(crate) fn provider_error(code: &str, what: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp
                .into_string()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let body: String = body.chars().take(500).collect();
            AppError::new(code, format!("{what} request failed"))
                .with_details(format!("status={status}; body={body}"))
                .with_retryable(status == 429 || status >= 500)
        }
        ureq::Error::Transport(t) => AppError::new(code, format!("Failed to call {what} endpoint"))
            .with_details(t.to_string())
            .with_retryable(true),
    }
}
