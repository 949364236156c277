//! Outbound chat-completion request construction.

use serde::Serialize;

/// Environment variable holding the bearer secret.
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Default `HTTP-Referer` identifying header.
pub const DEFAULT_REFERER: &str = "http://localhost";
/// Default `X-Title` identifying header.
pub const DEFAULT_TITLE: &str = "LeoeditApp";

/// A single streaming completion request. Immutable once built.
///
/// Model and prompt are not validated here; an empty value is rejected by the
/// remote service and surfaces as an HTTP failure.
#[derive(Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    /// Bearer credential, possibly empty.
    pub(crate) api_key: String,
    pub(crate) referer: String,
    pub(crate) title: String,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("stream", &self.stream)
            .field("api_key", &"[REDACTED]")
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish()
    }
}

impl CompletionRequest {
    /// Whether a credential was resolved at build time.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The JSON body sent to `/chat/completions`.
    pub(crate) fn body(&self) -> ChatCompletionBody<'_> {
        ChatCompletionBody {
            model: &self.model,
            messages: [WireMessage {
                role: "user",
                content: &self.prompt,
            }],
            stream: self.stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 1],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Assembles [`CompletionRequest`]s from caller parameters and process configuration.
#[derive(Clone)]
pub struct RequestBuilder {
    api_key_env: String,
    api_key: Option<String>,
    referer: String,
    title: String,
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish()
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the secret from a different environment variable.
    #[must_use]
    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Use an explicit key instead of the environment.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Build a streaming request. Never fails.
    ///
    /// The secret is resolved now: an explicit key wins, otherwise the
    /// environment variable is read. A missing secret leaves the credential
    /// empty and the service's 401/403 is reported as an ordinary HTTP failure.
    #[must_use]
    pub fn build(&self, model: impl Into<String>, prompt: impl Into<String>) -> CompletionRequest {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .unwrap_or_default();

        CompletionRequest {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
            api_key,
            referer: self.referer.clone(),
            title: self.title.clone(),
        }
    }
}
