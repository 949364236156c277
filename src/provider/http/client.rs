//! HTTP client wrapper for the completions endpoint.

use crate::provider::error::FailureReason;
use crate::provider::request::CompletionRequest;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Default OpenRouter API base.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Path of the chat completions endpoint, relative to the base URL.
pub const COMPLETIONS_PATH: &str = "/chat/completions";

/// Timeouts applied to one exchange.
///
/// `total` bounds the whole call including body reads and must be shorter
/// than `socket`. `socket` is an idle limit on each read, never a cap on the
/// exchange. `header` bounds the wait between sending and receiving status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub header: Duration,
    pub total: Duration,
    pub socket: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            header: Duration::from_secs(60),
            total: Duration::from_secs(120),
            socket: Duration::from_secs(300),
        }
    }
}

/// HTTP client for streaming completion requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    header_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        let client = reqwest::Client::builder()
            .read_timeout(timeouts.socket)
            .connect_timeout(timeouts.connect)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            header_timeout: timeouts.header,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build headers including authentication and the identifying pair.
    ///
    /// Values that are not valid header text are dropped rather than failing
    /// the call; an unusable credential then surfaces as the service's 401.
    fn build_headers(request: &CompletionRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let pairs = [
            (AUTHORIZATION, format!("Bearer {}", request.api_key)),
            (HeaderName::from_static("http-referer"), request.referer.clone()),
            (HeaderName::from_static("x-title"), request.title.clone()),
        ];
        for (name, value) in pairs {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(_) => tracing::warn!(header = %name, "Dropping header with invalid characters"),
            }
        }

        headers
    }

    /// POST a streaming request and return the body once a success status arrives.
    ///
    /// A non-success status reads the whole error body and returns
    /// [`FailureReason::Http`]; the body is never parsed as a stream.
    pub async fn post_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, FailureReason> {
        let url = format!("{}{COMPLETIONS_PATH}", self.base_url);

        let send = self
            .client
            .post(&url)
            .headers(Self::build_headers(request))
            .json(&request.body())
            .send();

        let response = tokio::time::timeout(self.header_timeout, send)
            .await
            .map_err(|_| FailureReason::Timeout)??;

        let status = response.status();
        tracing::debug!(%status, url = %url, "Completion stream response");

        if !status.is_success() {
            let body = response.text().await?;
            return Err(FailureReason::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::request::RequestBuilder;

    #[test]
    fn test_bearer_auth() {
        let request = RequestBuilder::new().api_key("test-token").build("m", "p");
        let headers = HttpClient::build_headers(&request);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-token");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_identifying_headers() {
        let request = RequestBuilder::new().api_key("k").build("m", "p");
        let headers = HttpClient::build_headers(&request);
        assert_eq!(headers.get("HTTP-Referer").unwrap(), "http://localhost");
        assert_eq!(headers.get("X-Title").unwrap(), "LeoeditApp");
    }

    #[test]
    fn test_empty_credential_still_sent() {
        let request = RequestBuilder::new()
            .api_key_env("CHATSTREAM_TEST_UNSET_KEY_b810")
            .build("m", "p");
        let headers = HttpClient::build_headers(&request);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer ");
    }

    #[test]
    fn test_invalid_header_dropped() {
        let request = RequestBuilder::new()
            .api_key("k")
            .title("bad\ntitle")
            .build("m", "p");
        let headers = HttpClient::build_headers(&request);
        assert!(headers.get("X-Title").is_none());
        assert!(headers.get(AUTHORIZATION).is_some());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpClient::new("http://127.0.0.1:9/v1/", Timeouts::default());
        assert_eq!(client.base_url(), "http://127.0.0.1:9/v1");
    }

    #[test]
    fn test_default_timeouts_ordered() {
        let t = Timeouts::default();
        assert!(t.connect < t.header);
        assert!(t.header < t.total);
        assert!(t.total < t.socket);
    }
}
