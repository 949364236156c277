//! Stream failure types.

use thiserror::Error;

/// Format an API error body for display, extracting the message from JSON if present.
///
/// Handles common patterns:
/// - `{"error": {"message": "...", "code": "..."}}` → message with code
/// - `{"error": "..."}` → the string
/// - `{"message": "..."}` → the message
/// - Plain text → returned as-is
#[must_use]
pub fn format_api_error(body: &str) -> String {
    if let Some(json_start) = body.find('{') {
        let json_str = &body[json_start..];

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(json_str)
            && let Some(msg) = extract_error_message(&json)
        {
            let prefix = body[..json_start].trim();
            if prefix.is_empty() {
                return msg;
            }
            return format!("{prefix} {msg}");
        }
    }

    body.trim().to_string()
}

fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    if let Some(error_obj) = json.get("error") {
        if let Some(msg) = error_obj.get("message").and_then(|v| v.as_str()) {
            let mut result = msg.to_string();

            // OpenRouter sends numeric codes, OpenAI sends strings
            match error_obj.get("code") {
                Some(serde_json::Value::String(code)) => {
                    result = format!("{result} (code: {code})");
                }
                Some(serde_json::Value::Number(code)) => {
                    result = format!("{result} (code: {code})");
                }
                _ => {}
            }

            return Some(result);
        }

        if let Some(msg) = error_obj.as_str() {
            return Some(msg.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
}

/// Why a stream ended without completing.
///
/// Every variant is fatal for the current call. Nothing is retried inside
/// the decoder; retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// The service answered with a non-success status. The body is kept for diagnostics.
    #[error("HTTP {status}: {}", format_api_error(.body))]
    Http { status: u16, body: String },

    /// The connection failed or a body read failed before end-of-input.
    #[error("IO error: {message}")]
    Io {
        message: String,
        /// Text accumulated before the failure. Never reported as a completion.
        partial_text: String,
    },

    #[error("Stream timed out")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,
}

impl FailureReason {
    /// Short machine-readable tag, used in failure notifications.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Io { .. } => "io",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Partial text the caller may choose to keep. Only IO failures preserve it.
    #[must_use]
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::Io { partial_text, .. } if !partial_text.is_empty() => Some(partial_text),
            _ => None,
        }
    }

    pub(crate) fn io(err: impl std::fmt::Display, partial_text: String) -> Self {
        Self::Io {
            message: err.to_string(),
            partial_text,
        }
    }
}

impl From<reqwest::Error> for FailureReason {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::io(err, String::new())
        }
    }
}
