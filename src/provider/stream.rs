//! Streaming chunk types and per-frame decoding.

use super::http::Frame;
use serde::Deserialize;

/// Streaming chunk from an OpenRouter-compatible API.
///
/// Only the fields the decoder reads are modelled. Every field is optional:
/// role-only deltas, usage trailers and keep-alive chunks decode to nothing.
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Option<Vec<StreamChoice>>,
    #[serde(default)]
    pub error: Option<StreamErrorBody>,
}

/// A choice in a streaming chunk.
#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

/// Delta content in a streaming choice.
#[derive(Debug, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error object embedded in an otherwise well-formed chunk.
#[derive(Debug, Deserialize)]
pub struct StreamErrorBody {
    #[serde(default)]
    pub message: String,
}

impl StreamChunk {
    /// Text of the first choice's delta, if non-empty.
    pub fn first_delta(&self) -> Option<&str> {
        self.choices
            .as_ref()?
            .first()?
            .delta
            .as_ref()?
            .content
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}

/// A single decoded unit from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Incremental content fragment.
    Token { text: String },
    /// Embedded error. Does not end the stream.
    StreamError { message: String },
    /// Termination sentinel.
    Done,
    /// A data frame whose payload is not the expected JSON.
    Malformed { raw: String },
}

impl ProtocolEvent {
    /// Decode a classified frame.
    ///
    /// Returns `None` for frames that carry nothing to report: a chunk with
    /// no choices, an empty delta, or a JSON `null` payload.
    pub fn decode(frame: Frame) -> Option<Self> {
        let payload = match frame {
            Frame::Done => return Some(Self::Done),
            Frame::Data(payload) => payload,
        };

        // Derived struct impls also accept arrays, so check the shape first
        let parsed = serde_json::from_str::<serde_json::Value>(&payload).and_then(|value| {
            match value {
                serde_json::Value::Null => Ok(None),
                serde_json::Value::Object(_) => serde_json::from_value::<StreamChunk>(value).map(Some),
                other => Err(serde::de::Error::custom(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                ))),
            }
        });

        let chunk = match parsed {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to parse stream chunk: {e}\nData: {payload}");
                return Some(Self::Malformed { raw: payload });
            }
        };

        // An error frame is reported on its own; its choices are not consumed
        if let Some(error) = chunk.error {
            tracing::warn!(message = %error.message, "Error in stream");
            return Some(Self::StreamError {
                message: error.message,
            });
        }

        chunk.first_delta().map(|text| Self::Token {
            text: text.to_string(),
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &str) -> Option<ProtocolEvent> {
        ProtocolEvent::decode(Frame::Data(payload.to_string()))
    }

    #[test]
    fn test_text_delta() {
        let json = r#"{
            "id": "gen-123",
            "object": "chat.completion.chunk",
            "created": 1677652288,
            "model": "openai/gpt-4o",
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": "Hello"},
                "finish_reason": null
            }]
        }"#;

        assert_eq!(
            decode(json),
            Some(ProtocolEvent::Token {
                text: "Hello".into()
            })
        );
    }

    #[test]
    fn test_only_first_choice_used() {
        let json = r#"{"choices":[{"delta":{"content":"a"}},{"delta":{"content":"b"}}]}"#;
        assert_eq!(decode(json), Some(ProtocolEvent::Token { text: "a".into() }));
    }

    #[test]
    fn test_empty_or_missing_delta() {
        assert_eq!(decode(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(decode(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#), None);
        assert_eq!(decode(r#"{"choices":[{"delta":{"content":null}}]}"#), None);
        assert_eq!(decode(r#"{"choices":[{"finish_reason":"stop"}]}"#), None);
        assert_eq!(decode(r#"{"choices":[]}"#), None);
        assert_eq!(decode(r#"{"choices":null}"#), None);
        assert_eq!(decode("{}"), None);
    }

    #[test]
    fn test_usage_trailer() {
        let json = r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#;
        assert_eq!(decode(json), None);
    }

    #[test]
    fn test_embedded_error() {
        assert_eq!(
            decode(r#"{"error":{"message":"x"}}"#),
            Some(ProtocolEvent::StreamError {
                message: "x".into()
            })
        );
    }

    #[test]
    fn test_error_wins_over_choices() {
        let json = r#"{"error":{"message":"overloaded","code":502},"choices":[{"delta":{"content":"lost"}}]}"#;
        assert_eq!(
            decode(json),
            Some(ProtocolEvent::StreamError {
                message: "overloaded".into()
            })
        );
    }

    #[test]
    fn test_null_error_ignored() {
        let json = r#"{"error":null,"choices":[{"delta":{"content":"ok"}}]}"#;
        assert_eq!(decode(json), Some(ProtocolEvent::Token { text: "ok".into() }));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            decode("{not json"),
            Some(ProtocolEvent::Malformed {
                raw: "{not json".into()
            })
        );
        assert_eq!(
            decode(""),
            Some(ProtocolEvent::Malformed { raw: String::new() })
        );
        // Valid JSON, wrong shape
        assert!(matches!(decode("42"), Some(ProtocolEvent::Malformed { .. })));
        assert!(matches!(
            decode(r#"{"error":"plain string"}"#),
            Some(ProtocolEvent::Malformed { .. })
        ));
    }

    #[test]
    fn test_array_payload_malformed() {
        assert_eq!(
            decode("[]"),
            Some(ProtocolEvent::Malformed { raw: "[]".into() })
        );
        let nested = r#"[[{"delta":{"content":"x"}}]]"#;
        assert_eq!(
            decode(nested),
            Some(ProtocolEvent::Malformed { raw: nested.into() })
        );
        assert!(matches!(
            decode(r#""text""#),
            Some(ProtocolEvent::Malformed { .. })
        ));
    }

    #[test]
    fn test_null_payload_skipped() {
        assert_eq!(decode("null"), None);
    }

    #[test]
    fn test_done() {
        assert_eq!(ProtocolEvent::decode(Frame::Done), Some(ProtocolEvent::Done));
    }
}
