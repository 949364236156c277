//! Notification sink for stream progress.
//!
//! The decoder reports through a caller-supplied [`Observer`]. Calls arrive
//! from the decoding task, one at a time and in arrival order; an observer
//! that needs delivery on a particular thread marshals the call itself.

use crate::provider::FailureReason;
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Event names emitted by the decoder.
pub mod events {
    pub const TOKEN: &str = "stream_token";
    pub const STREAM_ERROR: &str = "stream_error";
    pub const MALFORMED: &str = "stream_malformed";
    pub const DONE: &str = "stream_done";
    pub const COMPLETE: &str = "stream_complete";
    pub const FAILED: &str = "stream_failed";
}

/// Fire-and-forget sink for named events. No reply is expected.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &str, payload: Value);
}

impl<F> Observer for F
where
    F: Fn(&str, Value) + Send + Sync,
{
    fn notify(&self, event: &str, payload: Value) {
        self(event, payload);
    }
}

/// A typed notification, lowered to `(name, payload)` on emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Token { text: String, count: usize },
    StreamError { message: String },
    Malformed { raw: String },
    Done { token_count: usize },
    Complete { full_text: String, token_count: usize },
    Failed { reason: FailureReason },
}

impl Notification {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Token { .. } => events::TOKEN,
            Self::StreamError { .. } => events::STREAM_ERROR,
            Self::Malformed { .. } => events::MALFORMED,
            Self::Done { .. } => events::DONE,
            Self::Complete { .. } => events::COMPLETE,
            Self::Failed { .. } => events::FAILED,
        }
    }

    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Token { text, count } => json!({ "token": text, "count": count }),
            Self::StreamError { message } => json!({ "message": message }),
            Self::Malformed { raw } => json!({ "raw": raw }),
            Self::Done { token_count } => json!({ "token_count": token_count }),
            Self::Complete {
                full_text,
                token_count,
            } => json!({ "full_response": full_text, "token_count": token_count }),
            Self::Failed { reason } => json!({
                "kind": reason.kind(),
                "message": reason.to_string(),
            }),
        }
    }

    pub fn emit(&self, observer: &dyn Observer) {
        observer.notify(self.name(), self.payload());
    }
}

/// Forwards notifications into an unbounded channel, preserving order.
///
/// Sending never blocks the decoder. A dropped receiver silently discards.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<(String, Value)>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn notify(&self, event: &str, payload: Value) {
        let _ = self.tx.send((event.to_string(), payload));
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn notify(&self, _event: &str, _payload: Value) {}
}
