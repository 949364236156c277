//! Streaming decoder: one HTTP exchange from request to terminal outcome.

use super::error::FailureReason;
use super::http::{Frame, HttpClient, LineBuffer, Timeouts};
use super::request::CompletionRequest;
use super::stream::ProtocolEvent;
use crate::observer::{Notification, Observer};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Running record of what one stream has delivered.
///
/// Created fresh for every call and owned by it alone.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Accumulator {
    full_text: String,
    token_count: usize,
}

impl Accumulator {
    /// Append a delta and return the new token count.
    fn push(&mut self, text: &str) -> usize {
        self.full_text.push_str(text);
        self.token_count += 1;
        self.token_count
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }
}

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Completed {
        full_text: String,
        token_count: usize,
    },
    Failed {
        reason: FailureReason,
    },
}

impl TerminalOutcome {
    /// Convert into a `Result` of `(full_text, token_count)`.
    pub fn into_result(self) -> Result<(String, usize), FailureReason> {
        match self {
            Self::Completed {
                full_text,
                token_count,
            } => Ok((full_text, token_count)),
            Self::Failed { reason } => Err(reason),
        }
    }
}

impl From<Accumulator> for TerminalOutcome {
    fn from(acc: Accumulator) -> Self {
        Self::Completed {
            full_text: acc.full_text,
            token_count: acc.token_count,
        }
    }
}

/// An error from reading the response body.
pub trait ReadError: Display {
    /// Whether the read gave up waiting rather than failing outright.
    fn is_timeout(&self) -> bool;
}

impl ReadError for reqwest::Error {
    fn is_timeout(&self) -> bool {
        reqwest::Error::is_timeout(self)
    }
}

impl ReadError for io::Error {
    fn is_timeout(&self) -> bool {
        self.kind() == io::ErrorKind::TimedOut
    }
}

/// Drives streaming completion requests against one endpoint.
///
/// Holds no per-request state; concurrent calls are fully independent.
#[derive(Debug, Clone)]
pub struct StreamingDecoder {
    http: HttpClient,
    timeouts: Timeouts,
}

impl StreamingDecoder {
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            http: HttpClient::new(base_url, timeouts),
            timeouts,
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Stream one completion, notifying `observer` as frames arrive.
    ///
    /// `budget` bounds the whole exchange: connect, headers, and every body
    /// read. Expiry ends with [`FailureReason::Timeout`], cancelling `cancel`
    /// with [`FailureReason::Cancelled`]. Both drop the connection and discard
    /// the partial text.
    pub async fn stream(
        &self,
        request: &CompletionRequest,
        observer: &dyn Observer,
        budget: Duration,
        cancel: &CancellationToken,
    ) -> TerminalOutcome {
        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            has_credential = request.has_credential(),
            budget_secs = budget.as_secs_f64(),
            "Completion stream request"
        );

        let exchange = async {
            let body = self.http.post_stream(request).await?;
            debug!("Streaming started");
            decode_body(body, observer).await
        };

        finish(exchange, observer, budget, cancel).await
    }

    /// Run [`stream`](Self::stream) on its own task.
    pub fn spawn(
        self: &Arc<Self>,
        request: CompletionRequest,
        observer: Arc<dyn Observer>,
        budget: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<TerminalOutcome> {
        let decoder = Arc::clone(self);
        tokio::spawn(async move {
            decoder
                .stream(&request, observer.as_ref(), budget, &cancel)
                .await
        })
    }
}

/// Decode an already-open response body under a budget and cancellation token.
///
/// Same semantics as [`StreamingDecoder::stream`] after the status check.
pub async fn decode_stream<S, E>(
    body: S,
    observer: &dyn Observer,
    budget: Duration,
    cancel: &CancellationToken,
) -> TerminalOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: ReadError,
{
    finish(decode_body(body, observer), observer, budget, cancel).await
}

/// Race the exchange against the deadline and the token, then report.
async fn finish<F>(
    exchange: F,
    observer: &dyn Observer,
    budget: Duration,
    cancel: &CancellationToken,
) -> TerminalOutcome
where
    F: Future<Output = Result<Accumulator, FailureReason>>,
{
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FailureReason::Cancelled),
        res = tokio::time::timeout(budget, exchange) => res.unwrap_or(Err(FailureReason::Timeout)),
    };

    match result {
        Ok(acc) => {
            info!(tokens = acc.token_count, "Streaming complete");
            debug!(len = acc.full_text.len(), "Full response: {}", acc.full_text);
            Notification::Complete {
                full_text: acc.full_text.clone(),
                token_count: acc.token_count,
            }
            .emit(observer);
            acc.into()
        }
        Err(reason) => {
            warn!(kind = reason.kind(), "Stream failed: {reason}");
            Notification::Failed {
                reason: reason.clone(),
            }
            .emit(observer);
            TerminalOutcome::Failed { reason }
        }
    }
}

/// The read loop. Returns the accumulator on `[DONE]` or clean end-of-input.
async fn decode_body<S, E>(body: S, observer: &dyn Observer) -> Result<Accumulator, FailureReason>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: ReadError,
{
    futures::pin_mut!(body);

    let mut lines = LineBuffer::new();
    let mut acc = Accumulator::default();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) if e.is_timeout() => {
                debug!(tokens = acc.token_count, "Body read timed out: {e}");
                return Err(FailureReason::Timeout);
            }
            Err(e) => return Err(FailureReason::io(e, acc.full_text)),
        };

        for line in lines.feed(&chunk) {
            let Some(event) = Frame::parse(&line).and_then(ProtocolEvent::decode) else {
                continue;
            };

            match event {
                ProtocolEvent::Token { text } => {
                    let count = acc.push(&text);
                    Notification::Token { text, count }.emit(observer);
                }
                ProtocolEvent::StreamError { message } => {
                    Notification::StreamError { message }.emit(observer);
                }
                ProtocolEvent::Malformed { raw } => {
                    Notification::Malformed { raw }.emit(observer);
                }
                ProtocolEvent::Done => {
                    // Authoritative: anything after the sentinel is left unread
                    Notification::Done {
                        token_count: acc.token_count,
                    }
                    .emit(observer);
                    return Ok(acc);
                }
            }
        }
    }

    if lines.has_pending() {
        let discarded = lines.discard_pending();
        debug!(bytes = discarded, "Discarding unterminated trailing line");
    }
    debug!("Stream closed without [DONE]");
    Ok(acc)
}
