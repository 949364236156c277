//! Streaming chat-completion client.
//!
//! A [`RequestBuilder`] assembles the request, and a [`StreamingDecoder`]
//! sends it and turns the event-stream body into notifications and a
//! [`TerminalOutcome`].
//!
//! # Example
//!
//! ```ignore
//! use chatstream::observer::NullObserver;
//! use chatstream::provider::{RequestBuilder, StreamingDecoder, Timeouts, DEFAULT_BASE_URL};
//! use tokio_util::sync::CancellationToken;
//!
//! let request = RequestBuilder::new().build("openai/gpt-4o", "Hello");
//! let decoder = StreamingDecoder::new(DEFAULT_BASE_URL, Timeouts::default());
//! let outcome = decoder
//!     .stream(&request, &NullObserver, Timeouts::default().total, &CancellationToken::new())
//!     .await;
//! ```

mod decoder;
mod error;
mod http;
mod request;
mod stream;

pub use decoder::{Accumulator, ReadError, StreamingDecoder, TerminalOutcome, decode_stream};
pub use error::{FailureReason, format_api_error};
pub use http::{DEFAULT_BASE_URL, Frame, HttpClient, LineBuffer, Timeouts};
pub use request::{
    CompletionRequest, DEFAULT_API_KEY_ENV, DEFAULT_REFERER, DEFAULT_TITLE, RequestBuilder,
};
pub use stream::ProtocolEvent;
