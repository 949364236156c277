//! HTTP transport and line framing for the completions stream.

mod client;
mod sse;

pub use client::{DEFAULT_BASE_URL, HttpClient, Timeouts};
pub use sse::{Frame, LineBuffer};
