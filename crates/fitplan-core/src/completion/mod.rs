//! Language-completion boundary.
//!
//! [`CompletionService`] is the adapter trait for a completion backend;
//! [`HttpCompletionClient`] talks to an OpenAI-compatible chat endpoint.
//! [`CompletionInvoker`] wraps any service in a bounded retry policy with
//! exponential backoff and a per-call timeout.

pub mod error;
pub mod http;
pub mod invoker;
pub mod trait_def;
pub mod types;

pub use error::CompletionError;
pub use http::HttpCompletionClient;
pub use invoker::{CompletionInvoker, InvokeError, RetryPolicy};
pub use trait_def::CompletionService;
pub use types::{CompletionRequest, CompletionSettings};
