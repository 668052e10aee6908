//! The `CompletionService` trait: the adapter interface for completion
//! backends.

use async_trait::async_trait;

use super::error::CompletionError;
use super::types::CompletionRequest;

/// A backend that turns a system instruction into free-form text.
///
/// Implementations make exactly one attempt per call. Retries, backoff and
/// timeouts belong to [`super::CompletionInvoker`].
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Human-readable name for logs (e.g. "openai-compatible").
    fn name(&self) -> &str;

    /// Perform one completion and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

// Compile-time assertion: CompletionService must be object-safe.
// If this line compiles, the trait can be used as `dyn CompletionService`.
const _: () = {
    fn _assert_object_safe(_: &dyn CompletionService) {}
};
