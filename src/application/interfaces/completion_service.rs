use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{CompletionRequest, CompletionResponse, DomainError};

/// An interface for sending a single prompt to a text-completion service and
/// receiving the assistant's reply.
///
/// Implementors encapsulate transport, serialization, and vendor-specific
/// API details. Exactly one exchange is issued per call; if `cancel` fires
/// before the exchange completes the call aborts with
/// [`DomainError::Cancelled`] and no partial text is returned.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, DomainError>;

    /// Whether a credential is available for this service. Exposed so callers
    /// can gate submission deterministically before attempting a call.
    fn has_credential(&self) -> bool;
}
