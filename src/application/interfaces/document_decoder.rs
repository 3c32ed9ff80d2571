use async_trait::async_trait;

use crate::domain::DomainError;

/// A decoded, paginated document handle.
///
/// Underlying resources are released when the handle is dropped, on success
/// and failure paths alike.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// The ordered text tokens of one page, `1 <= page <= page_count()`.
    ///
    /// Token order is whatever the underlying text layer supplies; no layout
    /// reconstruction is attempted.
    async fn page_tokens(&self, page: usize) -> Result<Vec<String>, DomainError>;
}

/// An interface for decoding a raw binary payload into a paginated document.
///
/// Implementors encapsulate the document format and parsing library.
/// Consumers (e.g. [`crate::application::ExtractDocumentUseCase`]) remain
/// decoupled from any particular backend.
#[async_trait]
pub trait DocumentDecoder: Send + Sync {
    /// Decode `bytes` into a page source, or fail with
    /// [`DomainError::Decode`] when the payload is not a well-formed
    /// document.
    async fn decode(&self, bytes: &[u8]) -> Result<Box<dyn PageSource>, DomainError>;
}
