pub mod application;
pub mod connector;
pub mod domain;

pub use application::{
    ChatSession, CompletionService, DocumentDecoder, ExtractDocumentUseCase, PageSource,
    SessionConfig, MAX_CONTEXT_CHARS,
};

pub use connector::{AnthropicClient, LopdfDecoder, MockCompletion, MockDecoder};

pub use domain::{
    ChatMessage, CompletionRequest, CompletionResponse, CompletionState, DomainError,
    ExtractionProgress, ExtractionResult, ExtractionState, Role, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
