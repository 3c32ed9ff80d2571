use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::application::CompletionService;
use crate::domain::{CompletionRequest, CompletionResponse, DomainError};

enum Behavior {
    Reply(String),
    Fail(String),
    /// Never resolves on its own; returns `Cancelled` once the token fires.
    Hang,
}

/// A [`CompletionService`] with scripted behavior for tests and offline CLI
/// runs (`--mock`).
///
/// Prompts are recorded only once the credential and prompt checks have
/// passed, i.e. exactly when the real client would dispatch a request, so
/// `call_count()` doubles as "network calls observed".
pub struct MockCompletion {
    behavior: Behavior,
    has_credential: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Reply(reply.into()),
            has_credential: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with [`DomainError::Remote`] carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(message.into()),
            has_credential: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Stays in flight until the cancellation token fires.
    pub fn hanging() -> Self {
        Self {
            behavior: Behavior::Hang,
            has_credential: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.has_credential = false;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, DomainError> {
        if !self.has_credential {
            return Err(DomainError::config("Anthropic API key is required"));
        }
        if request.prompt.trim().is_empty() {
            return Err(DomainError::validation("prompt must be a non-empty string"));
        }

        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(request.prompt.clone());

        match &self.behavior {
            Behavior::Reply(reply) => Ok(CompletionResponse {
                text: reply.clone(),
                raw: json!({"content": [{"type": "text", "text": reply}]}),
            }),
            Behavior::Fail(message) => Err(DomainError::remote(message.clone())),
            Behavior::Hang => {
                cancel.cancelled().await;
                Err(DomainError::cancelled("completion call cancelled"))
            }
        }
    }

    fn has_credential(&self) -> bool {
        self.has_credential
    }
}
