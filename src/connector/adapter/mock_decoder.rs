use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::application::{DocumentDecoder, PageSource};
use crate::domain::DomainError;

/// A [`DocumentDecoder`] that serves scripted pages regardless of the input
/// bytes. Used by tests and by offline CLI runs (`--mock`).
///
/// With a gate attached, each page acquires one semaphore permit before
/// resolving, letting tests hold a run mid-page and exercise cancellation
/// and supersession deterministically.
pub struct MockDecoder {
    pages: Vec<Vec<String>>,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
}

impl MockDecoder {
    pub fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|tokens| tokens.iter().map(|t| t.to_string()).collect())
                .collect(),
            fail: false,
            gate: None,
        }
    }

    /// A decoder that rejects every payload with [`DomainError::Decode`].
    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
            gate: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl DocumentDecoder for MockDecoder {
    async fn decode(&self, _bytes: &[u8]) -> Result<Box<dyn PageSource>, DomainError> {
        if self.fail {
            return Err(DomainError::decode("mock decoder configured to fail"));
        }
        Ok(Box::new(MockPages {
            pages: self.pages.clone(),
            gate: self.gate.clone(),
        }))
    }
}

struct MockPages {
    pages: Vec<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl PageSource for MockPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_tokens(&self, page: usize) -> Result<Vec<String>, DomainError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| DomainError::internal("page gate closed"))?;
            permit.forget();
        }
        self.pages
            .get(page.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| DomainError::internal(format!("page {page} out of range")))
    }
}
