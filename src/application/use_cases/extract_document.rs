use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::DocumentDecoder;
use crate::domain::{DomainError, ExtractionResult};

/// Extracts per-page text from a binary document.
///
/// Pages are processed strictly in order 1..=N. `on_progress(page, total)`
/// is invoked synchronously after each page, with `page` strictly increasing
/// from 1 to N and never after cancellation has been acknowledged.
///
/// Cancellation is cooperative: the token is checked before each page, so at
/// most the page already in flight completes before the run aborts with
/// [`DomainError::Cancelled`]. A cancelled or failed run never yields a
/// partial result. The decoded document handle is dropped on every exit
/// path.
pub struct ExtractDocumentUseCase {
    decoder: Arc<dyn DocumentDecoder>,
}

impl ExtractDocumentUseCase {
    pub fn new(decoder: Arc<dyn DocumentDecoder>) -> Self {
        Self { decoder }
    }

    pub async fn execute(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<ExtractionResult, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::cancelled("extraction cancelled before start"));
        }

        let source = self.decoder.decode(bytes).await?;
        let total = source.page_count();
        debug!("Decoded document with {} pages", total);

        let mut page_texts = Vec::with_capacity(total);
        for page in 1..=total {
            if cancel.is_cancelled() {
                return Err(DomainError::cancelled(format!(
                    "extraction cancelled at page {page}/{total}"
                )));
            }

            let tokens = source.page_tokens(page).await?;
            page_texts.push(tokens.join(" "));
            on_progress(page, total);
        }

        let result = ExtractionResult::from_pages(page_texts);
        info!(
            "Extracted {} pages ({} chars)",
            result.page_count(),
            result.full_text().len()
        );
        Ok(result)
    }
}
