use async_trait::async_trait;
use lopdf::Document;

use crate::application::{DocumentDecoder, PageSource};
use crate::domain::DomainError;

/// PDF decoder backed by the pure-Rust `lopdf` crate.
///
/// Decoding happens entirely in memory; the returned [`PageSource`] owns the
/// parsed document and releases it on drop.
pub struct LopdfDecoder;

impl LopdfDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LopdfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentDecoder for LopdfDecoder {
    async fn decode(&self, bytes: &[u8]) -> Result<Box<dyn PageSource>, DomainError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| DomainError::decode(format!("not a well-formed PDF: {e}")))?;
        if document.is_encrypted() {
            return Err(DomainError::decode("PDF is encrypted"));
        }
        // get_pages() keys are logical page numbers, already in order.
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        Ok(Box::new(LopdfPages { document, pages }))
    }
}

struct LopdfPages {
    document: Document,
    pages: Vec<u32>,
}

#[async_trait]
impl PageSource for LopdfPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_tokens(&self, page: usize) -> Result<Vec<String>, DomainError> {
        let number = self
            .pages
            .get(page.wrapping_sub(1))
            .copied()
            .ok_or_else(|| DomainError::internal(format!("page {page} out of range")))?;
        let text = self
            .document
            .extract_text(&[number])
            .map_err(|e| DomainError::decode(format!("failed to extract page {page}: {e}")))?;
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}
