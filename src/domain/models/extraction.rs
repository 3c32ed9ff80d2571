use serde::{Deserialize, Serialize};

/// Separator between consecutive page texts in [`ExtractionResult::full_text`].
pub const PAGE_SEPARATOR: &str = "\n\n";

/// The text extracted from one document, page by page.
///
/// Fields are private so the invariant `full_text == page_texts.join("\n\n")`
/// holds for the lifetime of the value; the only constructor is
/// [`ExtractionResult::from_pages`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    page_count: usize,
    page_texts: Vec<String>,
    full_text: String,
}

impl ExtractionResult {
    pub fn from_pages(page_texts: Vec<String>) -> Self {
        let full_text = page_texts.join(PAGE_SEPARATOR);
        Self {
            page_count: page_texts.len(),
            page_texts,
            full_text,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Per-page texts in page order (page 1 first).
    pub fn page_texts(&self) -> &[String] {
        &self.page_texts
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Total character count of the joined text, as shown by display layers.
    pub fn char_count(&self) -> usize {
        self.full_text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.is_empty()
    }
}

/// Transient per-run progress: overwritten on each page, dropped on
/// completion, abort, or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionProgress {
    pub current: usize,
    pub total: usize,
}

impl ExtractionProgress {
    pub fn new(current: usize, total: usize) -> Self {
        debug_assert!(current <= total);
        Self { current, total }
    }
}
