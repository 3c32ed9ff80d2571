use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::{CompletionService, DocumentDecoder, ExtractDocumentUseCase};
use crate::domain::{
    ChatMessage, CompletionRequest, CompletionState, DomainError, ExtractionProgress,
    ExtractionResult, ExtractionState, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};

/// Instruction prefixed to every prompt sent to the completion service.
const PROMPT_HEADER: &str = "You are a helpful assistant. Use the PDF content if relevant. \
If the answer is not present, say you cannot find it.";

/// Maximum number of document characters included in a prompt.
pub const MAX_CONTEXT_CHARS: usize = 120_000;

/// Session-wide completion parameters, read once at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system: Option<String>,
    /// Character budget for the document portion of a prompt.
    pub context_budget: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            system: None,
            context_budget: MAX_CONTEXT_CHARS,
        }
    }
}

impl SessionConfig {
    /// Read the ambient model override (`ANTHROPIC_MODEL`) once; all other
    /// fields keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }
}

/// Mutable session state behind one lock: both sub-states, the transcript,
/// and the active cancellation handle + run id per sub-state.
///
/// Run ids guard against a superseded run committing state: every new run
/// increments the id, and a finishing run writes back only while its id is
/// still current.
struct SessionState {
    extraction: ExtractionState,
    completion: CompletionState,
    transcript: Vec<ChatMessage>,
    parse_token: Option<CancellationToken>,
    parse_run: u64,
    ask_token: Option<CancellationToken>,
    ask_run: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            extraction: ExtractionState::Idle,
            completion: CompletionState::Idle,
            transcript: Vec::new(),
            parse_token: None,
            parse_run: 0,
            ask_token: None,
            ask_run: 0,
        }
    }
}

/// Orchestrates one document-extraction pipeline and one completion pipeline
/// into a chat thread.
///
/// The two sub-states are independent: a document can be re-selected while a
/// completion call runs and vice versa. Within each sub-state at most one
/// run is active; starting a new run first cancels the previous one, whose
/// state mutations are discarded from that point on.
///
/// All methods take `&self`; the session is `Send + Sync` and can be shared
/// behind an [`Arc`] so cancellation can be requested from another task
/// while a call is in flight.
pub struct ChatSession {
    extractor: ExtractDocumentUseCase,
    completion: Arc<dyn CompletionService>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(
        decoder: Arc<dyn DocumentDecoder>,
        completion: Arc<dyn CompletionService>,
        config: SessionConfig,
    ) -> Self {
        Self {
            extractor: ExtractDocumentUseCase::new(decoder),
            completion,
            config,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// The lock is only ever held for short, non-awaiting sections, so
    /// poisoning means a bug rather than a recoverable condition.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state lock poisoned")
    }

    /// Extract text from a newly selected document.
    ///
    /// Any extraction already in progress is cancelled first and commits
    /// nothing from then on. The outcome is both returned and recorded in
    /// the extraction sub-state, so fire-and-forget callers can read it back
    /// later.
    pub async fn select_document(&self, bytes: &[u8]) -> Result<ExtractionResult, DomainError> {
        let (token, run) = {
            let mut state = self.state();
            if let Some(previous) = state.parse_token.take() {
                previous.cancel();
            }
            state.parse_run += 1;
            let token = CancellationToken::new();
            state.parse_token = Some(token.clone());
            state.extraction = ExtractionState::Parsing(None);
            (token, state.parse_run)
        };
        info!("Starting extraction run {run}");

        let result = self
            .extractor
            .execute(bytes, &token, |current, total| {
                let mut state = self.state();
                if state.parse_run == run {
                    state.extraction =
                        ExtractionState::Parsing(Some(ExtractionProgress::new(current, total)));
                }
            })
            .await;

        let mut state = self.state();
        if state.parse_run == run {
            state.parse_token = None;
            state.extraction = match &result {
                Ok(extracted) => ExtractionState::Ready(extracted.clone()),
                Err(e) if e.is_cancelled() => ExtractionState::Cancelled(e.to_string()),
                Err(e) => ExtractionState::Failed(e.to_string()),
            };
        } else {
            debug!("Extraction run {run} superseded; discarding outcome");
        }
        result
    }

    /// Send a user message and wait for the assistant's reply.
    ///
    /// Empty or whitespace-only text is rejected before the transcript or
    /// the completion service is touched. Otherwise the user message is
    /// appended immediately, so it remains in the transcript even when the
    /// call fails or is cancelled; the assistant message is appended only on
    /// success.
    pub async fn send(&self, text: &str) -> Result<String, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("message text is empty"));
        }

        let (prompt, token, run) = {
            let mut state = self.state();
            state.transcript.push(ChatMessage::user(text));

            let context = state
                .extraction
                .result()
                .map(|extracted| extracted.full_text())
                .filter(|full_text| !full_text.is_empty());
            let prompt = build_prompt(context, text, self.config.context_budget);

            if let Some(previous) = state.ask_token.take() {
                previous.cancel();
            }
            state.ask_run += 1;
            let token = CancellationToken::new();
            state.ask_token = Some(token.clone());
            state.completion = CompletionState::Asking;
            (prompt, token, state.ask_run)
        };

        let mut request = CompletionRequest::new(prompt)
            .with_model(&self.config.model)
            .with_max_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(system) = &self.config.system {
            request = request.with_system(system);
        }

        let result = self.completion.complete(&request, &token).await;

        let mut state = self.state();
        if state.ask_run == run {
            state.ask_token = None;
            match &result {
                Ok(response) => {
                    state.transcript.push(ChatMessage::assistant(&response.text));
                    state.completion = CompletionState::Idle;
                }
                Err(e) if e.is_cancelled() => {
                    state.completion = CompletionState::Cancelled(e.to_string());
                }
                Err(e) => {
                    state.completion = CompletionState::Failed(e.to_string());
                }
            }
        }
        result.map(|response| response.text)
    }

    /// Cancel the in-flight completion call, if any.
    pub fn cancel_ask(&self) {
        if let Some(token) = self.state().ask_token.as_ref() {
            token.cancel();
        }
    }

    /// Cancel the in-flight extraction run, if any.
    pub fn abort_parse(&self) {
        if let Some(token) = self.state().parse_token.as_ref() {
            token.cancel();
        }
    }

    /// Drop the document, its progress, and any extraction error, cancelling
    /// an in-flight run. The transcript and the completion sub-state are
    /// left untouched; clearing the transcript is a separate, explicit
    /// action ([`Self::clear_transcript`]).
    pub fn reset(&self) {
        let mut state = self.state();
        if let Some(token) = state.parse_token.take() {
            token.cancel();
        }
        state.parse_run += 1;
        state.extraction = ExtractionState::Idle;
    }

    pub fn clear_transcript(&self) {
        self.state().transcript.clear();
    }

    /// True iff a credential is available for the completion service.
    pub fn can_submit(&self) -> bool {
        self.completion.has_credential()
    }

    pub fn extraction_state(&self) -> ExtractionState {
        self.state().extraction.clone()
    }

    pub fn completion_state(&self) -> CompletionState {
        self.state().completion.clone()
    }

    pub fn extraction_result(&self) -> Option<ExtractionResult> {
        self.state().extraction.result().cloned()
    }

    pub fn progress(&self) -> Option<ExtractionProgress> {
        self.state().extraction.progress()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.state().transcript.clone()
    }
}

/// Combine the fixed instruction, an optional bounded document excerpt, and
/// the literal question into one prompt.
fn build_prompt(context: Option<&str>, question: &str, budget: usize) -> String {
    match context {
        Some(full_text) if !full_text.is_empty() => {
            let excerpt = truncate_chars(full_text, budget);
            format!("{PROMPT_HEADER}\n\nPDF content:\n{excerpt}\n\nQuestion: {question}")
        }
        _ => format!("{PROMPT_HEADER}\n\nQuestion: {question}"),
    }
}

/// The first `budget` characters of `text`, respecting char boundaries.
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_context_has_no_document_section() {
        let prompt = build_prompt(None, "What is X?", MAX_CONTEXT_CHARS);
        assert!(!prompt.contains("PDF content"));
        assert!(prompt.ends_with("Question: What is X?"));
    }

    #[test]
    fn prompt_with_context_includes_document_section() {
        let prompt = build_prompt(Some("page one text"), "What is X?", MAX_CONTEXT_CHARS);
        assert!(prompt.contains("PDF content:\npage one text"));
        assert!(prompt.ends_with("Question: What is X?"));
    }

    #[test]
    fn empty_context_is_treated_as_absent() {
        let prompt = build_prompt(Some(""), "What is X?", MAX_CONTEXT_CHARS);
        assert!(!prompt.contains("PDF content"));
    }

    #[test]
    fn truncate_chars_takes_exact_prefix() {
        let text = "a".repeat(150);
        assert_eq!(truncate_chars(&text, 120).len(), 120);
    }

    #[test]
    fn truncate_chars_is_noop_under_budget() {
        assert_eq!(truncate_chars("short", 120), "short");
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        let text = "héllo wörld";
        let truncated = truncate_chars(text, 3);
        assert_eq!(truncated, "hél");
    }
}
