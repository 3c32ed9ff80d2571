//! Session orchestrator scenarios: prompt building, transcript handling,
//! sub-state transitions, and cancellation across both pipelines.

use std::sync::Arc;

use tokio::sync::Semaphore;

use docchat::{
    ChatSession, CompletionState, ExtractionState, MockCompletion, MockDecoder, Role,
    SessionConfig, MAX_CONTEXT_CHARS,
};

fn session(decoder: MockDecoder, completion: Arc<MockCompletion>) -> Arc<ChatSession> {
    Arc::new(ChatSession::new(
        Arc::new(decoder),
        completion,
        SessionConfig::default(),
    ))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after 1000 yields");
}

#[tokio::test]
async fn three_page_document_reaches_ready() {
    let session = session(
        MockDecoder::new(&[&["Hello"], &["World"], &["!"]]),
        Arc::new(MockCompletion::replying("ok")),
    );

    let result = session
        .select_document(b"doc")
        .await
        .expect("extraction should succeed");

    assert_eq!(result.page_count(), 3);
    assert_eq!(result.full_text(), "Hello\n\nWorld\n\n!");
    match session.extraction_state() {
        ExtractionState::Ready(ready) => assert_eq!(ready, result),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn decode_failure_surfaces_in_state() {
    let session = session(MockDecoder::failing(), Arc::new(MockCompletion::replying("ok")));

    let err = session
        .select_document(b"doc")
        .await
        .expect_err("should fail");

    assert!(err.is_decode());
    match session.extraction_state() {
        ExtractionState::Failed(message) => assert!(message.contains("Decode error")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn send_without_document_omits_pdf_section() {
    let completion = Arc::new(MockCompletion::replying("42"));
    let session = session(MockDecoder::new(&[]), completion.clone());

    let answer = session.send("What is X?").await.expect("send should succeed");

    assert_eq!(answer, "42");
    let prompts = completion.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(!prompts[0].contains("PDF content"));
    assert!(prompts[0].ends_with("Question: What is X?"));

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].content, "What is X?");
    assert_eq!(transcript[1].role, Role::Assistant);
    assert_eq!(transcript[1].content, "42");
    assert_eq!(session.completion_state(), CompletionState::Idle);
}

#[tokio::test]
async fn send_includes_extracted_context() {
    let completion = Arc::new(MockCompletion::replying("found it"));
    let session = session(
        MockDecoder::new(&[&["alpha", "beta"], &["gamma"]]),
        completion.clone(),
    );

    session.select_document(b"doc").await.expect("extraction");
    session.send("Where is beta?").await.expect("send");

    let prompts = completion.prompts();
    assert!(prompts[0].contains("PDF content:\nalpha beta\n\ngamma"));
    assert!(prompts[0].ends_with("Question: Where is beta?"));
}

#[tokio::test]
async fn whitespace_send_is_rejected_before_any_call() {
    let completion = Arc::new(MockCompletion::replying("ok"));
    let session = session(MockDecoder::new(&[]), completion.clone());

    for text in ["", "   ", "\n\t"] {
        let err = session.send(text).await.expect_err("should be rejected");
        assert!(err.is_validation());
    }

    assert_eq!(completion.call_count(), 0);
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn context_is_truncated_to_the_character_budget() {
    let completion = Arc::new(MockCompletion::replying("ok"));
    let long_token = "a".repeat(150_000);
    let page: &[&str] = &[long_token.as_str()];
    let session = session(MockDecoder::new(&[page]), completion.clone());

    session.select_document(b"doc").await.expect("extraction");
    session.send("q").await.expect("send");

    let prompts = completion.prompts();
    let prompt = &prompts[0];
    let start = prompt.find("PDF content:\n").expect("document section") + "PDF content:\n".len();
    let end = prompt.rfind("\n\nQuestion:").expect("question section");
    let context = &prompt[start..end];
    assert_eq!(context.len(), MAX_CONTEXT_CHARS);
    assert!(context.bytes().all(|b| b == b'a'));
}

#[tokio::test]
async fn mid_flight_cancel_retains_user_message() {
    let session = session(MockDecoder::new(&[]), Arc::new(MockCompletion::hanging()));

    let handle = {
        let session = session.clone();
        tokio::spawn(async move { session.send("still there?").await })
    };
    wait_until(|| session.completion_state().is_asking()).await;

    session.cancel_ask();
    let err = handle
        .await
        .expect("task should not panic")
        .expect_err("should be cancelled");

    assert!(err.is_cancelled());
    assert!(matches!(
        session.completion_state(),
        CompletionState::Cancelled(_)
    ));
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, Role::User);
}

#[tokio::test]
async fn cancel_ask_is_a_noop_when_idle() {
    let session = session(MockDecoder::new(&[]), Arc::new(MockCompletion::replying("ok")));
    session.cancel_ask();
    session.abort_parse();
    assert_eq!(session.completion_state(), CompletionState::Idle);
    assert_eq!(session.extraction_state(), ExtractionState::Idle);
}

#[tokio::test]
async fn remote_error_surfaces_without_discarding_transcript() {
    let completion = Arc::new(MockCompletion::failing("invalid credential"));
    let session = session(MockDecoder::new(&[]), completion.clone());

    let err = session.send("hello").await.expect_err("should fail");

    assert!(err.is_remote());
    assert!(err.to_string().contains("invalid credential"));
    assert!(session.can_submit(), "credential state must be unaffected");
    match session.completion_state() {
        CompletionState::Failed(message) => assert!(message.contains("invalid credential")),
        other => panic!("expected Failed, got {other:?}"),
    }
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, Role::User);
}

#[tokio::test]
async fn missing_credential_fails_without_network_call() {
    let completion = Arc::new(MockCompletion::replying("ok").without_credential());
    let session = session(MockDecoder::new(&[]), completion.clone());

    assert!(!session.can_submit());
    let err = session.send("hello").await.expect_err("should fail");
    assert!(err.is_config());
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn new_selection_supersedes_inflight_run() {
    let gate = Arc::new(Semaphore::new(0));
    let decoder = MockDecoder::new(&[&["one"], &["two"], &["three"]]).with_gate(gate.clone());
    let session = session(decoder, Arc::new(MockCompletion::replying("ok")));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.select_document(b"doc1").await })
    };
    wait_until(|| session.extraction_state().is_parsing()).await;

    let second = {
        let session = session.clone();
        tokio::spawn(async move { session.select_document(b"doc2").await })
    };
    // Drive the second run far enough to cancel and supersede the first
    // before any page is allowed through.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    gate.add_permits(16);

    let second_result = second
        .await
        .expect("task should not panic")
        .expect("second run should succeed");
    let first_err = first
        .await
        .expect("task should not panic")
        .expect_err("first run should be cancelled");

    assert!(first_err.is_cancelled());
    assert_eq!(second_result.page_count(), 3);
    match session.extraction_state() {
        ExtractionState::Ready(ready) => assert_eq!(ready, second_result),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn abort_parse_cancels_inflight_run() {
    let gate = Arc::new(Semaphore::new(0));
    let decoder = MockDecoder::new(&[&["one"], &["two"]]).with_gate(gate.clone());
    let session = session(decoder, Arc::new(MockCompletion::replying("ok")));

    let handle = {
        let session = session.clone();
        tokio::spawn(async move { session.select_document(b"doc").await })
    };
    wait_until(|| session.extraction_state().is_parsing()).await;

    session.abort_parse();
    // The page already in flight may still complete before the cancellation
    // is observed.
    gate.add_permits(4);

    let err = handle
        .await
        .expect("task should not panic")
        .expect_err("should be cancelled");
    assert!(err.is_cancelled());
    assert!(matches!(
        session.extraction_state(),
        ExtractionState::Cancelled(_)
    ));
}

#[tokio::test]
async fn reset_clears_extraction_but_keeps_transcript() {
    let completion = Arc::new(MockCompletion::replying("fine"));
    let session = session(MockDecoder::new(&[&["page"]]), completion.clone());

    session.select_document(b"doc").await.expect("extraction");
    session.send("hello").await.expect("send");
    assert_eq!(session.transcript().len(), 2);

    session.reset();

    assert_eq!(session.extraction_state(), ExtractionState::Idle);
    assert!(session.extraction_result().is_none());
    assert!(session.progress().is_none());
    assert_eq!(session.transcript().len(), 2, "reset must not touch the transcript");
    assert_eq!(session.completion_state(), CompletionState::Idle);

    // A prompt sent after reset carries no document section.
    session.send("again").await.expect("send");
    let prompts = completion.prompts();
    assert!(!prompts[1].contains("PDF content"));
}

#[tokio::test]
async fn clear_transcript_is_a_separate_explicit_action() {
    let session = session(MockDecoder::new(&[]), Arc::new(MockCompletion::replying("ok")));
    session.send("hello").await.expect("send");
    assert_eq!(session.transcript().len(), 2);

    session.clear_transcript();
    assert!(session.transcript().is_empty());
}
