use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use domains::{AppError, ChatApi, FileUpload, MessageType, Participant, SenderRole};
use integration_tests::FakeBackend;
use services::{ChatConfig, ChatSync};
use tokio_test::{assert_err, assert_ok};

fn customer() -> Participant {
    Participant {
        user_id: "cust-1".into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
        role: SenderRole::Customer,
    }
}

fn customer_chat(backend: &FakeBackend) -> ChatSync {
    let client: Arc<dyn ChatApi> = Arc::new(assert_ok!(backend.client()));
    let config = ChatConfig {
        poll_interval: Duration::from_secs(30),
        reconcile_delay: Duration::from_millis(20),
    };
    ChatSync::new(client, None, customer(), config)
}

#[tokio::test]
async fn customer_gets_exactly_one_session() {
    let backend = assert_ok!(FakeBackend::start().await);
    let chat = customer_chat(&backend);

    assert_ok!(chat.start().await);
    let first = assert_ok!(chat.ensure_session().await);
    let again = assert_ok!(chat.ensure_session().await);

    assert_eq!(first, again);
    assert_eq!(backend.sessions().len(), 1);
    assert_eq!(backend.sessions()[0].user_email, "ada@example.com");
    chat.shutdown();
}

#[tokio::test]
async fn sent_message_replaces_its_optimistic_copy() {
    let backend = assert_ok!(FakeBackend::start().await);
    let chat = customer_chat(&backend);
    assert_ok!(chat.start().await);

    let sent = assert_ok!(chat.send_text("  Is oldsite.com still for sale?  ").await);
    assert_eq!(sent.content, "Is oldsite.com still for sale?");

    let messages = chat.store().read(|s| s.messages().to_vec());
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, sent.id);
    assert!(!messages[0].is_temporary());

    // the reconcile fetch lands on the same single message
    tokio::time::sleep(Duration::from_millis(100)).await;
    let ids: Vec<_> = chat.store().read(|s| s.messages().iter().map(|m| m.id.clone()).collect());
    assert_eq!(ids, vec![sent.id.clone()]);
    assert_eq!(backend.messages(&sent.session_id).len(), 1);
    chat.shutdown();
}

#[tokio::test]
async fn failed_send_is_rolled_back() {
    let backend = assert_ok!(FakeBackend::start().await);
    let chat = customer_chat(&backend);
    assert_ok!(chat.start().await);

    backend.fail_sends(true);
    let err = assert_err!(chat.send_text("hello?").await);
    assert!(matches!(err, AppError::Api { status: 500, .. }), "{err:?}");
    assert!(chat.store().read(|s| s.messages().is_empty()));

    backend.fail_sends(false);
    assert_ok!(chat.send_text("hello again").await);
    let contents: Vec<_> = chat.store().read(|s| s.messages().iter().map(|m| m.content.clone()).collect());
    assert_eq!(contents, vec!["hello again"]);
    chat.shutdown();
}

#[tokio::test]
async fn attachment_is_uploaded_then_sent_as_its_url() {
    let backend = assert_ok!(FakeBackend::start().await);
    let chat = customer_chat(&backend);
    assert_ok!(chat.start().await);

    let file = FileUpload {
        file_name: "receipt.png".into(),
        content_type: mime::IMAGE_PNG,
        bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    };
    let sent = assert_ok!(chat.send_attachment(file).await);

    assert_eq!(sent.message_type, MessageType::Image);
    assert_eq!(sent.content, "https://cdn.example.com/chat/receipt.png");

    let uploads = backend.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "receipt.png");
    assert_eq!(uploads[0].content_type, "image/png");
    assert_eq!(uploads[0].size, 8);
    chat.shutdown();
}

#[tokio::test]
async fn rejoining_loads_history_from_the_backend() {
    let backend = assert_ok!(FakeBackend::start().await);
    let chat = customer_chat(&backend);
    assert_ok!(chat.start().await);
    assert_ok!(chat.send_text("first").await);
    assert_ok!(chat.send_text("second").await);
    chat.shutdown();
    let session = chat.store().read(|s| s.session.clone());
    drop(chat);

    // a new tab for the same customer
    let tab = customer_chat(&backend);
    let session = session.expect("session was created");
    assert_ok!(tab.join_session(session).await);
    let contents: Vec<_> = tab.store().read(|s| s.messages().iter().map(|m| m.content.clone()).collect());
    assert_eq!(contents, vec!["first", "second"]);
    tab.shutdown();
}
