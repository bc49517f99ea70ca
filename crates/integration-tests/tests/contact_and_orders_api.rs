//! The admin back office: order status changes and the contact inbox.

use domains::{AppError, CartItem, ContactApi, ContactStatus, NewContactMessage, NewOrder, OrderApi, OrderStatus};
use integration_tests::FakeBackend;
use tokio_test::{assert_err, assert_ok};

fn inquiry(subject: &str) -> NewContactMessage {
    NewContactMessage {
        name: "Ada".into(),
        email: "ada@example.com".into(),
        subject: subject.into(),
        message: "Is a payment plan possible?".into(),
    }
}

#[tokio::test]
async fn order_moves_from_pending_to_completed() {
    let backend = assert_ok!(FakeBackend::start().await);
    let client = assert_ok!(backend.client());

    let order = assert_ok!(
        client
            .create_order(NewOrder {
                user_id: "u1".into(),
                items: vec![CartItem {
                    domain_id: "d1".into(),
                    name: "oldsite.com".into(),
                    price: 250.0,
                }],
                total: 250.0,
            })
            .await
    );
    assert_eq!(order.status, OrderStatus::Pending);

    let updated = assert_ok!(client.update_order_status(&order.id, OrderStatus::Completed).await);
    assert_eq!(updated.id, order.id);
    assert_eq!(updated.status, OrderStatus::Completed);

    let listed = assert_ok!(client.list_orders().await);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, OrderStatus::Completed);
    assert_eq!(backend.orders()[0].status, OrderStatus::Completed);
}

#[tokio::test]
async fn unknown_order_cannot_change_status() {
    let backend = assert_ok!(FakeBackend::start().await);
    let client = assert_ok!(backend.client());

    let err = assert_err!(client.update_order_status("o404", OrderStatus::Cancelled).await);
    assert!(matches!(err, AppError::NotFound(..)), "{err:?}");
}

#[tokio::test]
async fn submitted_message_lands_in_the_inbox_as_new() {
    let backend = assert_ok!(FakeBackend::start().await);
    let client = assert_ok!(backend.client());

    let message = assert_ok!(inquiry("  Payment plan ").validated());
    let stored = assert_ok!(client.submit_contact(message).await);
    assert_eq!(stored.subject, "Payment plan");
    assert_eq!(stored.status, ContactStatus::New);
    assert!(stored.created_at.is_some());

    assert_ok!(client.submit_contact(inquiry("Bulk discount")).await);
    let inbox = assert_ok!(client.list_contacts().await);
    let subjects: Vec<_> = inbox.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Bulk discount", "Payment plan"]);
}

#[tokio::test]
async fn blank_required_field_is_rejected_by_the_backend() {
    let backend = assert_ok!(FakeBackend::start().await);
    let client = assert_ok!(backend.client());

    let mut message = inquiry("Hello");
    message.message = String::new();
    let err = assert_err!(client.submit_contact(message).await);
    assert!(matches!(err, AppError::Api { status: 400, .. }), "{err:?}");
    assert!(backend.contacts().is_empty());
}

#[tokio::test]
async fn inbox_triage_marks_then_deletes() {
    let backend = assert_ok!(FakeBackend::start().await);
    let client = assert_ok!(backend.client());
    let stored = assert_ok!(client.submit_contact(inquiry("Transfer")).await);

    let read = assert_ok!(client.update_contact_status(&stored.id, ContactStatus::Read).await);
    assert_eq!(read.status, ContactStatus::Read);
    let replied = assert_ok!(client.update_contact_status(&stored.id, ContactStatus::Replied).await);
    assert_eq!(replied.status, ContactStatus::Replied);
    assert_eq!(backend.contacts()[0].status, ContactStatus::Replied);

    assert_ok!(client.delete_contact(&stored.id).await);
    assert!(assert_ok!(client.list_contacts().await).is_empty());

    let err = assert_err!(client.delete_contact(&stored.id).await);
    assert!(matches!(err, AppError::NotFound(..)), "{err:?}");
    let err = assert_err!(client.update_contact_status(&stored.id, ContactStatus::Read).await);
    assert!(matches!(err, AppError::NotFound(..)), "{err:?}");
}
