//! Scenario: Keyed writes are at-most-once
//!
//! GREEN when:
//! - a second upsert with an already-applied key returns `Duplicate` and
//!   leaves the stored entity unchanged;
//! - a new adjustment for an existing payment (new key) is merged into the
//!   stored history rather than replacing it;
//! - two concurrent writers racing on the same key both succeed, exactly one
//!   of them as `Inserted`;
//! - a lookup of an absent entity is `NotFound`, not a backend error.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use num_bigint::BigInt;
use pay_models::{ConnectorId, Payment, PaymentAdjustment, PaymentId, PaymentStatus, PaymentType};
use pay_storage::{
    InMemoryScheduler, InMemoryLedger, LedgerStore, ScheduleOptions, Scheduler, StateId,
    TaskDescriptor, WriteOutcome,
};

fn pid() -> PaymentId {
    PaymentId::new(
        "py_1",
        PaymentType::PayIn,
        ConnectorId::for_installation("adyen", "main"),
    )
}

fn payment_with(status: PaymentStatus, sec: u32) -> Payment {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, sec).unwrap();
    let mut p = Payment::new(pid(), at, "EUR/2");
    let adj = PaymentAdjustment::new(pid(), "py_1", at, status).with_amount(BigInt::from(990), "EUR/2");
    p.append_adjustment(adj).unwrap();
    p
}

fn key_of(p: &Payment) -> String {
    p.latest_adjustment().unwrap().idempotency_key()
}

#[tokio::test]
async fn repeated_key_is_a_silent_noop() {
    let store = InMemoryLedger::new();
    let p = payment_with(PaymentStatus::Pending, 0);
    let key = key_of(&p);

    assert_eq!(store.upsert_payment(p.clone(), &key).await.unwrap(), WriteOutcome::Inserted);
    assert_eq!(store.upsert_payment(p, &key).await.unwrap(), WriteOutcome::Duplicate);

    let stored = store.get_payment(&pid()).await.unwrap();
    assert_eq!(stored.adjustments().len(), 1);
}

#[tokio::test]
async fn new_adjustment_merges_into_history() {
    let store = InMemoryLedger::new();
    let first = payment_with(PaymentStatus::Pending, 0);
    let second = payment_with(PaymentStatus::Succeeded, 7);
    store.upsert_payment(first.clone(), &key_of(&first)).await.unwrap();
    store.upsert_payment(second.clone(), &key_of(&second)).await.unwrap();

    let stored = store.get_payment(&pid()).await.unwrap();
    assert_eq!(stored.adjustments().len(), 2);
    assert_eq!(stored.status(), PaymentStatus::Succeeded);
}

#[tokio::test]
async fn racing_writers_on_one_key_both_succeed() {
    let store = Arc::new(InMemoryLedger::new());
    let p = payment_with(PaymentStatus::Pending, 0);
    let key = key_of(&p);

    let a = {
        let (s, p, k) = (store.clone(), p.clone(), key.clone());
        tokio::spawn(async move { s.upsert_payment(p, &k).await })
    };
    let b = {
        let (s, p, k) = (store.clone(), p.clone(), key.clone());
        tokio::spawn(async move { s.upsert_payment(p, &k).await })
    };
    let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
    assert_eq!(
        outcomes.iter().filter(|o| **o == WriteOutcome::Inserted).count(),
        1
    );
    assert_eq!(store.applied_keys().await, 1);
}

#[tokio::test]
async fn absent_entity_is_not_found() {
    let store = InMemoryLedger::new();
    let err = store.get_payment(&pid()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn second_schedule_of_same_cursor_is_already_scheduled() {
    let sched = InMemoryScheduler::new();
    let task = TaskDescriptor::root(
        StateId::new(
            ConnectorId::for_installation("adyen", "main"),
            pay_models::FetchKind::Payments,
            None,
        ),
        pay_connector::TaskNode::new(pay_models::FetchKind::Payments),
    );
    sched.schedule(task.clone(), ScheduleOptions::run_now()).await.unwrap();
    let err = sched
        .schedule(task, ScheduleOptions::run_now())
        .await
        .unwrap_err();
    assert!(err.is_already_scheduled());
    assert_eq!(sched.take_pending().await.len(), 1);
}
