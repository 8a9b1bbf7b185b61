//! Scenario: Fetch-next exhaustion and cursor discipline
//!
//! # Invariant under test
//!
//! A cycle over N pages, the last with `has_more = false`, issues exactly N
//! adapter calls and N cursor writes and ends Idle. The cursor only moves
//! after the page it belongs to is in the ledger.
//!
//! GREEN when:
//! - 3 scripted pages -> 3 calls, 3 persists, phase Idle, final cursor "c3";
//! - each call receives the cursor the previous page returned;
//! - a transient failure after page 1 leaves the cursor at "c1" and the
//!   retry resumes from it;
//! - an invalid record fails its page without writing records or cursor;
//! - cancellation during a stalled fetch reconciles and persists nothing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pay_connector::{
    Connector, ConnectorError, ConnectorHandle, CursorState, FetchNextRequest, FetchNextResponse,
    InstallResponse, TaskNode, Workflow,
};
use pay_models::{
    Capability, CapabilitySet, ConnectorId, FetchKind, PaymentScheme, PaymentStatus, PaymentType,
    PspPayment, StateId,
};
use pay_money::{AssetTable, BigInt};
use pay_reconcile::Reconciler;
use pay_storage::{InMemoryLedger, InMemoryScheduler, InMemoryStateStore, StateStore, TaskDescriptor};
use pay_sync::{SyncDriver, SyncError, SyncPhase};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Scripted payments adapter
// ---------------------------------------------------------------------------

type Page = Result<FetchNextResponse<PspPayment>, ConnectorError>;

#[derive(Default)]
struct Pager {
    script: Mutex<VecDeque<Page>>,
    seen_states: Mutex<Vec<Vec<u8>>>,
    stall: bool,
}

impl Pager {
    fn new(pages: Vec<Page>) -> Self {
        Self {
            script: Mutex::new(pages.into()),
            ..Self::default()
        }
    }

    fn push(&self, page: Page) {
        self.script.lock().unwrap().push_back(page);
    }

    fn calls(&self) -> usize {
        self.seen_states.lock().unwrap().len()
    }

    fn seen(&self) -> Vec<Vec<u8>> {
        self.seen_states.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for Pager {
    fn provider(&self) -> &str {
        "pager"
    }

    async fn install(&self, _id: &ConnectorId) -> Result<InstallResponse, ConnectorError> {
        Ok(InstallResponse {
            capabilities: [Capability::FetchPayments].into_iter().collect::<CapabilitySet>(),
            workflow: Workflow(vec![TaskNode::new(FetchKind::Payments).periodically()]),
        })
    }

    async fn fetch_next_payments(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspPayment>, ConnectorError> {
        self.seen_states
            .lock()
            .unwrap()
            .push(req.state.as_bytes().to_vec());
        if self.stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ConnectorError::Permanent("script exhausted".into())))
    }
}

fn cid() -> ConnectorId {
    ConnectorId::for_installation("pager", "test")
}

fn payment(reference: &str, with_time: bool) -> PspPayment {
    PspPayment {
        parent_reference: None,
        reference: reference.into(),
        created_at: with_time.then(|| Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        payment_type: PaymentType::PayIn,
        amount: BigInt::from(1_000),
        asset: "EUR/2".into(),
        scheme: PaymentScheme::Sepa,
        status: PaymentStatus::Succeeded,
        source_account_reference: None,
        destination_account_reference: Some("acc_main".into()),
        metadata: Default::default(),
        raw: serde_json::json!({ "id": reference }),
    }
}

fn page(refs: &[&str], cursor: &str, has_more: bool) -> Page {
    Ok(FetchNextResponse {
        items: refs.iter().map(|r| payment(r, true)).collect(),
        new_state: CursorState::from_bytes(cursor.as_bytes().to_vec()),
        has_more,
    })
}

struct Rig {
    pager: Arc<Pager>,
    ledger: Arc<InMemoryLedger>,
    states: Arc<InMemoryStateStore>,
    driver: SyncDriver,
    task: TaskDescriptor,
}

async fn rig(pager: Pager, timeout: Duration) -> Rig {
    let pager = Arc::new(pager);
    let handle = ConnectorHandle::install(cid(), pager.clone(), timeout)
        .await
        .unwrap();
    let ledger = Arc::new(InMemoryLedger::new());
    let states = Arc::new(InMemoryStateStore::new());
    let reconciler = Arc::new(Reconciler::new(
        ledger.clone(),
        Arc::new(AssetTable::with_defaults()),
    ));
    let driver = SyncDriver::new(
        Arc::new(handle),
        reconciler,
        states.clone(),
        Arc::new(InMemoryScheduler::new()),
        2,
    );
    let task = TaskDescriptor::root(
        StateId::new(cid(), FetchKind::Payments, None),
        TaskNode::new(FetchKind::Payments).periodically(),
    );
    Rig {
        pager,
        ledger,
        states,
        driver,
        task,
    }
}

fn never_cancel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

async fn cursor(states: &InMemoryStateStore, id: &StateId) -> Option<Vec<u8>> {
    states
        .load_state(id)
        .await
        .unwrap()
        .map(|s| s.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn n_pages_mean_n_calls_and_n_persists() {
    let r = rig(
        Pager::new(vec![
            page(&["p1", "p2"], "c1", true),
            page(&["p3", "p4"], "c2", true),
            page(&["p5"], "c3", false),
        ]),
        Duration::from_secs(5),
    )
    .await;
    let (_tx, mut rx) = never_cancel();

    let report = r.driver.run_cycle(&r.task, &mut rx).await.unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(report.items, 5);
    assert_eq!(report.inserted, 5);
    assert_eq!(report.phase, SyncPhase::Idle);
    assert_eq!(r.pager.calls(), 3);
    assert_eq!(r.states.write_count(&r.task.state_id).await, 3);
    assert_eq!(
        cursor(&r.states, &r.task.state_id).await,
        Some(b"c3".to_vec())
    );
    // first call starts from the empty cursor, then follows the chain
    assert_eq!(
        r.pager.seen(),
        vec![Vec::new(), b"c1".to_vec(), b"c2".to_vec()]
    );
    assert_eq!(r.ledger.payments().await.len(), 5);
}

#[tokio::test]
async fn transient_failure_keeps_the_last_persisted_cursor() {
    let r = rig(
        Pager::new(vec![
            page(&["p1", "p2"], "c1", true),
            Err(ConnectorError::Transient("429".into())),
        ]),
        Duration::from_secs(5),
    )
    .await;
    let (_tx, mut rx) = never_cancel();

    let err = r.driver.run_cycle(&r.task, &mut rx).await.unwrap_err();
    assert!(matches!(err, SyncError::Transient(_)));
    assert!(err.is_retryable());
    assert_eq!(r.states.write_count(&r.task.state_id).await, 1);
    assert_eq!(
        cursor(&r.states, &r.task.state_id).await,
        Some(b"c1".to_vec())
    );

    // the scheduler re-runs the task; it resumes from c1
    r.pager.push(page(&["p3"], "c2", false));
    let report = r.driver.run_cycle(&r.task, &mut rx).await.unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(r.pager.seen().last(), Some(&b"c1".to_vec()));
    assert_eq!(r.ledger.payments().await.len(), 3);
}

#[tokio::test]
async fn invalid_record_fails_the_page_and_holds_the_cursor() {
    let bad = Ok(FetchNextResponse {
        items: vec![payment("ok", true), payment("no_time", false)],
        new_state: CursorState::from_bytes(b"c1".to_vec()),
        has_more: false,
    });
    let r = rig(Pager::new(vec![bad]), Duration::from_secs(5)).await;
    let (_tx, mut rx) = never_cancel();

    let err = r.driver.run_cycle(&r.task, &mut rx).await.unwrap_err();
    assert!(matches!(err, SyncError::Reconcile(_)));
    assert!(!err.is_retryable());
    assert_eq!(r.states.write_count(&r.task.state_id).await, 0);
    assert!(r.ledger.payments().await.is_empty());
}

#[tokio::test]
async fn cancellation_abandons_the_in_flight_fetch() {
    let mut pager = Pager::new(vec![page(&["p1"], "c1", false)]);
    pager.stall = true;
    let r = rig(pager, Duration::from_secs(60)).await;
    let (tx, mut rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = tx.send(true);
    });

    let err = r.driver.run_cycle(&r.task, &mut rx).await.unwrap_err();
    assert_eq!(err, SyncError::Cancelled);
    assert_eq!(r.pager.calls(), 1);
    assert_eq!(r.states.write_count(&r.task.state_id).await, 0);
    assert!(r.ledger.payments().await.is_empty());
}

#[tokio::test]
async fn cancelled_before_start_never_calls_the_adapter() {
    let r = rig(Pager::new(vec![page(&["p1"], "c1", false)]), Duration::from_secs(5)).await;
    let (tx, mut rx) = watch::channel(false);
    tx.send(true).unwrap();

    let err = r.driver.run_cycle(&r.task, &mut rx).await.unwrap_err();
    assert_eq!(err, SyncError::Cancelled);
    assert_eq!(r.pager.calls(), 0);
}
