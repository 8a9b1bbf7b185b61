//! Scenario: ConnectorHandle gates and bounds every adapter call
//!
//! # Invariant under test
//!
//! The engine never reaches an operation the adapter did not advertise at
//! install time, and a stalled adapter call is abandoned after the handle's
//! timeout with a retryable error.
//!
//! GREEN when:
//! - fetching an unadvertised kind fails with `CapabilityNotAdvertised`
//!   before the adapter is invoked;
//! - a stalled fetch yields `Timeout`, and `Timeout` is retryable;
//! - create_transfer enforces payment / polling-id exclusivity;
//! - an install whose workflow needs an unadvertised capability is refused.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigInt;
use pay_connector::{
    ActionResponse, ActionStart, Connector, ConnectorError, ConnectorHandle, CursorState,
    FetchNextRequest, FetchNextResponse, InstallResponse, PaymentInitiation, PollOutcome,
    PollResponse, TaskNode, Workflow,
};
use pay_models::{Capability, CapabilitySet, ConnectorId, FetchKind, PspAccount};

// ---------------------------------------------------------------------------
// Stub
// ---------------------------------------------------------------------------

struct Stub {
    caps: Vec<Capability>,
    workflow: Workflow,
    stall: bool,
    action: ActionResponse,
    calls: AtomicUsize,
}

impl Stub {
    fn new(caps: Vec<Capability>) -> Self {
        Self {
            caps,
            workflow: Workflow::default(),
            stall: false,
            action: ActionResponse::default(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Connector for Stub {
    fn provider(&self) -> &str {
        "stub"
    }

    async fn install(&self, _id: &ConnectorId) -> Result<InstallResponse, ConnectorError> {
        Ok(InstallResponse {
            capabilities: self.caps.iter().copied().collect::<CapabilitySet>(),
            workflow: self.workflow.clone(),
        })
    }

    async fn fetch_next_accounts(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspAccount>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(FetchNextResponse {
            items: vec![],
            new_state: CursorState::empty(),
            has_more: false,
        })
    }

    async fn create_transfer(
        &self,
        _req: PaymentInitiation,
    ) -> Result<ActionResponse, ConnectorError> {
        Ok(self.action.clone())
    }

    async fn poll_transfer_status(&self, _id: &str) -> Result<PollResponse, ConnectorError> {
        Ok(PollResponse::default())
    }
}

fn cid() -> ConnectorId {
    ConnectorId::for_installation("stub", "test")
}

fn req() -> FetchNextRequest {
    FetchNextRequest {
        from_payload: None,
        state: CursorState::empty(),
        page_size: 10,
    }
}

fn transfer() -> PaymentInitiation {
    PaymentInitiation {
        reference: "tr_1".into(),
        source_account_reference: Some("acc_src".into()),
        destination_account_reference: "acc_dst".into(),
        amount: BigInt::from(100),
        asset: "EUR/2".into(),
        description: None,
        metadata: Default::default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unadvertised_kind_is_refused_before_the_adapter_runs() {
    let stub = Arc::new(Stub::new(vec![Capability::FetchPayments]));
    let handle = ConnectorHandle::install(cid(), stub.clone(), Duration::from_secs(1))
        .await
        .unwrap();

    let err = handle.fetch_next(FetchKind::Accounts, req()).await.unwrap_err();
    assert_eq!(
        err,
        ConnectorError::CapabilityNotAdvertised {
            capability: Capability::FetchAccounts
        }
    );
    assert!(!err.is_retryable());
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stalled_call_times_out_as_retryable() {
    let mut stub = Stub::new(vec![Capability::FetchAccounts]);
    stub.stall = true;
    let handle = ConnectorHandle::install(cid(), Arc::new(stub), Duration::from_millis(20))
        .await
        .unwrap();

    let err = handle.fetch_next(FetchKind::Accounts, req()).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Timeout { after_ms: 20, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn zero_page_size_is_an_invalid_request() {
    let handle = ConnectorHandle::install(
        cid(),
        Arc::new(Stub::new(vec![Capability::FetchAccounts])),
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    let mut r = req();
    r.page_size = 0;
    assert!(matches!(
        handle.fetch_next(FetchKind::Accounts, r).await,
        Err(ConnectorError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn transfer_requires_exactly_one_of_payment_or_polling_id() {
    let mut stub = Stub::new(vec![Capability::CreateTransfer]);
    stub.action = ActionResponse {
        payment: None,
        polling_id: Some("poll_1".into()),
    };
    let handle = ConnectorHandle::install(cid(), Arc::new(stub), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(
        handle.create_transfer(transfer()).await.unwrap(),
        ActionStart::Polling("poll_1".into())
    );
    assert_eq!(
        handle.poll_transfer_status("poll_1").await.unwrap(),
        PollOutcome::Pending
    );

    let empty = ConnectorHandle::install(
        cid(),
        Arc::new(Stub::new(vec![Capability::CreateTransfer])),
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    assert!(matches!(
        empty.create_transfer(transfer()).await,
        Err(ConnectorError::Permanent(_))
    ));
}

#[tokio::test]
async fn non_positive_transfer_amount_never_reaches_the_adapter() {
    let handle = ConnectorHandle::install(
        cid(),
        Arc::new(Stub::new(vec![Capability::CreateTransfer])),
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    let mut t = transfer();
    t.amount = BigInt::from(0);
    assert!(matches!(
        handle.create_transfer(t).await,
        Err(ConnectorError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn workflow_outside_capabilities_is_refused_at_install() {
    let mut stub = Stub::new(vec![Capability::FetchAccounts]);
    stub.workflow = Workflow(vec![
        TaskNode::new(FetchKind::Accounts).child(TaskNode::new(FetchKind::Balances))
    ]);
    let err = ConnectorHandle::install(cid(), Arc::new(stub), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Permanent(_)));
}
