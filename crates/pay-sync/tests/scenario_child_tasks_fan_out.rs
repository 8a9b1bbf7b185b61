//! Scenario: Child workflow nodes fan out per parent item
//!
//! # Invariant under test
//!
//! A node with children schedules one RunNow task per (child, fetched
//! parent). The child's cursor is scoped by the parent reference and its
//! request carries the parent's raw payload. Re-scheduling an already
//! pending child is not an error.
//!
//! GREEN when:
//! - 2 accounts fetched -> 2 balance tasks, scopes "acc_a" / "acc_b";
//! - `from_payload` equals each account's raw payload;
//! - replaying the page schedules nothing new and still succeeds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pay_connector::{
    Connector, ConnectorError, ConnectorHandle, CursorState, FetchNextRequest, FetchNextResponse,
    InstallResponse, TaskNode, Workflow,
};
use pay_models::{Capability, CapabilitySet, ConnectorId, FetchKind, PspAccount, StateId};
use pay_money::AssetTable;
use pay_reconcile::Reconciler;
use pay_storage::{
    InMemoryLedger, InMemoryScheduler, InMemoryStateStore, Schedule, StateStore, TaskDescriptor,
};
use pay_sync::SyncDriver;
use tokio::sync::watch;

struct Accounts;

fn account(reference: &str) -> PspAccount {
    PspAccount {
        reference: reference.into(),
        created_at: Some(chrono::Utc::now()),
        name: Some(format!("Account {reference}")),
        default_asset: Some("EUR/2".into()),
        metadata: Default::default(),
        raw: serde_json::json!({ "iban_ref": reference }),
    }
}

fn workflow() -> TaskNode {
    TaskNode::new(FetchKind::Accounts)
        .periodically()
        .child(TaskNode::new(FetchKind::Balances))
}

#[async_trait]
impl Connector for Accounts {
    fn provider(&self) -> &str {
        "accounts"
    }

    async fn install(&self, _id: &ConnectorId) -> Result<InstallResponse, ConnectorError> {
        Ok(InstallResponse {
            capabilities: [Capability::FetchAccounts, Capability::FetchBalances]
                .into_iter()
                .collect::<CapabilitySet>(),
            workflow: Workflow(vec![workflow()]),
        })
    }

    async fn fetch_next_accounts(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspAccount>, ConnectorError> {
        Ok(FetchNextResponse {
            items: vec![account("acc_a"), account("acc_b")],
            new_state: CursorState::from_bytes(b"done".to_vec()),
            has_more: false,
        })
    }
}

fn cid() -> ConnectorId {
    ConnectorId::for_installation("accounts", "test")
}

#[tokio::test]
async fn each_account_gets_a_scoped_balance_task() {
    let handle = ConnectorHandle::install(cid(), Arc::new(Accounts), Duration::from_secs(5))
        .await
        .unwrap();
    let ledger = Arc::new(InMemoryLedger::new());
    let states = Arc::new(InMemoryStateStore::new());
    let scheduler = Arc::new(InMemoryScheduler::new());
    let driver = SyncDriver::new(
        Arc::new(handle),
        Arc::new(Reconciler::new(ledger.clone(), Arc::new(AssetTable::with_defaults()))),
        states.clone(),
        scheduler.clone(),
        10,
    );
    let task = TaskDescriptor::root(StateId::new(cid(), FetchKind::Accounts, None), workflow());
    let (_tx, mut rx) = watch::channel(false);

    let report = driver.run_cycle(&task, &mut rx).await.unwrap();
    assert_eq!(report.children_scheduled, 2);
    assert_eq!(ledger.accounts().await.len(), 2);

    let pending = scheduler.pending().await;
    assert_eq!(pending.len(), 2);
    for ((child, opts), parent) in pending.iter().zip(["acc_a", "acc_b"]) {
        assert_eq!(child.state_id.kind, FetchKind::Balances);
        assert_eq!(child.state_id.scope.as_deref(), Some(parent));
        assert_eq!(
            child.from_payload,
            Some(serde_json::json!({ "iban_ref": parent }))
        );
        assert_eq!(opts.schedule, Schedule::RunNow);
    }

    // replay: children still pending, accounts already applied
    let again = driver.run_cycle(&task, &mut rx).await.unwrap();
    assert_eq!(again.children_scheduled, 0);
    assert_eq!(again.duplicates, 2);
    assert_eq!(scheduler.pending().await.len(), 2);
    assert_eq!(states.write_count(&task.state_id).await, 2);
    assert!(states.load_state(&task.state_id).await.unwrap().is_some());
}
