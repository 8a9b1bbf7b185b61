//! In-memory implementations. Same semantics as a real backend: keyed
//! dedupe, merge-on-upsert for adjustment histories, atomic cursor writes.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use pay_connector::CursorState;
use pay_ids::CompositeId;
use pay_models::{
    Account, AccountId, Balance, BalanceId, Connector, ConnectorId, Order, OrderId, Payment,
    PaymentId, PspOther, StateId, Task, TaskId, Trade, TradeId, Webhook, WebhookConfig, WebhookId,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    LedgerStore, ScheduleOptions, Scheduler, SchedulerError, StateStore, StorageError,
    TaskDescriptor, WriteOutcome,
};

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Ledger {
    keys: HashSet<String>,
    accounts: BTreeMap<AccountId, Account>,
    balances: BTreeMap<BalanceId, Balance>,
    payments: BTreeMap<PaymentId, Payment>,
    orders: BTreeMap<OrderId, Order>,
    trades: BTreeMap<TradeId, Trade>,
    others: BTreeMap<(ConnectorId, String), PspOther>,
    connectors: BTreeMap<ConnectorId, Connector>,
    tasks: BTreeMap<TaskId, Task>,
    webhook_configs: BTreeMap<(ConnectorId, String), WebhookConfig>,
    webhooks: BTreeMap<WebhookId, Webhook>,
}

impl Ledger {
    /// `true` when `key` is new and has been claimed.
    fn claim(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            debug!(key, "duplicate idempotency key, skipping write");
            return false;
        }
        self.keys.insert(key.to_string());
        true
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    inner: RwLock<Ledger>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn applied_keys(&self) -> usize {
        self.inner.read().await.keys.len()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.inner.read().await.payments.values().cloned().collect()
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.inner.read().await.accounts.values().cloned().collect()
    }

    pub async fn others(&self) -> Vec<PspOther> {
        self.inner.read().await.others.values().cloned().collect()
    }
}

fn merge_err(e: pay_models::ModelError) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn upsert_account(&self, account: Account, key: &str) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if !g.claim(key) {
            return Ok(WriteOutcome::Duplicate);
        }
        match g.accounts.get_mut(&account.id) {
            Some(existing) => existing.metadata.extend(account.metadata),
            None => {
                g.accounts.insert(account.id.clone(), account);
            }
        }
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert_balance(&self, balance: Balance, key: &str) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if !g.claim(key) {
            return Ok(WriteOutcome::Duplicate);
        }
        g.balances.insert(balance.id(), balance);
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert_payment(&self, payment: Payment, key: &str) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if g.keys.contains(key) {
            debug!(key, "duplicate idempotency key, skipping write");
            return Ok(WriteOutcome::Duplicate);
        }
        match g.payments.get_mut(&payment.id) {
            Some(existing) => {
                existing.merge(payment).map_err(merge_err)?;
            }
            None => {
                g.payments.insert(payment.id.clone(), payment);
            }
        }
        g.keys.insert(key.to_string());
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert_order(&self, order: Order, key: &str) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if g.keys.contains(key) {
            debug!(key, "duplicate idempotency key, skipping write");
            return Ok(WriteOutcome::Duplicate);
        }
        match g.orders.get_mut(&order.id) {
            Some(existing) => {
                existing.merge(order).map_err(merge_err)?;
            }
            None => {
                g.orders.insert(order.id.clone(), order);
            }
        }
        g.keys.insert(key.to_string());
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert_trade(&self, trade: Trade, key: &str) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if g.keys.contains(key) {
            debug!(key, "duplicate idempotency key, skipping write");
            return Ok(WriteOutcome::Duplicate);
        }
        match g.trades.get_mut(&trade.id) {
            Some(existing) => {
                existing.merge(trade).map_err(merge_err)?;
            }
            None => {
                g.trades.insert(trade.id.clone(), trade);
            }
        }
        g.keys.insert(key.to_string());
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert_other(
        &self,
        connector_id: &ConnectorId,
        other: PspOther,
        key: &str,
    ) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if !g.claim(key) {
            return Ok(WriteOutcome::Duplicate);
        }
        g.others
            .insert((connector_id.clone(), other.id.clone()), other);
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert_connector(&self, connector: Connector) -> Result<(), StorageError> {
        self.inner
            .write()
            .await
            .connectors
            .insert(connector.id.clone(), connector);
        Ok(())
    }

    async fn upsert_task(&self, task: Task) -> Result<(), StorageError> {
        self.inner.write().await.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn upsert_webhook_configs(&self, configs: Vec<WebhookConfig>) -> Result<(), StorageError> {
        let mut g = self.inner.write().await;
        for c in configs {
            g.webhook_configs
                .insert((c.connector_id.clone(), c.name.clone()), c);
        }
        Ok(())
    }

    async fn store_webhook(&self, webhook: Webhook) -> Result<WriteOutcome, StorageError> {
        let mut g = self.inner.write().await;
        if g.webhooks.contains_key(&webhook.id) {
            debug!(webhook = %webhook.id, "webhook delivery already recorded");
            return Ok(WriteOutcome::Duplicate);
        }
        g.webhooks.insert(webhook.id.clone(), webhook);
        Ok(WriteOutcome::Inserted)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Account, StorageError> {
        self.inner
            .read()
            .await
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("account", id.encode()))
    }

    async fn get_payment(&self, id: &PaymentId) -> Result<Payment, StorageError> {
        self.inner
            .read()
            .await
            .payments
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("payment", id.encode()))
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, StorageError> {
        self.inner
            .read()
            .await
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("order", id.encode()))
    }

    async fn get_trade(&self, id: &TradeId) -> Result<Trade, StorageError> {
        self.inner
            .read()
            .await
            .trades
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("trade", id.encode()))
    }

    async fn get_connector(&self, id: &ConnectorId) -> Result<Connector, StorageError> {
        self.inner
            .read()
            .await
            .connectors
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("connector", id.encode()))
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, StorageError> {
        self.inner
            .read()
            .await
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("task", id.encode()))
    }

    async fn list_balances(&self, account_id: &AccountId) -> Result<Vec<Balance>, StorageError> {
        Ok(self
            .inner
            .read()
            .await
            .balances
            .values()
            .filter(|b| &b.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn get_webhook_config(
        &self,
        connector_id: &ConnectorId,
        name: &str,
    ) -> Result<WebhookConfig, StorageError> {
        self.inner
            .read()
            .await
            .webhook_configs
            .get(&(connector_id.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found("webhook config", name))
    }

    async fn get_webhook(&self, id: &WebhookId) -> Result<Webhook, StorageError> {
        self.inner
            .read()
            .await
            .webhooks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("webhook", id.encode()))
    }
}

// ---------------------------------------------------------------------------
// Cursor state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct States {
    current: HashMap<StateId, CursorState>,
    writes: HashMap<StateId, usize>,
}

#[derive(Default)]
pub struct InMemoryStateStore {
    inner: RwLock<States>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the cursor for `id` has been written.
    pub async fn write_count(&self, id: &StateId) -> usize {
        self.inner.read().await.writes.get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_state(&self, id: &StateId) -> Result<Option<CursorState>, StorageError> {
        Ok(self.inner.read().await.current.get(id).cloned())
    }

    async fn store_state(&self, id: &StateId, state: CursorState) -> Result<(), StorageError> {
        let mut g = self.inner.write().await;
        g.current.insert(id.clone(), state);
        *g.writes.entry(id.clone()).or_insert(0) += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Queue {
    pending: Vec<(TaskDescriptor, ScheduleOptions)>,
    ids: HashSet<String>,
}

/// Records scheduled tasks; a test or an embedding loop drains and runs
/// them.
#[derive(Default)]
pub struct InMemoryScheduler {
    inner: RwLock<Queue>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending(&self) -> Vec<(TaskDescriptor, ScheduleOptions)> {
        self.inner.read().await.pending.clone()
    }

    /// Remove and return every pending task. Their ids become schedulable
    /// again.
    pub async fn take_pending(&self) -> Vec<(TaskDescriptor, ScheduleOptions)> {
        let mut g = self.inner.write().await;
        g.ids.clear();
        std::mem::take(&mut g.pending)
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn schedule(&self, task: TaskDescriptor, opts: ScheduleOptions) -> Result<(), SchedulerError> {
        let id = task.task_id();
        let mut g = self.inner.write().await;
        if !g.ids.insert(id.clone()) {
            return Err(SchedulerError::AlreadyScheduled(id));
        }
        g.pending.push((task, opts));
        Ok(())
    }
}
