use async_trait::async_trait;
use pay_connector::CursorState;
use pay_models::{
    Account, AccountId, Balance, Connector, ConnectorId, Order, OrderId, Payment, PaymentId,
    PspOther, StateId, Task, TaskId, Trade, TradeId, Webhook, WebhookConfig, WebhookId,
};

use crate::StorageError;

/// Outcome of a keyed write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    /// Key already applied. Nothing changed.
    Duplicate,
}

/// Ledger persistence.
///
/// Every `upsert_*` takes the idempotency key of the change being applied.
/// A key seen before is a no-op returning [`WriteOutcome::Duplicate`]; two
/// writers racing on the same key must both succeed. Entities with an
/// adjustment history are merged, never replaced: the stored adjustment list
/// only grows.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn upsert_account(&self, account: Account, key: &str) -> Result<WriteOutcome, StorageError>;
    async fn upsert_balance(&self, balance: Balance, key: &str) -> Result<WriteOutcome, StorageError>;
    async fn upsert_payment(&self, payment: Payment, key: &str) -> Result<WriteOutcome, StorageError>;
    async fn upsert_order(&self, order: Order, key: &str) -> Result<WriteOutcome, StorageError>;
    async fn upsert_trade(&self, trade: Trade, key: &str) -> Result<WriteOutcome, StorageError>;
    async fn upsert_other(
        &self,
        connector_id: &ConnectorId,
        other: PspOther,
        key: &str,
    ) -> Result<WriteOutcome, StorageError>;

    async fn upsert_connector(&self, connector: Connector) -> Result<(), StorageError>;
    async fn upsert_task(&self, task: Task) -> Result<(), StorageError>;
    async fn upsert_webhook_configs(&self, configs: Vec<WebhookConfig>) -> Result<(), StorageError>;
    /// Record an inbound delivery under its [`WebhookId`]. A redelivery with
    /// an id already stored is [`WriteOutcome::Duplicate`].
    async fn store_webhook(&self, webhook: Webhook) -> Result<WriteOutcome, StorageError>;

    async fn get_account(&self, id: &AccountId) -> Result<Account, StorageError>;
    async fn get_payment(&self, id: &PaymentId) -> Result<Payment, StorageError>;
    async fn get_order(&self, id: &OrderId) -> Result<Order, StorageError>;
    async fn get_trade(&self, id: &TradeId) -> Result<Trade, StorageError>;
    async fn get_connector(&self, id: &ConnectorId) -> Result<Connector, StorageError>;
    async fn get_task(&self, id: &TaskId) -> Result<Task, StorageError>;
    async fn list_balances(&self, account_id: &AccountId) -> Result<Vec<Balance>, StorageError>;
    async fn get_webhook_config(
        &self,
        connector_id: &ConnectorId,
        name: &str,
    ) -> Result<WebhookConfig, StorageError>;
    async fn get_webhook(&self, id: &WebhookId) -> Result<Webhook, StorageError>;
}

/// Cursor persistence. `store_state` is a single atomic write; a reader that
/// runs after it returns sees the new value.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_state(&self, id: &StateId) -> Result<Option<CursorState>, StorageError>;
    async fn store_state(&self, id: &StateId, state: CursorState) -> Result<(), StorageError>;
}
