//! Engine: the installed-connector table and every operation that runs
//! through it.
//!
//! The engine owns no scheduling loop. Install schedules the workflow roots
//! with the external scheduler; the scheduler later hands tasks back through
//! [`Engine::run_task`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pay_connector::{
    ActionStart, BankAccountRequest, ConnectorError, ConnectorHandle, ConnectorRegistry,
    CreateWebhooksRequest, PaymentInitiation, PollOutcome, PspBatch, RegistryError,
    TranslateWebhookRequest,
};
use pay_ids::CompositeId;
use pay_models::{
    AccountId, Capability, Connector, ConnectorId, PaymentId, PspPayment, StateId, Task, TaskId,
    TaskStatus, TradeId, Webhook,
};
use pay_money::AssetTable;
use pay_reconcile::{canonical_payment_reference, ApplyReport, ReconcileError, Reconciler};
use pay_storage::{
    LedgerStore, ScheduleOptions, Scheduler, SchedulerError, StateStore, StorageError,
    TaskDescriptor, WriteOutcome,
};
use pay_trade::{create_payments_from_trade, TradeLegs, TradeMathError};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::driver::{SyncDriver, SyncReport};
use crate::SyncError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("connector {0} is not installed")]
    UnknownConnector(String),
    #[error("no webhook config '{name}' for connector {connector_id}")]
    UnknownWebhook { connector_id: String, name: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    TradeMath(#[from] TradeMathError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub page_size: usize,
    pub call_timeout: Duration,
    /// Webhooks are registered at install only when this is set.
    pub webhook_base_url: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            call_timeout: Duration::from_secs(30),
            webhook_base_url: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Transfer,
    Payout,
}

impl ActionKind {
    fn as_str(self) -> &'static str {
        match self {
            ActionKind::Transfer => "transfer",
            ActionKind::Payout => "payout",
        }
    }
}

/// Where a transfer or payout stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionProgress {
    pub task: Task,
    /// Set while the provider settles asynchronously.
    pub polling_id: Option<String>,
    /// Set once the resulting payment is in the ledger.
    pub payment_id: Option<PaymentId>,
}

pub struct Engine {
    registry: ConnectorRegistry,
    ledger: Arc<dyn LedgerStore>,
    states: Arc<dyn StateStore>,
    scheduler: Arc<dyn Scheduler>,
    reconciler: Arc<Reconciler>,
    settings: EngineSettings,
    handles: RwLock<BTreeMap<ConnectorId, Arc<ConnectorHandle>>>,
    /// Held for the whole of install and uninstall.
    lifecycle: Mutex<()>,
}

impl Engine {
    pub fn new(
        registry: ConnectorRegistry,
        ledger: Arc<dyn LedgerStore>,
        states: Arc<dyn StateStore>,
        scheduler: Arc<dyn Scheduler>,
        assets: Arc<AssetTable>,
        settings: EngineSettings,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(ledger.clone(), assets));
        Self {
            registry,
            ledger,
            states,
            scheduler,
            reconciler,
            settings,
            handles: RwLock::new(BTreeMap::new()),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn installed(&self) -> Vec<ConnectorId> {
        self.handles.read().await.keys().cloned().collect()
    }

    pub async fn handle(&self, connector_id: &ConnectorId) -> Result<Arc<ConnectorHandle>, EngineError> {
        self.handles
            .read()
            .await
            .get(connector_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownConnector(connector_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Install / uninstall
    // -----------------------------------------------------------------------

    /// Install `provider` under `name`.
    ///
    /// Installing the same (provider, name) twice returns the existing id
    /// without calling the adapter again, also when both installs race.
    pub async fn install(
        &self,
        provider: &str,
        name: &str,
        config: &serde_json::Value,
        polling_period: Duration,
        now: DateTime<Utc>,
    ) -> Result<ConnectorId, EngineError> {
        let _lifecycle = self.lifecycle.lock().await;
        let connector_id = ConnectorId::for_installation(provider, name);
        if self.handles.read().await.contains_key(&connector_id) {
            debug!(%connector_id, "connector already installed");
            return Ok(connector_id);
        }

        let adapter = self.registry.create(provider, config)?;
        let handle = Arc::new(
            ConnectorHandle::install(connector_id.clone(), adapter, self.settings.call_timeout)
                .await?,
        );

        self.ledger
            .upsert_connector(Connector {
                id: connector_id.clone(),
                name: name.to_string(),
                created_at: now,
                provider: provider.to_string(),
                config: config.clone(),
                scheduled_for_deletion: false,
                metadata: Default::default(),
                raw: serde_json::json!({
                    "capabilities": handle.capabilities(),
                    "workflow": handle.workflow(),
                }),
            })
            .await?;

        for root in handle.workflow().roots() {
            let task = TaskDescriptor::root(
                StateId::new(connector_id.clone(), root.kind, None),
                root.clone(),
            );
            let opts = if root.periodically {
                ScheduleOptions::periodically(polling_period)
            } else {
                ScheduleOptions::run_now()
            };
            match self.scheduler.schedule(task, opts).await {
                Ok(()) => {}
                Err(e) if e.is_already_scheduled() => {
                    debug!(%connector_id, kind = %root.kind, "root task already scheduled");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(base) = &self.settings.webhook_base_url {
            if handle.capabilities().contains(Capability::CreateWebhooks) {
                let configs = handle
                    .create_webhooks(CreateWebhooksRequest {
                        connector_id: connector_id.clone(),
                        webhook_base_url: base.clone(),
                        from_payload: None,
                    })
                    .await?;
                debug!(%connector_id, webhooks = configs.len(), "webhooks registered");
                self.ledger.upsert_webhook_configs(configs).await?;
            }
        }

        self.handles
            .write()
            .await
            .insert(connector_id.clone(), handle.clone());
        info!(
            %connector_id,
            provider,
            name,
            roots = handle.workflow().roots().len(),
            "connector ready"
        );
        Ok(connector_id)
    }

    /// Drop the handle, let the adapter clean up and flag the stored
    /// connector for deletion. Ledger data stays.
    pub async fn uninstall(&self, connector_id: &ConnectorId) -> Result<(), EngineError> {
        let _lifecycle = self.lifecycle.lock().await;
        let handle = self
            .handles
            .write()
            .await
            .remove(connector_id)
            .ok_or_else(|| EngineError::UnknownConnector(connector_id.to_string()))?;

        if let Err(e) = handle.uninstall().await {
            warn!(%connector_id, error = %e, "adapter uninstall failed");
        }

        let mut stored = self.ledger.get_connector(connector_id).await?;
        stored.scheduled_for_deletion = true;
        self.ledger.upsert_connector(stored).await?;
        info!(%connector_id, "connector uninstalled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    pub async fn driver(&self, connector_id: &ConnectorId) -> Result<SyncDriver, EngineError> {
        Ok(SyncDriver::new(
            self.handle(connector_id).await?,
            self.reconciler.clone(),
            self.states.clone(),
            self.scheduler.clone(),
            self.settings.page_size,
        ))
    }

    /// Entry point for the scheduler.
    pub async fn run_task(
        &self,
        task: &TaskDescriptor,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<SyncReport, EngineError> {
        let driver = self.driver(&task.state_id.connector_id).await?;
        Ok(driver.run_cycle(task, cancel).await?)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub async fn create_bank_account(
        &self,
        connector_id: &ConnectorId,
        req: BankAccountRequest,
    ) -> Result<AccountId, EngineError> {
        let handle = self.handle(connector_id).await?;
        let account = handle.create_bank_account(req).await?;
        let id = AccountId {
            reference: account.reference.clone(),
            connector_id: connector_id.clone(),
        };
        self.reconciler
            .apply_batch(connector_id, &PspBatch::ExternalAccounts(vec![account]))
            .await?;
        info!(%connector_id, account = %id.reference, "bank account created");
        Ok(id)
    }

    /// Start a transfer or payout and record a [`Task`] for it.
    ///
    /// A synchronous rail settles here. Otherwise the task stays
    /// PROCESSING and the caller polls with the returned polling id.
    pub async fn initiate(
        &self,
        connector_id: &ConnectorId,
        kind: ActionKind,
        req: PaymentInitiation,
        now: DateTime<Utc>,
    ) -> Result<ActionProgress, EngineError> {
        let handle = self.handle(connector_id).await?;
        let mut task = Task::processing(
            TaskId {
                reference: format!("{}/{}", kind.as_str(), req.reference),
                connector_id: connector_id.clone(),
            },
            now,
        );
        self.ledger.upsert_task(task.clone()).await?;

        let started = match kind {
            ActionKind::Transfer => handle.create_transfer(req).await,
            ActionKind::Payout => handle.create_payout(req).await,
        };

        match started {
            Err(e) => {
                task.fail(e.to_string(), now);
                self.ledger.upsert_task(task).await?;
                Err(e.into())
            }
            Ok(ActionStart::Immediate(psp)) => {
                let payment_id = self.settle(connector_id, &psp).await?;
                task.succeed(payment_id.encode(), now);
                task.raw = psp.raw;
                self.ledger.upsert_task(task.clone()).await?;
                Ok(ActionProgress {
                    task,
                    polling_id: None,
                    payment_id: Some(payment_id),
                })
            }
            Ok(ActionStart::Polling(polling_id)) => {
                debug!(%connector_id, task = %task.id.reference, %polling_id, "awaiting settlement");
                Ok(ActionProgress {
                    task,
                    polling_id: Some(polling_id),
                    payment_id: None,
                })
            }
        }
    }

    /// Poll an asynchronous transfer or payout once.
    ///
    /// A task that already reached a terminal status is returned untouched.
    pub async fn poll(
        &self,
        connector_id: &ConnectorId,
        kind: ActionKind,
        task_id: &TaskId,
        polling_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ActionProgress, EngineError> {
        let mut task = self.ledger.get_task(task_id).await?;
        if task.status != TaskStatus::Processing {
            return Ok(ActionProgress {
                task,
                polling_id: None,
                payment_id: None,
            });
        }

        let handle = self.handle(connector_id).await?;
        let outcome = match kind {
            ActionKind::Transfer => handle.poll_transfer_status(polling_id).await?,
            ActionKind::Payout => handle.poll_payout_status(polling_id).await?,
        };

        match outcome {
            PollOutcome::Pending => Ok(ActionProgress {
                task,
                polling_id: Some(polling_id.to_string()),
                payment_id: None,
            }),
            PollOutcome::Settled(psp) => {
                let payment_id = self.settle(connector_id, &psp).await?;
                task.succeed(payment_id.encode(), now);
                task.raw = psp.raw;
                self.ledger.upsert_task(task.clone()).await?;
                info!(%connector_id, task = %task.id.reference, "action settled");
                Ok(ActionProgress {
                    task,
                    polling_id: None,
                    payment_id: Some(payment_id),
                })
            }
            PollOutcome::Failed(reason) => {
                warn!(%connector_id, task = %task.id.reference, %reason, "action failed");
                task.fail(reason, now);
                self.ledger.upsert_task(task.clone()).await?;
                Ok(ActionProgress {
                    task,
                    polling_id: None,
                    payment_id: None,
                })
            }
        }
    }

    async fn settle(
        &self,
        connector_id: &ConnectorId,
        psp: &PspPayment,
    ) -> Result<PaymentId, EngineError> {
        self.reconciler.apply_payment(connector_id, psp).await?;
        Ok(PaymentId::new(
            canonical_payment_reference(psp),
            psp.payment_type,
            connector_id.clone(),
        ))
    }

    // -----------------------------------------------------------------------
    // Webhooks
    // -----------------------------------------------------------------------

    /// Record one inbound webhook routed by config `name`, then translate
    /// and apply it. A redelivery under a recorded [`pay_models::WebhookId`]
    /// is still translated; the ledger discards what it already holds.
    pub async fn handle_webhook(
        &self,
        connector_id: &ConnectorId,
        name: &str,
        webhook: Webhook,
    ) -> Result<ApplyReport, EngineError> {
        match self.ledger.get_webhook_config(connector_id, name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                return Err(EngineError::UnknownWebhook {
                    connector_id: connector_id.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        let handle = self.handle(connector_id).await?;
        let webhook_id = webhook.id.clone();
        if self.ledger.store_webhook(webhook.clone()).await? == WriteOutcome::Duplicate {
            debug!(%connector_id, webhook = %webhook_id, "webhook redelivered");
        }
        let translated = handle
            .translate_webhook(TranslateWebhookRequest {
                name: name.to_string(),
                webhook,
            })
            .await?;
        let report = self.reconciler.apply_webhook(connector_id, &translated).await?;
        debug!(
            %connector_id,
            name,
            inserted = report.inserted,
            duplicates = report.duplicates,
            "webhook applied"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Trades
    // -----------------------------------------------------------------------

    /// Derive and store the two ledger legs of a stored trade.
    pub async fn settle_trade(&self, trade_id: &TradeId) -> Result<TradeLegs, EngineError> {
        let trade = self.ledger.get_trade(trade_id).await?;
        let legs = create_payments_from_trade(&trade, self.reconciler.assets())?;
        for (payment, key) in legs.payments() {
            self.ledger.upsert_payment(payment.clone(), &key).await?;
        }
        info!(
            trade = %trade_id.reference,
            warnings = legs.report.warnings.len(),
            "trade legs stored"
        );
        Ok(legs)
    }
}
