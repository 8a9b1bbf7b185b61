//! ConnectorHandle: the single path from the engine to a provider adapter.
//!
//! Every call through a handle is
//! 1. refused with [`ConnectorError::CapabilityNotAdvertised`] when the
//!    operation is outside the set returned by `install`, and
//! 2. bounded by `call_timeout`; elapsing yields a retryable
//!    [`ConnectorError::Timeout`] and the in-flight call is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use num_bigint::Sign;
use pay_models::{
    Capability, CapabilitySet, ConnectorId, FetchKind, PspAccount, WebhookConfig,
};
use tracing::{debug, info, warn};

use crate::connector::Connector;
use crate::types::{
    ActionResponse, ActionStart, BankAccountRequest, CreateWebhooksRequest, FetchNextRequest,
    FetchNextResponse, FetchedPage, InstallResponse, PaymentInitiation, PollOutcome,
    PollResponse, PspBatch, TranslateWebhookRequest, TranslatedWebhook, Workflow,
};
use crate::ConnectorError;

pub struct ConnectorHandle {
    connector_id: ConnectorId,
    connector: Arc<dyn Connector>,
    capabilities: CapabilitySet,
    workflow: Workflow,
    call_timeout: Duration,
}

impl std::fmt::Debug for ConnectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorHandle")
            .field("connector_id", &self.connector_id)
            .field("provider", &self.connector.provider())
            .field("capabilities", &self.capabilities)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

async fn bounded<T, F>(
    call_timeout: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, ConnectorError>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    match tokio::time::timeout(call_timeout, fut).await {
        Ok(res) => res,
        Err(_) => {
            let after_ms = u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, after_ms, "connector call timed out");
            Err(ConnectorError::Timeout {
                operation: operation.to_string(),
                after_ms,
            })
        }
    }
}

fn page<T>(resp: FetchNextResponse<T>, wrap: fn(Vec<T>) -> PspBatch) -> FetchedPage {
    FetchedPage {
        items: wrap(resp.items),
        new_state: resp.new_state,
        has_more: resp.has_more,
    }
}

impl ConnectorHandle {
    /// Run the adapter's install and keep what it advertised.
    ///
    /// A workflow that fetches a kind whose capability is not advertised is
    /// rejected here, so it can never be scheduled.
    pub async fn install(
        connector_id: ConnectorId,
        connector: Arc<dyn Connector>,
        call_timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let resp = bounded(call_timeout, "install", connector.install(&connector_id)).await?;
        let handle = Self::from_install(connector_id, connector, resp, call_timeout)?;
        info!(
            connector_id = %handle.connector_id,
            provider = handle.connector.provider(),
            capabilities = handle.capabilities.len(),
            "connector installed"
        );
        Ok(handle)
    }

    /// Rebuild a handle from a previously stored install response.
    pub fn from_install(
        connector_id: ConnectorId,
        connector: Arc<dyn Connector>,
        resp: InstallResponse,
        call_timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        if let Some(cap) = resp.workflow.first_unadvertised(&resp.capabilities) {
            return Err(ConnectorError::Permanent(format!(
                "workflow requires {cap:?} which the connector does not advertise"
            )));
        }
        Ok(Self {
            connector_id,
            connector,
            capabilities: resp.capabilities,
            workflow: resp.workflow,
            call_timeout,
        })
    }

    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    pub fn provider(&self) -> &str {
        self.connector.provider()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    fn require(&self, capability: Capability) -> Result<(), ConnectorError> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else {
            Err(ConnectorError::CapabilityNotAdvertised { capability })
        }
    }

    pub async fn uninstall(&self) -> Result<(), ConnectorError> {
        bounded(
            self.call_timeout,
            "uninstall",
            self.connector.uninstall(&self.connector_id),
        )
        .await
    }

    /// One fetch-next call for `kind`.
    pub async fn fetch_next(
        &self,
        kind: FetchKind,
        req: FetchNextRequest,
    ) -> Result<FetchedPage, ConnectorError> {
        self.require(kind.capability())?;
        if req.page_size == 0 {
            return Err(ConnectorError::InvalidRequest(
                "page_size must be > 0".to_string(),
            ));
        }
        let page_size = req.page_size;
        let c = &self.connector;
        let t = self.call_timeout;

        let fetched = match kind {
            FetchKind::Accounts => page(
                bounded(t, "fetch_next_accounts", c.fetch_next_accounts(req)).await?,
                PspBatch::Accounts,
            ),
            FetchKind::Balances => page(
                bounded(t, "fetch_next_balances", c.fetch_next_balances(req)).await?,
                PspBatch::Balances,
            ),
            FetchKind::ExternalAccounts => page(
                bounded(
                    t,
                    "fetch_next_external_accounts",
                    c.fetch_next_external_accounts(req),
                )
                .await?,
                PspBatch::ExternalAccounts,
            ),
            FetchKind::Payments => page(
                bounded(t, "fetch_next_payments", c.fetch_next_payments(req)).await?,
                PspBatch::Payments,
            ),
            FetchKind::Orders => page(
                bounded(t, "fetch_next_orders", c.fetch_next_orders(req)).await?,
                PspBatch::Orders,
            ),
            FetchKind::Trades => page(
                bounded(t, "fetch_next_trades", c.fetch_next_trades(req)).await?,
                PspBatch::Trades,
            ),
            FetchKind::Others => page(
                bounded(t, "fetch_next_others", c.fetch_next_others(req)).await?,
                PspBatch::Others,
            ),
        };

        if fetched.items.len() > page_size && !fetched.has_more {
            return Err(ConnectorError::Permanent(format!(
                "{kind}: {} items for page size {page_size} without has_more",
                fetched.items.len()
            )));
        }

        debug!(
            connector_id = %self.connector_id,
            %kind,
            items = fetched.items.len(),
            has_more = fetched.has_more,
            "fetch_next returned"
        );
        Ok(fetched)
    }

    pub async fn create_bank_account(
        &self,
        req: BankAccountRequest,
    ) -> Result<PspAccount, ConnectorError> {
        self.require(Capability::CreateBankAccount)?;
        if req.name.trim().is_empty() {
            return Err(ConnectorError::InvalidRequest(
                "bank account name is empty".to_string(),
            ));
        }
        bounded(
            self.call_timeout,
            "create_bank_account",
            self.connector.create_bank_account(req),
        )
        .await
    }

    pub async fn create_transfer(
        &self,
        req: PaymentInitiation,
    ) -> Result<ActionStart, ConnectorError> {
        self.require(Capability::CreateTransfer)?;
        validate_initiation(&req)?;
        let resp = bounded(
            self.call_timeout,
            "create_transfer",
            self.connector.create_transfer(req),
        )
        .await?;
        action_start(resp)
    }

    pub async fn create_payout(&self, req: PaymentInitiation) -> Result<ActionStart, ConnectorError> {
        self.require(Capability::CreatePayout)?;
        validate_initiation(&req)?;
        let resp = bounded(
            self.call_timeout,
            "create_payout",
            self.connector.create_payout(req),
        )
        .await?;
        action_start(resp)
    }

    pub async fn poll_transfer_status(&self, polling_id: &str) -> Result<PollOutcome, ConnectorError> {
        self.require(Capability::CreateTransfer)?;
        let resp = bounded(
            self.call_timeout,
            "poll_transfer_status",
            self.connector.poll_transfer_status(polling_id),
        )
        .await?;
        poll_outcome(resp)
    }

    pub async fn poll_payout_status(&self, polling_id: &str) -> Result<PollOutcome, ConnectorError> {
        self.require(Capability::CreatePayout)?;
        let resp = bounded(
            self.call_timeout,
            "poll_payout_status",
            self.connector.poll_payout_status(polling_id),
        )
        .await?;
        poll_outcome(resp)
    }

    pub async fn create_webhooks(
        &self,
        req: CreateWebhooksRequest,
    ) -> Result<Vec<WebhookConfig>, ConnectorError> {
        self.require(Capability::CreateWebhooks)?;
        bounded(
            self.call_timeout,
            "create_webhooks",
            self.connector.create_webhooks(req),
        )
        .await
    }

    /// Translate one inbound webhook. Every upsert must carry a key.
    pub async fn translate_webhook(
        &self,
        req: TranslateWebhookRequest,
    ) -> Result<Vec<TranslatedWebhook>, ConnectorError> {
        self.require(Capability::TranslateWebhooks)?;
        let out = bounded(
            self.call_timeout,
            "translate_webhook",
            self.connector.translate_webhook(req),
        )
        .await?;
        if out.iter().any(|t| t.idempotency_key.trim().is_empty()) {
            return Err(ConnectorError::Permanent(
                "translated webhook without idempotency key".to_string(),
            ));
        }
        Ok(out)
    }
}

fn validate_initiation(req: &PaymentInitiation) -> Result<(), ConnectorError> {
    if req.reference.trim().is_empty() {
        return Err(ConnectorError::InvalidRequest("reference is empty".to_string()));
    }
    if req.destination_account_reference.trim().is_empty() {
        return Err(ConnectorError::InvalidRequest(
            "destination account is empty".to_string(),
        ));
    }
    if req.amount.sign() != Sign::Plus {
        return Err(ConnectorError::InvalidRequest(format!(
            "amount must be positive, got {}",
            req.amount
        )));
    }
    Ok(())
}

fn action_start(resp: ActionResponse) -> Result<ActionStart, ConnectorError> {
    match (resp.payment, resp.polling_id) {
        (Some(p), None) => Ok(ActionStart::Immediate(p)),
        (None, Some(id)) if !id.is_empty() => Ok(ActionStart::Polling(id)),
        (Some(_), Some(_)) => Err(ConnectorError::Permanent(
            "connector returned both a payment and a polling id".to_string(),
        )),
        _ => Err(ConnectorError::Permanent(
            "connector returned neither a payment nor a polling id".to_string(),
        )),
    }
}

fn poll_outcome(resp: PollResponse) -> Result<PollOutcome, ConnectorError> {
    match (resp.payment, resp.error) {
        (None, None) => Ok(PollOutcome::Pending),
        (Some(p), None) => Ok(PollOutcome::Settled(p)),
        (None, Some(e)) => Ok(PollOutcome::Failed(e)),
        (Some(_), Some(_)) => Err(ConnectorError::Permanent(
            "poll returned both a payment and an error".to_string(),
        )),
    }
}
