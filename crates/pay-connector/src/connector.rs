use async_trait::async_trait;
use pay_models::{
    ConnectorId, PspAccount, PspBalance, PspOrder, PspOther, PspPayment, PspTrade, WebhookConfig,
};

use crate::types::{
    ActionResponse, BankAccountRequest, CreateWebhooksRequest, FetchNextRequest,
    FetchNextResponse, InstallResponse, PaymentInitiation, PollResponse, TranslateWebhookRequest,
    TranslatedWebhook,
};
use crate::ConnectorError;

fn not_implemented(operation: &str) -> ConnectorError {
    ConnectorError::NotImplemented {
        operation: operation.to_string(),
    }
}

/// Provider adapter contract.
///
/// Every operation has a default returning [`ConnectorError::NotImplemented`];
/// an adapter overrides what it advertises in [`Connector::install`]. The
/// engine never calls an adapter directly but through
/// [`ConnectorHandle`](crate::ConnectorHandle), which refuses operations
/// outside the advertised set and bounds every call by a timeout.
///
/// Fetch contract: return at most `page_size` items per call and set
/// `has_more` when another call with `new_state` would return more. A call
/// that fails never advances the cursor; the next attempt resumes from the
/// last persisted state.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Provider name as registered (e.g. `"stripe"`).
    fn provider(&self) -> &str;

    async fn install(&self, connector_id: &ConnectorId) -> Result<InstallResponse, ConnectorError>;

    async fn uninstall(&self, _connector_id: &ConnectorId) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn fetch_next_accounts(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspAccount>, ConnectorError> {
        Err(not_implemented("fetch_next_accounts"))
    }

    async fn fetch_next_balances(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspBalance>, ConnectorError> {
        Err(not_implemented("fetch_next_balances"))
    }

    async fn fetch_next_external_accounts(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspAccount>, ConnectorError> {
        Err(not_implemented("fetch_next_external_accounts"))
    }

    async fn fetch_next_payments(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspPayment>, ConnectorError> {
        Err(not_implemented("fetch_next_payments"))
    }

    async fn fetch_next_orders(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspOrder>, ConnectorError> {
        Err(not_implemented("fetch_next_orders"))
    }

    async fn fetch_next_trades(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspTrade>, ConnectorError> {
        Err(not_implemented("fetch_next_trades"))
    }

    async fn fetch_next_others(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspOther>, ConnectorError> {
        Err(not_implemented("fetch_next_others"))
    }

    async fn create_bank_account(
        &self,
        _req: BankAccountRequest,
    ) -> Result<PspAccount, ConnectorError> {
        Err(not_implemented("create_bank_account"))
    }

    async fn create_transfer(
        &self,
        _req: PaymentInitiation,
    ) -> Result<ActionResponse, ConnectorError> {
        Err(not_implemented("create_transfer"))
    }

    async fn create_payout(&self, _req: PaymentInitiation) -> Result<ActionResponse, ConnectorError> {
        Err(not_implemented("create_payout"))
    }

    async fn poll_transfer_status(&self, _polling_id: &str) -> Result<PollResponse, ConnectorError> {
        Err(not_implemented("poll_transfer_status"))
    }

    async fn poll_payout_status(&self, _polling_id: &str) -> Result<PollResponse, ConnectorError> {
        Err(not_implemented("poll_payout_status"))
    }

    async fn create_webhooks(
        &self,
        _req: CreateWebhooksRequest,
    ) -> Result<Vec<WebhookConfig>, ConnectorError> {
        Err(not_implemented("create_webhooks"))
    }

    async fn translate_webhook(
        &self,
        _req: TranslateWebhookRequest,
    ) -> Result<Vec<TranslatedWebhook>, ConnectorError> {
        Err(not_implemented("translate_webhook"))
    }
}
