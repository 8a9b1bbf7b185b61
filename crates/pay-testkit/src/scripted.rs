use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use pay_connector::{
    ActionResponse, BankAccountRequest, Connector, ConnectorError, CreateWebhooksRequest,
    CursorState, FetchNextRequest, FetchNextResponse, FetchedPage, InstallResponse,
    PaymentInitiation, PollResponse, PspBatch, TranslateWebhookRequest, TranslatedWebhook,
    Workflow,
};
use pay_models::{
    Capability, CapabilitySet, ConnectorId, FetchKind, PspAccount, PspBalance, PspOrder,
    PspOther, PspPayment, PspTrade, WebhookConfig,
};

/// One recorded adapter invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub operation: &'static str,
    /// Cursor the call was made with (fetches only).
    pub state: Option<CursorState>,
    pub from_payload: Option<serde_json::Value>,
}

impl Call {
    fn op(operation: &'static str) -> Self {
        Self {
            operation,
            state: None,
            from_payload: None,
        }
    }
}

#[derive(Default)]
struct Script {
    pages: BTreeMap<FetchKind, VecDeque<Result<FetchedPage, ConnectorError>>>,
    actions: VecDeque<Result<ActionResponse, ConnectorError>>,
    polls: VecDeque<Result<PollResponse, ConnectorError>>,
    bank_accounts: VecDeque<Result<PspAccount, ConnectorError>>,
    webhooks: Vec<WebhookConfig>,
    translations: VecDeque<Result<Vec<TranslatedWebhook>, ConnectorError>>,
    calls: Vec<Call>,
    uninstalled: bool,
}

/// Fake adapter driven by pre-scripted answers.
///
/// - fetches pop the next scripted page for their kind; an exhausted script
///   answers an empty final page that keeps the caller's cursor
/// - actions, polls and webhook translations pop their own queues; an
///   exhausted queue is a permanent error
/// - every invocation is recorded in [`calls`](Self::calls)
pub struct ScriptedConnector {
    provider: String,
    capabilities: CapabilitySet,
    workflow: Workflow,
    script: Mutex<Script>,
}

impl ScriptedConnector {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            capabilities: CapabilitySet::default(),
            workflow: Workflow::default(),
            script: Mutex::new(Script::default()),
        }
    }

    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = caps.into_iter().collect();
        self
    }

    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn with_webhooks(self, configs: Vec<WebhookConfig>) -> Self {
        self.lock().webhooks = configs;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // a panicking test thread must not hide the script from the others
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Queue a page; its kind is taken from the batch.
    pub fn push_page(&self, page: FetchedPage) {
        let kind = page.items.kind();
        self.lock().pages.entry(kind).or_default().push_back(Ok(page));
    }

    pub fn push_fetch_error(&self, kind: FetchKind, err: ConnectorError) {
        self.lock().pages.entry(kind).or_default().push_back(Err(err));
    }

    pub fn push_action(&self, resp: Result<ActionResponse, ConnectorError>) {
        self.lock().actions.push_back(resp);
    }

    pub fn push_poll(&self, resp: Result<PollResponse, ConnectorError>) {
        self.lock().polls.push_back(resp);
    }

    pub fn push_bank_account(&self, resp: Result<PspAccount, ConnectorError>) {
        self.lock().bank_accounts.push_back(resp);
    }

    pub fn push_translation(&self, resp: Result<Vec<TranslatedWebhook>, ConnectorError>) {
        self.lock().translations.push_back(resp);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn was_uninstalled(&self) -> bool {
        self.lock().uninstalled
    }

    fn next_page(
        &self,
        operation: &'static str,
        kind: FetchKind,
        req: FetchNextRequest,
    ) -> Result<FetchedPage, ConnectorError> {
        let mut s = self.lock();
        s.calls.push(Call {
            operation,
            state: Some(req.state.clone()),
            from_payload: req.from_payload.clone(),
        });
        match s.pages.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(next) => next,
            None => Ok(FetchedPage {
                items: empty_batch(kind),
                new_state: req.state,
                has_more: false,
            }),
        }
    }

    fn pop<T>(
        &self,
        operation: &'static str,
        queue: impl FnOnce(&mut Script) -> Option<Result<T, ConnectorError>>,
    ) -> Result<T, ConnectorError> {
        let mut s = self.lock();
        s.calls.push(Call::op(operation));
        queue(&mut *s).unwrap_or_else(|| {
            Err(ConnectorError::Permanent(format!(
                "{operation}: script exhausted"
            )))
        })
    }
}

fn empty_batch(kind: FetchKind) -> PspBatch {
    match kind {
        FetchKind::Accounts => PspBatch::Accounts(vec![]),
        FetchKind::Balances => PspBatch::Balances(vec![]),
        FetchKind::ExternalAccounts => PspBatch::ExternalAccounts(vec![]),
        FetchKind::Payments => PspBatch::Payments(vec![]),
        FetchKind::Orders => PspBatch::Orders(vec![]),
        FetchKind::Trades => PspBatch::Trades(vec![]),
        FetchKind::Others => PspBatch::Others(vec![]),
    }
}

fn mismatch(kind: FetchKind) -> ConnectorError {
    ConnectorError::Permanent(format!("scripted page is not a {kind} batch"))
}

macro_rules! unwrap_page {
    ($page:expr, $kind:expr, $variant:path) => {{
        let page = $page?;
        match page.items {
            $variant(items) => Ok(FetchNextResponse {
                items,
                new_state: page.new_state,
                has_more: page.has_more,
            }),
            _ => Err(mismatch($kind)),
        }
    }};
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn install(&self, _connector_id: &ConnectorId) -> Result<InstallResponse, ConnectorError> {
        self.lock().calls.push(Call::op("install"));
        Ok(InstallResponse {
            capabilities: self.capabilities.clone(),
            workflow: self.workflow.clone(),
        })
    }

    async fn uninstall(&self, _connector_id: &ConnectorId) -> Result<(), ConnectorError> {
        let mut s = self.lock();
        s.calls.push(Call::op("uninstall"));
        s.uninstalled = true;
        Ok(())
    }

    async fn fetch_next_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspAccount>, ConnectorError> {
        let k = FetchKind::Accounts;
        unwrap_page!(self.next_page("fetch_next_accounts", k, req), k, PspBatch::Accounts)
    }

    async fn fetch_next_balances(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspBalance>, ConnectorError> {
        let k = FetchKind::Balances;
        unwrap_page!(self.next_page("fetch_next_balances", k, req), k, PspBatch::Balances)
    }

    async fn fetch_next_external_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspAccount>, ConnectorError> {
        let k = FetchKind::ExternalAccounts;
        unwrap_page!(
            self.next_page("fetch_next_external_accounts", k, req),
            k,
            PspBatch::ExternalAccounts
        )
    }

    async fn fetch_next_payments(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspPayment>, ConnectorError> {
        let k = FetchKind::Payments;
        unwrap_page!(self.next_page("fetch_next_payments", k, req), k, PspBatch::Payments)
    }

    async fn fetch_next_orders(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspOrder>, ConnectorError> {
        let k = FetchKind::Orders;
        unwrap_page!(self.next_page("fetch_next_orders", k, req), k, PspBatch::Orders)
    }

    async fn fetch_next_trades(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspTrade>, ConnectorError> {
        let k = FetchKind::Trades;
        unwrap_page!(self.next_page("fetch_next_trades", k, req), k, PspBatch::Trades)
    }

    async fn fetch_next_others(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextResponse<PspOther>, ConnectorError> {
        let k = FetchKind::Others;
        unwrap_page!(self.next_page("fetch_next_others", k, req), k, PspBatch::Others)
    }

    async fn create_bank_account(
        &self,
        _req: BankAccountRequest,
    ) -> Result<PspAccount, ConnectorError> {
        self.pop("create_bank_account", |s| s.bank_accounts.pop_front())
    }

    async fn create_transfer(
        &self,
        _req: PaymentInitiation,
    ) -> Result<ActionResponse, ConnectorError> {
        self.pop("create_transfer", |s| s.actions.pop_front())
    }

    async fn create_payout(&self, _req: PaymentInitiation) -> Result<ActionResponse, ConnectorError> {
        self.pop("create_payout", |s| s.actions.pop_front())
    }

    async fn poll_transfer_status(&self, _polling_id: &str) -> Result<PollResponse, ConnectorError> {
        self.pop("poll_transfer_status", |s| s.polls.pop_front())
    }

    async fn poll_payout_status(&self, _polling_id: &str) -> Result<PollResponse, ConnectorError> {
        self.pop("poll_payout_status", |s| s.polls.pop_front())
    }

    async fn create_webhooks(
        &self,
        req: CreateWebhooksRequest,
    ) -> Result<Vec<WebhookConfig>, ConnectorError> {
        let mut s = self.lock();
        s.calls.push(Call::op("create_webhooks"));
        Ok(s.webhooks
            .iter()
            .cloned()
            .map(|mut c| {
                c.connector_id = req.connector_id.clone();
                c
            })
            .collect())
    }

    async fn translate_webhook(
        &self,
        _req: TranslateWebhookRequest,
    ) -> Result<Vec<TranslatedWebhook>, ConnectorError> {
        self.pop("translate_webhook", |s| s.translations.pop_front())
    }
}
