//! Request / response shapes of the connector contract.

use num_bigint::BigInt;
use pay_models::{
    Capability, CapabilitySet, ConnectorId, FetchKind, Metadata, PspAccount, PspBalance, PspOrder,
    PspOther, PspPayment, PspTrade, Webhook,
};
use serde::{Deserialize, Serialize};

use crate::state::CursorState;

// ---------------------------------------------------------------------------
// Fetch-next
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchNextRequest {
    /// Raw payload of the parent item when this fetch runs as a child task
    /// (e.g. the account whose balances are being fetched).
    pub from_payload: Option<serde_json::Value>,
    pub state: CursorState,
    pub page_size: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchNextResponse<T> {
    pub items: Vec<T>,
    pub new_state: CursorState,
    pub has_more: bool,
}

/// One page of any fetchable kind.
#[derive(Clone, Debug, PartialEq)]
pub enum PspBatch {
    Accounts(Vec<PspAccount>),
    Balances(Vec<PspBalance>),
    ExternalAccounts(Vec<PspAccount>),
    Payments(Vec<PspPayment>),
    Orders(Vec<PspOrder>),
    Trades(Vec<PspTrade>),
    Others(Vec<PspOther>),
}

impl PspBatch {
    pub fn kind(&self) -> FetchKind {
        match self {
            PspBatch::Accounts(_) => FetchKind::Accounts,
            PspBatch::Balances(_) => FetchKind::Balances,
            PspBatch::ExternalAccounts(_) => FetchKind::ExternalAccounts,
            PspBatch::Payments(_) => FetchKind::Payments,
            PspBatch::Orders(_) => FetchKind::Orders,
            PspBatch::Trades(_) => FetchKind::Trades,
            PspBatch::Others(_) => FetchKind::Others,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PspBatch::Accounts(v) | PspBatch::ExternalAccounts(v) => v.len(),
            PspBatch::Balances(v) => v.len(),
            PspBatch::Payments(v) => v.len(),
            PspBatch::Orders(v) => v.len(),
            PspBatch::Trades(v) => v.len(),
            PspBatch::Others(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(reference, raw payload)` of every item, in page order. Child tasks
    /// run once per entry with the payload as `from_payload`.
    pub fn parents(&self) -> Vec<(String, serde_json::Value)> {
        match self {
            PspBatch::Accounts(v) | PspBatch::ExternalAccounts(v) => v
                .iter()
                .map(|a| (a.reference.clone(), a.raw.clone()))
                .collect(),
            PspBatch::Balances(v) => v
                .iter()
                .map(|b| {
                    let raw = serde_json::to_value(b).unwrap_or_default();
                    (format!("{}/{}", b.account_reference, b.asset), raw)
                })
                .collect(),
            PspBatch::Payments(v) => v
                .iter()
                .map(|p| (p.reference.clone(), p.raw.clone()))
                .collect(),
            PspBatch::Orders(v) => v
                .iter()
                .map(|o| (o.reference.clone(), o.raw.clone()))
                .collect(),
            PspBatch::Trades(v) => v
                .iter()
                .map(|t| (t.reference.clone(), t.raw.clone()))
                .collect(),
            PspBatch::Others(v) => v.iter().map(|o| (o.id.clone(), o.other.clone())).collect(),
        }
    }
}

/// A fetched page with its kind resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedPage {
    pub items: PspBatch,
    pub new_state: CursorState,
    pub has_more: bool,
}

// ---------------------------------------------------------------------------
// Install
// ---------------------------------------------------------------------------

/// One node of the fetch workflow a connector declares at install time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub kind: FetchKind,
    /// Re-run on the connector's polling period (top-level nodes only).
    #[serde(default)]
    pub periodically: bool,
    /// Run once per item fetched by this node.
    #[serde(default)]
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    pub fn new(kind: FetchKind) -> Self {
        Self {
            kind,
            periodically: false,
            children: Vec::new(),
        }
    }

    pub fn periodically(mut self) -> Self {
        self.periodically = true;
        self
    }

    pub fn child(mut self, node: TaskNode) -> Self {
        self.children.push(node);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow(pub Vec<TaskNode>);

impl Workflow {
    pub fn roots(&self) -> &[TaskNode] {
        &self.0
    }

    /// Every kind reachable in the tree, depth-first.
    pub fn kinds(&self) -> Vec<FetchKind> {
        fn walk(nodes: &[TaskNode], out: &mut Vec<FetchKind>) {
            for n in nodes {
                out.push(n.kind);
                walk(&n.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.0, &mut out);
        out
    }

    /// First fetch kind whose capability is missing from `caps`.
    pub fn first_unadvertised(&self, caps: &CapabilitySet) -> Option<Capability> {
        self.kinds()
            .into_iter()
            .map(|k| k.capability())
            .find(|c| !caps.contains(*c))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallResponse {
    pub capabilities: CapabilitySet,
    pub workflow: Workflow,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountRequest {
    pub name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub swift_bic_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Transfer or payout instruction. `reference` doubles as the provider-side
/// idempotency reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub reference: String,
    pub source_account_reference: Option<String>,
    pub destination_account_reference: String,
    #[serde(with = "pay_money::serde_amount")]
    pub amount: BigInt,
    pub asset: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// What a connector answers to a transfer/payout creation. Exactly one of
/// the two must be set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub payment: Option<PspPayment>,
    pub polling_id: Option<String>,
}

/// Validated [`ActionResponse`].
#[derive(Clone, Debug, PartialEq)]
pub enum ActionStart {
    /// Synchronous rail: the payment exists already.
    Immediate(PspPayment),
    /// Asynchronous settlement: poll with this id.
    Polling(String),
}

/// Raw poll answer. Neither set means still pending.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub payment: Option<PspPayment>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    Pending,
    Settled(PspPayment),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateWebhooksRequest {
    pub connector_id: ConnectorId,
    pub webhook_base_url: String,
    #[serde(default)]
    pub from_payload: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranslateWebhookRequest {
    /// Name of the [`pay_models::WebhookConfig`] the request was routed by.
    pub name: String,
    pub webhook: Webhook,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WebhookUpsert {
    Account(PspAccount),
    ExternalAccount(PspAccount),
    Balance(PspBalance),
    Payment(PspPayment),
    Order(PspOrder),
    Trade(PspTrade),
}

/// One ledger-shaped change carried by an inbound webhook.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslatedWebhook {
    pub idempotency_key: String,
    pub upsert: WebhookUpsert,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_kinds_are_depth_first() {
        let wf = Workflow(vec![
            TaskNode::new(FetchKind::Accounts)
                .periodically()
                .child(TaskNode::new(FetchKind::Balances))
                .child(TaskNode::new(FetchKind::Payments)),
            TaskNode::new(FetchKind::ExternalAccounts).periodically(),
        ]);
        assert_eq!(
            wf.kinds(),
            vec![
                FetchKind::Accounts,
                FetchKind::Balances,
                FetchKind::Payments,
                FetchKind::ExternalAccounts
            ]
        );
    }

    #[test]
    fn unadvertised_child_is_detected() {
        let wf = Workflow(vec![
            TaskNode::new(FetchKind::Accounts).child(TaskNode::new(FetchKind::Balances))
        ]);
        let caps: CapabilitySet = [Capability::FetchAccounts].into_iter().collect();
        assert_eq!(wf.first_unadvertised(&caps), Some(Capability::FetchBalances));
    }
}
