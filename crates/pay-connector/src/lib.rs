//! pay-connector
//!
//! Provider adapter contract and the engine-side handle around it.
//!
//! - [`Connector`]: the trait every provider adapter implements
//! - [`ConnectorHandle`]: capability gate + timeout bound, the only way the
//!   engine reaches an adapter
//! - [`ConnectorRegistry`]: provider name -> adapter factory
//! - [`CursorState`]: opaque per-(connector, kind) resume token
//!
//! The transport between engine and adapter is not modelled here; an
//! out-of-process adapter is just another `Connector` implementation.

mod connector;
mod handle;
mod registry;
mod state;
mod types;

pub use connector::Connector;
pub use handle::ConnectorHandle;
pub use registry::{ConnectorFactory, ConnectorRegistry, RegistryError};
pub use state::CursorState;
pub use types::{
    ActionResponse, ActionStart, BankAccountRequest, CreateWebhooksRequest, FetchNextRequest,
    FetchNextResponse, FetchedPage, InstallResponse, PaymentInitiation, PollOutcome,
    PollResponse, PspBatch, TaskNode, TranslateWebhookRequest, TranslatedWebhook, WebhookUpsert,
    Workflow,
};

use pay_models::Capability;

/// Failures of a connector call.
///
/// Transient failures are retried by the scheduler with the same unconsumed
/// cursor; everything else halts the (connector, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    /// Network failure, rate limit, 5xx.
    #[error("transient connector error: {0}")]
    Transient(String),
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },
    /// Invalid credentials, provider-side rejection, contract violation.
    #[error("permanent connector error: {0}")]
    Permanent(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{operation} is not implemented by this connector")]
    NotImplemented { operation: String },
    #[error("capability {capability:?} was not advertised at install")]
    CapabilityNotAdvertised { capability: Capability },
    #[error("connector call cancelled")]
    Cancelled,
}

impl ConnectorError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectorError::Transient(_) | ConnectorError::Timeout { .. }
        )
    }
}
