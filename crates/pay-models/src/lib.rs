//! pay-models
//!
//! Canonical ledger model:
//! - composite identifiers ([`ids`])
//! - ledger entities with append-only adjustment histories
//! - provider-shaped records returned by connectors ([`psp`])
//! - connector capabilities and fetchable kinds
//!
//! Pure data. Nothing here talks to a provider or a store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub mod account;
pub mod capability;
pub mod connector;
pub mod enums;
pub mod ids;
pub mod order;
pub mod payment;
pub mod psp;
pub mod trade;

pub use account::{Account, Balance};
pub use capability::{Capability, CapabilitySet, FetchKind};
pub use connector::{Connector, Task, Webhook, WebhookConfig};
pub use enums::*;
pub use ids::*;
pub use order::{Order, OrderAdjustment};
pub use payment::{Payment, PaymentAdjustment};
pub use psp::{PspAccount, PspBalance, PspOrder, PspOther, PspPayment, PspTrade};
pub use trade::{Trade, TradeAdjustment, TradeExecuted, TradeFee, TradeFill, TradeMarket};

/// Free-form string metadata carried by every entity.
pub type Metadata = BTreeMap<String, String>;

/// Provider payload retained verbatim for audit.
pub type RawPayload = serde_json::Value;

/// Result of appending one adjustment to an entity's history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Same adjustment id already present. Not an error.
    Duplicate,
}

/// Position that keeps `list` ordered by creation time. Adjustments sharing
/// a timestamp keep arrival order.
pub(crate) fn chronological_slot<T>(
    list: &[T],
    at: DateTime<Utc>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> usize {
    list.partition_point(|item| created_at(item) <= at)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("adjustment {adjustment} does not belong to {entity}")]
    ForeignAdjustment { entity: String, adjustment: String },
    #[error("cannot merge {got} into {expected}")]
    IdMismatch { expected: String, got: String },
}
