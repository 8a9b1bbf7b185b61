//! Composite identifiers.
//!
//! Every struct here rejects unknown fields so a decoded id never silently
//! drops data. Optional fields may be absent from the payload.

use chrono::{DateTime, Utc};
use pay_ids::impl_composite_id;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::FetchKind;
use crate::enums::{OrderStatus, PaymentStatus, PaymentType, TradeStatus};

/// Namespace for deterministic connector references (UUID v5).
const CONNECTOR_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_3c5e_8a2b_4c7d_9e0f_1a2b_3c4d_5e6f);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorId {
    pub reference: Uuid,
    pub provider: String,
}

impl ConnectorId {
    pub fn new(provider: impl Into<String>, reference: Uuid) -> Self {
        Self {
            reference,
            provider: provider.into(),
        }
    }

    /// Stable id for a named installation: the same `(provider, name)` always
    /// yields the same reference.
    pub fn for_installation(provider: impl Into<String>, name: &str) -> Self {
        let provider = provider.into();
        let seed = format!("{provider}/{name}");
        Self {
            reference: Uuid::new_v5(&CONNECTOR_NAMESPACE, seed.as_bytes()),
            provider,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountId {
    pub reference: String,
    pub connector_id: ConnectorId,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceId {
    pub account_id: AccountId,
    pub asset: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentReference {
    pub reference: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentId {
    pub payment_reference: PaymentReference,
    pub connector_id: ConnectorId,
}

impl PaymentId {
    pub fn new(
        reference: impl Into<String>,
        payment_type: PaymentType,
        connector_id: ConnectorId,
    ) -> Self {
        Self {
            payment_reference: PaymentReference {
                reference: reference.into(),
                payment_type,
            },
            connector_id,
        }
    }

    pub fn reference(&self) -> &str {
        &self.payment_reference.reference
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentAdjustmentId {
    pub payment_id: PaymentId,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub status: PaymentStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderId {
    pub reference: String,
    pub connector_id: ConnectorId,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderAdjustmentId {
    pub order_id: OrderId,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeId {
    pub reference: String,
    pub connector_id: ConnectorId,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeAdjustmentId {
    pub trade_id: TradeId,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub status: TradeStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskId {
    pub reference: String,
    pub connector_id: ConnectorId,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookId {
    pub reference: String,
    pub connector_id: ConnectorId,
}

/// Key of a persisted cursor: one per (connector, entity kind), optionally
/// narrowed by the parent item a child fetch runs for.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateId {
    pub connector_id: ConnectorId,
    pub kind: FetchKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl StateId {
    pub fn new(connector_id: ConnectorId, kind: FetchKind, scope: Option<String>) -> Self {
        Self {
            connector_id,
            kind,
            scope,
        }
    }
}

impl_composite_id!(
    ConnectorId,
    AccountId,
    BalanceId,
    PaymentReference,
    PaymentId,
    PaymentAdjustmentId,
    OrderId,
    OrderAdjustmentId,
    TradeId,
    TradeAdjustmentId,
    TaskId,
    WebhookId,
    StateId,
);

#[cfg(test)]
mod tests {
    use super::*;
    use pay_ids::{CompositeId, IdError};

    fn connector() -> ConnectorId {
        ConnectorId::for_installation("stripe", "eu-main")
    }

    #[test]
    fn installation_reference_is_deterministic() {
        assert_eq!(connector(), ConnectorId::for_installation("stripe", "eu-main"));
        assert_ne!(connector(), ConnectorId::for_installation("stripe", "us-main"));
    }

    #[test]
    fn payment_id_round_trips() {
        let id = PaymentId::new("py_1", PaymentType::PayIn, connector());
        let s = id.to_string();
        let back: PaymentId = s.parse().unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn state_id_without_scope_omits_field() {
        let id = StateId::new(connector(), FetchKind::Payments, None);
        let back = StateId::decode(&id.encode()).unwrap();
        assert_eq!(back, id);
        let json = pay_ids::to_canonical_json(&id).unwrap();
        assert!(!json.contains("scope"));
    }

    #[test]
    fn payment_id_decoded_as_account_id_is_malformed_not_missing() {
        let s = PaymentId::new("py_1", PaymentType::PayIn, connector()).encode();
        // unknown field `payment_reference` is reported before any missing field
        let err = AccountId::decode(&s).unwrap_err();
        assert!(matches!(err, IdError::Malformed { .. }));
    }
}
