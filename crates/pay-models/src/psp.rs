//! Provider-shaped records, as returned by connectors.
//!
//! These are deliberately loose: `created_at` is optional and `raw` may be
//! null so that a misbehaving connector produces a validation error in the
//! reconciler rather than a deserialization failure deep in transport.
//! Amounts are already in minor units of `asset`.

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::enums::{
    InstrumentType, OrderDirection, OrderStatus, OrderType, PaymentScheme, PaymentStatus,
    PaymentType, TimeInForce, TradeSide, TradeStatus,
};
use crate::trade::{TradeExecuted, TradeFee, TradeFill, TradeMarket};
use crate::{Metadata, RawPayload};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PspAccount {
    pub reference: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_asset: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub raw: RawPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PspBalance {
    pub account_reference: String,
    pub created_at: Option<DateTime<Utc>>,
    pub asset: String,
    #[serde(with = "pay_money::serde_amount")]
    pub amount: BigInt,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub raw: RawPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PspPayment {
    /// Set when this record adjusts another payment (a refund, a dispute).
    #[serde(default)]
    pub parent_reference: Option<String>,
    pub reference: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(with = "pay_money::serde_amount")]
    pub amount: BigInt,
    pub asset: String,
    #[serde(default = "default_scheme")]
    pub scheme: PaymentScheme,
    pub status: PaymentStatus,
    #[serde(default)]
    pub source_account_reference: Option<String>,
    #[serde(default)]
    pub destination_account_reference: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub raw: RawPayload,
}

fn default_scheme() -> PaymentScheme {
    PaymentScheme::Other
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PspOrder {
    pub reference: String,
    pub created_at: Option<DateTime<Utc>>,
    pub direction: OrderDirection,
    pub source_asset: String,
    pub destination_asset: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    #[serde(with = "pay_money::serde_amount")]
    pub base_quantity_ordered: BigInt,
    #[serde(default, with = "pay_money::serde_amount::option")]
    pub base_quantity_filled: Option<BigInt>,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub raw: RawPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PspTrade {
    pub reference: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub portfolio_account_reference: Option<String>,
    #[serde(default)]
    pub order_reference: Option<String>,
    #[serde(default = "default_instrument")]
    pub instrument_type: InstrumentType,
    pub market: TradeMarket,
    pub side: TradeSide,
    pub status: TradeStatus,
    #[serde(default)]
    pub fills: Vec<TradeFill>,
    #[serde(default)]
    pub fees: Vec<TradeFee>,
    #[serde(default)]
    pub executed: TradeExecuted,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub raw: RawPayload,
}

fn default_instrument() -> InstrumentType {
    InstrumentType::Spot
}

/// Anything a connector fetches that has no ledger shape. Stored as-is under
/// the connector's own identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PspOther {
    pub id: String,
    pub other: RawPayload,
}
