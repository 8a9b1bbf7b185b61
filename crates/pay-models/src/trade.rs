//! Trades: fills, fees and the provider's executed summary.
//!
//! Quantities and prices stay as the provider's decimal strings. Exact
//! arithmetic over them lives in `pay-trade`.

use chrono::{DateTime, Utc};
use pay_ids::CompositeId;
use serde::{Deserialize, Serialize};

use crate::enums::{InstrumentType, TradeSide, TradeStatus};
use crate::ids::{AccountId, ConnectorId, OrderId, TradeAdjustmentId, TradeId};
use crate::{chronological_slot, AppendOutcome, Metadata, ModelError, RawPayload};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMarket {
    pub symbol: String,
    /// Normalized `"CODE/scale"`.
    pub base_asset: String,
    /// Normalized `"CODE/scale"`.
    pub quote_asset: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFee {
    pub asset: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub trade_reference: String,
    pub timestamp: DateTime<Utc>,
    pub price: String,
    pub quantity: String,
    pub quote_amount: String,
    #[serde(default)]
    pub fees: Vec<TradeFee>,
    #[serde(default)]
    pub raw: RawPayload,
}

/// Summary as reported by the provider. Every field is optional because
/// providers differ in what they report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeExecuted {
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub quote_amount: Option<String>,
    #[serde(default)]
    pub average_price: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TradeAdjustment {
    pub id: TradeAdjustmentId,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub status: TradeStatus,
    pub raw: RawPayload,
}

impl TradeAdjustment {
    pub fn new(
        trade_id: TradeId,
        reference: impl Into<String>,
        created_at: DateTime<Utc>,
        status: TradeStatus,
    ) -> Self {
        let reference = reference.into();
        Self {
            id: TradeAdjustmentId {
                trade_id,
                reference: reference.clone(),
                created_at,
                status,
            },
            reference,
            created_at,
            status,
            raw: RawPayload::Null,
        }
    }

    pub fn idempotency_key(&self) -> String {
        self.id.idempotency_key()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub connector_id: ConnectorId,
    pub created_at: DateTime<Utc>,
    pub portfolio_account_id: Option<AccountId>,
    pub order_id: Option<OrderId>,
    pub instrument_type: InstrumentType,
    pub market: TradeMarket,
    pub side: TradeSide,
    pub fills: Vec<TradeFill>,
    pub fees: Vec<TradeFee>,
    pub executed: TradeExecuted,
    pub metadata: Metadata,
    pub raw: RawPayload,
    adjustments: Vec<TradeAdjustment>,
}

impl Trade {
    pub fn new(id: TradeId, created_at: DateTime<Utc>, market: TradeMarket, side: TradeSide) -> Self {
        Self {
            connector_id: id.connector_id.clone(),
            id,
            created_at,
            portfolio_account_id: None,
            order_id: None,
            instrument_type: InstrumentType::Spot,
            market,
            side,
            fills: Vec::new(),
            fees: Vec::new(),
            executed: TradeExecuted::default(),
            metadata: Metadata::new(),
            raw: RawPayload::Null,
            adjustments: Vec::new(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.id.reference
    }

    pub fn adjustments(&self) -> &[TradeAdjustment] {
        &self.adjustments
    }

    pub fn status(&self) -> TradeStatus {
        self.adjustments
            .last()
            .map(|a| a.status)
            .unwrap_or(TradeStatus::Pending)
    }

    pub fn append_adjustment(&mut self, adj: TradeAdjustment) -> Result<AppendOutcome, ModelError> {
        if adj.id.trade_id != self.id {
            return Err(ModelError::ForeignAdjustment {
                entity: self.id.encode(),
                adjustment: adj.id.encode(),
            });
        }
        if self.adjustments.iter().any(|a| a.id == adj.id) {
            return Ok(AppendOutcome::Duplicate);
        }
        let at = chronological_slot(&self.adjustments, adj.created_at, |a| a.created_at);
        self.adjustments.insert(at, adj);
        Ok(AppendOutcome::Appended)
    }

    /// Later observations of a trade carry a superset of fills; the incoming
    /// fill list and summary replace the stored ones when they are longer.
    pub fn merge(&mut self, incoming: Trade) -> Result<usize, ModelError> {
        if incoming.id != self.id {
            return Err(ModelError::IdMismatch {
                expected: self.id.encode(),
                got: incoming.id.encode(),
            });
        }
        if incoming.fills.len() >= self.fills.len() {
            self.fills = incoming.fills;
            self.fees = incoming.fees;
            self.executed = incoming.executed;
        }
        if self.portfolio_account_id.is_none() {
            self.portfolio_account_id = incoming.portfolio_account_id;
        }
        if self.order_id.is_none() {
            self.order_id = incoming.order_id;
        }
        if incoming.created_at < self.created_at {
            self.created_at = incoming.created_at;
        }
        self.metadata.extend(incoming.metadata);

        let mut appended = 0;
        for adj in incoming.adjustments {
            if self.append_adjustment(adj)? == AppendOutcome::Appended {
                appended += 1;
            }
        }
        Ok(appended)
    }
}
