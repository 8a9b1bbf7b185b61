use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Zero;
use pay_ids::CompositeId;
use serde::Serialize;

use crate::enums::{OrderDirection, OrderStatus, OrderType, TimeInForce};
use crate::ids::{ConnectorId, OrderAdjustmentId, OrderId};
use crate::{chronological_slot, AppendOutcome, Metadata, ModelError, RawPayload};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderAdjustment {
    pub id: OrderAdjustmentId,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(with = "pay_money::serde_amount::option")]
    pub base_quantity_filled: Option<BigInt>,
    pub metadata: Metadata,
    pub raw: RawPayload,
}

impl OrderAdjustment {
    pub fn new(
        order_id: OrderId,
        reference: impl Into<String>,
        created_at: DateTime<Utc>,
        status: OrderStatus,
    ) -> Self {
        let reference = reference.into();
        Self {
            id: OrderAdjustmentId {
                order_id,
                reference: reference.clone(),
                created_at,
                status,
            },
            reference,
            created_at,
            status,
            base_quantity_filled: None,
            metadata: Metadata::new(),
            raw: RawPayload::Null,
        }
    }

    pub fn idempotency_key(&self) -> String {
        self.id.idempotency_key()
    }
}

/// An exchange order. Status and filled quantity are projected from the
/// adjustment list exactly as for payments.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub connector_id: ConnectorId,
    pub created_at: DateTime<Utc>,
    pub direction: OrderDirection,
    pub order_type: OrderType,
    pub time_in_force: Option<TimeInForce>,
    pub source_asset: String,
    pub destination_asset: String,
    #[serde(with = "pay_money::serde_amount")]
    pub base_quantity_ordered: BigInt,
    pub metadata: Metadata,
    pub raw: RawPayload,
    adjustments: Vec<OrderAdjustment>,
    status: OrderStatus,
    #[serde(with = "pay_money::serde_amount")]
    base_quantity_filled: BigInt,
}

impl Order {
    pub fn new(
        id: OrderId,
        created_at: DateTime<Utc>,
        direction: OrderDirection,
        source_asset: impl Into<String>,
        destination_asset: impl Into<String>,
    ) -> Self {
        Self {
            connector_id: id.connector_id.clone(),
            id,
            created_at,
            direction,
            order_type: OrderType::Other,
            time_in_force: None,
            source_asset: source_asset.into(),
            destination_asset: destination_asset.into(),
            base_quantity_ordered: BigInt::zero(),
            metadata: Metadata::new(),
            raw: RawPayload::Null,
            adjustments: Vec::new(),
            status: OrderStatus::Pending,
            base_quantity_filled: BigInt::zero(),
        }
    }

    pub fn adjustments(&self) -> &[OrderAdjustment] {
        &self.adjustments
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn base_quantity_filled(&self) -> &BigInt {
        &self.base_quantity_filled
    }

    pub fn append_adjustment(&mut self, adj: OrderAdjustment) -> Result<AppendOutcome, ModelError> {
        if adj.id.order_id != self.id {
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
        self.recompute();
        Ok(AppendOutcome::Appended)
    }

    pub fn merge(&mut self, incoming: Order) -> Result<usize, ModelError> {
        if incoming.id != self.id {
            return Err(ModelError::IdMismatch {
                expected: self.id.encode(),
                got: incoming.id.encode(),
            });
        }
        if self.time_in_force.is_none() {
            self.time_in_force = incoming.time_in_force;
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

    fn recompute(&mut self) {
        let mut status = OrderStatus::Pending;
        let mut filled = BigInt::zero();
        for adj in &self.adjustments {
            status = adj.status;
            if let Some(q) = &adj.base_quantity_filled {
                filled = q.clone();
            }
        }
        self.status = status;
        self.base_quantity_filled = filled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn oid() -> OrderId {
        OrderId {
            reference: "ord_1".into(),
            connector_id: ConnectorId::for_installation("kraken", "spot"),
        }
    }

    #[test]
    fn filled_quantity_carries_forward() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut o = Order::new(oid(), t0, OrderDirection::Buy, "USD/2", "BTC/8");

        let mut a = OrderAdjustment::new(oid(), "ord_1", t0, OrderStatus::PartiallyFilled);
        a.base_quantity_filled = Some(BigInt::from(5));
        o.append_adjustment(a).unwrap();

        let b = OrderAdjustment::new(
            oid(),
            "ord_1",
            t0 + chrono::Duration::seconds(1),
            OrderStatus::Cancelled,
        );
        o.append_adjustment(b).unwrap();

        assert_eq!(o.status(), OrderStatus::Cancelled);
        assert_eq!(o.base_quantity_filled(), &BigInt::from(5));
    }

    #[test]
    fn out_of_order_fill_does_not_override_later_status() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(10);
        let mut o = Order::new(oid(), t1, OrderDirection::Buy, "USD/2", "BTC/8");

        let mut filled = OrderAdjustment::new(oid(), "ord_1", t1, OrderStatus::Filled);
        filled.base_quantity_filled = Some(BigInt::from(8));
        o.append_adjustment(filled).unwrap();

        let mut partial = OrderAdjustment::new(oid(), "ord_1", t0, OrderStatus::PartiallyFilled);
        partial.base_quantity_filled = Some(BigInt::from(3));
        o.append_adjustment(partial).unwrap();

        assert_eq!(o.status(), OrderStatus::Filled);
        assert_eq!(o.base_quantity_filled(), &BigInt::from(8));
        assert_eq!(o.adjustments()[0].created_at, t0);
    }
}
