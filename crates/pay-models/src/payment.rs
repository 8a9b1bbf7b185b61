//! Payments and their adjustment history.
//!
//! The adjustment list is the source of truth, ordered by `created_at`
//! whatever order provider events arrive in. `status`, `amount` and
//! `initial_amount` are a projection recomputed from the list on every insert
//! and are never written independently.

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Zero;
use pay_ids::CompositeId;
use serde::Serialize;

use crate::enums::{PaymentScheme, PaymentStatus, PaymentType};
use crate::ids::{AccountId, ConnectorId, PaymentAdjustmentId, PaymentId};
use crate::{chronological_slot, AppendOutcome, Metadata, ModelError, RawPayload};

/// One immutable status/amount record in a payment's history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentAdjustment {
    pub id: PaymentAdjustmentId,
    /// The provider record's own reference (a refund keeps its own reference
    /// even though it is filed under the original payment).
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub status: PaymentStatus,
    #[serde(with = "pay_money::serde_amount::option")]
    pub amount: Option<BigInt>,
    pub asset: Option<String>,
    pub metadata: Metadata,
    pub raw: RawPayload,
}

impl PaymentAdjustment {
    pub fn new(
        payment_id: PaymentId,
        reference: impl Into<String>,
        created_at: DateTime<Utc>,
        status: PaymentStatus,
    ) -> Self {
        let reference = reference.into();
        Self {
            id: PaymentAdjustmentId {
                payment_id,
                reference: reference.clone(),
                created_at,
                status,
            },
            reference,
            created_at,
            status,
            amount: None,
            asset: None,
            metadata: Metadata::new(),
            raw: RawPayload::Null,
        }
    }

    pub fn with_amount(mut self, amount: BigInt, asset: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.asset = Some(asset.into());
        self
    }

    pub fn with_raw(mut self, raw: RawPayload) -> Self {
        self.raw = raw;
        self
    }

    pub fn idempotency_key(&self) -> String {
        self.id.idempotency_key()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct PaymentProjection {
    status: PaymentStatus,
    #[serde(with = "pay_money::serde_amount")]
    amount: BigInt,
    #[serde(with = "pay_money::serde_amount")]
    initial_amount: BigInt,
}

impl Default for PaymentProjection {
    fn default() -> Self {
        Self {
            status: PaymentStatus::Pending,
            amount: BigInt::zero(),
            initial_amount: BigInt::zero(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub connector_id: ConnectorId,
    pub created_at: DateTime<Utc>,
    /// Normalized `"CODE/scale"`.
    pub asset: String,
    pub scheme: PaymentScheme,
    pub source_account_id: Option<AccountId>,
    pub destination_account_id: Option<AccountId>,
    pub metadata: Metadata,
    pub raw: RawPayload,
    adjustments: Vec<PaymentAdjustment>,
    #[serde(flatten)]
    projection: PaymentProjection,
}

impl Payment {
    pub fn new(id: PaymentId, created_at: DateTime<Utc>, asset: impl Into<String>) -> Self {
        Self {
            connector_id: id.connector_id.clone(),
            id,
            created_at,
            asset: asset.into(),
            scheme: PaymentScheme::Other,
            source_account_id: None,
            destination_account_id: None,
            metadata: Metadata::new(),
            raw: RawPayload::Null,
            adjustments: Vec::new(),
            projection: PaymentProjection::default(),
        }
    }

    pub fn reference(&self) -> &str {
        self.id.reference()
    }

    pub fn payment_type(&self) -> PaymentType {
        self.id.payment_reference.payment_type
    }

    pub fn adjustments(&self) -> &[PaymentAdjustment] {
        &self.adjustments
    }

    pub fn latest_adjustment(&self) -> Option<&PaymentAdjustment> {
        self.adjustments.last()
    }

    pub fn status(&self) -> PaymentStatus {
        self.projection.status
    }

    /// Current amount. Zero while the latest adjustment is an authorisation.
    pub fn amount(&self) -> &BigInt {
        &self.projection.amount
    }

    /// Amount of the first adjustment that carried one.
    pub fn initial_amount(&self) -> &BigInt {
        &self.projection.initial_amount
    }

    pub fn has_adjustment(&self, id: &PaymentAdjustmentId) -> bool {
        self.adjustments.iter().any(|a| &a.id == id)
    }

    /// Insert one adjustment at its place in time. An adjustment with an id
    /// already present is a no-op; existing entries are never modified.
    pub fn append_adjustment(
        &mut self,
        adj: PaymentAdjustment,
    ) -> Result<AppendOutcome, ModelError> {
        if adj.id.payment_id != self.id {
            return Err(ModelError::ForeignAdjustment {
                entity: self.id.encode(),
                adjustment: adj.id.encode(),
            });
        }
        if self.has_adjustment(&adj.id) {
            return Ok(AppendOutcome::Duplicate);
        }
        let at = chronological_slot(&self.adjustments, adj.created_at, |a| a.created_at);
        self.adjustments.insert(at, adj);
        self.recompute();
        Ok(AppendOutcome::Appended)
    }

    /// Fold `incoming` into `self`: insert its adjustments, fill header
    /// fields that are still unknown and keep the earliest `created_at`.
    /// Returns how many adjustments were new.
    pub fn merge(&mut self, incoming: Payment) -> Result<usize, ModelError> {
        if incoming.id != self.id {
            return Err(ModelError::IdMismatch {
                expected: self.id.encode(),
                got: incoming.id.encode(),
            });
        }

        if self.source_account_id.is_none() {
            self.source_account_id = incoming.source_account_id;
        }
        if self.destination_account_id.is_none() {
            self.destination_account_id = incoming.destination_account_id;
        }
        if self.scheme == PaymentScheme::Other {
            self.scheme = incoming.scheme;
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
        let mut p = PaymentProjection::default();
        let mut seen_amount = false;

        for adj in &self.adjustments {
            if let Some(a) = &adj.amount {
                if !seen_amount {
                    p.initial_amount = a.clone();
                    seen_amount = true;
                }
                p.amount = a.clone();
            }
            p.status = adj.status;
        }

        if p.status.is_authorisation_only() {
            p.amount = BigInt::zero();
        }

        self.projection = p;
    }
}
