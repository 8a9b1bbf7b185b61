use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use pay_ids::CompositeId;
use serde::{Deserialize, Serialize};

use crate::enums::AccountType;
use crate::ids::{AccountId, BalanceId, ConnectorId};
use crate::{Metadata, RawPayload};

/// An account held at (internal) or known to (external) a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub connector_id: ConnectorId,
    pub created_at: DateTime<Utc>,
    pub reference: String,
    pub account_type: AccountType,
    pub name: Option<String>,
    /// Normalized `"CODE/scale"`.
    pub default_asset: Option<String>,
    pub metadata: Metadata,
    pub raw: RawPayload,
}

impl Account {
    /// Accounts are keyed by identity alone: re-ingesting the same reference
    /// is a no-op.
    pub fn idempotency_key(&self) -> String {
        self.id.idempotency_key()
    }
}

/// Point-in-time balance of one asset on one account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// Normalized `"CODE/scale"`.
    pub asset: String,
    #[serde(with = "pay_money::serde_amount")]
    pub balance: BigInt,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub raw: RawPayload,
}

impl Balance {
    pub fn id(&self) -> BalanceId {
        BalanceId {
            account_id: self.account_id.clone(),
            asset: self.asset.clone(),
            created_at: self.created_at,
        }
    }

    pub fn connector_id(&self) -> &ConnectorId {
        &self.account_id.connector_id
    }

    /// Keyed by (account, asset, observation time) and the amount, so an
    /// unchanged re-observation is deduplicated.
    pub fn idempotency_key(&self) -> String {
        pay_ids::idempotency_key(&(self.id(), self.balance.to_string()))
    }
}
