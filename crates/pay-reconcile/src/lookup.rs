//! Lookups by opaque external id.
//!
//! A caller must be able to tell "this string is garbage" from "well-formed,
//! but no such entity": the two map to different [`LookupError`] variants.

use pay_ids::{CompositeId, IdError};
use pay_models::{Account, AccountId, Payment, PaymentId, Trade, TradeId};
use pay_storage::{LedgerStore, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("malformed id: {0}")]
    Malformed(#[from] IdError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for LookupError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { id, .. } => LookupError::NotFound(id),
            other => LookupError::Storage(other),
        }
    }
}

pub async fn get_payment_by_external_id(
    store: &dyn LedgerStore,
    external_id: &str,
) -> Result<Payment, LookupError> {
    let id = PaymentId::decode(external_id)?;
    Ok(store.get_payment(&id).await?)
}

pub async fn get_account_by_external_id(
    store: &dyn LedgerStore,
    external_id: &str,
) -> Result<Account, LookupError> {
    let id = AccountId::decode(external_id)?;
    Ok(store.get_account(&id).await?)
}

pub async fn get_trade_by_external_id(
    store: &dyn LedgerStore,
    external_id: &str,
) -> Result<Trade, LookupError> {
    let id = TradeId::decode(external_id)?;
    Ok(store.get_trade(&id).await?)
}
