//! pay-reconcile
//!
//! Provider records -> ledger entities.
//!
//! - every record is validated before anything in its batch is written; one
//!   invalid record fails the whole batch
//! - canonical ids come from the identity codec; refunds and other child
//!   records accumulate under their parent payment
//! - each write carries an idempotency key; a replayed record is a no-op

mod convert;
mod lookup;
mod reconciler;

pub use convert::{
    account_from_psp, balance_from_psp, canonical_payment_reference, order_from_psp,
    other_key, payment_from_psp, trade_from_psp,
};
pub use lookup::{
    get_account_by_external_id, get_payment_by_external_id, get_trade_by_external_id,
    LookupError,
};
pub use reconciler::{ApplyReport, Reconciler};

use pay_money::MoneyError;
use pay_storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Record is incomplete or inconsistent. Never retried.
    #[error("invalid {kind} '{reference}': {reason}")]
    Validation {
        kind: &'static str,
        reference: String,
        reason: String,
    },
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
