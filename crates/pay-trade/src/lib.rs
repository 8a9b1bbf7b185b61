//! pay-trade
//!
//! Trade math engine:
//! - validates a trade's fills against each other and against the provider's
//!   executed summary
//! - derives expected base / quote leg amounts (fees folded in by side)
//! - builds the two balanced ledger payments of a trade, one adjustment per fill
//! - exact rational arithmetic only; stateless and safe to run in parallel

mod legs;
mod validate;

pub use legs::{create_payments_from_trade, expected_leg_amounts, LegAmounts, TradeLegs};
pub use validate::{validate_trade_math, TradeMathReport, TradeMathWarning};

use pay_money::MoneyError;

/// Hard mismatches. They block leg creation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeMathError {
    /// Unsupported asset or malformed decimal.
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error("fill {index}: {field} must be positive, got '{value}'")]
    NonPositiveFill {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("fill {index}: price * quantity = {expected}, quote amount is {got}")]
    FillQuoteMismatch {
        index: usize,
        expected: String,
        got: String,
    },
    #[error("executed quantity {reported} != sum of fills {from_fills}")]
    ExecutedQuantityMismatch { reported: String, from_fills: String },
    #[error("executed quote amount {reported} != sum of fills {from_fills}")]
    ExecutedQuoteMismatch { reported: String, from_fills: String },
    #[error("trade {reference} has no fills")]
    NoFills { reference: String },
    #[error("ledger: {0}")]
    Ledger(String),
}
