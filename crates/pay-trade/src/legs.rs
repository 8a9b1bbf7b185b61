//! Ledger legs of a trade.
//!
//! A trade settles as two synthetic payments on the portfolio account:
//!
//! | side | base leg                | quote leg               |
//! |------|-------------------------|-------------------------|
//! | BUY  | PAY-IN, fees excluded   | PAYOUT, + quote fees    |
//! | SELL | PAYOUT, + base fees     | PAY-IN, fees excluded   |

use num_traits::Zero;
use pay_ids::CompositeId;
use pay_models::{
    AccountId, Payment, PaymentAdjustment, PaymentId, PaymentScheme, PaymentStatus, PaymentType,
    Trade, TradeSide,
};
use pay_money::{parse_decimal, rational_to_minor_units, AssetTable, BigRational};

use crate::validate::{effective_fees, fill_totals, scales, validate_trade_math, TradeMathReport};
use crate::TradeMathError;

/// Exact amounts each leg must move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegAmounts {
    pub base: BigRational,
    pub quote: BigRational,
}

/// Fill totals with the side's fee folded into the paying leg.
pub fn expected_leg_amounts(
    trade: &Trade,
    assets: &AssetTable,
) -> Result<LegAmounts, TradeMathError> {
    let s = scales(trade, assets)?;
    let (mut base, mut quote) = fill_totals(trade)?;
    let fees = effective_fees(trade, assets)?;

    match trade.side {
        TradeSide::Buy => {
            if let Some(fee) = fees.get(&s.quote_asset) {
                quote += fee;
            }
        }
        TradeSide::Sell => {
            if let Some(fee) = fees.get(&s.base_asset) {
                base += fee;
            }
        }
    }
    Ok(LegAmounts { base, quote })
}

/// The two ledger payments of a trade and the validation report they were
/// built under.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeLegs {
    pub base: Payment,
    pub quote: Payment,
    pub report: TradeMathReport,
}

impl TradeLegs {
    /// `(payment, idempotency key)` for both legs, base first.
    pub fn payments(&self) -> [(&Payment, String); 2] {
        [
            (&self.base, leg_key(&self.base)),
            (&self.quote, leg_key(&self.quote)),
        ]
    }
}

fn leg_key(p: &Payment) -> String {
    match p.latest_adjustment() {
        Some(adj) => adj.idempotency_key(),
        None => p.id.idempotency_key(),
    }
}

struct Leg {
    name: &'static str,
    payment_type: PaymentType,
    asset: String,
    scale: u32,
    fee: BigRational,
}

/// Build both leg payments.
///
/// Each leg gets one SUCCEEDED adjustment per fill. The adjustment amount is
/// the leg's running total after that fill, with the paying leg's fee
/// settled on the final fill, so the projected amount of each leg equals its
/// expected amount truncated to the asset's scale.
///
/// # Errors
/// [`TradeMathError::NoFills`] for a trade without fills, and every hard
/// error of [`validate_trade_math`].
pub fn create_payments_from_trade(
    trade: &Trade,
    assets: &AssetTable,
) -> Result<TradeLegs, TradeMathError> {
    if trade.fills.is_empty() {
        return Err(TradeMathError::NoFills {
            reference: trade.reference().to_string(),
        });
    }
    let report = validate_trade_math(trade, assets)?;
    let s = scales(trade, assets)?;
    let fees = effective_fees(trade, assets)?;

    let (base_type, quote_type) = match trade.side {
        TradeSide::Buy => (PaymentType::PayIn, PaymentType::Payout),
        TradeSide::Sell => (PaymentType::Payout, PaymentType::PayIn),
    };
    let (base_fee, quote_fee) = match trade.side {
        TradeSide::Buy => (
            BigRational::zero(),
            fees.get(&s.quote_asset).cloned().unwrap_or_else(BigRational::zero),
        ),
        TradeSide::Sell => (
            fees.get(&s.base_asset).cloned().unwrap_or_else(BigRational::zero),
            BigRational::zero(),
        ),
    };

    let base = build_leg(
        trade,
        Leg {
            name: "base",
            payment_type: base_type,
            asset: s.base_asset.clone(),
            scale: s.base,
            fee: base_fee,
        },
        |f| parse_decimal(&f.quantity),
    )?;
    let quote = build_leg(
        trade,
        Leg {
            name: "quote",
            payment_type: quote_type,
            asset: s.quote_asset.clone(),
            scale: s.quote,
            fee: quote_fee,
        },
        |f| parse_decimal(&f.quote_amount),
    )?;

    Ok(TradeLegs {
        base,
        quote,
        report,
    })
}

fn build_leg<F>(trade: &Trade, leg: Leg, amount_of: F) -> Result<Payment, TradeMathError>
where
    F: Fn(&pay_models::TradeFill) -> Result<BigRational, pay_money::MoneyError>,
{
    let reference = format!("{}/{}", trade.reference(), leg.name);
    let id = PaymentId::new(reference, leg.payment_type, trade.connector_id.clone());
    let first_fill_at = trade.fills.first().map(|f| f.timestamp).unwrap_or(trade.created_at);

    let mut payment = Payment::new(id.clone(), first_fill_at, leg.asset.clone());
    payment.scheme = PaymentScheme::Other;
    let portfolio: Option<AccountId> = trade.portfolio_account_id.clone();
    match leg.payment_type {
        PaymentType::PayIn => payment.destination_account_id = portfolio,
        _ => payment.source_account_id = portfolio,
    }
    payment
        .metadata
        .insert("trade_reference".to_string(), trade.reference().to_string());
    payment.metadata.insert("leg".to_string(), leg.name.to_string());
    payment.raw = trade.raw.clone();

    let last = trade.fills.len() - 1;
    let mut running = BigRational::zero();
    for (i, fill) in trade.fills.iter().enumerate() {
        running += amount_of(fill)?;
        let settled = if i == last {
            &running + &leg.fee
        } else {
            running.clone()
        };
        let minor = rational_to_minor_units(&settled, leg.scale);

        let mut adj = PaymentAdjustment::new(
            id.clone(),
            format!("{}/fill/{}", trade.reference(), i + 1),
            fill.timestamp,
            PaymentStatus::Succeeded,
        )
        .with_amount(minor, leg.asset.clone())
        .with_raw(fill.raw.clone());
        adj.metadata
            .insert("fill_reference".to_string(), fill.trade_reference.clone());

        payment
            .append_adjustment(adj)
            .map_err(|e| TradeMathError::Ledger(e.to_string()))?;
    }
    Ok(payment)
}
