//! Internal numeric consistency of a trade.
//!
//! All arithmetic is exact (`BigRational`). Tolerances are one quantum of the
//! asset the compared amount is denominated in.

use std::collections::{BTreeMap, BTreeSet};

use num_traits::{Signed, Zero};
use pay_models::{Trade, TradeFee};
use pay_money::{format_asset, parse_decimal, quantum, within, AssetTable, BigRational};
use tracing::warn;

use crate::TradeMathError;

/// Soft mismatches. Reported, never blocking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TradeMathWarning {
    /// Reported average price differs from total quote / total quantity by
    /// more than one quote quantum.
    AveragePriceDeviation { reported: String, computed: String },
    /// Top-level fee total for `asset` differs from the per-fill total.
    FeeMismatch {
        asset: String,
        top_level: String,
        from_fills: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TradeMathReport {
    pub warnings: Vec<TradeMathWarning>,
}

impl TradeMathReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Resolved scales of a trade's market.
pub(crate) struct Scales {
    pub base_asset: String,
    pub base: u32,
    pub quote_asset: String,
    pub quote: u32,
}

pub(crate) fn scales(trade: &Trade, assets: &AssetTable) -> Result<Scales, TradeMathError> {
    let (base_code, base) = assets.get_scale(&trade.market.base_asset)?;
    let (quote_code, quote) = assets.get_scale(&trade.market.quote_asset)?;
    Ok(Scales {
        base_asset: format_asset(&base_code, base),
        base,
        quote_asset: format_asset(&quote_code, quote),
        quote,
    })
}

/// Sum of fill quantities and of fill quote amounts.
pub(crate) fn fill_totals(trade: &Trade) -> Result<(BigRational, BigRational), TradeMathError> {
    let mut qty = BigRational::zero();
    let mut quote = BigRational::zero();
    for f in &trade.fills {
        qty += parse_decimal(&f.quantity)?;
        quote += parse_decimal(&f.quote_amount)?;
    }
    Ok((qty, quote))
}

/// Fee totals keyed by normalized asset.
pub(crate) fn fee_totals<'a>(
    fees: impl IntoIterator<Item = &'a TradeFee>,
    assets: &AssetTable,
) -> Result<BTreeMap<String, BigRational>, TradeMathError> {
    let mut out: BTreeMap<String, BigRational> = BTreeMap::new();
    for fee in fees {
        let asset = assets.normalize(&fee.asset)?;
        let amount = parse_decimal(&fee.amount)?;
        *out.entry(asset).or_insert_with(BigRational::zero) += amount;
    }
    Ok(out)
}

/// Fees that settle with the trade, per asset: the top-level total when the
/// provider reports one for that asset, otherwise the per-fill total.
pub(crate) fn effective_fees(
    trade: &Trade,
    assets: &AssetTable,
) -> Result<BTreeMap<String, BigRational>, TradeMathError> {
    let mut fees = fee_totals(trade.fills.iter().flat_map(|f| f.fees.iter()), assets)?;
    fees.extend(fee_totals(trade.fees.iter(), assets)?);
    Ok(fees)
}

fn show(v: &BigRational) -> String {
    if v.is_integer() {
        v.to_integer().to_string()
    } else {
        format!("{}/{}", v.numer(), v.denom())
    }
}

/// Check a trade's numbers.
///
/// # Errors
/// - unsupported asset or malformed decimal anywhere in the trade
/// - a fill with non-positive price or quantity
/// - a fill whose `price * quantity` differs from its quote amount by more
///   than one quote quantum
/// - fill totals disagreeing with the executed summary by more than one
///   quantum of the respective asset
pub fn validate_trade_math(
    trade: &Trade,
    assets: &AssetTable,
) -> Result<TradeMathReport, TradeMathError> {
    let s = scales(trade, assets)?;
    let base_q = quantum(s.base);
    let quote_q = quantum(s.quote);

    for (index, fill) in trade.fills.iter().enumerate() {
        let price = parse_decimal(&fill.price)?;
        let qty = parse_decimal(&fill.quantity)?;
        let quote = parse_decimal(&fill.quote_amount)?;

        if !price.is_positive() {
            return Err(TradeMathError::NonPositiveFill {
                index,
                field: "price",
                value: fill.price.clone(),
            });
        }
        if !qty.is_positive() {
            return Err(TradeMathError::NonPositiveFill {
                index,
                field: "quantity",
                value: fill.quantity.clone(),
            });
        }

        let expected = &price * &qty;
        if !within(&expected, &quote, &quote_q) {
            return Err(TradeMathError::FillQuoteMismatch {
                index,
                expected: show(&expected),
                got: fill.quote_amount.clone(),
            });
        }
    }

    let (total_qty, total_quote) = fill_totals(trade)?;

    if let Some(raw) = &trade.executed.quantity {
        let reported = parse_decimal(raw)?;
        if !within(&reported, &total_qty, &base_q) {
            return Err(TradeMathError::ExecutedQuantityMismatch {
                reported: raw.clone(),
                from_fills: show(&total_qty),
            });
        }
    }
    if let Some(raw) = &trade.executed.quote_amount {
        let reported = parse_decimal(raw)?;
        if !within(&reported, &total_quote, &quote_q) {
            return Err(TradeMathError::ExecutedQuoteMismatch {
                reported: raw.clone(),
                from_fills: show(&total_quote),
            });
        }
    }

    let mut report = TradeMathReport::default();

    if let Some(raw) = &trade.executed.average_price {
        let reported = parse_decimal(raw)?;
        if !total_qty.is_zero() {
            let computed = &total_quote / &total_qty;
            if !within(&reported, &computed, &quote_q) {
                report.warnings.push(TradeMathWarning::AveragePriceDeviation {
                    reported: raw.clone(),
                    computed: show(&computed),
                });
            }
        }
    }

    let fills_carry_fees = trade.fills.iter().any(|f| !f.fees.is_empty());
    if !trade.fees.is_empty() && fills_carry_fees {
        let top = fee_totals(trade.fees.iter(), assets)?;
        let fills = fee_totals(trade.fills.iter().flat_map(|f| f.fees.iter()), assets)?;
        let fee_assets: BTreeSet<&String> = top.keys().chain(fills.keys()).collect();
        for asset in fee_assets {
            let top_amount = top.get(asset).cloned().unwrap_or_else(BigRational::zero);
            let fill_amount = fills.get(asset).cloned().unwrap_or_else(BigRational::zero);
            if fill_amount != top_amount {
                report.warnings.push(TradeMathWarning::FeeMismatch {
                    asset: asset.clone(),
                    top_level: show(&top_amount),
                    from_fills: show(&fill_amount),
                });
            }
        }
    }

    for w in &report.warnings {
        warn!(trade = trade.reference(), warning = ?w, "trade math warning");
    }

    Ok(report)
}
