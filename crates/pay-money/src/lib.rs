//! pay-money
//!
//! Money is an arbitrary-precision integer of minor units of an asset.
//! Assets are `"CODE/scale"` strings resolved through an injected [`AssetTable`].
//!
//! Pure logic. No IO. No floating point.

mod amount;
mod asset;
mod rational;
pub mod serde_amount;

pub use amount::{from_minor_units, to_minor_units};
pub use asset::{format_asset, split_asset, AssetTable};
pub use rational::{
    format_rational, minor_units_to_rational, parse_decimal, pow10, quantum,
    rational_to_minor_units, within,
};

pub use num_bigint::BigInt;
pub use num_rational::BigRational;

/// Money and asset failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Asset code is not present in the scale table.
    #[error("unsupported asset: {asset}")]
    UnsupportedAsset { asset: String },
    /// Asset string is not of the form `CODE` or `CODE/scale`.
    #[error("invalid asset '{asset}': {reason}")]
    InvalidAsset { asset: String, reason: String },
    /// Amount string is not a plain decimal number.
    #[error("invalid amount: '{raw}'")]
    InvalidAmount { raw: String },
}

/// Resolve `asset` and convert `raw` at its scale.
pub fn asset_to_minor_units(
    assets: &AssetTable,
    asset: &str,
    raw: &str,
) -> Result<BigInt, MoneyError> {
    let (_, scale) = assets.get_scale(asset)?;
    to_minor_units(raw, scale)
}
