//! Asset strings and the asset-scale table.
//!
//! An asset is written `"<CODE>/<scale>"` (e.g. `"USD/2"`, `"BTC/8"`). The
//! table maps each supported code to its decimal scale; it is built once and
//! passed by reference to whoever needs it. There is no process-wide table.

use std::collections::BTreeMap;

use crate::MoneyError;

/// Built-in scales: ISO 4217 minor units for common fiat plus the crypto
/// assets the bundled connectors report.
const DEFAULT_SCALES: &[(&str, u32)] = &[
    ("AED", 2),
    ("ARS", 2),
    ("AUD", 2),
    ("BHD", 3),
    ("BRL", 2),
    ("CAD", 2),
    ("CHF", 2),
    ("CLP", 0),
    ("CNY", 2),
    ("COP", 2),
    ("CZK", 2),
    ("DKK", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("HKD", 2),
    ("HUF", 2),
    ("IDR", 2),
    ("ILS", 2),
    ("INR", 2),
    ("ISK", 0),
    ("JOD", 3),
    ("JPY", 0),
    ("KRW", 0),
    ("KWD", 3),
    ("MXN", 2),
    ("MYR", 2),
    ("NGN", 2),
    ("NOK", 2),
    ("NZD", 2),
    ("OMR", 3),
    ("PHP", 2),
    ("PLN", 2),
    ("RON", 2),
    ("SAR", 2),
    ("SEK", 2),
    ("SGD", 2),
    ("THB", 2),
    ("TND", 3),
    ("TRY", 2),
    ("TWD", 2),
    ("UAH", 2),
    ("USD", 2),
    ("VND", 0),
    ("XAF", 0),
    ("XOF", 0),
    ("ZAR", 2),
    // crypto
    ("BTC", 8),
    ("ETH", 18),
    ("SOL", 9),
    ("USDC", 6),
    ("USDT", 6),
];

/// Read-only lookup from asset code to decimal scale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetTable {
    scales: BTreeMap<String, u32>,
}

impl AssetTable {
    /// Empty table (every lookup fails).
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with the built-in scales.
    pub fn with_defaults() -> Self {
        DEFAULT_SCALES
            .iter()
            .map(|(code, scale)| (code.to_string(), *scale))
            .collect()
    }

    /// Add or override one entry. Codes are stored upper-cased.
    pub fn insert(&mut self, code: impl AsRef<str>, scale: u32) {
        self.scales
            .insert(code.as_ref().trim().to_ascii_uppercase(), scale);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, code: impl AsRef<str>, scale: u32) -> Self {
        self.insert(code, scale);
        self
    }

    pub fn scale_of(&self, code: &str) -> Option<u32> {
        self.scales.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.scales.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Resolve an asset string to `(code, scale)`.
    ///
    /// Accepts `"CODE/scale"` or a bare `"CODE"` (scale taken from the table).
    ///
    /// # Errors
    /// - [`MoneyError::UnsupportedAsset`] when the code is not in the table.
    /// - [`MoneyError::InvalidAsset`] when the string is not of the expected
    ///   shape or the explicit scale disagrees with the table.
    pub fn get_scale(&self, asset: &str) -> Result<(String, u32), MoneyError> {
        let (code, explicit) = split_asset(asset)?;

        let known = self
            .scale_of(code)
            .ok_or_else(|| MoneyError::UnsupportedAsset {
                asset: asset.to_string(),
            })?;

        match explicit {
            Some(s) if s != known => Err(MoneyError::InvalidAsset {
                asset: asset.to_string(),
                reason: format!("scale {s} does not match configured scale {known}"),
            }),
            _ => Ok((code.to_string(), known)),
        }
    }

    /// Canonical `"CODE/scale"` form of a supported asset.
    pub fn normalize(&self, asset: &str) -> Result<String, MoneyError> {
        let (code, scale) = self.get_scale(asset)?;
        Ok(format_asset(&code, scale))
    }
}

impl FromIterator<(String, u32)> for AssetTable {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut t = AssetTable::new();
        for (code, scale) in iter {
            t.insert(code, scale);
        }
        t
    }
}

/// `"USD"`, 2 -> `"USD/2"`.
pub fn format_asset(code: &str, scale: u32) -> String {
    format!("{code}/{scale}")
}

/// Split `"CODE/scale"` into its parts without consulting any table.
pub fn split_asset(asset: &str) -> Result<(&str, Option<u32>), MoneyError> {
    let invalid = |reason: &str| MoneyError::InvalidAsset {
        asset: asset.to_string(),
        reason: reason.to_string(),
    };

    let (code, scale) = match asset.split_once('/') {
        Some((c, s)) => (c, Some(s)),
        None => (asset, None),
    };

    if code.is_empty() {
        return Err(invalid("empty asset code"));
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(invalid("asset code must be upper-case alphanumeric"));
    }

    let scale = match scale {
        None => None,
        Some(s) => Some(
            s.parse::<u32>()
                .map_err(|_| invalid("scale is not a non-negative integer"))?,
        ),
    };

    Ok((code, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_know_usd_and_btc() {
        let t = AssetTable::with_defaults();
        assert_eq!(t.get_scale("USD/2").unwrap(), ("USD".to_string(), 2));
        assert_eq!(t.get_scale("BTC/8").unwrap(), ("BTC".to_string(), 8));
        assert_eq!(t.get_scale("JPY").unwrap(), ("JPY".to_string(), 0));
    }

    #[test]
    fn unknown_code_is_unsupported() {
        let t = AssetTable::with_defaults();
        assert!(matches!(
            t.get_scale("ZZZ"),
            Err(MoneyError::UnsupportedAsset { .. })
        ));
        assert!(matches!(
            t.get_scale("ZZZ/2"),
            Err(MoneyError::UnsupportedAsset { .. })
        ));
    }

    #[test]
    fn scale_mismatch_is_invalid() {
        let t = AssetTable::with_defaults();
        assert!(matches!(
            t.get_scale("USD/3"),
            Err(MoneyError::InvalidAsset { .. })
        ));
    }

    #[test]
    fn malformed_strings_are_invalid() {
        let t = AssetTable::with_defaults();
        for bad in ["", "/2", "usd/2", "USD/x", "USD/-1"] {
            assert!(
                matches!(t.get_scale(bad), Err(MoneyError::InvalidAsset { .. })),
                "{bad:?} should be invalid"
            );
        }
    }

    #[test]
    fn insert_overrides_and_uppercases() {
        let t = AssetTable::new().with("eurc", 6);
        assert_eq!(t.scale_of("EURC"), Some(6));
        assert_eq!(t.normalize("EURC").unwrap(), "EURC/6");
    }
}
