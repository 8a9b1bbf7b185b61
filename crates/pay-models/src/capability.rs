//! Connector capabilities and fetchable entity kinds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One operation a connector may advertise at install time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    FetchAccounts,
    FetchBalances,
    FetchExternalAccounts,
    FetchPayments,
    FetchOrders,
    FetchTrades,
    FetchOthers,
    CreateWebhooks,
    TranslateWebhooks,
    CreateBankAccount,
    CreateTransfer,
    CreatePayout,
}

/// Entity kinds reachable through fetch-next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchKind {
    Accounts,
    Balances,
    ExternalAccounts,
    Payments,
    Orders,
    Trades,
    Others,
}

impl FetchKind {
    pub const ALL: [FetchKind; 7] = [
        FetchKind::Accounts,
        FetchKind::Balances,
        FetchKind::ExternalAccounts,
        FetchKind::Payments,
        FetchKind::Orders,
        FetchKind::Trades,
        FetchKind::Others,
    ];

    /// Capability that must be advertised before this kind can be fetched.
    pub fn capability(&self) -> Capability {
        match self {
            FetchKind::Accounts => Capability::FetchAccounts,
            FetchKind::Balances => Capability::FetchBalances,
            FetchKind::ExternalAccounts => Capability::FetchExternalAccounts,
            FetchKind::Payments => Capability::FetchPayments,
            FetchKind::Orders => Capability::FetchOrders,
            FetchKind::Trades => Capability::FetchTrades,
            FetchKind::Others => Capability::FetchOthers,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::Accounts => "accounts",
            FetchKind::Balances => "balances",
            FetchKind::ExternalAccounts => "external_accounts",
            FetchKind::Payments => "payments",
            FetchKind::Orders => "orders",
            FetchKind::Trades => "trades",
            FetchKind::Others => "others",
        }
    }
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set a connector advertised at install time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, c: Capability) -> bool {
        self.0.contains(&c)
    }

    pub fn insert(&mut self, c: Capability) {
        self.0.insert(c);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_a_fetch_capability() {
        let caps: CapabilitySet = FetchKind::ALL.iter().map(|k| k.capability()).collect();
        assert_eq!(caps.len(), FetchKind::ALL.len());
        assert!(!caps.contains(Capability::CreatePayout));
    }

    #[test]
    fn capability_wire_name() {
        assert_eq!(
            serde_json::to_string(&Capability::FetchExternalAccounts).unwrap(),
            "\"FETCH_EXTERNAL_ACCOUNTS\""
        );
    }
}
