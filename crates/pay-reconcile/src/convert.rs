//! Provider record -> ledger entity conversion.
//!
//! Pure: no store access. Each function validates the record and returns the
//! entity together with the idempotency key its write is applied under.

use chrono::{DateTime, Utc};
use num_bigint::Sign;
use pay_ids::CompositeId;
use pay_models::{
    Account, AccountId, AccountType, Balance, ConnectorId, Order, OrderAdjustment, OrderId,
    Payment, PaymentAdjustment, PaymentId, PspAccount, PspBalance, PspOrder, PspOther,
    PspPayment, PspTrade, Trade, TradeAdjustment, TradeId,
};
use pay_money::AssetTable;

use crate::ReconcileError;

fn invalid(kind: &'static str, reference: &str, reason: impl Into<String>) -> ReconcileError {
    ReconcileError::Validation {
        kind,
        reference: reference.to_string(),
        reason: reason.into(),
    }
}

fn require_reference(kind: &'static str, reference: &str) -> Result<(), ReconcileError> {
    if reference.trim().is_empty() {
        return Err(invalid(kind, reference, "reference is empty"));
    }
    Ok(())
}

fn require_created_at(
    kind: &'static str,
    reference: &str,
    created_at: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, ReconcileError> {
    created_at.ok_or_else(|| invalid(kind, reference, "created_at is not set"))
}

fn require_raw(kind: &'static str, reference: &str, raw: &serde_json::Value) -> Result<(), ReconcileError> {
    if raw.is_null() {
        return Err(invalid(kind, reference, "raw payload is missing"));
    }
    Ok(())
}

fn asset(assets: &AssetTable, raw: &str) -> Result<String, ReconcileError> {
    Ok(assets.normalize(raw)?)
}

fn account_id(connector_id: &ConnectorId, reference: &str) -> AccountId {
    AccountId {
        reference: reference.to_string(),
        connector_id: connector_id.clone(),
    }
}

fn optional_account_id(connector_id: &ConnectorId, reference: &Option<String>) -> Option<AccountId> {
    reference
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(|r| account_id(connector_id, r))
}

// ---------------------------------------------------------------------------
// Accounts / balances
// ---------------------------------------------------------------------------

pub fn account_from_psp(
    connector_id: &ConnectorId,
    psp: &PspAccount,
    account_type: AccountType,
    assets: &AssetTable,
) -> Result<(Account, String), ReconcileError> {
    const KIND: &str = "account";
    require_reference(KIND, &psp.reference)?;
    let created_at = require_created_at(KIND, &psp.reference, psp.created_at)?;
    require_raw(KIND, &psp.reference, &psp.raw)?;
    let default_asset = match &psp.default_asset {
        Some(a) => Some(asset(assets, a)?),
        None => None,
    };

    let account = Account {
        id: account_id(connector_id, &psp.reference),
        connector_id: connector_id.clone(),
        created_at,
        reference: psp.reference.clone(),
        account_type,
        name: psp.name.clone(),
        default_asset,
        metadata: psp.metadata.clone(),
        raw: psp.raw.clone(),
    };
    let key = account.idempotency_key();
    Ok((account, key))
}

pub fn balance_from_psp(
    connector_id: &ConnectorId,
    psp: &PspBalance,
    assets: &AssetTable,
) -> Result<(Balance, String), ReconcileError> {
    const KIND: &str = "balance";
    require_reference(KIND, &psp.account_reference)?;
    let created_at = require_created_at(KIND, &psp.account_reference, psp.created_at)?;
    require_raw(KIND, &psp.account_reference, &psp.raw)?;

    let balance = Balance {
        account_id: account_id(connector_id, &psp.account_reference),
        created_at,
        last_updated_at: created_at,
        asset: asset(assets, &psp.asset)?,
        balance: psp.amount.clone(),
        metadata: psp.metadata.clone(),
        raw: psp.raw.clone(),
    };
    let key = balance.idempotency_key();
    Ok((balance, key))
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Canonical payment reference: the parent's when the record adjusts another
/// payment, the record's own otherwise.
pub fn canonical_payment_reference(psp: &PspPayment) -> &str {
    match psp.parent_reference.as_deref() {
        Some(parent) if !parent.trim().is_empty() => parent,
        _ => &psp.reference,
    }
}

/// One payment carrying exactly one new adjustment. The adjustment keeps the
/// record's own reference even when filed under a parent.
pub fn payment_from_psp(
    connector_id: &ConnectorId,
    psp: &PspPayment,
    assets: &AssetTable,
) -> Result<(Payment, String), ReconcileError> {
    const KIND: &str = "payment";
    require_reference(KIND, &psp.reference)?;
    let created_at = require_created_at(KIND, &psp.reference, psp.created_at)?;
    require_raw(KIND, &psp.reference, &psp.raw)?;
    if psp.amount.sign() == Sign::Minus {
        return Err(invalid(KIND, &psp.reference, "amount is negative"));
    }
    let asset = asset(assets, &psp.asset)?;

    let id = PaymentId::new(
        canonical_payment_reference(psp),
        psp.payment_type,
        connector_id.clone(),
    );

    let mut payment = Payment::new(id.clone(), created_at, asset.clone());
    payment.scheme = psp.scheme;
    payment.source_account_id = optional_account_id(connector_id, &psp.source_account_reference);
    payment.destination_account_id =
        optional_account_id(connector_id, &psp.destination_account_reference);
    payment.metadata = psp.metadata.clone();
    payment.raw = psp.raw.clone();

    let mut adj = PaymentAdjustment::new(id, psp.reference.clone(), created_at, psp.status)
        .with_amount(psp.amount.clone(), asset)
        .with_raw(psp.raw.clone());
    adj.metadata = psp.metadata.clone();
    let key = adj.idempotency_key();

    payment
        .append_adjustment(adj)
        .map_err(|e| invalid(KIND, &psp.reference, e.to_string()))?;
    Ok((payment, key))
}

// ---------------------------------------------------------------------------
// Orders / trades
// ---------------------------------------------------------------------------

pub fn order_from_psp(
    connector_id: &ConnectorId,
    psp: &PspOrder,
    assets: &AssetTable,
) -> Result<(Order, String), ReconcileError> {
    const KIND: &str = "order";
    require_reference(KIND, &psp.reference)?;
    let created_at = require_created_at(KIND, &psp.reference, psp.created_at)?;
    require_raw(KIND, &psp.reference, &psp.raw)?;
    if psp.base_quantity_ordered.sign() == Sign::Minus {
        return Err(invalid(KIND, &psp.reference, "ordered quantity is negative"));
    }

    let id = OrderId {
        reference: psp.reference.clone(),
        connector_id: connector_id.clone(),
    };
    let mut order = Order::new(
        id.clone(),
        created_at,
        psp.direction,
        asset(assets, &psp.source_asset)?,
        asset(assets, &psp.destination_asset)?,
    );
    order.order_type = psp.order_type;
    order.time_in_force = psp.time_in_force;
    order.base_quantity_ordered = psp.base_quantity_ordered.clone();
    order.metadata = psp.metadata.clone();
    order.raw = psp.raw.clone();

    let mut adj = OrderAdjustment::new(id, psp.reference.clone(), created_at, psp.status);
    adj.base_quantity_filled = psp.base_quantity_filled.clone();
    adj.raw = psp.raw.clone();
    let key = adj.idempotency_key();

    order
        .append_adjustment(adj)
        .map_err(|e| invalid(KIND, &psp.reference, e.to_string()))?;
    Ok((order, key))
}

/// A trade re-observed with more fills under an unchanged status is a new
/// write: the key covers the fill count as well as the adjustment id.
pub fn trade_from_psp(
    connector_id: &ConnectorId,
    psp: &PspTrade,
    assets: &AssetTable,
) -> Result<(Trade, String), ReconcileError> {
    const KIND: &str = "trade";
    require_reference(KIND, &psp.reference)?;
    let created_at = require_created_at(KIND, &psp.reference, psp.created_at)?;
    require_raw(KIND, &psp.reference, &psp.raw)?;

    let mut market = psp.market.clone();
    market.base_asset = asset(assets, &market.base_asset)?;
    market.quote_asset = asset(assets, &market.quote_asset)?;

    let id = TradeId {
        reference: psp.reference.clone(),
        connector_id: connector_id.clone(),
    };
    let mut trade = Trade::new(id.clone(), created_at, market, psp.side);
    trade.instrument_type = psp.instrument_type;
    trade.portfolio_account_id = optional_account_id(connector_id, &psp.portfolio_account_reference);
    trade.order_id = psp
        .order_reference
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(|r| OrderId {
            reference: r.to_string(),
            connector_id: connector_id.clone(),
        });
    trade.fills = psp.fills.clone();
    trade.fees = psp.fees.clone();
    trade.executed = psp.executed.clone();
    trade.metadata = psp.metadata.clone();
    trade.raw = psp.raw.clone();

    let mut adj = TradeAdjustment::new(id, psp.reference.clone(), created_at, psp.status);
    adj.raw = psp.raw.clone();
    let key = pay_ids::idempotency_key(&(adj.id.encode(), trade.fills.len()));

    trade
        .append_adjustment(adj)
        .map_err(|e| invalid(KIND, &psp.reference, e.to_string()))?;
    Ok((trade, key))
}

pub fn other_key(connector_id: &ConnectorId, psp: &PspOther) -> Result<String, ReconcileError> {
    require_reference("other", &psp.id)?;
    Ok(pay_ids::idempotency_key(&(connector_id, &psp.id, &psp.other)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use num_bigint::BigInt;
    use pay_models::{PaymentScheme, PaymentStatus, PaymentType};
    use pay_money::MoneyError;

    fn cid() -> ConnectorId {
        ConnectorId::for_installation("stripe", "main")
    }

    fn psp(reference: &str) -> PspPayment {
        PspPayment {
            parent_reference: None,
            reference: reference.into(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()),
            payment_type: PaymentType::PayIn,
            amount: BigInt::from(1234),
            asset: "USD/2".into(),
            scheme: PaymentScheme::CardVisa,
            status: PaymentStatus::Succeeded,
            source_account_reference: None,
            destination_account_reference: Some("acct_1".into()),
            metadata: Default::default(),
            raw: serde_json::json!({"id": reference}),
        }
    }

    #[test]
    fn empty_reference_is_a_validation_error() {
        let err = payment_from_psp(&cid(), &psp(""), &AssetTable::with_defaults()).unwrap_err();
        assert!(matches!(err, ReconcileError::Validation { .. }));
    }

    #[test]
    fn missing_created_at_is_a_validation_error() {
        let mut p = psp("py_1");
        p.created_at = None;
        let err = payment_from_psp(&cid(), &p, &AssetTable::with_defaults()).unwrap_err();
        assert!(matches!(err, ReconcileError::Validation { .. }));
    }

    #[test]
    fn null_raw_is_a_validation_error() {
        let mut p = psp("py_1");
        p.raw = serde_json::Value::Null;
        assert!(payment_from_psp(&cid(), &p, &AssetTable::with_defaults()).is_err());
    }

    #[test]
    fn balance_without_raw_is_a_validation_error() {
        let assets = AssetTable::with_defaults();
        let mut b = PspBalance {
            account_reference: "acct_1".into(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()),
            asset: "EUR/2".into(),
            amount: BigInt::from(900),
            metadata: Default::default(),
            raw: serde_json::Value::Null,
        };
        let err = balance_from_psp(&cid(), &b, &assets).unwrap_err();
        assert!(matches!(err, ReconcileError::Validation { .. }));

        b.raw = serde_json::json!({"available": 900});
        let (balance, _) = balance_from_psp(&cid(), &b, &assets).unwrap();
        assert_eq!(balance.raw, b.raw);
    }

    #[test]
    fn unknown_asset_is_a_money_error() {
        let mut p = psp("py_1");
        p.asset = "ZZZ/2".into();
        let err = payment_from_psp(&cid(), &p, &AssetTable::with_defaults()).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Money(MoneyError::UnsupportedAsset { .. })
        ));
    }

    #[test]
    fn bare_asset_code_is_normalized() {
        let mut p = psp("py_1");
        p.asset = "JPY".into();
        let (payment, _) = payment_from_psp(&cid(), &p, &AssetTable::with_defaults()).unwrap();
        assert_eq!(payment.asset, "JPY/0");
    }

    #[test]
    fn refund_files_under_parent_with_own_reference() {
        let mut r = psp("re_9");
        r.parent_reference = Some("py_1".into());
        r.status = PaymentStatus::Refunded;
        let (payment, _) = payment_from_psp(&cid(), &r, &AssetTable::with_defaults()).unwrap();
        assert_eq!(payment.reference(), "py_1");
        assert_eq!(payment.adjustments()[0].reference, "re_9");
        assert_eq!(
            payment.destination_account_id.as_ref().map(|a| a.reference.as_str()),
            Some("acct_1")
        );
    }

    #[test]
    fn same_event_yields_same_key() {
        let assets = AssetTable::with_defaults();
        let (_, k1) = payment_from_psp(&cid(), &psp("py_1"), &assets).unwrap();
        let (_, k2) = payment_from_psp(&cid(), &psp("py_1"), &assets).unwrap();
        assert_eq!(k1, k2);

        let mut later = psp("py_1");
        later.status = PaymentStatus::Refunded;
        let (_, k3) = payment_from_psp(&cid(), &later, &assets).unwrap();
        assert_ne!(k1, k3);
    }
}
