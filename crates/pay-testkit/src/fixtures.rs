//! Provider-shaped records for scenarios.

use chrono::{DateTime, TimeZone, Utc};
use pay_connector::{CursorState, FetchedPage, PspBatch};
use pay_models::{
    InstrumentType, PaymentScheme, PaymentStatus, PaymentType, PspAccount, PspBalance, PspPayment, PspTrade,
    TradeExecuted, TradeFee, TradeFill, TradeMarket, TradeSide, TradeStatus,
};
use pay_money::BigInt;

/// 2024-01-01T00:00:00Z plus `secs`.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200 + secs, 0)
        .single()
        .unwrap_or_default()
}

pub fn page(items: PspBatch, cursor: &str, has_more: bool) -> FetchedPage {
    FetchedPage {
        items,
        new_state: CursorState::from_bytes(cursor.as_bytes().to_vec()),
        has_more,
    }
}

pub fn account(reference: &str) -> PspAccount {
    PspAccount {
        reference: reference.to_string(),
        created_at: Some(ts(0)),
        name: Some(format!("{reference} main")),
        default_asset: Some("EUR/2".to_string()),
        metadata: Default::default(),
        raw: serde_json::json!({ "id": reference }),
    }
}

pub fn balance(account_reference: &str, asset: &str, amount: i64) -> PspBalance {
    PspBalance {
        account_reference: account_reference.to_string(),
        created_at: Some(ts(60)),
        asset: asset.to_string(),
        amount: BigInt::from(amount),
        metadata: Default::default(),
        raw: serde_json::json!({ "account": account_reference, "amount": amount }),
    }
}

pub fn payment(reference: &str, status: PaymentStatus, amount: i64, at: i64) -> PspPayment {
    PspPayment {
        parent_reference: None,
        reference: reference.to_string(),
        created_at: Some(ts(at)),
        payment_type: PaymentType::PayIn,
        amount: BigInt::from(amount),
        asset: "EUR/2".to_string(),
        scheme: PaymentScheme::CardVisa,
        status,
        source_account_reference: None,
        destination_account_reference: Some("acc_main".to_string()),
        metadata: Default::default(),
        raw: serde_json::json!({ "id": reference, "status": status.as_str() }),
    }
}

/// Refund `reference` adjusting payment `parent`.
pub fn refund(parent: &str, reference: &str, amount: i64, at: i64) -> PspPayment {
    PspPayment {
        parent_reference: Some(parent.to_string()),
        ..payment(reference, PaymentStatus::Refunded, amount, at)
    }
}

/// BUY 1 BTC at 100.5 USD with a 0.5 USD fee, one fill.
pub fn buy_trade(reference: &str) -> PspTrade {
    PspTrade {
        reference: reference.to_string(),
        created_at: Some(ts(0)),
        portfolio_account_reference: Some("portfolio".to_string()),
        order_reference: None,
        instrument_type: InstrumentType::Spot,
        market: TradeMarket {
            symbol: "BTC-USD".to_string(),
            base_asset: "BTC/8".to_string(),
            quote_asset: "USD/2".to_string(),
        },
        side: TradeSide::Buy,
        status: TradeStatus::Filled,
        fills: vec![TradeFill {
            trade_reference: format!("{reference}-f1"),
            timestamp: ts(1),
            price: "100.5".to_string(),
            quantity: "1".to_string(),
            quote_amount: "100.5".to_string(),
            fees: vec![],
            raw: serde_json::json!({ "fill": 1 }),
        }],
        fees: vec![TradeFee {
            asset: "USD/2".to_string(),
            amount: "0.5".to_string(),
            kind: None,
        }],
        executed: TradeExecuted {
            quantity: Some("1".to_string()),
            quote_amount: Some("100.5".to_string()),
            average_price: Some("100.5".to_string()),
            completed_at: Some(ts(1)),
        },
        metadata: Default::default(),
        raw: serde_json::json!({ "id": reference }),
    }
}
