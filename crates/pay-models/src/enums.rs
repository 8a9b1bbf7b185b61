//! Closed vocabularies shared by ledger entities and provider records.
//!
//! Wire names are upper-case and stable: they are part of identifier strings
//! and idempotency keys, so renaming a variant changes every derived id.

use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Direction of a payment relative to the connector's accounts.
    pub enum PaymentType {
        PayIn => "PAY-IN",
        Payout => "PAYOUT",
        Transfer => "TRANSFER",
        Other => "OTHER",
    }
}

wire_enum! {
    /// Status carried by each payment adjustment.
    pub enum PaymentStatus {
        Pending => "PENDING",
        Succeeded => "SUCCEEDED",
        Cancelled => "CANCELLED",
        Failed => "FAILED",
        Expired => "EXPIRED",
        Refunded => "REFUNDED",
        RefundedFailure => "REFUNDED_FAILURE",
        RefundReversed => "REFUND_REVERSED",
        Dispute => "DISPUTE",
        DisputeWon => "DISPUTE_WON",
        DisputeLost => "DISPUTE_LOST",
        Authorisation => "AUTHORISATION",
        Capture => "CAPTURE",
        CaptureFailed => "CAPTURE_FAILED",
        Other => "OTHER",
    }
}

impl PaymentStatus {
    /// Funds are reserved but not captured.
    pub fn is_authorisation_only(&self) -> bool {
        matches!(self, PaymentStatus::Authorisation)
    }
}

wire_enum! {
    /// Payment rail / instrument.
    pub enum PaymentScheme {
        CardVisa => "CARD_VISA",
        CardMasterCard => "CARD_MASTERCARD",
        CardAmex => "CARD_AMEX",
        Sepa => "SEPA",
        SepaCredit => "SEPA_CREDIT",
        SepaDebit => "SEPA_DEBIT",
        Ach => "ACH",
        AchDebit => "ACH_DEBIT",
        Rtp => "RTP",
        Wire => "WIRE",
        Other => "OTHER",
    }
}

wire_enum! {
    pub enum AccountType {
        Internal => "INTERNAL",
        External => "EXTERNAL",
    }
}

wire_enum! {
    pub enum OrderDirection {
        Buy => "BUY",
        Sell => "SELL",
    }
}

wire_enum! {
    pub enum OrderType {
        Market => "MARKET",
        Limit => "LIMIT",
        StopLimit => "STOP_LIMIT",
        Other => "OTHER",
    }
}

wire_enum! {
    pub enum OrderStatus {
        Pending => "PENDING",
        Open => "OPEN",
        PartiallyFilled => "PARTIALLY_FILLED",
        Filled => "FILLED",
        Cancelled => "CANCELLED",
        Failed => "FAILED",
        Expired => "EXPIRED",
    }
}

wire_enum! {
    pub enum TimeInForce {
        GoodUntilCancelled => "GOOD_UNTIL_CANCELLED",
        GoodUntilDateTime => "GOOD_UNTIL_DATE_TIME",
        ImmediateOrCancel => "IMMEDIATE_OR_CANCEL",
        FillOrKill => "FILL_OR_KILL",
    }
}

wire_enum! {
    pub enum TradeSide {
        Buy => "BUY",
        Sell => "SELL",
    }
}

wire_enum! {
    pub enum TradeStatus {
        Pending => "PENDING",
        PartiallyFilled => "PARTIALLY_FILLED",
        Filled => "FILLED",
        Cancelled => "CANCELLED",
        Failed => "FAILED",
    }
}

wire_enum! {
    pub enum InstrumentType {
        Spot => "SPOT",
        Other => "OTHER",
    }
}

wire_enum! {
    pub enum TaskStatus {
        Processing => "PROCESSING",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
    }
}
