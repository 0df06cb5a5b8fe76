// 7.0: static configuration. DerivativeParams is fixed at construction (only
// the fee can move afterwards, through set_fee). EngineConfig tunes the engine
// shell itself, mostly the audit log.

use crate::types::{Quote, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeParams {
    /// When the forward matures. The managed close path opens at this time.
    pub expiry: Timestamp,
    /// Expected cadence between valuation calls, in milliseconds. Advisory:
    /// the engine only enforces that valuation time strictly advances.
    pub margin_period_ms: i64,
    /// Registration fee debited once per account.
    pub fee: Quote,
    /// Smallest acceptable order magnitude.
    pub min_notional: Decimal,
}

impl DerivativeParams {
    pub fn new(expiry: Timestamp, margin_period_ms: i64, fee: Quote) -> Self {
        Self {
            expiry,
            margin_period_ms,
            fee,
            min_notional: dec!(1),
        }
    }

    /// Daily-valued forward with no registration fee.
    pub fn daily(expiry: Timestamp) -> Self {
        Self::new(expiry, 86_400_000, Quote::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Oldest audit events are dropped past this many.
    pub max_events: usize,
    /// Echo every event to stdout as it is emitted.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }
}
