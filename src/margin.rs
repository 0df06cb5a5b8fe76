// 5.0: margin math. all pure functions, no engine state. the requirement for
// an account considers both ways its exposure can grow: the long side (position
// plus the resting bid filling in full) and the short side (position plus the
// resting ask). each side owes initial margin on the entry-priced exposure,
// variation margin on the open size at the reference price, minus whatever
// unrealized profit the side already carries. the binding side wins.

use crate::book::Order;
use crate::position::{mark_to_market, Position};
use crate::types::{Notional, Price, Quote, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginRates {
    pub initial: Rate,
    pub variation: Rate,
}

impl MarginRates {
    pub fn new(initial: Rate, variation: Rate) -> Self {
        Self { initial, variation }
    }
}

// 5.1: one side of the requirement.
// max(0, initial*|v| + variation*|n|*p - (n*p + v))
fn side_requirement(notional: Decimal, value: Decimal, price: Price, rates: MarginRates) -> Decimal {
    let initial = rates.initial.as_fraction() * value.abs();
    let variation = rates.variation.as_fraction() * notional.abs() * price.value();
    let unrealized = mark_to_market(Notional::new(notional), Quote::new(value), price).value();
    (initial + variation - unrealized).max(Decimal::ZERO)
}

/// Collateral the account must hold allocated against this derivative, given
/// its position, its resting orders, and the current reference price.
pub fn collateral_requirement(
    position: Position,
    bid: Option<Order>,
    ask: Option<Order>,
    price: Price,
    rates: MarginRates,
) -> Quote {
    let n = position.notional.value();
    let v = position.value.value();

    // long side: the bid fills in full at its limit price
    let (long_n, long_v) = match bid {
        Some(o) => (n + o.notional, v - o.notional * o.price.value()),
        None => (n, v),
    };
    // short side: the ask fills in full at its limit price
    let (short_n, short_v) = match ask {
        Some(o) => (n - o.notional, v + o.notional * o.price.value()),
        None => (n, v),
    };

    let long = side_requirement(long_n, long_v, price, rates);
    let short = side_requirement(short_n, short_v, price, rates);
    Quote::new(long.max(short))
}
