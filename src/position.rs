// 4.0: running position per account per derivative. a position is the pair
// (notional, value): notional is the signed open size, value is the accumulated
// negative cost basis, -(fill notional * fill price) summed over every fill ever
// applied. value cannot be reconstructed from notional alone, so it is carried
// as state and only ever accumulated.
// 4.1 has the pure mark-to-market formula at the bottom.

use crate::types::{Notional, Price, Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub notional: Notional,
    pub value: Quote,
}

impl Position {
    pub fn flat() -> Self {
        Self {
            notional: Notional::zero(),
            value: Quote::zero(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.notional.is_zero() && self.value.is_zero()
    }

    /// Apply one fill. A long fill adds notional and subtracts notional*price
    /// from value; a short fill mirrors it. Two accounts applying opposite
    /// sides of the same fill stay zero-sum by construction.
    pub fn apply_fill(&mut self, side: Side, magnitude: Decimal, price: Price) {
        let signed = side.sign() * magnitude;
        self.notional = self.notional.add(signed);
        self.value = self.value.add(Quote::new(-(signed * price.value())));
    }

    /// Unrealized profit or loss at the given reference price.
    pub fn mark_to_market(&self, price: Price) -> Quote {
        mark_to_market(self.notional, self.value, price)
    }

    /// Realize the whole position at the close price: value becomes the
    /// mark-to-market result, notional flattens to zero.
    pub fn realize_close(&mut self, price: Price) {
        self.value = self.mark_to_market(price);
        self.notional = Notional::zero();
    }

    /// Realize a same-signed portion of the position at the given price.
    /// Removing the full notional is equivalent to `realize_close`.
    pub fn realize_partial(&mut self, removed: Notional, price: Price) {
        self.notional = self.notional.add(-removed.value());
        self.value = self.value.add(Quote::new(removed.value() * price.value()));
    }
}

// 4.1: the mark-to-market formula. notional * price + value
pub fn mark_to_market(notional: Notional, value: Quote, price: Price) -> Quote {
    Quote::new(notional.value() * price.value() + value.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fill_accumulates_value() {
        let mut pos = Position::flat();
        pos.apply_fill(Side::Long, dec!(10000), Price::new_unchecked(dec!(100000)));

        assert_eq!(pos.notional.value(), dec!(10000));
        assert_eq!(pos.value.value(), dec!(-1000000000));
    }

    #[test]
    fn opposite_fills_are_zero_sum() {
        let price = Price::new_unchecked(dec!(3000000000000000));
        let mut long = Position::flat();
        let mut short = Position::flat();

        long.apply_fill(Side::Long, dec!(10000), price);
        short.apply_fill(Side::Short, dec!(10000), price);

        assert_eq!(long.notional.value() + short.notional.value(), dec!(0));
        assert_eq!(long.value.value() + short.value.value(), dec!(0));
    }

    #[test]
    fn mtm_zero_at_fill_price() {
        let mut pos = Position::flat();
        let price = Price::new_unchecked(dec!(30000000000000));
        pos.apply_fill(Side::Long, dec!(10000), price);

        assert_eq!(pos.mark_to_market(price).value(), dec!(0));
    }

    #[test]
    fn mtm_tracks_price_move() {
        let mut pos = Position::flat();
        pos.apply_fill(Side::Long, dec!(10000), Price::new_unchecked(dec!(30000000000000)));

        // 10000 * (31e12 - 30e12) = 1e16
        let moved = Price::new_unchecked(dec!(31000000000000));
        assert_eq!(pos.mark_to_market(moved).value(), dec!(10000000000000000));
    }

    #[test]
    fn close_realizes_mtm_and_flattens() {
        let mut pos = Position::flat();
        pos.apply_fill(Side::Short, dec!(10000), Price::new_unchecked(dec!(100000)));

        pos.realize_close(Price::new_unchecked(dec!(20000)));
        assert_eq!(pos.notional.value(), dec!(0));
        // short from 100000 closed at 20000: 10000 * 80000 profit
        assert_eq!(pos.value.value(), dec!(800000000));
    }

    #[test]
    fn partial_realization_matches_full() {
        let price_in = Price::new_unchecked(dec!(50));
        let price_out = Price::new_unchecked(dec!(55));

        let mut whole = Position::flat();
        whole.apply_fill(Side::Short, dec!(9000), price_in);
        let mut partial = whole;

        whole.realize_close(price_out);

        partial.realize_partial(Notional::new(dec!(-9000)), price_out);
        assert_eq!(partial, whole);
    }
}
