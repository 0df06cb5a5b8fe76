// 8.0: one forward instance. everything scoped to a single derivative lives
// here: construction params, the oracle, active and staged margin rates, the
// verified participant set, every participant's position, the order book, the
// reference price, the valuation clock, and the closed/default flags.
// the engine mutates this through `&mut` access; order submission clones the
// whole struct to plan fills before committing, so it stays Clone.

use crate::book::OrderBook;
use crate::config::DerivativeParams;
use crate::margin::{collateral_requirement, MarginRates};
use crate::oracle::PriceOracle;
use crate::position::Position;
use crate::types::{AccountId, DerivativeId, Price, Quote, Rate, Side, Timestamp, TraderId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derivative {
    pub id: DerivativeId,
    pub admin: TraderId,
    pub params: DerivativeParams,
    pub oracle: PriceOracle,
    pub book: OrderBook,
    rates: MarginRates,
    pending_initial: Option<Rate>,
    pending_variation: Option<Rate>,
    verified: BTreeSet<AccountId>,
    positions: BTreeMap<AccountId, Position>,
    reference_price: Option<Price>,
    valuation_time: Option<Timestamp>,
    closed: BTreeSet<AccountId>,
    defaulted: BTreeSet<AccountId>,
}

impl Derivative {
    pub fn new(id: DerivativeId, admin: TraderId, params: DerivativeParams, oracle: PriceOracle) -> Self {
        Self {
            id,
            admin,
            params,
            oracle,
            book: OrderBook::new(),
            rates: MarginRates::default(),
            pending_initial: None,
            pending_variation: None,
            verified: BTreeSet::new(),
            positions: BTreeMap::new(),
            reference_price: None,
            valuation_time: None,
            closed: BTreeSet::new(),
            defaulted: BTreeSet::new(),
        }
    }

    // 8.1: participants

    pub fn verify_account(&mut self, account: AccountId) {
        self.verified.insert(account);
    }

    pub fn is_verified(&self, account: AccountId) -> bool {
        self.verified.contains(&account)
    }

    pub fn verified_accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.verified.iter().copied()
    }

    pub fn is_closed(&self, account: AccountId) -> bool {
        self.closed.contains(&account)
    }

    pub fn mark_closed(&mut self, account: AccountId) {
        self.closed.insert(account);
        self.book.clear_account(account);
    }

    pub fn is_in_default(&self, account: AccountId) -> bool {
        self.defaulted.contains(&account)
    }

    pub fn set_default(&mut self, account: AccountId, in_default: bool) {
        if in_default {
            self.defaulted.insert(account);
        } else {
            self.defaulted.remove(&account);
        }
    }

    // 8.2: positions. reads never allocate, unknown accounts are flat.

    pub fn position(&self, account: AccountId) -> Position {
        self.positions.get(&account).copied().unwrap_or_else(Position::flat)
    }

    pub fn position_mut(&mut self, account: AccountId) -> &mut Position {
        self.positions.entry(account).or_insert_with(Position::flat)
    }

    // 8.3: rates. margin-rate changes stage until the next valuation; the fee
    // moves immediately.

    pub fn rates(&self) -> MarginRates {
        self.rates
    }

    pub fn stage_initial_rate(&mut self, rate: Rate) {
        self.pending_initial = Some(rate);
    }

    pub fn stage_variation_rate(&mut self, rate: Rate) {
        self.pending_variation = Some(rate);
    }

    pub fn activate_staged_rates(&mut self) {
        if let Some(rate) = self.pending_initial.take() {
            self.rates.initial = rate;
        }
        if let Some(rate) = self.pending_variation.take() {
            self.rates.variation = rate;
        }
    }

    pub fn set_fee(&mut self, fee: Quote) {
        self.params.fee = fee;
    }

    // 8.4: valuation clock and reference price

    pub fn reference_price(&self) -> Option<Price> {
        self.reference_price
    }

    pub fn set_reference_price(&mut self, price: Price) {
        self.reference_price = Some(price);
    }

    pub fn valuation_time(&self) -> Option<Timestamp> {
        self.valuation_time
    }

    /// Record a valuation timestamp. Returns false when it does not strictly
    /// advance the clock.
    pub fn advance_valuation(&mut self, time: Timestamp) -> bool {
        if self.valuation_time.is_some_and(|t| time <= t) {
            return false;
        }
        self.valuation_time = Some(time);
        true
    }

    pub fn has_matured(&self) -> bool {
        self.valuation_time.is_some_and(|t| t >= self.params.expiry)
    }

    // 8.5: derived state

    /// Collateral the account must keep allocated, at the current reference
    /// price and active rates. Zero before the first price is known.
    pub fn requirement(&self, account: AccountId) -> Quote {
        let Some(price) = self.reference_price else {
            return Quote::zero();
        };
        collateral_requirement(
            self.position(account),
            self.book.order_of(account, Side::Long),
            self.book.order_of(account, Side::Short),
            price,
            self.rates,
        )
    }

    /// Expired once there is at least one verified account and every verified
    /// account has closed its position.
    pub fn is_expired(&self) -> bool {
        !self.verified.is_empty() && self.verified.iter().all(|a| self.closed.contains(a))
    }

    /// Settled once expired and every verified account's position value has
    /// been paired off to zero.
    pub fn is_settled(&self) -> bool {
        self.is_expired()
            && self
                .verified
                .iter()
                .all(|a| self.position(*a).value.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn derivative() -> Derivative {
        Derivative::new(
            DerivativeId(1),
            TraderId(99),
            DerivativeParams::new(Timestamp(1000), 100, Quote::zero()),
            PriceOracle::AdministratorPush {
                authorized: TraderId(99),
            },
        )
    }

    #[test]
    fn staged_rates_wait_for_activation() {
        let mut d = derivative();
        d.stage_initial_rate(Rate::from_percent(30));
        d.stage_variation_rate(Rate::from_percent(10));
        assert_eq!(d.rates(), MarginRates::default());

        d.activate_staged_rates();
        assert_eq!(d.rates().initial, Rate::from_percent(30));
        assert_eq!(d.rates().variation, Rate::from_percent(10));
    }

    #[test]
    fn valuation_clock_only_advances() {
        let mut d = derivative();
        assert!(d.advance_valuation(Timestamp(10)));
        assert!(!d.advance_valuation(Timestamp(10)));
        assert!(!d.advance_valuation(Timestamp(5)));
        assert!(d.advance_valuation(Timestamp(11)));
    }

    #[test]
    fn expiry_needs_a_participant() {
        let mut d = derivative();
        assert!(!d.is_expired());

        d.verify_account(AccountId(1));
        d.verify_account(AccountId(2));
        d.mark_closed(AccountId(1));
        assert!(!d.is_expired());

        d.mark_closed(AccountId(2));
        assert!(d.is_expired());
        assert!(d.is_settled());
    }

    #[test]
    fn settled_requires_zero_values() {
        let mut d = derivative();
        d.verify_account(AccountId(1));
        d.position_mut(AccountId(1)).value = Quote::new(dec!(45000));
        d.mark_closed(AccountId(1));

        assert!(d.is_expired());
        assert!(!d.is_settled());

        d.position_mut(AccountId(1)).value = Quote::zero();
        assert!(d.is_settled());
    }
}
