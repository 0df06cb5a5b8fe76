// 3.0: resting orders. each account carries at most one bid and one ask on a
// derivative; submitting on a side the account already quotes replaces the old
// order wholesale, and notional zero clears it. on top of the per-account
// entries the book owns one extra slot, the unwind slot, which holds the
// mirror interest posted by forced close-outs. it belongs to the derivative
// itself, not to any account.
// 3.1: aggregates (highest bid, lowest ask) are cached and recomputed after
// every mutation. scan order is fixed: accounts in id order, unwind slot last,
// so price ties always resolve the same way.

use crate::types::{AccountId, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One resting order: a positive magnitude at a limit price. The side is
/// implied by which slot it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub notional: Decimal,
    pub price: Price,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBook {
    pub bid: Option<Order>,
    pub ask: Option<Order>,
}

impl AccountBook {
    pub fn get(&self, side: Side) -> Option<Order> {
        match side {
            Side::Long => self.bid,
            Side::Short => self.ask,
        }
    }

    fn slot(&mut self, side: Side) -> &mut Option<Order> {
        match side {
            Side::Long => &mut self.bid,
            Side::Short => &mut self.ask,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bid.is_none() && self.ask.is_none()
    }
}

/// The maker matched against: a verified account's resting order, or the
/// derivative's own unwind slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maker {
    Account(AccountId),
    Unwind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    entries: BTreeMap<AccountId, AccountBook>,
    unwind: AccountBook,
    best_bid: Option<Price>,
    best_ask: Option<Price>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_of(&self, account: AccountId, side: Side) -> Option<Order> {
        self.entries.get(&account).and_then(|b| b.get(side))
    }

    pub fn unwind_order(&self, side: Side) -> Option<Order> {
        self.unwind.get(side)
    }

    pub fn highest_bid(&self) -> Option<Price> {
        self.best_bid
    }

    pub fn lowest_ask(&self) -> Option<Price> {
        self.best_ask
    }

    // 3.2: mutations. every one of these ends in recompute_aggregates.

    /// Wholesale replacement. `None` clears the slot; clearing an empty slot
    /// is a no-op.
    pub fn set_order(&mut self, account: AccountId, side: Side, order: Option<Order>) {
        match order {
            Some(o) => {
                *self.entries.entry(account).or_default().slot(side) = Some(o);
            }
            None => {
                if let Some(book) = self.entries.get_mut(&account) {
                    *book.slot(side) = None;
                    if book.is_empty() {
                        self.entries.remove(&account);
                    }
                }
            }
        }
        self.recompute_aggregates();
    }

    pub fn set_unwind_order(&mut self, side: Side, order: Option<Order>) {
        *self.unwind.slot(side) = order;
        self.recompute_aggregates();
    }

    /// Reduce a resting order by a fill amount, removing it once exhausted.
    pub fn reduce_order(&mut self, maker: Maker, side: Side, amount: Decimal) {
        let slot = match maker {
            Maker::Account(account) => self
                .entries
                .get_mut(&account)
                .map(|b| b.slot(side)),
            Maker::Unwind => Some(self.unwind.slot(side)),
        };
        if let Some(slot) = slot {
            match slot {
                Some(order) if order.notional > amount => order.notional -= amount,
                Some(_) => *slot = None,
                None => {}
            }
        }
        if let Maker::Account(account) = maker {
            if self.entries.get(&account).is_some_and(|b| b.is_empty()) {
                self.entries.remove(&account);
            }
        }
        self.recompute_aggregates();
    }

    /// Drop both of an account's resting orders. Used when the account closes.
    pub fn clear_account(&mut self, account: AccountId) {
        self.entries.remove(&account);
        self.recompute_aggregates();
    }

    // 3.3: matching scan. finds the opposite-side resting order with the best
    // price that crosses the taker's limit. at equal prices the lowest account
    // id wins and the unwind slot goes last.

    pub fn best_counterparty(&self, taker_side: Side, limit: Price) -> Option<(Maker, Order)> {
        let maker_side = taker_side.opposite();
        let mut best: Option<(Maker, Order)> = None;

        let candidates = self
            .entries
            .iter()
            .filter_map(|(id, book)| book.get(maker_side).map(|o| (Maker::Account(*id), o)))
            .chain(
                self.unwind
                    .get(maker_side)
                    .map(|o| (Maker::Unwind, o)),
            );

        for (maker, order) in candidates {
            let crosses = match taker_side {
                Side::Long => order.price <= limit,
                Side::Short => order.price >= limit,
            };
            if !crosses {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, incumbent)) => match taker_side {
                    Side::Long => order.price < incumbent.price,
                    Side::Short => order.price > incumbent.price,
                },
            };
            if better {
                best = Some((maker, order));
            }
        }
        best
    }

    fn recompute_aggregates(&mut self) {
        let bids = self
            .entries
            .values()
            .filter_map(|b| b.bid)
            .chain(self.unwind.bid)
            .map(|o| o.price);
        self.best_bid = bids.max();

        let asks = self
            .entries
            .values()
            .filter_map(|b| b.ask)
            .chain(self.unwind.ask)
            .map(|o| o.price);
        self.best_ask = asks.min();
    }
}
