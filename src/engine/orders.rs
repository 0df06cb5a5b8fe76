// 12.0: order submission. one entry point covers replace, cancel, offset,
// match, and rest:
//   notional 0                      -> cancel the side (idempotent)
//   existing same-side order        -> discarded wholesale first
//   own opposite order crosses      -> offset, no trade, no position change
//   opposite book crosses           -> fill at each resting order's price,
//                                      best price first, account id breaks
//                                      ties, unwind slot last
//   anything left                   -> rests at the submitted limit
// the whole plan runs on a clone of the derivative. the submitter's collateral
// is checked against the planned requirement before anything is committed, so
// a rejected order leaves no trace. counterparty allocations are re-synced
// best effort after commit; their default flags wait for the next margin
// check.

use crate::book::{Maker, Order};
use crate::engine::core::Engine;
use crate::engine::results::{ClearingError, Fill, OrderResult};
use crate::events::EventPayload;
use crate::types::{AccountId, DerivativeId, Price, Side, TraderId};
use rust_decimal::Decimal;

impl Engine {
    pub fn submit_order(
        &mut self,
        caller: TraderId,
        account: AccountId,
        derivative: DerivativeId,
        side: Side,
        notional: Decimal,
        price: Price,
    ) -> Result<OrderResult, ClearingError> {
        self.account(account)?.require_authorized(caller)?;
        let deriv = self.derivative(derivative)?;
        if !deriv.is_verified(account) {
            return Err(ClearingError::NotVerified(account));
        }
        if deriv.is_closed(account) {
            return Err(ClearingError::AccountClosed(account));
        }
        if notional < Decimal::ZERO {
            return Err(ClearingError::NegativeNotional);
        }
        if notional.is_zero() {
            return self.cancel_order(account, derivative, side);
        }
        let minimum = deriv.params.min_notional;
        if notional < minimum {
            return Err(ClearingError::OrderTooSmall { notional, minimum });
        }

        // 12.1: plan every effect on a scratch copy
        let mut planned = deriv.clone();
        planned.book.set_order(account, side, None);

        let mut remaining = notional;
        let mut offset = Decimal::ZERO;
        if let Some(own) = planned.book.order_of(account, side.opposite()) {
            let crosses = match side {
                Side::Long => own.price <= price,
                Side::Short => own.price >= price,
            };
            if crosses {
                offset = remaining.min(own.notional);
                planned
                    .book
                    .reduce_order(Maker::Account(account), side.opposite(), offset);
                remaining -= offset;
            }
        }

        let mut fills = Vec::new();
        while remaining > Decimal::ZERO {
            let Some((maker, resting)) = planned.book.best_counterparty(side, price) else {
                break;
            };
            let amount = remaining.min(resting.notional);
            let fill_price = resting.price;

            planned.position_mut(account).apply_fill(side, amount, fill_price);
            let maker_account = match maker {
                Maker::Account(m) => {
                    planned
                        .position_mut(m)
                        .apply_fill(side.opposite(), amount, fill_price);
                    Some(m)
                }
                // the defaulter's loss was realized at close-out; the unwind
                // fill moves only the aggressor
                Maker::Unwind => None,
            };
            planned.book.reduce_order(maker, side.opposite(), amount);
            planned.set_reference_price(fill_price);
            fills.push(Fill {
                maker: maker_account,
                notional: amount,
                price: fill_price,
            });
            remaining -= amount;
        }

        if remaining > Decimal::ZERO {
            planned.book.set_order(
                account,
                side,
                Some(Order {
                    notional: remaining,
                    price,
                }),
            );
        }

        // 12.2: collateral gate on the submitter, then commit
        let required = planned.requirement(account);
        let acc = self.account(account)?;
        let coverable = acc.total_available().add(acc.allocation(derivative));
        if required > coverable {
            return Err(ClearingError::InsufficientCollateral {
                required,
                coverable,
            });
        }

        let mut counterparties: Vec<AccountId> = fills.iter().filter_map(|f| f.maker).collect();
        counterparties.dedup();
        *self.derivative_mut(derivative)? = planned;
        self.account_mut(account)?.set_allocation(derivative, required);
        for maker in counterparties {
            let requirement = self.derivative(derivative)?.requirement(maker);
            self.account_mut(maker)?.set_allocation(derivative, requirement);
        }

        self.emit(EventPayload::OrderPlaced {
            derivative,
            account,
            side,
            notional,
            price,
        });
        if offset > Decimal::ZERO {
            self.emit(EventPayload::OrderOffset {
                derivative,
                account,
                side,
                amount: offset,
            });
        }
        for fill in &fills {
            self.emit(EventPayload::Fill {
                derivative,
                taker: account,
                maker: fill.maker,
                taker_side: side,
                notional: fill.notional,
                price: fill.price,
            });
        }

        Ok(OrderResult {
            fills,
            offset,
            resting: remaining,
        })
    }

    // 12.3: cancel. clearing an empty side is a no-op and still Ok.
    fn cancel_order(
        &mut self,
        account: AccountId,
        derivative: DerivativeId,
        side: Side,
    ) -> Result<OrderResult, ClearingError> {
        let deriv = self.derivative_mut(derivative)?;
        deriv.book.set_order(account, side, None);
        let required = deriv.requirement(account);
        self.account_mut(account)?.set_allocation(derivative, required);
        self.emit(EventPayload::OrderCancelled {
            derivative,
            account,
            side,
        });
        Ok(OrderResult {
            fills: Vec::new(),
            offset: Decimal::ZERO,
            resting: Decimal::ZERO,
        })
    }
}
