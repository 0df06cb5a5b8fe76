// randomized invariants over the margin math and the matching path.

use forwards_core::{
    collateral_requirement, mark_to_market, DerivativeParams, Engine, EngineConfig, MarginRates,
    Notional, Position, Price, PriceOracle, Quote, Rate, Side, Timestamp, TraderId,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ADMIN: TraderId = TraderId(1000);

fn engine_with_two_accounts() -> (Engine, forwards_core::DerivativeId, Vec<forwards_core::AccountId>) {
    let mut engine = Engine::new(EngineConfig::default());
    let derivative = engine.create_derivative(
        ADMIN,
        DerivativeParams::new(Timestamp(1_000_000_000), 100, Quote::zero()),
        PriceOracle::AdministratorPush { authorized: ADMIN },
    );
    let mut accounts = Vec::new();
    for i in 1..=2u64 {
        let owner = TraderId(i);
        let account = engine.create_account(owner);
        engine
            .deposit(account, Quote::new(dec!(1000000000000000000000000)))
            .unwrap();
        engine.register_derivative(owner, account, derivative).unwrap();
        engine.add_verified_account(ADMIN, derivative, account).unwrap();
        accounts.push(account);
    }
    (engine, derivative, accounts)
}

proptest! {
    // holding n units entered at p is worth exactly zero at p
    #[test]
    fn mtm_zero_at_entry_price(n in -1_000_000i64..1_000_000, p in 1i64..10_000_000) {
        let n = Decimal::from(n);
        let p = Decimal::from(p);
        let value = Quote::new(-n * p);
        let mtm = mark_to_market(Notional::new(n), value, Price::new_unchecked(p));
        prop_assert_eq!(mtm.value(), Decimal::ZERO);
    }

    // and worth n * (p2 - p) at any other price
    #[test]
    fn mtm_is_linear_in_the_price_move(
        n in -1_000_000i64..1_000_000,
        p in 1i64..10_000_000,
        p2 in 1i64..10_000_000,
    ) {
        let n = Decimal::from(n);
        let value = Quote::new(-n * Decimal::from(p));
        let mtm = mark_to_market(Notional::new(n), value, Price::new_unchecked(Decimal::from(p2)));
        prop_assert_eq!(mtm.value(), n * Decimal::from(p2 - p));
    }

    // the requirement never goes negative and never ignores a loss
    #[test]
    fn requirement_is_nonnegative_and_covers_losses(
        n in -1_000_000i64..1_000_000,
        v in -1_000_000_000i64..1_000_000_000,
        p in 1i64..10_000,
        initial in 0u32..100,
        variation in 0u32..100,
    ) {
        let position = Position {
            notional: Notional::new(Decimal::from(n)),
            value: Quote::new(Decimal::from(v)),
        };
        let price = Price::new_unchecked(Decimal::from(p));
        let rates = MarginRates::new(Rate::from_percent(initial), Rate::from_percent(variation));
        let req = collateral_requirement(position, None, None, price, rates);

        prop_assert!(req.value() >= Decimal::ZERO);
        let loss = -position.mark_to_market(price).value();
        if loss > Decimal::ZERO {
            prop_assert!(req.value() >= loss);
        }
    }

    // adding a resting order can only raise the requirement
    #[test]
    fn resting_orders_never_lower_the_requirement(
        n in -1_000i64..1_000,
        p in 1i64..10_000,
        bid_n in 1i64..1_000,
        bid_p in 1i64..10_000,
    ) {
        let position = Position {
            notional: Notional::new(Decimal::from(n)),
            value: Quote::new(-Decimal::from(n) * Decimal::from(p)),
        };
        let price = Price::new_unchecked(Decimal::from(p));
        let rates = MarginRates::new(Rate::from_percent(30), Rate::from_percent(10));
        let bid = forwards_core::Order {
            notional: Decimal::from(bid_n),
            price: Price::new_unchecked(Decimal::from(bid_p)),
        };

        let bare = collateral_requirement(position, None, None, price, rates);
        let with_bid = collateral_requirement(position, Some(bid), None, price, rates);
        prop_assert!(with_bid >= bare);
    }

    // any cross leaves the two books zero-sum in notional and value
    #[test]
    fn matching_is_zero_sum(
        bid_n in 1i64..100_000,
        ask_n in 1i64..100_000,
        p in 1i64..1_000_000,
    ) {
        let (mut engine, derivative, accounts) = engine_with_two_accounts();
        let (a, b) = (accounts[0], accounts[1]);
        let price = Price::new_unchecked(Decimal::from(p));

        engine
            .submit_order(TraderId(1), a, derivative, Side::Long, Decimal::from(bid_n), price)
            .unwrap();
        engine
            .submit_order(TraderId(2), b, derivative, Side::Short, Decimal::from(ask_n), price)
            .unwrap();

        let long = engine.get_position(derivative, a);
        let short = engine.get_position(derivative, b);
        prop_assert_eq!(long.notional.value() + short.notional.value(), Decimal::ZERO);
        prop_assert_eq!(long.value.value() + short.value.value(), Decimal::ZERO);

        let filled = bid_n.min(ask_n);
        prop_assert_eq!(long.notional.value(), Decimal::from(filled));
    }

    // cancelling an empty side any number of times changes nothing
    #[test]
    fn cancel_is_idempotent(n in 1i64..100_000, p in 1i64..1_000_000, repeats in 1usize..4) {
        let (mut engine, derivative, accounts) = engine_with_two_accounts();
        let (a, b) = (accounts[0], accounts[1]);
        let price = Price::new_unchecked(Decimal::from(p));

        engine
            .submit_order(TraderId(2), b, derivative, Side::Short, Decimal::from(n), price)
            .unwrap();
        let before = engine.lowest_ask(derivative);

        for _ in 0..repeats {
            engine
                .submit_order(TraderId(1), a, derivative, Side::Long, Decimal::ZERO, price)
                .unwrap();
        }
        prop_assert_eq!(engine.lowest_ask(derivative), before);
        prop_assert_eq!(engine.highest_bid(derivative), None);
    }
}
