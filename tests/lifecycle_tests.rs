// end-to-end walkthroughs: a full life of a forward from first trade to
// destruction, and a default remediated by a forced close-out.

use forwards_core::{
    AccountId, DerivativeId, DerivativeParams, Engine, EngineConfig, Notional, Price, PriceOracle,
    Quote, Rate, Side, Timestamp, TraderId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ADMIN: TraderId = TraderId(1000);

fn setup(
    fee: Decimal,
    deposit: Decimal,
    expiry: i64,
) -> (Engine, DerivativeId, AccountId, AccountId) {
    let mut engine = Engine::new(EngineConfig::default());
    let derivative = engine.create_derivative(
        ADMIN,
        DerivativeParams::new(Timestamp(expiry), 86_400_000, Quote::new(fee)),
        PriceOracle::AdministratorPush { authorized: ADMIN },
    );
    let mut ids = Vec::new();
    for i in 1..=2u64 {
        let owner = TraderId(i);
        let account = engine.create_account(owner);
        engine.deposit(account, Quote::new(deposit)).unwrap();
        engine.register_derivative(owner, account, derivative).unwrap();
        engine.add_verified_account(ADMIN, derivative, account).unwrap();
        ids.push(account);
    }
    (engine, derivative, ids[0], ids[1])
}

fn price(p: Decimal) -> Price {
    Price::new_unchecked(p)
}

#[test]
fn full_lifecycle_through_destroy() {
    let (mut engine, derivative, long, short) = setup(dec!(500), dec!(1000000), 100);

    engine
        .set_initial_margin_rate(ADMIN, derivative, Rate::from_percent(30))
        .unwrap();
    engine
        .set_variation_margin_rate(ADMIN, derivative, Rate::from_percent(20))
        .unwrap();

    // 9000 crosses at 50, 1000 keeps bidding
    engine
        .submit_order(TraderId(1), long, derivative, Side::Long, dec!(10000), price(dec!(50)))
        .unwrap();
    engine
        .submit_order(TraderId(2), short, derivative, Side::Short, dec!(9000), price(dec!(50)))
        .unwrap();

    let lp = engine.get_position(derivative, long);
    assert_eq!(lp.notional.value(), dec!(9000));
    assert_eq!(lp.value.value(), dec!(-450000));
    let sp = engine.get_position(derivative, short);
    assert_eq!(sp.notional.value(), dec!(-9000));
    assert_eq!(sp.value.value(), dec!(450000));

    let bid = engine.get_bid(derivative, long).unwrap();
    assert_eq!(bid.notional, dec!(1000));
    assert_eq!(bid.price.value(), dec!(50));
    assert_eq!(engine.reference_price(derivative).unwrap().value(), dec!(50));

    // valuation at 55 activates the staged rates and sizes the allocations
    engine
        .mark_to_market(ADMIN, derivative, Timestamp(100), price(dec!(55)))
        .unwrap();

    assert_eq!(engine.allocation(long, derivative).value(), dec!(210000));
    assert_eq!(engine.allocation(short, derivative).value(), dec!(279000));
    assert_eq!(engine.total_available(long).value(), dec!(789500));
    assert_eq!(engine.total_available(short).value(), dec!(720500));
    assert!(!engine.is_in_default(derivative, long));
    assert!(!engine.is_in_default(derivative, short));

    // expiry reached, both sides close at the reference price
    engine.close_position(TraderId(1), long, derivative).unwrap();
    engine.close_position(TraderId(2), short, derivative).unwrap();

    assert_eq!(engine.get_position(derivative, long).value.value(), dec!(45000));
    assert_eq!(engine.get_position(derivative, short).value.value(), dec!(-45000));
    assert!(engine.get_position(derivative, long).notional.is_zero());
    assert_eq!(engine.highest_bid(derivative), None);
    assert!(engine.is_expired(derivative));
    assert!(!engine.is_settled(derivative));

    // one settlement pairs the values off
    engine
        .settle(ADMIN, derivative, short, long, Quote::new(dec!(45000)))
        .unwrap();
    assert!(engine.get_position(derivative, long).value.is_zero());
    assert!(engine.get_position(derivative, short).value.is_zero());
    assert!(engine.is_settled(derivative));

    engine.destroy(ADMIN, derivative).unwrap();

    assert_eq!(engine.total_allocated(long).value(), dec!(0));
    assert_eq!(engine.total_allocated(short).value(), dec!(0));
    assert_eq!(engine.total_available(long).value(), dec!(1044500));
    assert_eq!(engine.total_available(short).value(), dec!(954500));
    assert!(!engine.is_in_use(long));
    assert!(!engine.is_in_use(short));
    assert!(!engine.is_expired(derivative));
}

#[test]
fn default_close_out_and_unwind_exit() {
    let deposit = dec!(125000000000000000);
    let (mut engine, derivative, long, short) = setup(dec!(0), deposit, 1_000_000);

    engine
        .set_initial_margin_rate(ADMIN, derivative, Rate::from_percent(30))
        .unwrap();
    engine
        .set_variation_margin_rate(ADMIN, derivative, Rate::from_percent(10))
        .unwrap();
    engine
        .mark_to_market(ADMIN, derivative, Timestamp(1), price(dec!(30000000000000)))
        .unwrap();

    engine
        .submit_order(TraderId(1), long, derivative, Side::Long, dec!(10000), price(dec!(30000000000000)))
        .unwrap();
    engine
        .submit_order(TraderId(2), short, derivative, Side::Short, dec!(10000), price(dec!(30000000000000)))
        .unwrap();

    // the move to 3.1e13 puts the short under water
    engine
        .mark_to_market(ADMIN, derivative, Timestamp(2), price(dec!(31000000000000)))
        .unwrap();

    assert_eq!(
        engine.collateral_requirement_for(derivative, long).value(),
        dec!(111000000000000000)
    );
    assert_eq!(
        engine.collateral_requirement_for(derivative, short).value(),
        dec!(131000000000000000)
    );
    assert!(!engine.is_in_default(derivative, long));
    assert!(engine.is_in_default(derivative, short));

    // forced unwind of the whole short position at the reference price
    engine
        .close_out(ADMIN, short, derivative, Notional::new(dec!(-10000)))
        .unwrap();

    let sp = engine.get_position(derivative, short);
    assert!(sp.notional.is_zero());
    assert_eq!(sp.value.value(), dec!(-10000000000000000));

    // the realized loss is coverable, so a fresh check clears the flag
    assert!(!engine.margin_check(derivative, short).unwrap());
    assert!(!engine.is_in_default(derivative, short));

    // the long exits against the unwind slot; only its own position moves
    let result = engine
        .submit_order(TraderId(1), long, derivative, Side::Short, dec!(10000), price(dec!(31000000000000)))
        .unwrap();
    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].maker, None);

    let lp = engine.get_position(derivative, long);
    assert!(lp.notional.is_zero());
    assert_eq!(lp.value.value(), dec!(10000000000000000));
    assert_eq!(engine.get_position(derivative, short).value.value(), dec!(-10000000000000000));
    assert_eq!(engine.highest_bid(derivative), None);
}

#[test]
fn partial_close_out_keeps_the_remainder_open() {
    let deposit = dec!(125000000000000000);
    let (mut engine, derivative, long, short) = setup(dec!(0), deposit, 1_000_000);

    engine
        .mark_to_market(ADMIN, derivative, Timestamp(1), price(dec!(30000000000000)))
        .unwrap();
    engine
        .submit_order(TraderId(1), long, derivative, Side::Long, dec!(10000), price(dec!(30000000000000)))
        .unwrap();
    engine
        .submit_order(TraderId(2), short, derivative, Side::Short, dec!(10000), price(dec!(30000000000000)))
        .unwrap();

    engine
        .close_out(ADMIN, short, derivative, Notional::new(dec!(-4000)))
        .unwrap();

    let sp = engine.get_position(derivative, short);
    assert_eq!(sp.notional.value(), dec!(-6000));
    // removed at the entry price, nothing realized
    assert_eq!(sp.value.value(), dec!(180000000000000000));

    // the account stays open and can still trade
    assert!(!engine.is_expired(derivative));
    engine
        .submit_order(TraderId(2), short, derivative, Side::Long, dec!(6000), price(dec!(30000000000000)))
        .unwrap();
}
