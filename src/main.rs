// forwards-sim: scripted walkthroughs of the clearing engine. each scenario
// builds a fresh engine, drives it through a sequence of calls, and prints
// the state it cares about. useful for eyeballing behavior without a test
// harness.

use forwards_core::{
    AccountId, DerivativeId, DerivativeParams, Engine, EngineConfig, Notional, Price, PriceOracle,
    Quote, Rate, Side, Timestamp, TraderId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ADMIN: TraderId = TraderId(1000);

fn main() {
    lifecycle_scenario();
    default_scenario();
    book_scenario();
}

fn banner(title: &str) {
    println!();
    println!("==== {title} ====");
}

fn setup(fee: Decimal, expiry: i64, participants: u64) -> (Engine, DerivativeId, Vec<AccountId>) {
    let mut engine = Engine::new(EngineConfig::default());
    let derivative = engine.create_derivative(
        ADMIN,
        DerivativeParams::new(Timestamp(expiry), 86_400_000, Quote::new(fee)),
        PriceOracle::AdministratorPush { authorized: ADMIN },
    );
    let mut accounts = Vec::new();
    for i in 1..=participants {
        let owner = TraderId(i);
        let account = engine.create_account(owner);
        engine.deposit(account, Quote::new(dec!(1000000))).unwrap();
        engine.register_derivative(owner, account, derivative).unwrap();
        engine.add_verified_account(ADMIN, derivative, account).unwrap();
        accounts.push(account);
    }
    (engine, derivative, accounts)
}

fn print_account(engine: &Engine, derivative: DerivativeId, account: AccountId, label: &str) {
    let pos = engine.get_position(derivative, account);
    println!(
        "  {label}: position ({}, {}), allocated {}, available {}",
        pos.notional,
        pos.value,
        engine.allocation(account, derivative),
        engine.total_available(account),
    );
}

// trade, mark, close, settle, destroy
fn lifecycle_scenario() {
    banner("full lifecycle");
    let (mut engine, derivative, accounts) = setup(dec!(500), 100, 2);
    let (a, b) = (accounts[0], accounts[1]);

    engine.set_initial_margin_rate(ADMIN, derivative, Rate::from_percent(30)).unwrap();
    engine.set_variation_margin_rate(ADMIN, derivative, Rate::from_percent(20)).unwrap();

    engine
        .submit_order(TraderId(1), a, derivative, Side::Long, dec!(10000), Price::new_unchecked(dec!(50)))
        .unwrap();
    engine
        .submit_order(TraderId(2), b, derivative, Side::Short, dec!(9000), Price::new_unchecked(dec!(50)))
        .unwrap();
    println!("crossed 9000 @ 50, 1000 still bid");
    print_account(&engine, derivative, a, "long ");
    print_account(&engine, derivative, b, "short");

    engine
        .mark_to_market(ADMIN, derivative, Timestamp(50), Price::new_unchecked(dec!(55)))
        .unwrap();
    println!("marked at 55, staged rates now active");
    print_account(&engine, derivative, a, "long ");
    print_account(&engine, derivative, b, "short");

    engine
        .mark_to_market(ADMIN, derivative, Timestamp(100), Price::new_unchecked(dec!(55)))
        .unwrap();
    engine.close_position(TraderId(1), a, derivative).unwrap();
    engine.close_position(TraderId(2), b, derivative).unwrap();
    println!("expired and closed at 55");
    print_account(&engine, derivative, a, "long ");
    print_account(&engine, derivative, b, "short");

    engine.settle(ADMIN, derivative, b, a, Quote::new(dec!(45000))).unwrap();
    engine.destroy(ADMIN, derivative).unwrap();
    println!("settled 45000 and destroyed");
    println!(
        "  final balances: {} / {}",
        engine.balance(a),
        engine.balance(b)
    );
}

// a price move the short cannot cover, then a forced unwind
fn default_scenario() {
    banner("default and close-out");
    let (mut engine, derivative, accounts) = setup(dec!(0), 1_000_000, 2);
    let (a, b) = (accounts[0], accounts[1]);

    engine.set_initial_margin_rate(ADMIN, derivative, Rate::from_percent(30)).unwrap();
    engine.set_variation_margin_rate(ADMIN, derivative, Rate::from_percent(10)).unwrap();
    engine
        .mark_to_market(ADMIN, derivative, Timestamp(1), Price::new_unchecked(dec!(30)))
        .unwrap();

    engine
        .submit_order(TraderId(1), a, derivative, Side::Long, dec!(10000), Price::new_unchecked(dec!(30)))
        .unwrap();
    engine
        .submit_order(TraderId(2), b, derivative, Side::Short, dec!(10000), Price::new_unchecked(dec!(30)))
        .unwrap();

    engine.withdraw(TraderId(2), b, engine.total_available(b)).unwrap();
    engine
        .mark_to_market(ADMIN, derivative, Timestamp(2), Price::new_unchecked(dec!(40)))
        .unwrap();
    println!(
        "marked at 40: short requirement {}, in default: {}",
        engine.collateral_requirement_for(derivative, b),
        engine.is_in_default(derivative, b),
    );

    engine.close_out(ADMIN, b, derivative, Notional::new(dec!(-10000))).unwrap();
    println!("closed out the short at the reference price");
    print_account(&engine, derivative, b, "short");

    engine
        .submit_order(TraderId(1), a, derivative, Side::Short, dec!(10000), Price::new_unchecked(dec!(40)))
        .unwrap();
    println!("long exited against the unwind slot");
    print_account(&engine, derivative, a, "long ");
}

// replacement, offsetting, sweeping several levels
fn book_scenario() {
    banner("order book tour");
    let (mut engine, derivative, accounts) = setup(dec!(0), 1_000_000, 3);
    let (a, b, c) = (accounts[0], accounts[1], accounts[2]);

    engine
        .submit_order(TraderId(1), a, derivative, Side::Long, dec!(200), Price::new_unchecked(dec!(20)))
        .unwrap();
    let result = engine
        .submit_order(TraderId(1), a, derivative, Side::Short, dec!(50), Price::new_unchecked(dec!(20)))
        .unwrap();
    println!(
        "own ask offset {} against the resting bid, remaining bid {}",
        result.offset,
        engine.get_bid(derivative, a).map(|o| o.notional).unwrap_or_default(),
    );

    engine
        .submit_order(TraderId(1), a, derivative, Side::Long, dec!(0), Price::new_unchecked(dec!(20)))
        .unwrap();
    engine
        .submit_order(TraderId(1), a, derivative, Side::Short, dec!(700), Price::new_unchecked(dec!(298)))
        .unwrap();
    engine
        .submit_order(TraderId(2), b, derivative, Side::Short, dec!(250), Price::new_unchecked(dec!(299)))
        .unwrap();
    let result = engine
        .submit_order(TraderId(3), c, derivative, Side::Long, dec!(1000), Price::new_unchecked(dec!(300)))
        .unwrap();
    println!(
        "bid for 1000 swept {} across {} levels, {} left resting",
        result.filled(),
        result.fills.len(),
        result.resting,
    );
    for fill in &result.fills {
        println!("  fill {} @ {}", fill.notional, fill.price);
    }
    println!(
        "reference price now {}",
        engine.reference_price(derivative).unwrap()
    );
}
