// forwards-core: margin-based clearing for a single linear forward shared by
// many participants. collateral-first architecture: every position change is
// gated by what the account can cover, and the administrator's valuation loop
// keeps allocations and default flags honest between trades.
//
// layout:
//   types.rs      - newtype primitives (ids, sides, notional, price, quote, rate)
//   account.rs    - collateral accounts: balance, allocations, fees, auth
//   position.rs   - (notional, value) pairs and mark-to-market
//   book.rs       - one bid + one ask per account, unwind slot, aggregates
//   margin.rs     - pure collateral requirement math
//   oracle.rs     - close-price oracles (administrator push / signed attestation)
//   derivative.rs - one forward instance: rates, participants, clock, book
//   config.rs     - derivative params and engine config
//   events.rs     - audit event log
//   engine/       - the aggregate: orders, valuation, lifecycle

pub mod account;
pub mod book;
pub mod config;
pub mod derivative;
pub mod engine;
pub mod events;
pub mod margin;
pub mod oracle;
pub mod position;
pub mod types;

pub use account::{AccountError, CollateralAccount};
pub use book::{AccountBook, Maker, Order, OrderBook};
pub use config::{DerivativeParams, EngineConfig};
pub use derivative::Derivative;
pub use engine::{ClearingError, Engine, Fill, OrderResult};
pub use events::{Event, EventLog, EventPayload};
pub use margin::{collateral_requirement, MarginRates};
pub use oracle::{PriceAttestation, PriceOracle};
pub use position::{mark_to_market, Position};
pub use types::{AccountId, DerivativeId, Notional, Price, Quote, Rate, Side, Timestamp, TraderId};
