// 9.0: audit trail. every state change in the engine emits one of these.
// the log is append-only and bounded; oldest entries fall off first. payloads
// are serde-serializable so a session can be dumped as json for inspection.

use crate::types::{AccountId, DerivativeId, Price, Quote, Rate, Side, Timestamp, TraderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub at: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // accounts
    AccountCreated { account: AccountId, owner: TraderId },
    Deposited { account: AccountId, amount: Quote },
    Withdrawn { account: AccountId, amount: Quote },
    OperatorAdded { account: AccountId, operator: TraderId },
    OwnershipTransferred { account: AccountId, new_owner: TraderId },

    // derivative admin
    DerivativeCreated { derivative: DerivativeId, admin: TraderId },
    AccountRegistered { derivative: DerivativeId, account: AccountId, fee: Quote },
    AccountVerified { derivative: DerivativeId, account: AccountId },
    FeeChanged { derivative: DerivativeId, fee: Quote },
    InitialRateStaged { derivative: DerivativeId, rate: Rate },
    VariationRateStaged { derivative: DerivativeId, rate: Rate },

    // trading
    OrderPlaced {
        derivative: DerivativeId,
        account: AccountId,
        side: Side,
        notional: Decimal,
        price: Price,
    },
    OrderCancelled { derivative: DerivativeId, account: AccountId, side: Side },
    OrderOffset {
        derivative: DerivativeId,
        account: AccountId,
        side: Side,
        amount: Decimal,
    },
    Fill {
        derivative: DerivativeId,
        taker: AccountId,
        /// None when the fill consumed the unwind slot.
        maker: Option<AccountId>,
        taker_side: Side,
        notional: Decimal,
        price: Price,
    },

    // valuation
    ValuationApplied { derivative: DerivativeId, time: Timestamp, price: Price },
    MarginChecked {
        derivative: DerivativeId,
        account: AccountId,
        requirement: Quote,
        allocated: Quote,
        in_default: bool,
    },

    // lifecycle
    PositionClosed { derivative: DerivativeId, account: AccountId, price: Price, value: Quote },
    ClosedOut { derivative: DerivativeId, account: AccountId, notional: Decimal, price: Price },
    Settled { derivative: DerivativeId, payer: AccountId, payee: AccountId, amount: Quote },
    Destroyed { derivative: DerivativeId },
}

#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
    verbose: bool,
}

impl EventLog {
    pub fn new(max_events: usize, verbose: bool) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 0,
            max_events,
            verbose,
        }
    }

    pub fn emit(&mut self, payload: EventPayload) {
        let event = Event {
            id: EventId(self.next_id),
            at: Timestamp::now(),
            payload,
        };
        self.next_id += 1;
        if self.verbose {
            println!("[{}] {:?}", event.id.0, event.payload);
        }
        self.events.push_back(event);
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
