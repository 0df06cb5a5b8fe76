// 10.0: operation outcomes and the engine-wide error enum.

use crate::account::AccountError;
use crate::types::{AccountId, DerivativeId, Price, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One execution produced by an order submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// None when the fill consumed the derivative's unwind slot.
    pub maker: Option<AccountId>,
    pub notional: Decimal,
    pub price: Price,
}

/// What happened to a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub fills: Vec<Fill>,
    /// Amount absorbed by the account's own opposite resting order.
    pub offset: Decimal,
    /// Amount left resting on the book after matching.
    pub resting: Decimal,
}

impl OrderResult {
    pub fn filled(&self) -> Decimal {
        self.fills.iter().map(|f| f.notional).sum()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClearingError {
    #[error("caller is not authorized for this operation")]
    Unauthorized,
    #[error("account {0:?} not found")]
    AccountNotFound(AccountId),
    #[error("derivative {0:?} not found")]
    DerivativeNotFound(DerivativeId),
    #[error("account {0:?} is not registered with this derivative")]
    NotRegistered(AccountId),
    #[error("account {0:?} is not a verified participant")]
    NotVerified(AccountId),
    #[error("account {0:?} has closed its position")]
    AccountClosed(AccountId),
    #[error("order notional may not be negative")]
    NegativeNotional,
    #[error("order notional {notional} is below the minimum {minimum}")]
    OrderTooSmall { notional: Decimal, minimum: Decimal },
    #[error("insufficient collateral: requirement {required}, coverable {coverable}")]
    InsufficientCollateral { required: Quote, coverable: Quote },
    #[error("valuation time does not advance the clock")]
    StaleValuation,
    #[error("no reference price has been established")]
    NoReferencePrice,
    #[error("derivative has not reached expiry")]
    NotExpired,
    #[error("derivative is not fully settled")]
    NotSettled,
    #[error("price attestation rejected")]
    InvalidAttestation,
    #[error("operation not available under this price oracle")]
    OracleMismatch,
    #[error("close-out notional must be a same-signed portion of the position")]
    InvalidCloseOut,
    #[error("settlement amount must be positive")]
    NonPositiveSettlement,
    #[error(transparent)]
    Account(#[from] AccountError),
}
