// 2.0: collateral accounts. one ledger per participant: a single quote-currency
// balance, a per-derivative allocation map, per-derivative fee receipts, and the
// set of derivatives the account is registered with. the engine never touches an
// allocation directly, it goes through allocate/release/set_allocation so the
// invariant 0 <= sum(allocations) <= balance holds everywhere.
// 2.1: authorization. each account has one owner and any number of operators.
// operators can do everything the owner can except manage the operator set and
// transfer ownership.

use crate::types::{AccountId, DerivativeId, Quote, TraderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("insufficient available balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Quote, available: Quote },
    #[error("insufficient allocation for derivative {derivative:?}: need {needed}, have {allocated}")]
    InsufficientAllocation {
        derivative: DerivativeId,
        needed: Quote,
        allocated: Quote,
    },
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("caller is not the account owner")]
    NotOwner,
    #[error("caller is not authorized for this account")]
    NotAuthorized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralAccount {
    pub id: AccountId,
    owner: TraderId,
    operators: BTreeSet<TraderId>,
    balance: Quote,
    allocations: BTreeMap<DerivativeId, Quote>,
    fees_paid: BTreeMap<DerivativeId, Quote>,
    registered: BTreeSet<DerivativeId>,
}

impl CollateralAccount {
    pub fn new(id: AccountId, owner: TraderId) -> Self {
        Self {
            id,
            owner,
            operators: BTreeSet::new(),
            balance: Quote::zero(),
            allocations: BTreeMap::new(),
            fees_paid: BTreeMap::new(),
            registered: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> TraderId {
        self.owner
    }

    pub fn balance(&self) -> Quote {
        self.balance
    }

    // 2.2: authorization checks

    pub fn is_owner(&self, caller: TraderId) -> bool {
        self.owner == caller
    }

    pub fn is_authorized(&self, caller: TraderId) -> bool {
        self.owner == caller || self.operators.contains(&caller)
    }

    pub fn require_owner(&self, caller: TraderId) -> Result<(), AccountError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(AccountError::NotOwner)
        }
    }

    pub fn require_authorized(&self, caller: TraderId) -> Result<(), AccountError> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(AccountError::NotAuthorized)
        }
    }

    pub fn add_operator(&mut self, operator: TraderId) {
        self.operators.insert(operator);
    }

    pub fn remove_operator(&mut self, operator: TraderId) {
        self.operators.remove(&operator);
    }

    pub fn transfer_ownership(&mut self, new_owner: TraderId) {
        self.owner = new_owner;
    }

    // 2.3: balance movements. withdraw only draws on the unallocated part.

    pub fn deposit(&mut self, amount: Quote) -> Result<(), AccountError> {
        if amount.value() <= Decimal::ZERO {
            return Err(AccountError::NonPositiveAmount);
        }
        self.balance = self.balance.add(amount);
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Quote) -> Result<(), AccountError> {
        if amount.value() <= Decimal::ZERO {
            return Err(AccountError::NonPositiveAmount);
        }
        let available = self.total_available();
        if amount > available {
            return Err(AccountError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.balance = self.balance.sub(amount);
        Ok(())
    }

    /// Credit straight into available balance. Settlement payouts land here.
    pub fn credit(&mut self, amount: Quote) {
        self.balance = self.balance.add(amount);
    }

    /// Debit balance and allocation together. Settlement payments leave here.
    pub fn debit_allocated(
        &mut self,
        derivative: DerivativeId,
        amount: Quote,
    ) -> Result<(), AccountError> {
        let allocated = self.allocation(derivative);
        if amount > allocated {
            return Err(AccountError::InsufficientAllocation {
                derivative,
                needed: amount,
                allocated,
            });
        }
        self.allocations.insert(derivative, allocated.sub(amount));
        self.balance = self.balance.sub(amount);
        Ok(())
    }

    // 2.4: allocations. collateral pledged to a derivative stays inside the
    // balance but is fenced off from withdrawal.

    pub fn allocation(&self, derivative: DerivativeId) -> Quote {
        self.allocations
            .get(&derivative)
            .copied()
            .unwrap_or_else(Quote::zero)
    }

    pub fn total_allocated(&self) -> Quote {
        self.allocations.values().sum()
    }

    pub fn total_available(&self) -> Quote {
        self.balance.sub(self.total_allocated())
    }

    pub fn allocate(&mut self, derivative: DerivativeId, amount: Quote) -> Result<(), AccountError> {
        let available = self.total_available();
        if amount > available {
            return Err(AccountError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let current = self.allocation(derivative);
        self.allocations.insert(derivative, current.add(amount));
        Ok(())
    }

    pub fn release(&mut self, derivative: DerivativeId, amount: Quote) -> Result<(), AccountError> {
        let allocated = self.allocation(derivative);
        if amount > allocated {
            return Err(AccountError::InsufficientAllocation {
                derivative,
                needed: amount,
                allocated,
            });
        }
        self.allocations.insert(derivative, allocated.sub(amount));
        Ok(())
    }

    pub fn release_all(&mut self, derivative: DerivativeId) {
        self.allocations.remove(&derivative);
    }

    /// Set the allocation to `target`, clamped to what the balance can carry.
    /// Returns the allocation actually reached. Margin checks use this: the
    /// target is the requirement, the shortfall decides the default flag.
    pub fn set_allocation(&mut self, derivative: DerivativeId, target: Quote) -> Quote {
        let current = self.allocation(derivative);
        let headroom = self.total_available().add(current);
        let reached = target.min(headroom);
        self.allocations.insert(derivative, reached);
        reached
    }

    // 2.5: registration. paying the fee once registers the account with a
    // derivative; re-registering is a no-op and pays nothing.

    pub fn is_registered(&self, derivative: DerivativeId) -> bool {
        self.registered.contains(&derivative)
    }

    pub fn is_in_use(&self) -> bool {
        !self.registered.is_empty()
    }

    pub fn registered_derivatives(&self) -> impl Iterator<Item = DerivativeId> + '_ {
        self.registered.iter().copied()
    }

    pub fn paid_fee(&self, derivative: DerivativeId) -> Quote {
        self.fees_paid
            .get(&derivative)
            .copied()
            .unwrap_or_else(Quote::zero)
    }

    pub fn register(&mut self, derivative: DerivativeId, fee: Quote) -> Result<(), AccountError> {
        if self.registered.contains(&derivative) {
            return Ok(());
        }
        let available = self.total_available();
        if fee > available {
            return Err(AccountError::InsufficientBalance {
                needed: fee,
                available,
            });
        }
        self.balance = self.balance.sub(fee);
        let paid = self.paid_fee(derivative);
        self.fees_paid.insert(derivative, paid.add(fee));
        self.registered.insert(derivative);
        Ok(())
    }

    pub fn deregister(&mut self, derivative: DerivativeId) {
        self.registered.remove(&derivative);
        self.allocations.remove(&derivative);
    }
}
