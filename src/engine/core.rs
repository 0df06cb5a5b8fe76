// 11.0: the engine aggregate. owns every account and derivative, hands out
// ids, and emits the audit trail. all mutation goes through `&mut self`
// methods; callers serialize access however they like (mutex, command queue),
// the engine itself is a plain value.

use crate::account::CollateralAccount;
use crate::config::{DerivativeParams, EngineConfig};
use crate::derivative::Derivative;
use crate::engine::results::ClearingError;
use crate::events::{Event, EventLog, EventPayload};
use crate::oracle::PriceOracle;
use crate::position::Position;
use crate::types::{AccountId, DerivativeId, Price, Quote, Rate, Side, TraderId};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct Engine {
    pub(crate) accounts: BTreeMap<AccountId, CollateralAccount>,
    pub(crate) derivatives: BTreeMap<DerivativeId, Derivative>,
    next_account: u64,
    next_derivative: u32,
    log: EventLog,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            accounts: BTreeMap::new(),
            derivatives: BTreeMap::new(),
            next_account: 1,
            next_derivative: 1,
            log: EventLog::new(config.max_events, config.verbose),
        }
    }

    pub(crate) fn emit(&mut self, payload: EventPayload) {
        self.log.emit(payload);
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.log.events()
    }

    // 11.1: lookup helpers. reads of unknown entities return defined zero
    // values on the query surface; mutating paths get NotFound errors.

    pub(crate) fn account(&self, id: AccountId) -> Result<&CollateralAccount, ClearingError> {
        self.accounts
            .get(&id)
            .ok_or(ClearingError::AccountNotFound(id))
    }

    pub(crate) fn account_mut(
        &mut self,
        id: AccountId,
    ) -> Result<&mut CollateralAccount, ClearingError> {
        self.accounts
            .get_mut(&id)
            .ok_or(ClearingError::AccountNotFound(id))
    }

    pub(crate) fn derivative(&self, id: DerivativeId) -> Result<&Derivative, ClearingError> {
        self.derivatives
            .get(&id)
            .ok_or(ClearingError::DerivativeNotFound(id))
    }

    pub(crate) fn derivative_mut(
        &mut self,
        id: DerivativeId,
    ) -> Result<&mut Derivative, ClearingError> {
        self.derivatives
            .get_mut(&id)
            .ok_or(ClearingError::DerivativeNotFound(id))
    }

    pub(crate) fn require_admin(
        &self,
        derivative: DerivativeId,
        caller: TraderId,
    ) -> Result<(), ClearingError> {
        if self.derivative(derivative)?.admin == caller {
            Ok(())
        } else {
            Err(ClearingError::Unauthorized)
        }
    }

    // 11.2: account management

    pub fn create_account(&mut self, owner: TraderId) -> AccountId {
        let id = AccountId(self.next_account);
        self.next_account += 1;
        self.accounts.insert(id, CollateralAccount::new(id, owner));
        self.emit(EventPayload::AccountCreated { account: id, owner });
        id
    }

    pub fn deposit(&mut self, account: AccountId, amount: Quote) -> Result<(), ClearingError> {
        self.account_mut(account)?.deposit(amount)?;
        self.emit(EventPayload::Deposited { account, amount });
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        caller: TraderId,
        account: AccountId,
        amount: Quote,
    ) -> Result<(), ClearingError> {
        let acc = self.account_mut(account)?;
        acc.require_authorized(caller)?;
        acc.withdraw(amount)?;
        self.emit(EventPayload::Withdrawn { account, amount });
        Ok(())
    }

    pub fn add_operator(
        &mut self,
        caller: TraderId,
        account: AccountId,
        operator: TraderId,
    ) -> Result<(), ClearingError> {
        let acc = self.account_mut(account)?;
        acc.require_owner(caller)?;
        acc.add_operator(operator);
        self.emit(EventPayload::OperatorAdded { account, operator });
        Ok(())
    }

    pub fn remove_operator(
        &mut self,
        caller: TraderId,
        account: AccountId,
        operator: TraderId,
    ) -> Result<(), ClearingError> {
        let acc = self.account_mut(account)?;
        acc.require_owner(caller)?;
        acc.remove_operator(operator);
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: TraderId,
        account: AccountId,
        new_owner: TraderId,
    ) -> Result<(), ClearingError> {
        let acc = self.account_mut(account)?;
        acc.require_owner(caller)?;
        acc.transfer_ownership(new_owner);
        self.emit(EventPayload::OwnershipTransferred { account, new_owner });
        Ok(())
    }

    pub fn balance(&self, account: AccountId) -> Quote {
        self.accounts
            .get(&account)
            .map(|a| a.balance())
            .unwrap_or_else(Quote::zero)
    }

    pub fn total_allocated(&self, account: AccountId) -> Quote {
        self.accounts
            .get(&account)
            .map(|a| a.total_allocated())
            .unwrap_or_else(Quote::zero)
    }

    pub fn total_available(&self, account: AccountId) -> Quote {
        self.accounts
            .get(&account)
            .map(|a| a.total_available())
            .unwrap_or_else(Quote::zero)
    }

    pub fn allocation(&self, account: AccountId, derivative: DerivativeId) -> Quote {
        self.accounts
            .get(&account)
            .map(|a| a.allocation(derivative))
            .unwrap_or_else(Quote::zero)
    }

    pub fn is_in_use(&self, account: AccountId) -> bool {
        self.accounts.get(&account).is_some_and(|a| a.is_in_use())
    }

    pub fn account_derivatives(&self, account: AccountId) -> Vec<DerivativeId> {
        self.accounts
            .get(&account)
            .map(|a| a.registered_derivatives().collect())
            .unwrap_or_default()
    }

    // 11.3: derivative construction and registration

    pub fn create_derivative(
        &mut self,
        admin: TraderId,
        params: DerivativeParams,
        oracle: PriceOracle,
    ) -> DerivativeId {
        let id = DerivativeId(self.next_derivative);
        self.next_derivative += 1;
        self.derivatives
            .insert(id, Derivative::new(id, admin, params, oracle));
        self.emit(EventPayload::DerivativeCreated {
            derivative: id,
            admin,
        });
        id
    }

    /// Register the account with a derivative, paying its fee once. Calling
    /// again for an already-registered account is an Ok no-op.
    pub fn register_derivative(
        &mut self,
        caller: TraderId,
        account: AccountId,
        derivative: DerivativeId,
    ) -> Result<(), ClearingError> {
        let fee = self.derivative(derivative)?.params.fee;
        let acc = self.account_mut(account)?;
        acc.require_authorized(caller)?;
        if acc.is_registered(derivative) {
            return Ok(());
        }
        acc.register(derivative, fee)?;
        self.emit(EventPayload::AccountRegistered {
            derivative,
            account,
            fee,
        });
        Ok(())
    }

    pub fn required_fee(&self, derivative: DerivativeId) -> Quote {
        self.derivatives
            .get(&derivative)
            .map(|d| d.params.fee)
            .unwrap_or_else(Quote::zero)
    }

    pub fn paid_fee(&self, account: AccountId, derivative: DerivativeId) -> Quote {
        self.accounts
            .get(&account)
            .map(|a| a.paid_fee(derivative))
            .unwrap_or_else(Quote::zero)
    }

    /// Admit a registered account as a trading participant. Admin only.
    pub fn add_verified_account(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
        account: AccountId,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        if !self.account(account)?.is_registered(derivative) {
            return Err(ClearingError::NotRegistered(account));
        }
        self.derivative_mut(derivative)?.verify_account(account);
        self.emit(EventPayload::AccountVerified {
            derivative,
            account,
        });
        Ok(())
    }

    pub fn verified_accounts(&self, derivative: DerivativeId) -> Vec<AccountId> {
        self.derivatives
            .get(&derivative)
            .map(|d| d.verified_accounts().collect())
            .unwrap_or_default()
    }

    // 11.4: derivative admin knobs

    /// Fee changes are effective immediately.
    pub fn set_fee(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
        fee: Quote,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        self.derivative_mut(derivative)?.set_fee(fee);
        self.emit(EventPayload::FeeChanged { derivative, fee });
        Ok(())
    }

    /// Staged; becomes active at the next valuation.
    pub fn set_initial_margin_rate(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
        rate: Rate,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        self.derivative_mut(derivative)?.stage_initial_rate(rate);
        self.emit(EventPayload::InitialRateStaged { derivative, rate });
        Ok(())
    }

    /// Staged; becomes active at the next valuation.
    pub fn set_variation_margin_rate(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
        rate: Rate,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        self.derivative_mut(derivative)?.stage_variation_rate(rate);
        self.emit(EventPayload::VariationRateStaged { derivative, rate });
        Ok(())
    }

    // 11.5: query surface. unknown accounts read as flat, never as errors.

    pub fn get_position(&self, derivative: DerivativeId, account: AccountId) -> Position {
        self.derivatives
            .get(&derivative)
            .map(|d| d.position(account))
            .unwrap_or_else(Position::flat)
    }

    pub fn get_bid(&self, derivative: DerivativeId, account: AccountId) -> Option<crate::book::Order> {
        self.derivatives
            .get(&derivative)
            .and_then(|d| d.book.order_of(account, Side::Long))
    }

    pub fn get_ask(&self, derivative: DerivativeId, account: AccountId) -> Option<crate::book::Order> {
        self.derivatives
            .get(&derivative)
            .and_then(|d| d.book.order_of(account, Side::Short))
    }

    pub fn highest_bid(&self, derivative: DerivativeId) -> Option<Price> {
        self.derivatives
            .get(&derivative)
            .and_then(|d| d.book.highest_bid())
    }

    pub fn lowest_ask(&self, derivative: DerivativeId) -> Option<Price> {
        self.derivatives
            .get(&derivative)
            .and_then(|d| d.book.lowest_ask())
    }

    pub fn reference_price(&self, derivative: DerivativeId) -> Option<Price> {
        self.derivatives
            .get(&derivative)
            .and_then(|d| d.reference_price())
    }

    /// Pure, re-entrant read of the collateral requirement.
    pub fn collateral_requirement_for(
        &self,
        derivative: DerivativeId,
        account: AccountId,
    ) -> Quote {
        self.derivatives
            .get(&derivative)
            .map(|d| d.requirement(account))
            .unwrap_or_else(Quote::zero)
    }

    pub fn is_in_default(&self, derivative: DerivativeId, account: AccountId) -> bool {
        self.derivatives
            .get(&derivative)
            .is_some_and(|d| d.is_in_default(account))
    }

    pub fn is_expired(&self, derivative: DerivativeId) -> bool {
        self.derivatives
            .get(&derivative)
            .is_some_and(|d| d.is_expired())
    }

    pub fn is_settled(&self, derivative: DerivativeId) -> bool {
        self.derivatives
            .get(&derivative)
            .is_some_and(|d| d.is_settled())
    }
}
