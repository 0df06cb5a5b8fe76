// 13.0: valuation. the administrator pushes (time, price) pairs; each one
// must strictly advance the valuation clock. a valuation activates any staged
// margin rates, stores the new reference price, then margin-checks every
// verified account. a margin check moves the account's allocation to its
// requirement, as far as the balance allows, and the shortfall decides the
// default flag. the flag is sticky: it stays up until a later check finds the
// requirement covered.

use crate::engine::core::Engine;
use crate::engine::results::ClearingError;
use crate::events::EventPayload;
use crate::types::{AccountId, DerivativeId, Price, Timestamp, TraderId};

impl Engine {
    pub fn mark_to_market(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
        time: Timestamp,
        price: Price,
    ) -> Result<(), ClearingError> {
        // the oracle decides who may push prices. under a signed-attestation
        // oracle nobody may: valuation prices arrive through attested closes,
        // not through this call.
        let deriv = self.derivative(derivative)?;
        if !deriv.oracle.allows_push(caller) {
            return Err(if deriv.oracle.is_managed() {
                ClearingError::Unauthorized
            } else {
                ClearingError::OracleMismatch
            });
        }
        let deriv = self.derivative_mut(derivative)?;
        if !deriv.advance_valuation(time) {
            return Err(ClearingError::StaleValuation);
        }
        deriv.activate_staged_rates();
        deriv.set_reference_price(price);
        self.emit(EventPayload::ValuationApplied {
            derivative,
            time,
            price,
        });

        for account in self.verified_accounts(derivative) {
            self.check_account(derivative, account)?;
        }
        Ok(())
    }

    /// Re-run the margin check for one account. Returns whether the account
    /// is in default afterwards.
    pub fn margin_check(
        &mut self,
        derivative: DerivativeId,
        account: AccountId,
    ) -> Result<bool, ClearingError> {
        if !self.derivative(derivative)?.is_verified(account) {
            return Err(ClearingError::NotVerified(account));
        }
        self.check_account(derivative, account)
    }

    fn check_account(
        &mut self,
        derivative: DerivativeId,
        account: AccountId,
    ) -> Result<bool, ClearingError> {
        let requirement = self.derivative(derivative)?.requirement(account);
        let reached = self
            .account_mut(account)?
            .set_allocation(derivative, requirement);
        let in_default = reached < requirement;
        self.derivative_mut(derivative)?
            .set_default(account, in_default);
        self.emit(EventPayload::MarginChecked {
            derivative,
            account,
            requirement,
            allocated: reached,
            in_default,
        });
        Ok(in_default)
    }
}
