// 14.0: end of life. a derivative winds down in stages:
//   close      - each participant realizes its value and flattens, either at
//                the managed reference price once the valuation clock reaches
//                expiry, or at an attested price at any time
//   close-out  - the administrator forcibly removes (part of) a defaulter's
//                position pre-expiry, posting the mirror interest to the
//                unwind slot so the other side can still exit
//   settle     - once every participant is closed, the administrator pairs
//                off realized values by moving allocated collateral between
//                accounts
//   destroy    - once all values are zero, allocations are released,
//                registrations removed, and the derivative is discarded

use crate::book::Order;
use crate::engine::core::Engine;
use crate::engine::results::ClearingError;
use crate::events::EventPayload;
use crate::oracle::PriceAttestation;
use crate::types::{AccountId, DerivativeId, Notional, Quote, TraderId};
use rust_decimal::Decimal;

impl Engine {
    /// Close under the managed oracle: realizes the position at the current
    /// reference price. Only once the valuation clock has reached expiry.
    /// Callable by the account's owner or operators, or by the derivative
    /// administrator on their behalf.
    pub fn close_position(
        &mut self,
        caller: TraderId,
        account: AccountId,
        derivative: DerivativeId,
    ) -> Result<(), ClearingError> {
        let deriv = self.derivative(derivative)?;
        if deriv.admin != caller {
            self.account(account)?.require_authorized(caller)?;
        }
        if !deriv.oracle.is_managed() {
            return Err(ClearingError::OracleMismatch);
        }
        if !deriv.is_verified(account) {
            return Err(ClearingError::NotVerified(account));
        }
        if deriv.is_closed(account) {
            return Err(ClearingError::AccountClosed(account));
        }
        if !deriv.has_matured() {
            return Err(ClearingError::NotExpired);
        }
        let price = deriv
            .reference_price()
            .ok_or(ClearingError::NoReferencePrice)?;

        let deriv = self.derivative_mut(derivative)?;
        deriv.position_mut(account).realize_close(price);
        deriv.mark_closed(account);
        let value = deriv.position(account).value;
        self.emit(EventPayload::PositionClosed {
            derivative,
            account,
            price,
            value,
        });
        Ok(())
    }

    /// Close against a signed price attestation. Works at any time; the
    /// attestation must carry the signer the derivative's oracle trusts.
    /// The administrator may close on a participant's behalf here too.
    pub fn close_position_attested(
        &mut self,
        caller: TraderId,
        account: AccountId,
        derivative: DerivativeId,
        attestation: PriceAttestation,
    ) -> Result<(), ClearingError> {
        let deriv = self.derivative(derivative)?;
        if deriv.admin != caller {
            self.account(account)?.require_authorized(caller)?;
        }
        if !deriv.is_verified(account) {
            return Err(ClearingError::NotVerified(account));
        }
        if deriv.is_closed(account) {
            return Err(ClearingError::AccountClosed(account));
        }
        if !deriv.oracle.accepts(&attestation) {
            return Err(ClearingError::InvalidAttestation);
        }

        let price = attestation.price;
        let deriv = self.derivative_mut(derivative)?;
        deriv.position_mut(account).realize_close(price);
        deriv.mark_closed(account);
        let value = deriv.position(account).value;
        self.emit(EventPayload::PositionClosed {
            derivative,
            account,
            price,
            value,
        });
        Ok(())
    }

    /// Forcibly remove a same-signed portion of an account's position at the
    /// reference price, posting the mirrored interest to the unwind slot.
    /// Administrator only. A full close-out marks the account closed.
    pub fn close_out(
        &mut self,
        caller: TraderId,
        account: AccountId,
        derivative: DerivativeId,
        forced: Notional,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        let deriv = self.derivative(derivative)?;
        if !deriv.is_verified(account) {
            return Err(ClearingError::NotVerified(account));
        }
        if deriv.is_closed(account) {
            return Err(ClearingError::AccountClosed(account));
        }
        let price = deriv
            .reference_price()
            .ok_or(ClearingError::NoReferencePrice)?;

        let position = deriv.position(account);
        let same_signed = forced.side().is_some()
            && forced.side() == position.notional.side()
            && forced.abs() <= position.notional.abs();
        if !same_signed {
            return Err(ClearingError::InvalidCloseOut);
        }
        let removed_side = forced.side().ok_or(ClearingError::InvalidCloseOut)?;

        let deriv = self.derivative_mut(derivative)?;
        deriv.position_mut(account).realize_partial(forced, price);

        // the removed interest reappears on the opposite side of the book,
        // owned by the derivative itself, repriced at the reference price
        let mirror = removed_side.opposite();
        let carried = deriv
            .book
            .unwind_order(mirror)
            .map(|o| o.notional)
            .unwrap_or(Decimal::ZERO);
        deriv.book.set_unwind_order(
            mirror,
            Some(Order {
                notional: carried + forced.abs(),
                price,
            }),
        );

        if deriv.position(account).notional.is_zero() {
            deriv.mark_closed(account);
        }
        self.emit(EventPayload::ClosedOut {
            derivative,
            account,
            notional: forced.value(),
            price,
        });
        Ok(())
    }

    /// Pairwise settlement of realized values: the payer's value rises by
    /// `amount`, the payee's falls, and the collateral moves from the payer's
    /// allocation into the payee's available balance. Administrator only,
    /// post-expiry only.
    pub fn settle(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
        payer: AccountId,
        payee: AccountId,
        amount: Quote,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        let deriv = self.derivative(derivative)?;
        if !deriv.is_expired() {
            return Err(ClearingError::NotExpired);
        }
        if !deriv.is_verified(payer) {
            return Err(ClearingError::NotVerified(payer));
        }
        if !deriv.is_verified(payee) {
            return Err(ClearingError::NotVerified(payee));
        }
        if amount.value() <= Decimal::ZERO {
            return Err(ClearingError::NonPositiveSettlement);
        }

        // collateral first: this is the call that can fail
        self.account_mut(payer)?.debit_allocated(derivative, amount)?;
        self.account_mut(payee)?.credit(amount);

        let deriv = self.derivative_mut(derivative)?;
        let paying = deriv.position_mut(payer);
        paying.value = paying.value.add(amount);
        let receiving = deriv.position_mut(payee);
        receiving.value = receiving.value.sub(amount);

        self.emit(EventPayload::Settled {
            derivative,
            payer,
            payee,
            amount,
        });
        Ok(())
    }

    /// Tear the derivative down once fully settled: every account's
    /// allocation returns to its available balance and registrations are
    /// removed. Administrator only.
    pub fn destroy(
        &mut self,
        caller: TraderId,
        derivative: DerivativeId,
    ) -> Result<(), ClearingError> {
        self.require_admin(derivative, caller)?;
        if !self.derivative(derivative)?.is_settled() {
            return Err(ClearingError::NotSettled);
        }
        for account in self.accounts.values_mut() {
            account.deregister(derivative);
        }
        self.derivatives.remove(&derivative);
        self.emit(EventPayload::Destroyed { derivative });
        Ok(())
    }
}
