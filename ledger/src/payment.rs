//! # Payment Settlement
//!
//! The currency leg of a purchase. Credits move inside the ledger; money
//! moves on whatever rail the embedding environment provides — a native
//! token transfer, a banking API, a test double. [`PaymentGateway`] is that
//! seam.
//!
//! The façade treats the gateway as all-or-nothing per call: `settle`
//! either moves the full amount or moves nothing, and a failure makes the
//! whole purchase roll back. Gateways must not partially settle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::Principal;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PaymentError {
    /// The payer does not hold enough funds.
    #[error("insufficient funds: {payer} holds {available}, owes {requested}")]
    InsufficientFunds {
        /// The paying principal.
        payer: Principal,
        /// Funds available.
        available: u64,
        /// Amount owed.
        requested: u64,
    },

    /// The payee's account cannot absorb the amount.
    #[error("funds overflow crediting {payee}")]
    Overflow {
        /// The receiving principal.
        payee: Principal,
    },

    /// The rail refused the settlement for its own reasons.
    #[error("settlement rejected: {reason}")]
    Rejected {
        /// Rail-specific failure reason.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// PaymentGateway
// ---------------------------------------------------------------------------

/// A settlement rail that can move `amount` currency units from `payer`
/// to `payee`, atomically.
pub trait PaymentGateway {
    /// Moves the full amount or fails without moving anything.
    fn settle(
        &mut self,
        payer: &Principal,
        payee: &Principal,
        amount: u64,
    ) -> Result<(), PaymentError>;
}

// ---------------------------------------------------------------------------
// CashAccounts
// ---------------------------------------------------------------------------

/// An in-memory settlement rail: plain per-principal currency accounts.
///
/// This is what the standalone service runs with (funded through its
/// faucet endpoint) and what most tests settle against. Accounts are
/// created lazily and never go negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashAccounts {
    accounts: HashMap<Principal, u64>,
}

impl CashAccounts {
    /// Creates an empty rail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposits funds into a principal's account (the faucet).
    ///
    /// Saturates at `u64::MAX` — the faucet is a convenience, not a place
    /// to enforce monetary policy.
    pub fn deposit(&mut self, principal: &Principal, amount: u64) -> u64 {
        let account = self.accounts.entry(principal.clone()).or_insert(0);
        *account = account.saturating_add(amount);
        *account
    }

    /// Funds available to `principal`.
    pub fn funds_of(&self, principal: &Principal) -> u64 {
        self.accounts.get(principal).copied().unwrap_or(0)
    }
}

impl PaymentGateway for CashAccounts {
    fn settle(
        &mut self,
        payer: &Principal,
        payee: &Principal,
        amount: u64,
    ) -> Result<(), PaymentError> {
        let available = self.funds_of(payer);
        if available < amount {
            return Err(PaymentError::InsufficientFunds {
                payer: payer.clone(),
                available,
                requested: amount,
            });
        }

        if payer == payee {
            return Ok(());
        }

        let payee_funds = self.funds_of(payee);
        let new_payee_funds = payee_funds
            .checked_add(amount)
            .ok_or(PaymentError::Overflow {
                payee: payee.clone(),
            })?;

        *self.accounts.entry(payer.clone()).or_insert(0) -= amount;
        self.accounts.insert(payee.clone(), new_payee_funds);
        Ok(())
    }
}
