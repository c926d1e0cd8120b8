//! # Ledger Error Taxonomy
//!
//! Every fallible operation in the ledger returns one of these kinds. The
//! taxonomy is deliberately flat: each variant is terminal for the call that
//! raised it, nothing is retried internally, and no partial state mutation
//! survives an error.
//!
//! Each kind also carries a stable wire code (`code()`), the kebab-case
//! identifiers that clients match on (`err-owner-only`, `err-invalid-credit`,
//! ...). Messages are for humans; codes are for machines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::Principal;

/// Errors raised by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    /// The caller is not the contract owner.
    #[error("owner-only operation: caller {caller} is not the contract owner")]
    OwnerOnly {
        /// The principal that attempted the call.
        caller: Principal,
    },

    /// The caller is not on the verifier roster.
    #[error("caller {caller} is not an authorized verifier")]
    InvalidVerifier {
        /// The principal that attempted the call.
        caller: Principal,
    },

    /// A credit batch with this id has already been minted. Ids are
    /// caller-supplied and collisions are an error, never an overwrite.
    #[error("credit batch {credit_id} already exists")]
    CreditExists {
        /// The colliding batch id.
        credit_id: u64,
    },

    /// The referenced credit batch does not exist.
    #[error("no credit batch with id {credit_id}")]
    InvalidCredit {
        /// The batch id that was looked up.
        credit_id: u64,
    },

    /// A zero or otherwise degenerate amount was supplied.
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: u64,
    },

    /// The debited principal does not hold enough spendable credits.
    #[error("insufficient balance: {principal} holds {available}, requested {requested}")]
    InsufficientBalance {
        /// The principal that was short.
        principal: Principal,
        /// Spendable balance at the time of the call.
        available: u64,
        /// Amount the call tried to move.
        requested: u64,
    },

    /// No active listing exists for the referenced credit batch.
    #[error("no active listing for credit batch {credit_id}")]
    ListingNotFound {
        /// The batch id that was looked up.
        credit_id: u64,
    },

    /// An active listing already exists for this credit batch. The order
    /// book allows at most one active listing per batch.
    #[error("credit batch {credit_id} already has an active listing")]
    ListingExists {
        /// The batch id with the standing listing.
        credit_id: u64,
    },

    /// The purchase asked for more units than the listing has left.
    #[error("listing for batch {credit_id} has {available} units, requested {requested}")]
    InsufficientListing {
        /// The batch id of the listing.
        credit_id: u64,
        /// Units remaining on the listing.
        available: u64,
        /// Units the buyer tried to purchase.
        requested: u64,
    },

    /// The payment leg of a purchase could not settle. The credit leg is
    /// rolled back; no state survives.
    #[error("payment failed: {reason}")]
    PaymentFailed {
        /// Human-readable settlement failure reason.
        reason: String,
    },

    /// The call named a function the contract does not export.
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// The unmatched function name.
        name: String,
    },

    /// The call named a known function but its arguments did not parse.
    #[error("malformed call to {function}: {detail}")]
    MalformedCall {
        /// The function that was being invoked.
        function: String,
        /// What was wrong with the arguments.
        detail: String,
    },

    /// A balance or supply operation would exceed `u64::MAX`.
    ///
    /// Hitting this means someone is moving more than 18.4 quintillion
    /// tonnes of CO2e. That's either a bug or an attack.
    #[error("arithmetic overflow: current {current}, delta {delta}")]
    Overflow {
        /// Value before the failed operation.
        current: u64,
        /// Amount that caused the overflow.
        delta: u64,
    },
}

impl LedgerError {
    /// Stable kebab-case wire code for this error kind.
    ///
    /// These codes are part of the public API contract — clients match on
    /// them, so renaming one is a breaking change.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::OwnerOnly { .. } => "err-owner-only",
            LedgerError::InvalidVerifier { .. } => "err-invalid-verifier",
            LedgerError::CreditExists { .. } => "err-credit-exists",
            LedgerError::InvalidCredit { .. } => "err-invalid-credit",
            LedgerError::InvalidAmount { .. } => "err-invalid-amount",
            LedgerError::InsufficientBalance { .. } => "err-insufficient-balance",
            LedgerError::ListingNotFound { .. } => "err-listing-not-found",
            LedgerError::ListingExists { .. } => "err-listing-exists",
            LedgerError::InsufficientListing { .. } => "err-insufficient-listing",
            LedgerError::PaymentFailed { .. } => "err-payment-failed",
            LedgerError::UnknownFunction { .. } => "err-unknown-function",
            LedgerError::MalformedCall { .. } => "err-malformed-call",
            LedgerError::Overflow { .. } => "err-overflow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_distinct() {
        let errors = [
            LedgerError::OwnerOnly {
                caller: Principal::from("p"),
            },
            LedgerError::InvalidVerifier {
                caller: Principal::from("p"),
            },
            LedgerError::CreditExists { credit_id: 1 },
            LedgerError::InvalidCredit { credit_id: 1 },
            LedgerError::InvalidAmount { amount: 0 },
            LedgerError::InsufficientBalance {
                principal: Principal::from("p"),
                available: 0,
                requested: 1,
            },
            LedgerError::ListingNotFound { credit_id: 1 },
            LedgerError::ListingExists { credit_id: 1 },
            LedgerError::InsufficientListing {
                credit_id: 1,
                available: 0,
                requested: 1,
            },
            LedgerError::PaymentFailed {
                reason: "declined".into(),
            },
            LedgerError::UnknownFunction { name: "x".into() },
            LedgerError::MalformedCall {
                function: "transfer".into(),
                detail: "missing amount".into(),
            },
            LedgerError::Overflow {
                current: u64::MAX,
                delta: 1,
            },
        ];

        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| c.starts_with("err-")));
    }

    #[test]
    fn display_includes_context() {
        let err = LedgerError::InsufficientBalance {
            principal: Principal::from("ST1PQHQ"),
            available: 100,
            requested: 250,
        };
        let msg = err.to_string();
        assert!(msg.contains("ST1PQHQ"));
        assert!(msg.contains("100"));
        assert!(msg.contains("250"));
    }

    #[test]
    fn serialization_roundtrip() {
        let err = LedgerError::CreditExists { credit_id: 42 };
        let json = serde_json::to_string(&err).expect("serialize");
        let back: LedgerError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, err);
    }
}
