//! # Access Control
//!
//! Two gates protect the ledger's privileged operations:
//!
//! - **Owner gate** — minting and roster management are restricted to the
//!   single contract owner, fixed at initialization and immutable for the
//!   ledger's lifetime.
//! - **Verifier gate** — marking a credit batch as verified is restricted
//!   to principals on the verifier roster, which only the owner can extend.
//!
//! Both gates are pure predicates: they read state, they never write it.
//! Callers run the gate before touching any other state, so a failed check
//! is always side-effect-free.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::principal::Principal;

/// The owner principal and the verifier roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    /// The contract owner, set once at initialization.
    owner: Principal,
    /// Principals authorized to verify credit batches. Empty at init.
    verifiers: HashSet<Principal>,
}

impl AccessControl {
    /// Creates access control with the given owner and an empty roster.
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            verifiers: HashSet::new(),
        }
    }

    /// The contract owner.
    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    /// Fails with [`LedgerError::OwnerOnly`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Principal) -> Result<(), LedgerError> {
        if caller == &self.owner {
            Ok(())
        } else {
            Err(LedgerError::OwnerOnly {
                caller: caller.clone(),
            })
        }
    }

    /// Fails with [`LedgerError::InvalidVerifier`] unless `caller` is on
    /// the roster.
    pub fn require_verifier(&self, caller: &Principal) -> Result<(), LedgerError> {
        if self.verifiers.contains(caller) {
            Ok(())
        } else {
            Err(LedgerError::InvalidVerifier {
                caller: caller.clone(),
            })
        }
    }

    /// Adds a principal to the verifier roster. Owner-only.
    ///
    /// Idempotent: adding a principal that is already on the roster is a
    /// no-op success. Returns `true` if the principal was newly added.
    pub fn add_verifier(
        &mut self,
        caller: &Principal,
        principal: Principal,
    ) -> Result<bool, LedgerError> {
        self.require_owner(caller)?;
        Ok(self.verifiers.insert(principal))
    }

    /// Returns `true` if `principal` is on the verifier roster.
    pub fn is_verifier(&self, principal: &Principal) -> bool {
        self.verifiers.contains(principal)
    }

    /// Number of principals on the roster.
    pub fn verifier_count(&self) -> usize {
        self.verifiers.len()
    }
}
