//! # Credit Registry
//!
//! The authoritative record of minted credit batches. A batch is created
//! exactly once, its metadata and quantity are immutable afterwards, and
//! the only permitted mutation is the one-way `verified` transition.
//!
//! Marketplace trading never touches a batch: `total_quantity` records what
//! was minted, not who currently holds it. Ownership lives in the balance
//! ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::principal::Principal;

// ---------------------------------------------------------------------------
// CreditBatch
// ---------------------------------------------------------------------------

/// One minted batch of carbon credits.
///
/// The id is caller-supplied at mint time; a collision is an error, never an
/// overwrite. Everything except `verified` / `verified_at` is frozen at mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBatch {
    /// Caller-supplied unique batch identifier.
    pub credit_id: u64,
    /// Project that generated the reductions (e.g., "Amazon Forest Protection").
    pub project_name: String,
    /// Host country of the project.
    pub country: String,
    /// Year the reductions occurred.
    pub vintage_year: u16,
    /// Certification methodology (e.g., "VCS", "Gold Standard").
    pub methodology: String,
    /// Quantity minted for this batch, in whole credits. Immutable —
    /// trading moves balances, not batch records.
    pub total_quantity: u64,
    /// Whether an authorized verifier has attested this batch.
    pub verified: bool,
    /// The principal the batch was minted to, recorded for provenance.
    /// Never re-derived from the balance ledger.
    pub owner_at_mint: Principal,
    /// Timestamp of the mint.
    pub created_at: DateTime<Utc>,
    /// Timestamp of verification, if it has happened.
    pub verified_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// CreditRegistry
// ---------------------------------------------------------------------------

/// All minted batches, keyed by their caller-supplied id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditRegistry {
    batches: HashMap<u64, CreditBatch>,
}

impl CreditRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly minted batch.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CreditExists`] if a batch with this id was
    /// already minted.
    pub fn insert(&mut self, batch: CreditBatch) -> Result<(), LedgerError> {
        let credit_id = batch.credit_id;
        if self.batches.contains_key(&credit_id) {
            return Err(LedgerError::CreditExists { credit_id });
        }
        self.batches.insert(credit_id, batch);
        Ok(())
    }

    /// Returns the batch snapshot for `credit_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidCredit`] if no such batch exists.
    pub fn get(&self, credit_id: u64) -> Result<&CreditBatch, LedgerError> {
        self.batches
            .get(&credit_id)
            .ok_or(LedgerError::InvalidCredit { credit_id })
    }

    /// Returns `true` if a batch with this id has been minted.
    pub fn contains(&self, credit_id: u64) -> bool {
        self.batches.contains_key(&credit_id)
    }

    /// Marks a batch as verified.
    ///
    /// The transition is one-way and idempotent: re-verifying an already
    /// verified batch is a no-op success. Returns `true` if this call
    /// flipped the flag.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidCredit`] if no such batch exists.
    pub fn verify(&mut self, credit_id: u64) -> Result<bool, LedgerError> {
        let batch = self
            .batches
            .get_mut(&credit_id)
            .ok_or(LedgerError::InvalidCredit { credit_id })?;

        if batch.verified {
            return Ok(false);
        }

        batch.verified = true;
        batch.verified_at = Some(Utc::now());
        Ok(true)
    }

    /// Sum of `total_quantity` over all minted batches, widened to `u128`
    /// so the sum itself cannot overflow. This is the right-hand side of
    /// the conservation invariant.
    pub fn total_minted(&self) -> u128 {
        self.batches
            .values()
            .map(|b| u128::from(b.total_quantity))
            .sum()
    }

    /// Number of minted batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns `true` if nothing has been minted yet.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
