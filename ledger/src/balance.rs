//! # Balance Ledger
//!
//! Per-principal fungible credit balances. Each entry is split in two:
//!
//! - **spendable** — units the principal can transfer or list for sale.
//! - **escrowed** — units locked under an active listing. Still owned by
//!   the principal (they count toward the reported balance), but not
//!   spendable until the listing sells them or releases them.
//!
//! The conservation law is enforced here: the sum of all entries
//! (spendable + escrowed) equals the sum of `total_quantity` over all
//! minted batches, at every point after a successful call. Minting credits
//! a balance, transfers and fills move value between entries, and nothing
//! else creates or destroys it.
//!
//! Every mutation validates all of its preconditions — sufficiency and
//! overflow — before the first write, so a failed call leaves the ledger
//! byte-identical.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::principal::Principal;

// ---------------------------------------------------------------------------
// BalanceEntry
// ---------------------------------------------------------------------------

/// One principal's holdings.
///
/// Invariant: `spendable + escrowed` never exceeds `u64::MAX`, so the
/// reported balance is always representable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Units free to transfer or list.
    pub spendable: u64,
    /// Units locked under an active listing.
    pub escrowed: u64,
    /// Timestamp of the last balance-modifying operation.
    pub last_updated: Option<DateTime<Utc>>,
}

impl BalanceEntry {
    /// Total units owned: spendable plus escrowed.
    pub fn total(&self) -> u64 {
        // Safe by the entry invariant; both mutation paths check the sum.
        self.spendable + self.escrowed
    }
}

// ---------------------------------------------------------------------------
// BalanceLedger
// ---------------------------------------------------------------------------

/// The mapping from principal to holdings.
///
/// Entries are created lazily — an absent key reads as zero — and are
/// never negative (`u64` fields with checked arithmetic).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceLedger {
    entries: HashMap<Principal, BalanceEntry>,
}

impl BalanceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits freshly minted units to a principal's spendable balance.
    ///
    /// This is the only entry point that creates value; everything else
    /// moves it. Returns the new spendable balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the credit would push the
    /// entry past `u64::MAX`.
    pub fn credit(&mut self, principal: &Principal, amount: u64) -> Result<u64, LedgerError> {
        let entry = self.entries.entry(principal.clone()).or_default();

        let new_spendable = entry
            .spendable
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                current: entry.spendable,
                delta: amount,
            })?;
        // The reported balance (spendable + escrowed) must stay representable.
        new_spendable
            .checked_add(entry.escrowed)
            .ok_or(LedgerError::Overflow {
                current: entry.escrowed,
                delta: new_spendable,
            })?;

        entry.spendable = new_spendable;
        entry.last_updated = Some(Utc::now());
        Ok(new_spendable)
    }

    /// Moves `amount` spendable units from `from` to `to`.
    ///
    /// Atomic: either both balances change or neither does. A self-transfer
    /// validates the same preconditions and then changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] for a zero amount — degenerate
    /// no-op transfers mask caller bugs, so they are rejected outright.
    /// Returns [`LedgerError::InsufficientBalance`] if `from` lacks the
    /// spendable units, and [`LedgerError::Overflow`] if `to` cannot absorb
    /// them.
    pub fn transfer(
        &mut self,
        amount: u64,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let available = self.spendable_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                principal: from.clone(),
                available,
                requested: amount,
            });
        }

        if from == to {
            // Preconditions hold and the net effect is nil.
            return Ok(());
        }

        // Pre-check the receiving side before any write.
        let recipient = self.entries.get(to).cloned().unwrap_or_default();
        let new_recipient_spendable =
            recipient
                .spendable
                .checked_add(amount)
                .ok_or(LedgerError::Overflow {
                    current: recipient.spendable,
                    delta: amount,
                })?;
        new_recipient_spendable
            .checked_add(recipient.escrowed)
            .ok_or(LedgerError::Overflow {
                current: recipient.escrowed,
                delta: new_recipient_spendable,
            })?;

        let now = Utc::now();
        let sender = self.entries.get_mut(from).expect("checked above");
        sender.spendable -= amount;
        sender.last_updated = Some(now);

        let recipient = self.entries.entry(to.clone()).or_default();
        recipient.spendable = new_recipient_spendable;
        recipient.last_updated = Some(now);
        Ok(())
    }

    /// Locks `amount` of a principal's spendable units into escrow.
    ///
    /// Used when a listing opens: the listed quantity leaves the spendable
    /// pool so it cannot be double-spent into a transfer or a second
    /// listing while the offer stands.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if the principal lacks
    /// the spendable units.
    pub fn lock(&mut self, principal: &Principal, amount: u64) -> Result<(), LedgerError> {
        let available = self.spendable_of(principal);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                principal: principal.clone(),
                available,
                requested: amount,
            });
        }

        let entry = self.entries.get_mut(principal).expect("checked above");
        // Moving within the entry keeps the total unchanged, so no
        // overflow check is needed.
        entry.spendable -= amount;
        entry.escrowed += amount;
        entry.last_updated = Some(Utc::now());
        Ok(())
    }

    /// Releases `amount` of `from`'s escrowed units into `to`'s spendable
    /// balance. This is the credit leg of a purchase settlement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if `from` has less than
    /// `amount` in escrow — which indicates an order-book inconsistency,
    /// since fills never exceed the escrowed quantity — and
    /// [`LedgerError::Overflow`] if `to` cannot absorb the units.
    pub fn release_to(
        &mut self,
        from: &Principal,
        to: &Principal,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let escrowed = self.escrowed_of(from);
        if escrowed < amount {
            return Err(LedgerError::InsufficientBalance {
                principal: from.clone(),
                available: escrowed,
                requested: amount,
            });
        }

        if from == to {
            let entry = self.entries.get_mut(from).expect("checked above");
            entry.escrowed -= amount;
            entry.spendable += amount;
            entry.last_updated = Some(Utc::now());
            return Ok(());
        }

        let recipient = self.entries.get(to).cloned().unwrap_or_default();
        let new_recipient_spendable =
            recipient
                .spendable
                .checked_add(amount)
                .ok_or(LedgerError::Overflow {
                    current: recipient.spendable,
                    delta: amount,
                })?;
        new_recipient_spendable
            .checked_add(recipient.escrowed)
            .ok_or(LedgerError::Overflow {
                current: recipient.escrowed,
                delta: new_recipient_spendable,
            })?;

        let now = Utc::now();
        let seller = self.entries.get_mut(from).expect("checked above");
        seller.escrowed -= amount;
        seller.last_updated = Some(now);

        let recipient = self.entries.entry(to.clone()).or_default();
        recipient.spendable = new_recipient_spendable;
        recipient.last_updated = Some(now);
        Ok(())
    }

    /// The principal's reported balance: spendable plus escrowed. Absent
    /// entries read as zero.
    pub fn balance_of(&self, principal: &Principal) -> u64 {
        self.entries.get(principal).map(|e| e.total()).unwrap_or(0)
    }

    /// The principal's spendable balance only.
    pub fn spendable_of(&self, principal: &Principal) -> u64 {
        self.entries
            .get(principal)
            .map(|e| e.spendable)
            .unwrap_or(0)
    }

    /// The principal's escrowed balance only.
    pub fn escrowed_of(&self, principal: &Principal) -> u64 {
        self.entries.get(principal).map(|e| e.escrowed).unwrap_or(0)
    }

    /// Sum of all reported balances, widened to `u128` so the sum itself
    /// cannot overflow. This is the left-hand side of the conservation
    /// invariant.
    pub fn total_supply(&self) -> u128 {
        self.entries
            .values()
            .map(|e| u128::from(e.spendable) + u128::from(e.escrowed))
            .sum()
    }

    /// Number of principals with a balance entry (zero entries included).
    pub fn account_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Principal {
        Principal::from("alice")
    }

    fn bob() -> Principal {
        Principal::from("bob")
    }

    #[test]
    fn credit_creates_lazy_entry() {
        let mut ledger = BalanceLedger::new();
        assert_eq!(ledger.balance_of(&alice()), 0);

        let new_balance = ledger.credit(&alice(), 1000).unwrap();
        assert_eq!(new_balance, 1000);
        assert_eq!(ledger.balance_of(&alice()), 1000);
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), u64::MAX).unwrap();

        let result = ledger.credit(&alice(), 1);
        assert!(matches!(result, Err(LedgerError::Overflow { .. })));
        assert_eq!(ledger.balance_of(&alice()), u64::MAX);
    }

    #[test]
    fn transfer_moves_value() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();

        ledger.transfer(400, &alice(), &bob()).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 600);
        assert_eq!(ledger.balance_of(&bob()), 400);
    }

    #[test]
    fn transfer_zero_amount_rejected() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();

        let result = ledger.transfer(0, &alice(), &bob());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidAmount { amount: 0 })
        ));
    }

    #[test]
    fn transfer_insufficient_rejected_without_mutation() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 100).unwrap();

        let result = ledger.transfer(1000, &alice(), &bob());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance {
                available: 100,
                requested: 1000,
                ..
            })
        ));
        assert_eq!(ledger.balance_of(&alice()), 100);
        assert_eq!(ledger.balance_of(&bob()), 0);
    }

    #[test]
    fn transfer_from_unknown_principal_rejected() {
        let mut ledger = BalanceLedger::new();
        let result = ledger.transfer(1, &alice(), &bob());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { available: 0, .. })
        ));
    }

    #[test]
    fn self_transfer_is_validated_noop() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 500).unwrap();

        ledger.transfer(200, &alice(), &alice()).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 500);

        let result = ledger.transfer(600, &alice(), &alice());
        assert!(result.is_err());
    }

    #[test]
    fn transfer_recipient_overflow_leaves_sender_intact() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 100).unwrap();
        ledger.credit(&bob(), u64::MAX).unwrap();

        let result = ledger.transfer(1, &alice(), &bob());
        assert!(matches!(result, Err(LedgerError::Overflow { .. })));
        assert_eq!(ledger.balance_of(&alice()), 100);
        assert_eq!(ledger.balance_of(&bob()), u64::MAX);
    }

    #[test]
    fn lock_moves_spendable_to_escrow() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();

        ledger.lock(&alice(), 600).unwrap();
        assert_eq!(ledger.spendable_of(&alice()), 400);
        assert_eq!(ledger.escrowed_of(&alice()), 600);
        // Reported balance is unchanged by escrow.
        assert_eq!(ledger.balance_of(&alice()), 1000);
    }

    #[test]
    fn locked_units_cannot_be_transferred() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();
        ledger.lock(&alice(), 800).unwrap();

        let result = ledger.transfer(300, &alice(), &bob());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance {
                available: 200,
                ..
            })
        ));
    }

    #[test]
    fn lock_beyond_spendable_rejected() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 100).unwrap();

        assert!(ledger.lock(&alice(), 200).is_err());
        assert_eq!(ledger.spendable_of(&alice()), 100);
        assert_eq!(ledger.escrowed_of(&alice()), 0);
    }

    #[test]
    fn release_moves_escrow_to_recipient() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();
        ledger.lock(&alice(), 500).unwrap();

        ledger.release_to(&alice(), &bob(), 200).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 800);
        assert_eq!(ledger.escrowed_of(&alice()), 300);
        assert_eq!(ledger.balance_of(&bob()), 200);
    }

    #[test]
    fn release_beyond_escrow_rejected() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();
        ledger.lock(&alice(), 100).unwrap();

        let result = ledger.release_to(&alice(), &bob(), 200);
        assert!(result.is_err());
        assert_eq!(ledger.escrowed_of(&alice()), 100);
        assert_eq!(ledger.balance_of(&bob()), 0);
    }

    #[test]
    fn release_to_self_unlocks() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();
        ledger.lock(&alice(), 500).unwrap();

        ledger.release_to(&alice(), &alice(), 500).unwrap();
        assert_eq!(ledger.spendable_of(&alice()), 1000);
        assert_eq!(ledger.escrowed_of(&alice()), 0);
    }

    #[test]
    fn total_supply_tracks_all_movements() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&alice(), 1000).unwrap();
        ledger.credit(&bob(), 250).unwrap();
        assert_eq!(ledger.total_supply(), 1250);

        ledger.transfer(100, &alice(), &bob()).unwrap();
        assert_eq!(ledger.total_supply(), 1250);

        ledger.lock(&alice(), 500).unwrap();
        assert_eq!(ledger.total_supply(), 1250);

        ledger.release_to(&alice(), &bob(), 500).unwrap();
        assert_eq!(ledger.total_supply(), 1250);
    }
}
