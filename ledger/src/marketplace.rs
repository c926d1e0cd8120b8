//! # Marketplace Order Book
//!
//! Listings are open offers to sell a quantity of a specific credit batch
//! at a fixed per-unit price. The book holds at most one active listing per
//! batch — the simpler, safer policy — and supports partial fills: each
//! purchase decrements the remaining quantity, and the listing deactivates
//! when it reaches zero.
//!
//! The book tracks offers only. The escrow that backs them and the money
//! that settles them live in [`crate::balance`] and [`crate::payment`];
//! the contract façade composes the three into an atomic trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::principal::Principal;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// An active or settled sale order for one credit batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Unique listing identifier, assigned by the book at creation.
    pub listing_id: String,
    /// The credit batch being offered.
    pub credit_id: u64,
    /// The principal that created the listing and escrowed the units.
    pub seller: Principal,
    /// Price per unit, in the smallest currency unit. Zero is allowed —
    /// a donation listing.
    pub price: u64,
    /// Units still offered. Decremented by each fill.
    pub quantity: u64,
    /// `true` while `quantity > 0`.
    pub active: bool,
    /// Timestamp when the listing opened.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent fill.
    pub updated_at: DateTime<Utc>,
}

/// What a fill did, handed back to the façade for settlement and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReceipt {
    /// The seller owed the payment leg.
    pub seller: Principal,
    /// Price per unit at the time of the fill.
    pub unit_price: u64,
    /// Units moved by this fill.
    pub quantity: u64,
    /// Total payment owed: `unit_price * quantity`, overflow-checked.
    pub cost: u64,
    /// Units left on the listing after this fill.
    pub remaining: u64,
    /// `true` if this fill exhausted the listing.
    pub cleared: bool,
}

// ---------------------------------------------------------------------------
// OrderBook
// ---------------------------------------------------------------------------

/// All listings, keyed by credit batch id.
///
/// A settled (inactive) listing stays in the book as a snapshot until a new
/// listing for the same batch supersedes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    listings: HashMap<u64, Listing>,
}

impl OrderBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a listing for `credit_id`.
    ///
    /// The caller (the contract façade) has already verified that the batch
    /// exists and escrowed the seller's units; the book only enforces its
    /// own invariants.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] for a zero quantity and
    /// [`LedgerError::ListingExists`] if the batch already has an active
    /// listing.
    pub fn open(
        &mut self,
        credit_id: u64,
        seller: Principal,
        price: u64,
        quantity: u64,
    ) -> Result<&Listing, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidAmount { amount: quantity });
        }
        if self.listings.get(&credit_id).is_some_and(|l| l.active) {
            return Err(LedgerError::ListingExists { credit_id });
        }

        let now = Utc::now();
        let listing = Listing {
            listing_id: Uuid::new_v4().to_string(),
            credit_id,
            seller,
            price,
            quantity,
            active: true,
            created_at: now,
            updated_at: now,
        };

        // Supersedes any settled listing for the same batch.
        self.listings.insert(credit_id, listing);
        Ok(&self.listings[&credit_id])
    }

    /// Returns the listing snapshot for `credit_id`, active or settled.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ListingNotFound`] if no listing was ever
    /// opened for the batch.
    pub fn get(&self, credit_id: u64) -> Result<&Listing, LedgerError> {
        self.listings
            .get(&credit_id)
            .ok_or(LedgerError::ListingNotFound { credit_id })
    }

    /// Fills `quantity` units of the active listing for `credit_id`.
    ///
    /// All preconditions — including the payment-cost overflow check — run
    /// before the listing is touched, so an error leaves the book intact.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ListingNotFound`] if there is no active
    /// listing, [`LedgerError::InvalidAmount`] for a zero quantity,
    /// [`LedgerError::InsufficientListing`] if the listing has fewer units
    /// left, and [`LedgerError::Overflow`] if `price * quantity` exceeds
    /// `u64::MAX`.
    pub fn fill(&mut self, credit_id: u64, quantity: u64) -> Result<FillReceipt, LedgerError> {
        let listing = self
            .listings
            .get_mut(&credit_id)
            .filter(|l| l.active)
            .ok_or(LedgerError::ListingNotFound { credit_id })?;

        if quantity == 0 {
            return Err(LedgerError::InvalidAmount { amount: quantity });
        }
        if quantity > listing.quantity {
            return Err(LedgerError::InsufficientListing {
                credit_id,
                available: listing.quantity,
                requested: quantity,
            });
        }

        let cost = listing
            .price
            .checked_mul(quantity)
            .ok_or(LedgerError::Overflow {
                current: listing.price,
                delta: quantity,
            })?;

        listing.quantity -= quantity;
        let cleared = listing.quantity == 0;
        if cleared {
            listing.active = false;
        }
        listing.updated_at = Utc::now();

        Ok(FillReceipt {
            seller: listing.seller.clone(),
            unit_price: listing.price,
            quantity,
            cost,
            remaining: listing.quantity,
            cleared,
        })
    }

    /// Puts `quantity` units back on the listing for `credit_id`,
    /// reactivating it. Compensating action for a fill whose settlement
    /// legs could not complete; only ever called with the quantity of the
    /// fill being undone.
    pub fn restore(&mut self, credit_id: u64, quantity: u64) -> Result<(), LedgerError> {
        let listing = self
            .listings
            .get_mut(&credit_id)
            .ok_or(LedgerError::ListingNotFound { credit_id })?;

        listing.quantity = listing
            .quantity
            .checked_add(quantity)
            .ok_or(LedgerError::Overflow {
                current: listing.quantity,
                delta: quantity,
            })?;
        listing.active = listing.quantity > 0;
        listing.updated_at = Utc::now();
        Ok(())
    }

    /// Returns `true` if the batch currently has an active listing.
    pub fn has_active(&self, credit_id: u64) -> bool {
        self.listings.get(&credit_id).is_some_and(|l| l.active)
    }

    /// Number of active listings across the book.
    pub fn active_count(&self) -> usize {
        self.listings.values().filter(|l| l.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller() -> Principal {
        Principal::from("seller")
    }

    #[test]
    fn open_assigns_id_and_activates() {
        let mut book = OrderBook::new();
        let listing = book.open(1, seller(), 100_000, 500).unwrap();

        assert!(!listing.listing_id.is_empty());
        assert_eq!(listing.quantity, 500);
        assert_eq!(listing.price, 100_000);
        assert!(listing.active);
        assert_eq!(book.active_count(), 1);
    }

    #[test]
    fn zero_quantity_listing_rejected() {
        let mut book = OrderBook::new();
        let result = book.open(1, seller(), 100_000, 0);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn second_active_listing_rejected() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();

        let result = book.open(1, seller(), 90_000, 100);
        assert!(matches!(
            result,
            Err(LedgerError::ListingExists { credit_id: 1 })
        ));
        // The standing listing is untouched.
        assert_eq!(book.get(1).unwrap().price, 100_000);
    }

    #[test]
    fn partial_fill_decrements_and_stays_active() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();

        let receipt = book.fill(1, 200).unwrap();
        assert_eq!(receipt.quantity, 200);
        assert_eq!(receipt.cost, 20_000_000);
        assert_eq!(receipt.remaining, 300);
        assert!(!receipt.cleared);

        let listing = book.get(1).unwrap();
        assert_eq!(listing.quantity, 300);
        assert!(listing.active);
    }

    #[test]
    fn exhausting_fill_deactivates() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();

        let receipt = book.fill(1, 500).unwrap();
        assert!(receipt.cleared);
        assert_eq!(receipt.remaining, 0);

        let listing = book.get(1).unwrap();
        assert!(!listing.active);
        // A settled listing is no longer fillable.
        assert!(matches!(
            book.fill(1, 1),
            Err(LedgerError::ListingNotFound { .. })
        ));
    }

    #[test]
    fn settled_listing_can_be_superseded() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();
        book.fill(1, 500).unwrap();

        let listing = book.open(1, seller(), 120_000, 200).unwrap();
        assert_eq!(listing.price, 120_000);
        assert!(listing.active);
    }

    #[test]
    fn overfill_rejected_without_mutation() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();

        let result = book.fill(1, 600);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientListing {
                available: 500,
                requested: 600,
                ..
            })
        ));
        assert_eq!(book.get(1).unwrap().quantity, 500);
    }

    #[test]
    fn zero_fill_rejected() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();
        assert!(matches!(
            book.fill(1, 0),
            Err(LedgerError::InvalidAmount { amount: 0 })
        ));
    }

    #[test]
    fn fill_unknown_listing_rejected() {
        let mut book = OrderBook::new();
        assert!(matches!(
            book.fill(42, 10),
            Err(LedgerError::ListingNotFound { credit_id: 42 })
        ));
    }

    #[test]
    fn cost_overflow_rejected_before_mutation() {
        let mut book = OrderBook::new();
        book.open(1, seller(), u64::MAX, 500).unwrap();

        let result = book.fill(1, 2);
        assert!(matches!(result, Err(LedgerError::Overflow { .. })));
        assert_eq!(book.get(1).unwrap().quantity, 500);
    }

    #[test]
    fn restore_reactivates_after_fill() {
        let mut book = OrderBook::new();
        book.open(1, seller(), 100_000, 500).unwrap();
        book.fill(1, 500).unwrap();
        assert!(!book.has_active(1));

        book.restore(1, 500).unwrap();
        let listing = book.get(1).unwrap();
        assert!(listing.active);
        assert_eq!(listing.quantity, 500);
    }
}
