// Copyright (c) 2026 Verdant Labs. MIT License.
// See LICENSE for details.

//! # Verdant Ledger — Core Library
//!
//! The authoritative state machine behind the Verdant carbon credit
//! marketplace. One credit is one tonne of CO2-equivalent, minted as part of
//! a discrete, verifiable batch and traded as a fungible balance.
//!
//! The design follows the concerns of the system, one module each:
//!
//! - **access** — caller resolution gates: contract owner and the verifier
//!   roster. Pure predicates, no side effects.
//! - **registry** — the record of minted credit batches: metadata, quantity,
//!   verification status. Batches are immutable except for the one-way
//!   `verified` transition.
//! - **balance** — per-principal fungible balances with a spendable/escrowed
//!   split. The conservation law lives here: total balances always equal
//!   total minted quantity.
//! - **marketplace** — the order book: at most one active listing per credit
//!   batch, partial fills, deactivation on full fill.
//! - **payment** — the currency leg of a trade, behind a trait so the
//!   settlement rail can be swapped (and made to fail, in tests).
//! - **contract** — the single entry surface: a tagged call enum dispatched
//!   exhaustively against the state above, returning structured outcomes.
//!
//! ## Design Rules
//!
//! 1. Every monetary operation uses checked arithmetic. Wrapping math and
//!    money do not mix.
//! 2. Every mutating call validates all preconditions before the first
//!    write. An error never leaves partial state behind.
//! 3. The library is synchronous and deterministic. Serialization of calls
//!    against shared state is the embedding service's job (see the node
//!    crate), not ours.

pub mod access;
pub mod balance;
pub mod config;
pub mod contract;
pub mod error;
pub mod marketplace;
pub mod payment;
pub mod principal;
pub mod registry;

pub use contract::{Call, CarbonLedger, Outcome};
pub use error::LedgerError;
pub use principal::Principal;
