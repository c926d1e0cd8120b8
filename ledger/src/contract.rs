//! # Contract Façade
//!
//! The single entry surface of the ledger. Every external call arrives as a
//! [`Call`] — a tagged variant per exported function — together with the
//! caller's resolved [`Principal`], and is dispatched exhaustively against
//! the owned state: access control, credit registry, balance ledger, order
//! book, and the payment gateway.
//!
//! ## Atomicity
//!
//! Each call is all-or-nothing. Single-component operations get this for
//! free (preconditions run before the first write); the two composite
//! operations use compensating actions:
//!
//! - **create-listing** escrows the seller's units, then opens the listing.
//!   If the open fails, the escrow is released back.
//! - **purchase-listing** fills the book, settles payment, then moves the
//!   escrowed credits. A failure in a later leg undoes the earlier ones, so
//!   there is no state where payment moved but credits did not, or vice
//!   versa.
//!
//! The façade assumes one call at a time: `execute` takes `&mut self`, and
//! the embedding service serializes callers (see the node crate).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::AccessControl;
use crate::balance::BalanceLedger;
use crate::error::LedgerError;
use crate::marketplace::{Listing, OrderBook};
use crate::payment::{CashAccounts, PaymentGateway};
use crate::principal::Principal;
use crate::registry::{CreditBatch, CreditRegistry};

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// One invocation of an exported contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "kebab-case")]
pub enum Call {
    /// Mint a new credit batch to `recipient`. Owner-only.
    MintCredits {
        credit_id: u64,
        project_name: String,
        country: String,
        vintage_year: u16,
        total_quantity: u64,
        methodology: String,
        recipient: Principal,
    },
    /// Add a principal to the verifier roster. Owner-only.
    AddVerifier { principal: Principal },
    /// Mark a credit batch as verified. Verifier-only.
    VerifyCredits { credit_id: u64 },
    /// Read a credit batch snapshot.
    GetCreditInfo { credit_id: u64 },
    /// Read a principal's balance.
    GetBalance { principal: Principal },
    /// Move spendable credits between principals.
    Transfer {
        amount: u64,
        from: Principal,
        to: Principal,
    },
    /// Open a sale listing for a credit batch.
    CreateListing {
        credit_id: u64,
        price: u64,
        quantity: u64,
    },
    /// Read a listing snapshot.
    GetListing { credit_id: u64 },
    /// Buy units from the active listing for a credit batch.
    PurchaseListing { credit_id: u64, quantity: u64 },
}

impl Call {
    /// Builds a call from a wire-level `(function_name, args)` pair.
    ///
    /// `args` is a JSON object keyed by parameter name. Unmatched function
    /// names fail with [`LedgerError::UnknownFunction`]; known functions
    /// with missing or mistyped arguments fail with
    /// [`LedgerError::MalformedCall`].
    pub fn parse(name: &str, args: &Value) -> Result<Self, LedgerError> {
        match name {
            "mint-credits" => Ok(Call::MintCredits {
                credit_id: field_u64(name, args, "credit_id")?,
                project_name: field_str(name, args, "project_name")?,
                country: field_str(name, args, "country")?,
                vintage_year: field_u16(name, args, "vintage_year")?,
                total_quantity: field_u64(name, args, "total_quantity")?,
                methodology: field_str(name, args, "methodology")?,
                recipient: Principal::from(field_str(name, args, "recipient")?),
            }),
            "add-verifier" => Ok(Call::AddVerifier {
                principal: Principal::from(field_str(name, args, "principal")?),
            }),
            "verify-credits" => Ok(Call::VerifyCredits {
                credit_id: field_u64(name, args, "credit_id")?,
            }),
            "get-credit-info" => Ok(Call::GetCreditInfo {
                credit_id: field_u64(name, args, "credit_id")?,
            }),
            "get-balance" => Ok(Call::GetBalance {
                principal: Principal::from(field_str(name, args, "principal")?),
            }),
            "transfer" => Ok(Call::Transfer {
                amount: field_u64(name, args, "amount")?,
                from: Principal::from(field_str(name, args, "from")?),
                to: Principal::from(field_str(name, args, "to")?),
            }),
            "create-listing" => Ok(Call::CreateListing {
                credit_id: field_u64(name, args, "credit_id")?,
                price: field_u64(name, args, "price")?,
                quantity: field_u64(name, args, "quantity")?,
            }),
            "get-listing" => Ok(Call::GetListing {
                credit_id: field_u64(name, args, "credit_id")?,
            }),
            "purchase-listing" => Ok(Call::PurchaseListing {
                credit_id: field_u64(name, args, "credit_id")?,
                quantity: field_u64(name, args, "quantity")?,
            }),
            other => Err(LedgerError::UnknownFunction {
                name: other.to_string(),
            }),
        }
    }

    /// The exported function name this call maps to.
    pub fn function_name(&self) -> &'static str {
        match self {
            Call::MintCredits { .. } => "mint-credits",
            Call::AddVerifier { .. } => "add-verifier",
            Call::VerifyCredits { .. } => "verify-credits",
            Call::GetCreditInfo { .. } => "get-credit-info",
            Call::GetBalance { .. } => "get-balance",
            Call::Transfer { .. } => "transfer",
            Call::CreateListing { .. } => "create-listing",
            Call::GetListing { .. } => "get-listing",
            Call::PurchaseListing { .. } => "purchase-listing",
        }
    }

    /// Returns `true` for read-only calls that never mutate state.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Call::GetCreditInfo { .. } | Call::GetBalance { .. } | Call::GetListing { .. }
        )
    }
}

fn field<'a>(function: &str, args: &'a Value, key: &str) -> Result<&'a Value, LedgerError> {
    args.get(key).ok_or_else(|| LedgerError::MalformedCall {
        function: function.to_string(),
        detail: format!("missing argument '{}'", key),
    })
}

fn field_u64(function: &str, args: &Value, key: &str) -> Result<u64, LedgerError> {
    field(function, args, key)?
        .as_u64()
        .ok_or_else(|| LedgerError::MalformedCall {
            function: function.to_string(),
            detail: format!("argument '{}' must be an unsigned integer", key),
        })
}

fn field_u16(function: &str, args: &Value, key: &str) -> Result<u16, LedgerError> {
    let raw = field_u64(function, args, key)?;
    u16::try_from(raw).map_err(|_| LedgerError::MalformedCall {
        function: function.to_string(),
        detail: format!("argument '{}' out of range", key),
    })
}

fn field_str(function: &str, args: &Value, key: &str) -> Result<String, LedgerError> {
    field(function, args, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LedgerError::MalformedCall {
            function: function.to_string(),
            detail: format!("argument '{}' must be a string", key),
        })
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The success payload of an executed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// A batch was minted and its quantity credited to the recipient.
    Minted { credit_id: u64, total_quantity: u64 },
    /// A verifier was added (or was already on the roster).
    VerifierAdded {
        principal: Principal,
        newly_added: bool,
    },
    /// A batch was verified (or already was).
    Verified {
        credit_id: u64,
        newly_verified: bool,
    },
    /// Credits moved between principals.
    Transferred {
        amount: u64,
        from: Principal,
        to: Principal,
    },
    /// A listing opened and the offered units went into escrow.
    ListingCreated {
        credit_id: u64,
        listing_id: String,
        quantity: u64,
    },
    /// A purchase settled: credits and payment both moved.
    Purchased {
        credit_id: u64,
        quantity: u64,
        cost: u64,
        remaining: u64,
        listing_cleared: bool,
    },
    /// Snapshot of a credit batch.
    CreditInfo { batch: CreditBatch },
    /// A principal's reported balance.
    Balance { principal: Principal, amount: u64 },
    /// Snapshot of a listing.
    ListingInfo { listing: Listing },
}

// ---------------------------------------------------------------------------
// CarbonLedger
// ---------------------------------------------------------------------------

/// The complete contract state: one owner, one registry, one balance
/// ledger, one order book, one payment rail.
///
/// Generic over the payment gateway so tests can swap in a failing rail;
/// defaults to the in-memory [`CashAccounts`].
#[derive(Debug, Clone)]
pub struct CarbonLedger<G = CashAccounts> {
    access: AccessControl,
    registry: CreditRegistry,
    balances: BalanceLedger,
    book: OrderBook,
    payments: G,
}

impl CarbonLedger<CashAccounts> {
    /// Creates a ledger owned by `owner`, settling against in-memory cash
    /// accounts.
    pub fn new(owner: Principal) -> Self {
        Self::with_gateway(owner, CashAccounts::new())
    }
}

impl<G: PaymentGateway> CarbonLedger<G> {
    /// Creates a ledger owned by `owner` with a custom payment gateway.
    pub fn with_gateway(owner: Principal, gateway: G) -> Self {
        Self {
            access: AccessControl::new(owner),
            registry: CreditRegistry::new(),
            balances: BalanceLedger::new(),
            book: OrderBook::new(),
            payments: gateway,
        }
    }

    /// The contract owner.
    pub fn owner(&self) -> &Principal {
        self.access.owner()
    }

    /// The payment rail, for deposits and balance queries by the embedding
    /// service.
    pub fn payments(&self) -> &G {
        &self.payments
    }

    /// Mutable access to the payment rail (the service faucet).
    pub fn payments_mut(&mut self) -> &mut G {
        &mut self.payments
    }

    /// Dispatches a call on behalf of `caller`.
    pub fn execute(&mut self, caller: &Principal, call: Call) -> Result<Outcome, LedgerError> {
        match call {
            Call::MintCredits {
                credit_id,
                project_name,
                country,
                vintage_year,
                total_quantity,
                methodology,
                recipient,
            } => self.mint_credits(
                caller,
                credit_id,
                project_name,
                country,
                vintage_year,
                total_quantity,
                methodology,
                recipient,
            ),
            Call::AddVerifier { principal } => self.add_verifier(caller, principal),
            Call::VerifyCredits { credit_id } => self.verify_credits(caller, credit_id),
            Call::GetCreditInfo { credit_id } => Ok(Outcome::CreditInfo {
                batch: self.credit_info(credit_id)?.clone(),
            }),
            Call::GetBalance { principal } => Ok(Outcome::Balance {
                amount: self.balance_of(&principal),
                principal,
            }),
            Call::Transfer { amount, from, to } => self.transfer(caller, amount, from, to),
            Call::CreateListing {
                credit_id,
                price,
                quantity,
            } => self.create_listing(caller, credit_id, price, quantity),
            Call::GetListing { credit_id } => Ok(Outcome::ListingInfo {
                listing: self.listing(credit_id)?.clone(),
            }),
            Call::PurchaseListing {
                credit_id,
                quantity,
            } => self.purchase_listing(caller, credit_id, quantity),
        }
    }

    // -- Mutating operations ------------------------------------------------

    /// Mints a new credit batch and credits its quantity to the recipient.
    ///
    /// The sole entry point that creates value; the conservation invariant
    /// holds immediately after (batch quantity and recipient balance grow
    /// by the same amount).
    #[allow(clippy::too_many_arguments)]
    fn mint_credits(
        &mut self,
        caller: &Principal,
        credit_id: u64,
        project_name: String,
        country: String,
        vintage_year: u16,
        total_quantity: u64,
        methodology: String,
        recipient: Principal,
    ) -> Result<Outcome, LedgerError> {
        self.access.require_owner(caller)?;
        if self.registry.contains(credit_id) {
            return Err(LedgerError::CreditExists { credit_id });
        }
        if total_quantity == 0 {
            return Err(LedgerError::InvalidAmount {
                amount: total_quantity,
            });
        }

        if !crate::config::is_plausible_vintage(vintage_year) {
            tracing::warn!(credit_id, vintage_year, "minting batch with implausible vintage");
        }

        self.balances.credit(&recipient, total_quantity)?;
        let batch = CreditBatch {
            credit_id,
            project_name,
            country,
            vintage_year,
            methodology,
            total_quantity,
            verified: false,
            owner_at_mint: recipient.clone(),
            created_at: chrono::Utc::now(),
            verified_at: None,
        };
        // Cannot collide: checked above, and nothing between the check and
        // the insert touches the registry.
        self.registry.insert(batch)?;

        tracing::info!(credit_id, total_quantity, recipient = %recipient, "minted credit batch");
        Ok(Outcome::Minted {
            credit_id,
            total_quantity,
        })
    }

    /// Adds a principal to the verifier roster. Owner-only, idempotent.
    fn add_verifier(
        &mut self,
        caller: &Principal,
        principal: Principal,
    ) -> Result<Outcome, LedgerError> {
        let newly_added = self.access.add_verifier(caller, principal.clone())?;
        if newly_added {
            tracing::info!(verifier = %principal, "verifier added to roster");
        }
        Ok(Outcome::VerifierAdded {
            principal,
            newly_added,
        })
    }

    /// Marks a batch as verified. Verifier-only; re-verification is a
    /// no-op success.
    fn verify_credits(
        &mut self,
        caller: &Principal,
        credit_id: u64,
    ) -> Result<Outcome, LedgerError> {
        self.access.require_verifier(caller)?;
        let newly_verified = self.registry.verify(credit_id)?;
        if newly_verified {
            tracing::info!(credit_id, verifier = %caller, "credit batch verified");
        }
        Ok(Outcome::Verified {
            credit_id,
            newly_verified,
        })
    }

    /// Moves spendable credits from `from` to `to`.
    ///
    /// Binding `from` to the caller is the authentication layer's job; the
    /// ledger records the discrepancy but does not police it.
    fn transfer(
        &mut self,
        caller: &Principal,
        amount: u64,
        from: Principal,
        to: Principal,
    ) -> Result<Outcome, LedgerError> {
        if caller != &from {
            tracing::warn!(caller = %caller, from = %from, "transfer caller differs from sender");
        }
        self.balances.transfer(amount, &from, &to)?;
        tracing::info!(amount, from = %from, to = %to, "credits transferred");
        Ok(Outcome::Transferred { amount, from, to })
    }

    /// Opens a listing: escrows the caller's units, then records the offer.
    fn create_listing(
        &mut self,
        caller: &Principal,
        credit_id: u64,
        price: u64,
        quantity: u64,
    ) -> Result<Outcome, LedgerError> {
        // All preconditions up front, before the escrow lock.
        if !self.registry.contains(credit_id) {
            return Err(LedgerError::InvalidCredit { credit_id });
        }
        if quantity == 0 {
            return Err(LedgerError::InvalidAmount { amount: quantity });
        }
        if self.book.has_active(credit_id) {
            return Err(LedgerError::ListingExists { credit_id });
        }

        self.balances.lock(caller, quantity)?;

        let listing_id = match self.book.open(credit_id, caller.clone(), price, quantity) {
            Ok(listing) => listing.listing_id.clone(),
            Err(e) => {
                // Compensate: the offer never opened, so the escrow must
                // not stand.
                if let Err(undo) = self.balances.release_to(caller, caller, quantity) {
                    tracing::error!(credit_id, error = %undo, "failed to undo escrow lock");
                }
                return Err(e);
            }
        };

        tracing::info!(credit_id, %listing_id, price, quantity, seller = %caller, "listing created");
        Ok(Outcome::ListingCreated {
            credit_id,
            listing_id,
            quantity,
        })
    }

    /// Buys `quantity` units from the active listing for `credit_id`.
    ///
    /// Three legs, committed together or not at all: the book fill, the
    /// payment settlement, and the escrow release. Later-leg failures undo
    /// the earlier legs.
    fn purchase_listing(
        &mut self,
        buyer: &Principal,
        credit_id: u64,
        quantity: u64,
    ) -> Result<Outcome, LedgerError> {
        let receipt = self.book.fill(credit_id, quantity)?;

        if let Err(e) = self
            .payments
            .settle(buyer, &receipt.seller, receipt.cost)
        {
            if let Err(undo) = self.book.restore(credit_id, quantity) {
                tracing::error!(credit_id, error = %undo, "failed to restore listing after payment failure");
            }
            return Err(LedgerError::PaymentFailed {
                reason: e.to_string(),
            });
        }

        if let Err(e) = self.balances.release_to(&receipt.seller, buyer, quantity) {
            // Unwind both earlier legs. The refund cannot fail on the cash
            // rail (the seller just received at least `cost`), but a custom
            // gateway might; the double fault is logged, not swallowed.
            if let Err(undo) = self.book.restore(credit_id, quantity) {
                tracing::error!(credit_id, error = %undo, "failed to restore listing during rollback");
            }
            if let Err(undo) = self.payments.settle(&receipt.seller, buyer, receipt.cost) {
                tracing::error!(credit_id, error = %undo, "failed to refund payment during rollback");
            }
            return Err(e);
        }

        tracing::info!(
            credit_id,
            quantity,
            cost = receipt.cost,
            buyer = %buyer,
            seller = %receipt.seller,
            "purchase settled"
        );
        Ok(Outcome::Purchased {
            credit_id,
            quantity,
            cost: receipt.cost,
            remaining: receipt.remaining,
            listing_cleared: receipt.cleared,
        })
    }

    // -- Read-only operations -----------------------------------------------

    /// Snapshot of a credit batch.
    pub fn credit_info(&self, credit_id: u64) -> Result<&CreditBatch, LedgerError> {
        self.registry.get(credit_id)
    }

    /// A principal's reported balance (spendable + escrowed). Unknown
    /// principals read as zero.
    pub fn balance_of(&self, principal: &Principal) -> u64 {
        self.balances.balance_of(principal)
    }

    /// Snapshot of the listing for a credit batch.
    pub fn listing(&self, credit_id: u64) -> Result<&Listing, LedgerError> {
        self.book.get(credit_id)
    }

    /// Whether a principal is on the verifier roster.
    pub fn is_verifier(&self, principal: &Principal) -> bool {
        self.access.is_verifier(principal)
    }

    /// Total credits ever minted, across all batches.
    pub fn total_minted(&self) -> u128 {
        self.registry.total_minted()
    }

    /// The conservation invariant: total balances equal total minted.
    /// True after every successful call; checked in tests and exported by
    /// the service's status endpoint.
    pub fn is_conserved(&self) -> bool {
        self.balances.total_supply() == self.registry.total_minted()
    }

    /// Number of minted batches.
    pub fn batch_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of active listings.
    pub fn active_listing_count(&self) -> usize {
        self.book.active_count()
    }
}
