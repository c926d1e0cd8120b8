//! Integration tests for the carbon credit contract surface.
//!
//! These tests drive the façade the way a deployed client would — named
//! calls with a caller principal — and check the cross-module guarantees:
//! conservation of value, authorization gates, escrow accounting, and
//! all-or-nothing settlement.

use serde_json::json;
use verdant_ledger::{Call, CarbonLedger, LedgerError, Principal};

fn owner() -> Principal {
    Principal::from("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM")
}

fn buyer() -> Principal {
    Principal::from("ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG")
}

/// Helper: mints the standard test batch (id 1, 1000 credits) to the owner.
fn mint_standard_batch(ledger: &mut CarbonLedger) {
    let call = Call::parse(
        "mint-credits",
        &json!({
            "credit_id": 1,
            "project_name": "Amazon Forest Protection",
            "country": "Brazil",
            "vintage_year": 2024,
            "total_quantity": 1000,
            "methodology": "VCS",
            "recipient": owner().as_str(),
        }),
    )
    .unwrap();
    ledger.execute(&owner(), call).unwrap();
}

// ---------------------------------------------------------------------------
// Token Management
// ---------------------------------------------------------------------------

#[test]
fn mint_credits_then_read_balance() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);

    assert_eq!(ledger.balance_of(&owner()), 1000);
    assert!(ledger.is_conserved());
}

#[test]
fn mint_fails_when_not_contract_owner() {
    let mut ledger = CarbonLedger::new(owner());
    let call = Call::parse(
        "mint-credits",
        &json!({
            "credit_id": 1,
            "project_name": "Amazon Forest Protection",
            "country": "Brazil",
            "vintage_year": 2024,
            "total_quantity": 1000,
            "methodology": "VCS",
            "recipient": buyer().as_str(),
        }),
    )
    .unwrap();

    let err = ledger.execute(&buyer(), call).unwrap_err();
    assert_eq!(err.code(), "err-owner-only");

    // Registry and balances are untouched.
    assert_eq!(ledger.batch_count(), 0);
    assert_eq!(ledger.balance_of(&buyer()), 0);
}

// ---------------------------------------------------------------------------
// Verification System
// ---------------------------------------------------------------------------

#[test]
fn verify_credits_after_roster_addition() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);

    let add = Call::parse("add-verifier", &json!({ "principal": owner().as_str() })).unwrap();
    ledger.execute(&owner(), add).unwrap();

    let verify = Call::parse("verify-credits", &json!({ "credit_id": 1 })).unwrap();
    ledger.execute(&owner(), verify).unwrap();

    assert!(ledger.credit_info(1).unwrap().verified);
}

#[test]
fn verify_fails_from_unauthorized_verifier() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);

    let verify = Call::parse("verify-credits", &json!({ "credit_id": 1 })).unwrap();
    let err = ledger.execute(&buyer(), verify).unwrap_err();
    assert_eq!(err.code(), "err-invalid-verifier");
    assert!(!ledger.credit_info(1).unwrap().verified);
}

#[test]
fn reverification_is_stable_for_all_ids() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);
    let add = Call::parse("add-verifier", &json!({ "principal": owner().as_str() })).unwrap();
    ledger.execute(&owner(), add).unwrap();

    for _ in 0..3 {
        let verify = Call::parse("verify-credits", &json!({ "credit_id": 1 })).unwrap();
        ledger.execute(&owner(), verify).unwrap();
        assert!(ledger.credit_info(1).unwrap().verified);
    }
}

// ---------------------------------------------------------------------------
// Trading Functions
// ---------------------------------------------------------------------------

#[test]
fn create_listing_and_read_it_back() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);

    let create = Call::parse(
        "create-listing",
        &json!({ "credit_id": 1, "price": 100_000, "quantity": 500 }),
    )
    .unwrap();
    ledger.execute(&owner(), create).unwrap();

    let listing = ledger.listing(1).unwrap();
    assert_eq!(listing.quantity, 500);
    assert_eq!(listing.price, 100_000);
    assert!(listing.active);
}

#[test]
fn partial_purchase_updates_balances_and_listing() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);

    let create = Call::parse(
        "create-listing",
        &json!({ "credit_id": 1, "price": 100_000, "quantity": 500 }),
    )
    .unwrap();
    ledger.execute(&owner(), create).unwrap();

    ledger.payments_mut().deposit(&buyer(), 20_000_000);
    let purchase = Call::parse(
        "purchase-listing",
        &json!({ "credit_id": 1, "quantity": 200 }),
    )
    .unwrap();
    ledger.execute(&buyer(), purchase).unwrap();

    assert_eq!(ledger.balance_of(&owner()), 800);
    assert_eq!(ledger.balance_of(&buyer()), 200);

    let listing = ledger.listing(1).unwrap();
    assert_eq!(listing.quantity, 300);
    assert!(listing.active);

    // The payment leg settled in full.
    assert_eq!(ledger.payments().funds_of(&buyer()), 0);
    assert_eq!(ledger.payments().funds_of(&owner()), 20_000_000);
}

// ---------------------------------------------------------------------------
// Error Handling
// ---------------------------------------------------------------------------

#[test]
fn invalid_credit_id_rejected() {
    let ledger = CarbonLedger::new(owner());
    let err = ledger.credit_info(999).unwrap_err();
    assert_eq!(err.code(), "err-invalid-credit");
}

#[test]
fn transfer_beyond_balance_rejected() {
    let mut ledger = CarbonLedger::new(owner());

    let call = Call::parse(
        "transfer",
        &json!({ "amount": 1000, "from": owner().as_str(), "to": buyer().as_str() }),
    )
    .unwrap();
    let err = ledger.execute(&owner(), call).unwrap_err();
    assert_eq!(err.code(), "err-insufficient-balance");
}

#[test]
fn unknown_function_rejected() {
    let err = Call::parse("retire-credits", &json!({})).unwrap_err();
    assert_eq!(err.code(), "err-unknown-function");
}

// ---------------------------------------------------------------------------
// Integration: Full Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_mint_verify_list_sell() {
    let mut ledger = CarbonLedger::new(owner());

    // 1. Mint
    mint_standard_batch(&mut ledger);

    // 2. Add verifier + verify
    let add = Call::parse("add-verifier", &json!({ "principal": owner().as_str() })).unwrap();
    ledger.execute(&owner(), add).unwrap();
    let verify = Call::parse("verify-credits", &json!({ "credit_id": 1 })).unwrap();
    ledger.execute(&owner(), verify).unwrap();

    // 3. List
    let create = Call::parse(
        "create-listing",
        &json!({ "credit_id": 1, "price": 100_000, "quantity": 500 }),
    )
    .unwrap();
    ledger.execute(&owner(), create).unwrap();

    // 4. Sell
    ledger.payments_mut().deposit(&buyer(), 50_000_000);
    let purchase = Call::parse(
        "purchase-listing",
        &json!({ "credit_id": 1, "quantity": 200 }),
    )
    .unwrap();
    ledger.execute(&buyer(), purchase).unwrap();

    // Final state: verified, and the batch record still shows the full
    // minted quantity — trading moves balances, not batch metadata.
    let batch = ledger.credit_info(1).unwrap();
    assert!(batch.verified);
    assert_eq!(batch.total_quantity, 1000);
    assert!(ledger.is_conserved());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn conservation_holds_across_arbitrary_call_sequences() {
    let mut ledger = CarbonLedger::new(owner());
    let carol = Principal::from("carol");

    let calls: Vec<(Principal, Call)> = vec![
        (
            owner(),
            Call::parse(
                "mint-credits",
                &json!({
                    "credit_id": 1, "project_name": "Mangrove Restoration",
                    "country": "Indonesia", "vintage_year": 2023,
                    "total_quantity": 1000, "methodology": "Gold Standard",
                    "recipient": owner().as_str(),
                }),
            )
            .unwrap(),
        ),
        (
            owner(),
            Call::parse(
                "mint-credits",
                &json!({
                    "credit_id": 2, "project_name": "Wind Farm Offsets",
                    "country": "India", "vintage_year": 2022,
                    "total_quantity": 400, "methodology": "CDM",
                    "recipient": carol.as_str(),
                }),
            )
            .unwrap(),
        ),
        (
            owner(),
            Call::parse(
                "transfer",
                &json!({ "amount": 250, "from": owner().as_str(), "to": buyer().as_str() }),
            )
            .unwrap(),
        ),
        (
            owner(),
            Call::parse(
                "create-listing",
                &json!({ "credit_id": 1, "price": 50, "quantity": 300 }),
            )
            .unwrap(),
        ),
        // Fails: carol lists a batch she can cover, then buyer overfills.
        (
            carol.clone(),
            Call::parse(
                "create-listing",
                &json!({ "credit_id": 2, "price": 10, "quantity": 400 }),
            )
            .unwrap(),
        ),
        (
            buyer(),
            Call::parse(
                "purchase-listing",
                &json!({ "credit_id": 2, "quantity": 500 }),
            )
            .unwrap(),
        ),
        (
            buyer(),
            Call::parse(
                "purchase-listing",
                &json!({ "credit_id": 1, "quantity": 100 }),
            )
            .unwrap(),
        ),
    ];

    ledger.payments_mut().deposit(&buyer(), 1_000_000);

    for (caller, call) in calls {
        // Success or failure, the invariant must hold after every call.
        let _ = ledger.execute(&caller, call);
        assert!(
            ledger.is_conserved(),
            "conservation violated with {} credits minted",
            ledger.total_minted()
        );
    }

    assert_eq!(ledger.total_minted(), 1400);
}

#[test]
fn failed_purchase_leaves_no_trace() {
    let mut ledger = CarbonLedger::new(owner());
    mint_standard_batch(&mut ledger);

    let create = Call::parse(
        "create-listing",
        &json!({ "credit_id": 1, "price": 100_000, "quantity": 500 }),
    )
    .unwrap();
    ledger.execute(&owner(), create).unwrap();

    // Buyer has a quarter of the required funds.
    ledger.payments_mut().deposit(&buyer(), 5_000_000);
    let purchase = Call::parse(
        "purchase-listing",
        &json!({ "credit_id": 1, "quantity": 200 }),
    )
    .unwrap();
    let err = ledger.execute(&buyer(), purchase).unwrap_err();
    assert_eq!(err.code(), "err-payment-failed");

    // Credits, listing, and funds all exactly as before the attempt.
    assert_eq!(ledger.balance_of(&owner()), 1000);
    assert_eq!(ledger.balance_of(&buyer()), 0);
    assert_eq!(ledger.listing(1).unwrap().quantity, 500);
    assert_eq!(ledger.payments().funds_of(&buyer()), 5_000_000);
    assert_eq!(ledger.payments().funds_of(&owner()), 0);
}
