//! # Ledger Configuration & Constants
//!
//! Every magic number in Verdant lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong.

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// One carbon credit represents one tonne of CO2-equivalent. The ledger
/// tracks whole credits only; fractional tonnes are an off-ledger concern.
pub const TONNES_CO2E_PER_CREDIT: u64 = 1;

/// Listing prices are denominated in the smallest unit of the settlement
/// currency (micro-units, six decimals).
pub const PRICE_DECIMALS: u8 = 6;

// ---------------------------------------------------------------------------
// Vintage Year Bounds
// ---------------------------------------------------------------------------

/// Earliest plausible vintage year. The Kyoto Protocol was adopted in 1997;
/// no recognized methodology certifies reductions from before it.
pub const MIN_VINTAGE_YEAR: u16 = 1997;

/// Latest plausible vintage year. Forward crediting beyond this is either a
/// typo or wishful thinking.
pub const MAX_VINTAGE_YEAR: u16 = 2100;

/// Returns `true` if `year` falls within the plausible vintage window.
///
/// The ledger records whatever vintage the owner mints — provenance data is
/// immutable and caller-supplied — but the service layer uses this to flag
/// suspicious batches in its logs.
pub fn is_plausible_vintage(year: u16) -> bool {
    (MIN_VINTAGE_YEAR..=MAX_VINTAGE_YEAR).contains(&year)
}

// ---------------------------------------------------------------------------
// Service Defaults
// ---------------------------------------------------------------------------

/// Default JSON-RPC and REST API port.
pub const DEFAULT_RPC_PORT: u16 = 8430;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 8431;

/// Ledger protocol version string, reported by the service `/status`
/// endpoint and the `version` subcommand.
pub const LEDGER_VERSION: &str = "0.1.0";
