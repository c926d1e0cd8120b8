//! # REST + JSON-RPC API
//!
//! Builds the axum router exposing the contract surface. Every named
//! contract call goes through `POST /rpc`; reads are also available as
//! plain REST endpoints.
//!
//! ## Endpoints
//!
//! | Method | Path                    | Description                        |
//! |--------|-------------------------|------------------------------------|
//! | GET    | `/health`               | Liveness probe                     |
//! | GET    | `/status`               | Ledger status summary              |
//! | POST   | `/rpc`                  | JSON-RPC 2.0 contract call gateway |
//! | GET    | `/credits/:id`          | Credit batch snapshot              |
//! | GET    | `/balances/:principal`  | Reported balance of a principal    |
//! | GET    | `/listings/:credit_id`  | Listing snapshot                   |
//! | POST   | `/faucet`               | Fund a payment account (dev only)  |
//!
//! ## Serialization of calls
//!
//! The shared ledger sits behind a single `RwLock`. Every mutating call
//! takes the write lock, so calls are wholly ordered and each one's
//! multi-step mutation commits before the next caller observes anything —
//! the serialization guarantee a blockchain runtime would otherwise
//! provide.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use verdant_ledger::{Call, CarbonLedger, LedgerError, Outcome, Principal};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The service's reported version string.
    pub version: String,
    /// The contract owner principal, fixed at startup.
    pub owner: Principal,
    /// Whether the cash faucet endpoint accepts deposits.
    pub faucet_enabled: bool,
    /// When the service started, for uptime reporting.
    pub started_at: DateTime<Utc>,
    /// The contract state. One writer at a time.
    pub ledger: Arc<RwLock<CarbonLedger>>,
    /// Prometheus metrics handles for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/credits/:id", get(credit_handler))
        .route("/balances/:principal", get(balance_handler))
        .route("/listings/:credit_id", get(listing_handler))
        .route("/faucet", post(faucet_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
///
/// `params` carries the resolved caller principal and the named contract
/// call arguments:
///
/// ```json
/// { "caller": "ST1...", "args": { "credit_id": 1, "quantity": 200 } }
/// ```
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The contract function to invoke (e.g., "mint-credits").
    pub method: String,
    /// Caller principal and call arguments.
    pub params: Option<serde_json::Value>,
    /// Request identifier, echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Structured error data; for ledger errors this carries the stable
    /// wire code, e.g. `{"code": "err-owner-only"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    fn from_ledger(err: &LedgerError) -> Self {
        let code = match err {
            LedgerError::UnknownFunction { .. } => -32601,
            LedgerError::MalformedCall { .. } => -32602,
            _ => -32000,
        };
        Self {
            code,
            message: err.to_string(),
            data: Some(serde_json::json!({ "code": err.code() })),
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Service software version.
    pub version: String,
    /// The contract owner principal.
    pub owner: String,
    /// Number of minted credit batches.
    pub batch_count: usize,
    /// Total credits minted across all batches.
    pub total_minted: u128,
    /// Number of active listings on the order book.
    pub active_listings: usize,
    /// Whether the conservation invariant currently holds. Anything but
    /// `true` here is a bug worth paging someone over.
    pub conserved: bool,
    /// Whether the faucet endpoint is enabled.
    pub faucet_enabled: bool,
    /// Seconds since the service started.
    pub uptime_secs: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Request body for `POST /faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetRequest {
    /// The principal whose payment account to fund.
    pub principal: String,
    /// Amount to deposit, in the smallest currency unit.
    pub amount: u64,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    fn from_ledger(err: &LedgerError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the service is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — ledger status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    let resp = StatusResponse {
        version: state.version.clone(),
        owner: state.owner.to_string(),
        batch_count: ledger.batch_count(),
        total_minted: ledger.total_minted(),
        active_listings: ledger.active_listing_count(),
        conserved: ledger.is_conserved(),
        faucet_enabled: state.faucet_enabled,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        timestamp: Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /rpc` — JSON-RPC 2.0 contract call gateway.
///
/// Dispatches the named function against the ledger on behalf of the
/// caller named in `params`. Unknown functions return -32601; malformed
/// arguments return -32602; every other ledger error returns -32000 with
/// the stable wire code in `data`.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let id = req.id.clone();
    let respond = |result: Result<serde_json::Value, JsonRpcError>| {
        let (result, error) = match result {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e)),
        };
        Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result,
            error,
            id,
        })
    };

    if req.jsonrpc != "2.0" {
        return respond(Err(JsonRpcError::invalid_request(
            "Invalid Request: jsonrpc must be \"2.0\"",
        )));
    }

    let params = match req.params.as_ref() {
        Some(serde_json::Value::Object(map)) => map,
        _ => {
            return respond(Err(JsonRpcError::invalid_params(
                "Invalid params: expected object with 'caller' and 'args'",
            )))
        }
    };
    let caller = match params.get("caller").and_then(|v| v.as_str()) {
        Some(s) => Principal::from(s),
        None => {
            return respond(Err(JsonRpcError::invalid_params(
                "Invalid params: missing 'caller'",
            )))
        }
    };
    let empty_args = serde_json::json!({});
    let args = params.get("args").unwrap_or(&empty_args);

    let call = match Call::parse(&req.method, args) {
        Ok(call) => call,
        Err(e) => return respond(Err(JsonRpcError::from_ledger(&e))),
    };

    state.metrics.calls_total.inc();
    let timer = state.metrics.call_latency_seconds.start_timer();

    let outcome = if call.is_read_only() {
        // Reads share the lock; they cannot observe a half-applied call.
        let ledger = state.ledger.read().await;
        execute_read(&ledger, &call)
    } else {
        let mut ledger = state.ledger.write().await;
        let result = ledger.execute(&caller, call);
        record_outcome(&state.metrics, &ledger, &result);
        result
    };
    timer.observe_duration();

    match outcome {
        Ok(outcome) => respond(Ok(
            serde_json::to_value(&outcome).unwrap_or(serde_json::Value::Null)
        )),
        Err(e) => {
            state.metrics.calls_failed_total.inc();
            respond(Err(JsonRpcError::from_ledger(&e)))
        }
    }
}

/// Dispatches a read-only call under the shared lock.
fn execute_read(ledger: &CarbonLedger, call: &Call) -> Result<Outcome, LedgerError> {
    match call {
        Call::GetCreditInfo { credit_id } => Ok(Outcome::CreditInfo {
            batch: ledger.credit_info(*credit_id)?.clone(),
        }),
        Call::GetBalance { principal } => Ok(Outcome::Balance {
            principal: principal.clone(),
            amount: ledger.balance_of(principal),
        }),
        Call::GetListing { credit_id } => Ok(Outcome::ListingInfo {
            listing: ledger.listing(*credit_id)?.clone(),
        }),
        // `Call::is_read_only` gates entry to this path.
        other => Err(LedgerError::UnknownFunction {
            name: other.function_name().to_string(),
        }),
    }
}

/// Updates business metrics after a mutating call.
fn record_outcome(
    metrics: &SharedMetrics,
    ledger: &CarbonLedger,
    result: &Result<Outcome, LedgerError>,
) {
    match result {
        Ok(Outcome::Minted { total_quantity, .. }) => {
            metrics.credits_minted_total.inc_by(*total_quantity);
        }
        Ok(Outcome::Purchased { .. }) => {
            metrics.purchases_settled_total.inc();
        }
        _ => {}
    }
    metrics
        .active_listings
        .set(ledger.active_listing_count() as i64);
}

/// `GET /credits/:id` — credit batch snapshot.
async fn credit_handler(
    State(state): State<AppState>,
    Path(credit_id): Path<u64>,
) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match ledger.credit_info(credit_id) {
        Ok(batch) => (StatusCode::OK, Json(serde_json::json!(batch))).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::from_ledger(&e)),
        )
            .into_response(),
    }
}

/// `GET /balances/:principal` — reported balance (spendable + escrowed).
async fn balance_handler(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    let principal = Principal::from(principal);
    let amount = ledger.balance_of(&principal);
    Json(serde_json::json!({ "principal": principal, "amount": amount }))
}

/// `GET /listings/:credit_id` — listing snapshot, active or settled.
async fn listing_handler(
    State(state): State<AppState>,
    Path(credit_id): Path<u64>,
) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match ledger.listing(credit_id) {
        Ok(listing) => (StatusCode::OK, Json(serde_json::json!(listing))).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::from_ledger(&e)),
        )
            .into_response(),
    }
}

/// `POST /faucet` — deposits settlement currency into a payment account.
///
/// Dev convenience: buyers need funds before they can purchase, and this
/// service has no real payment rail behind it. Disabled with
/// `--disable-faucet`.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> impl IntoResponse {
    if !state.faucet_enabled {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "faucet disabled" })),
        )
            .into_response();
    }

    let principal = Principal::from(req.principal);
    let mut ledger = state.ledger.write().await;
    let new_funds = ledger.payments_mut().deposit(&principal, req.amount);
    tracing::info!(principal = %principal, amount = req.amount, "faucet deposit");
    Json(serde_json::json!({ "principal": principal, "funds": new_funds })).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
