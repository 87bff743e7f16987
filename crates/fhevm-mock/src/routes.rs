//! HTTP routes for the mock gateway

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::Address;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use fhevm_client::gateway::{DecryptResponse, HealthResponse, KeysResponse, PublicDecryptRequest};
use fhevm_client::UserDecryptRequest;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::error::Result;
use crate::metrics::{outcome_of, record_request};
use crate::store::CiphertextStore;

/// State shared by every route
pub struct GatewayState {
    pub store: Arc<CiphertextStore>,
    pub chain_id: u64,
    pub public_key: String,
    pub acl_address: Option<Address>,
    pub enforce_acl: bool,
    pub prometheus: Option<PrometheusHandle>,
}

pub type SharedState = Arc<GatewayState>;

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        chain_id: Some(state.chain_id),
    })
}

async fn keys(State(state): State<SharedState>) -> Json<KeysResponse> {
    Json(KeysResponse {
        public_key: state.public_key.clone(),
        acl_address: state.acl_address,
        chain_id: state.chain_id,
    })
}

async fn reencrypt(
    State(state): State<SharedState>,
    Json(request): Json<UserDecryptRequest>,
) -> Result<Json<DecryptResponse>> {
    let start = Instant::now();
    let result = state
        .store
        .user_decrypt(&request, state.chain_id, state.enforce_acl);
    record_request("reencrypt", outcome_of(&result), start.elapsed());

    match &result {
        Ok(_) => tracing::debug!(user = %request.user_address, "Reencryption served"),
        Err(e) => tracing::info!(user = %request.user_address, error = %e, "Reencryption refused"),
    }
    Ok(Json(DecryptResponse { value: result? }))
}

async fn public_decrypt(
    State(state): State<SharedState>,
    Json(request): Json<PublicDecryptRequest>,
) -> Result<Json<DecryptResponse>> {
    let start = Instant::now();
    let result = state
        .store
        .public_decrypt(request.contract_address, request.handle);
    record_request("public_decrypt", outcome_of(&result), start.elapsed());
    Ok(Json(DecryptResponse { value: result? }))
}

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
}

/// Minimal JSON-RPC endpoint so wallets can identify the chain
async fn rpc(State(state): State<SharedState>, Json(request): Json<RpcRequest>) -> Json<Value> {
    let result = match request.method.as_str() {
        "eth_chainId" => json!(format!("0x{:x}", state.chain_id)),
        "net_version" => json!(state.chain_id.to_string()),
        other => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "error": { "code": -32601, "message": format!("Method not found: {}", other) },
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": request.id, "result": result }))
}

async fn metrics(State(state): State<SharedState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/keys", get(keys))
        .route("/reencrypt", post(reencrypt))
        .route("/public-decrypt", post(public_decrypt))
        .route("/rpc", post(rpc))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
