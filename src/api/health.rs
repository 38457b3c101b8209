use super::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub rpc: String,
    pub wallet: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let rpc_status = if rpc_responds(&state.config.ethereum_rpc_url).await {
        "connected".to_string()
    } else {
        "disconnected".to_string()
    };

    let wallet_status = if state.reconciler.snapshot().await.wallet_connected {
        "configured".to_string()
    } else {
        "not_configured".to_string()
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rpc: rpc_status,
        wallet: wallet_status,
    })
}

// Cheap liveness probe against the RPC node, independent of ethers.
async fn rpc_responds(rpc_url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };

    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_blockNumber",
        "params": []
    });

    match client.post(rpc_url).json(&body).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
