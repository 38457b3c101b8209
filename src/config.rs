use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub ethereum_rpc_url: String,
    pub chain_id: u64,

    // Contract Addresses
    pub chess_contract_address: String,
    pub stake_token_address: String,

    // Backend Signing
    pub wallet_private_key: Option<String>,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            ethereum_rpc_url: env::var("ETHEREUM_RPC_URL")?,
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "11155111".to_string())
                .parse()?,

            chess_contract_address: env::var("CHESS_CONTRACT_ADDRESS")?,
            stake_token_address: env::var("STAKE_TOKEN_ADDRESS")?,

            wallet_private_key: env::var("WALLET_PRIVATE_KEY").ok(),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ethereum_rpc_url.trim().is_empty() {
            anyhow::bail!("ETHEREUM_RPC_URL is empty");
        }
        if url::Url::parse(&self.ethereum_rpc_url).is_err() {
            anyhow::bail!("ETHEREUM_RPC_URL is not a valid URL");
        }

        if !is_hex_address(&self.chess_contract_address) {
            anyhow::bail!("CHESS_CONTRACT_ADDRESS is not a 20-byte hex address");
        }
        if !is_hex_address(&self.stake_token_address) {
            anyhow::bail!("STAKE_TOKEN_ADDRESS is not a 20-byte hex address");
        }

        if self.chess_contract_address.starts_with("0x0000") {
            tracing::warn!("Using placeholder chess contract address");
        }
        if self.stake_token_address.starts_with("0x0000") {
            tracing::warn!("Using placeholder stake token address");
        }

        match &self.wallet_private_key {
            Some(key) => {
                let stripped = key.trim().trim_start_matches("0x");
                if hex::decode(stripped).map(|b| b.len() != 32).unwrap_or(true) {
                    anyhow::bail!("WALLET_PRIVATE_KEY is not a 32-byte hex key");
                }
            }
            None => {
                tracing::warn!("WALLET_PRIVATE_KEY is not set; contract writes are disabled");
            }
        }

        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        if self.environment == "development" || self.environment == "testnet" {
            return true;
        }
        // Goerli, Sepolia, Arbitrum Sepolia, Base Sepolia
        matches!(self.chain_id, 5 | 11155111 | 421614 | 84532)
    }
}

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|h| h.len() == 40 && hex::decode(h).is_ok())
        .unwrap_or(false)
}
