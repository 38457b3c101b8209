use crate::{
    config::Config,
    error::{AppError, Result},
};
use async_trait::async_trait;
use ethers::{
    abi::Detokenize,
    contract::ContractCall,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Filter, Log, TransactionReceipt, TxHash, U256},
    utils::format_ether,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Tuple returned by `getGameDetails`, decoded into named fields. A zero
/// address means the slot has not been taken yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameDetails {
    pub player1: Address,
    pub player2: Address,
    pub player1_stake: U256,
    pub player2_stake: U256,
    pub active: bool,
}

/// Everything the reconciler needs from the chain. Kept behind a trait so
/// the reconciliation logic can run against a stub in tests.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    fn wallet_address(&self) -> Option<Address>;
    fn contract_address(&self) -> Address;

    async fn latest_game_id(&self) -> Result<u64>;
    async fn game_details(&self, game_id: u64) -> Result<GameDetails>;

    async fn create_game(&self, stake: U256) -> Result<TxHash>;
    async fn join_game(&self, game_id: u64) -> Result<TxHash>;
    async fn piece_taken(&self, game_id: u64, player: Address, piece_code: u8) -> Result<TxHash>;
    async fn end_game(&self, game_id: u64, player: Address) -> Result<TxHash>;
    async fn withdraw(&self, game_id: u64) -> Result<TxHash>;
    async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash>;

    /// `Ok(Some(true))` mined and successful, `Ok(Some(false))` reverted,
    /// `Ok(None)` not mined yet.
    async fn receipt_status(&self, tx_hash: TxHash) -> Result<Option<bool>>;
}

pub struct OnchainInvoker {
    game: ChessGame<SignerClient>,
    token: StakeToken<SignerClient>,
    wallet_address: Address,
}

#[derive(Clone)]
pub struct OnchainReader {
    provider: Arc<Provider<Http>>,
    contract_address: Address,
}

impl OnchainInvoker {
    /// Returns `Ok(None)` when no private key is configured; the service
    /// then runs read-only.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(key) = &config.wallet_private_key else {
            return Ok(None);
        };

        let provider = Provider::<Http>::try_from(&config.ethereum_rpc_url)
            .map_err(|e| AppError::Internal(format!("Invalid EVM RPC URL: {}", e)))?;
        let wallet = key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| AppError::Internal(format!("Invalid wallet private key: {}", e)))?
            .with_chain_id(config.chain_id);
        let wallet_address = wallet.address();

        let game_address = Address::from_str(&config.chess_contract_address)
            .map_err(|_| AppError::Internal("Invalid chess contract address".to_string()))?;
        let token_address = Address::from_str(&config.stake_token_address)
            .map_err(|_| AppError::Internal("Invalid stake token address".to_string()))?;

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Ok(Some(Self {
            game: ChessGame::new(game_address, client.clone()),
            token: StakeToken::new(token_address, client),
            wallet_address,
        }))
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet_address
    }

    pub async fn create_game(&self, stake: U256) -> Result<TxHash> {
        self.dispatch(self.game.create_game(stake)).await
    }

    pub async fn join_game(&self, game_id: u64) -> Result<TxHash> {
        self.dispatch(self.game.join_game(U256::from(game_id))).await
    }

    pub async fn piece_taken(&self, game_id: u64, player: Address, piece_code: u8) -> Result<TxHash> {
        self.dispatch(self.game.piece_taken(U256::from(game_id), player, piece_code))
            .await
    }

    pub async fn end_game(&self, game_id: u64, player: Address) -> Result<TxHash> {
        self.dispatch(self.game.end_game(U256::from(game_id), player))
            .await
    }

    pub async fn withdraw(&self, game_id: u64) -> Result<TxHash> {
        self.dispatch(self.game.withdraw(U256::from(game_id))).await
    }

    pub async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash> {
        self.dispatch(self.token.approve(spender, amount)).await
    }

    async fn dispatch<D: Detokenize>(&self, call: ContractCall<SignerClient, D>) -> Result<TxHash> {
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(*pending)
    }
}

impl OnchainReader {
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(&config.ethereum_rpc_url)
            .map_err(|e| AppError::Internal(format!("Invalid EVM RPC URL: {}", e)))?;
        let contract_address = Address::from_str(&config.chess_contract_address)
            .map_err(|_| AppError::Internal("Invalid chess contract address".to_string()))?;
        Ok(Self {
            provider: Arc::new(provider),
            contract_address,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub async fn block_number(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(block.as_u64())
    }

    /// All logs emitted by the chess contract in the block range, inclusive.
    pub async fn game_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.contract_address)
            .from_block(from_block)
            .to_block(to_block);
        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    }

    pub async fn latest_game_id(&self) -> Result<u64> {
        let contract = ChessGame::new(self.contract_address, self.provider.clone());
        let id = contract
            .get_latest_game_id()
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        u256_to_game_id(id)
    }

    pub async fn game_details(&self, game_id: u64) -> Result<GameDetails> {
        let contract = ChessGame::new(self.contract_address, self.provider.clone());
        let (player1, player2, player1_stake, player2_stake, active) = contract
            .get_game_details(U256::from(game_id))
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(GameDetails {
            player1,
            player2,
            player1_stake,
            player2_stake,
            active,
        })
    }

    pub async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    }
}

/// Production gateway pairing the read path with the optional signer.
pub struct OnchainGateway {
    reader: OnchainReader,
    invoker: Option<OnchainInvoker>,
}

impl OnchainGateway {
    pub fn new(reader: OnchainReader, invoker: Option<OnchainInvoker>) -> Self {
        Self { reader, invoker }
    }

    fn invoker(&self) -> Result<&OnchainInvoker> {
        self.invoker.as_ref().ok_or(AppError::WalletNotConfigured)
    }
}

#[async_trait]
impl ContractGateway for OnchainGateway {
    fn wallet_address(&self) -> Option<Address> {
        self.invoker.as_ref().map(|i| i.wallet_address())
    }

    fn contract_address(&self) -> Address {
        self.reader.contract_address()
    }

    async fn latest_game_id(&self) -> Result<u64> {
        self.reader.latest_game_id().await
    }

    async fn game_details(&self, game_id: u64) -> Result<GameDetails> {
        self.reader.game_details(game_id).await
    }

    async fn create_game(&self, stake: U256) -> Result<TxHash> {
        self.invoker()?.create_game(stake).await
    }

    async fn join_game(&self, game_id: u64) -> Result<TxHash> {
        self.invoker()?.join_game(game_id).await
    }

    async fn piece_taken(&self, game_id: u64, player: Address, piece_code: u8) -> Result<TxHash> {
        self.invoker()?.piece_taken(game_id, player, piece_code).await
    }

    async fn end_game(&self, game_id: u64, player: Address) -> Result<TxHash> {
        self.invoker()?.end_game(game_id, player).await
    }

    async fn withdraw(&self, game_id: u64) -> Result<TxHash> {
        self.invoker()?.withdraw(game_id).await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash> {
        self.invoker()?.approve(spender, amount).await
    }

    async fn receipt_status(&self, tx_hash: TxHash) -> Result<Option<bool>> {
        let receipt = self.reader.transaction_receipt(tx_hash).await?;
        Ok(receipt.map(|r| r.status.map(|s| s.as_u64() == 1).unwrap_or(true)))
    }
}

pub fn u256_to_game_id(value: U256) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(AppError::Internal(format!(
            "Game id {} exceeds u64 range",
            value
        )));
    }
    Ok(value.as_u64())
}

/// Converts an 18-decimal base-unit amount into a display stake.
pub fn stake_from_base_units(value: U256) -> Result<Decimal> {
    Decimal::from_str(&format_ether(value))
        .map_err(|e| AppError::Internal(format!("Stake amount out of range: {}", e)))
}

ethers::contract::abigen!(
    ChessGame,
    r#"[
        function createGame(uint256 stake)
        function joinGame(uint256 gameId)
        function pieceTaken(uint256 gameId, address player, uint8 pieceType)
        function endGame(uint256 gameId, address player)
        function withdraw(uint256 gameId)
        function getLatestGameId() view returns (uint256)
        function getGameDetails(uint256 gameId) view returns (address, address, uint256, uint256, bool)
        event GameCreated(uint256 indexed gameId)
        event PlayerJoined(uint256 indexed gameId, address player)
        event PieceTaken(uint256 indexed gameId, address player, uint8 pieceType)
        event GameEnded(uint256 indexed gameId, address player)
    ]"#
);

ethers::contract::abigen!(
    StakeToken,
    r#"[
        function approve(address spender, uint256 amount) returns (bool)
        function allowance(address owner, address spender) view returns (uint256)
    ]"#
);
