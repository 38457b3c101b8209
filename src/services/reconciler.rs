use crate::{
    error::Result,
    indexer::event_parser::ChessGameEvent,
    models::{ActionOutcome, GameSnapshot, MoveOutcome, PendingAction, PlayerSlot},
};
use ethers::types::{Address, TxHash, U256};
use ethers::utils::parse_ether;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

use super::contract_mirror::{ContractMirrorStore, MirrorCommand};
use super::game_state::{GameCommand, GameStateStore};
use super::notice_center::{NoticeCenter, NoticeKind};
use super::onchain::{stake_from_base_units, ContractGateway};

const DEFAULT_RECEIPT_POLL_ATTEMPTS: usize = 20;
const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1_500;

/// Keeps the local game state and the contract mirror in step with each
/// other and with the chain. All move gestures and contract write requests
/// funnel through here; the stores themselves never talk to the chain.
#[derive(Clone)]
pub struct Reconciler {
    gateway: Arc<dyn ContractGateway>,
    game: GameStateStore,
    mirror: ContractMirrorStore,
    notices: NoticeCenter,
    last_tx: Arc<RwLock<Option<TxHash>>>,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        game: GameStateStore,
        mirror: ContractMirrorStore,
        notices: NoticeCenter,
    ) -> Self {
        Self {
            gateway,
            game,
            mirror,
            notices,
            last_tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Combined snapshot served to clients.
    pub async fn snapshot(&self) -> GameSnapshot {
        let game = self.game.view().await;
        let mirror = self.mirror.snapshot().await;
        let last_tx = *self.last_tx.read().await;
        GameSnapshot {
            fen: game.fen,
            game_over: game.game_over,
            current_player: game.current_player,
            game_id: mirror.game_id,
            player1_stake: mirror.player1_stake,
            player2_stake: mirror.player2_stake,
            player1_joined: mirror.player1_joined,
            player2_joined: mirror.player2_joined,
            is_creating_game: mirror.is_creating_game,
            is_creating_confirming: mirror.is_creating_confirming,
            is_joining_game: mirror.is_joining_game,
            is_joining_confirming: mirror.is_joining_confirming,
            is_withdrawing: mirror.is_withdrawing,
            is_withdrawing_confirming: mirror.is_withdrawing_confirming,
            wallet_connected: self.gateway.wallet_address().is_some(),
            last_tx_hash: last_tx.map(|h| format!("{:#x}", h)),
        }
    }

    /// Seeds the mirror from the chain at startup. Tracks the latest game
    /// the contract knows about, matching how the game UI picks its game.
    pub async fn bootstrap(&self) -> Result<()> {
        let game_id = self.gateway.latest_game_id().await?;
        self.mirror.apply(MirrorCommand::SetGameId(Some(game_id))).await;
        self.refresh_game_details().await?;
        tracing::info!("Synced contract state for game {}", game_id);
        Ok(())
    }

    /// Re-reads `getGameDetails` for the tracked game and folds the result
    /// into both stores. No-op when no game id is known yet.
    pub async fn refresh_game_details(&self) -> Result<()> {
        let Some(game_id) = self.mirror.snapshot().await.game_id else {
            return Ok(());
        };
        let details = self.gateway.game_details(game_id).await?;

        let player1_stake = stake_from_base_units(details.player1_stake)?;
        let player2_stake = stake_from_base_units(details.player2_stake)?;
        self.mirror
            .apply(MirrorCommand::SetStakes {
                player1: player1_stake,
                player2: player2_stake,
            })
            .await;
        self.mirror
            .apply(MirrorCommand::SetPlayerJoined {
                slot: PlayerSlot::Player1,
                joined: !details.player1.is_zero(),
            })
            .await;
        self.mirror
            .apply(MirrorCommand::SetPlayerJoined {
                slot: PlayerSlot::Player2,
                joined: !details.player2.is_zero(),
            })
            .await;

        // The contract's active flag wins over any local view of game over.
        self.game.apply(GameCommand::SetGameOver(!details.active)).await;

        let current = match self.gateway.wallet_address() {
            Some(addr) if addr == details.player1 => Some(PlayerSlot::Player1),
            Some(addr) if addr == details.player2 => Some(PlayerSlot::Player2),
            _ => None,
        };
        self.game.apply(GameCommand::SetCurrentPlayer(current)).await;
        Ok(())
    }

    // ==================== MOVE HANDLING ====================

    /// Runs a move gesture through the guard chain, the board, and the
    /// after-the-fact contract reports.
    pub async fn handle_move(&self, from: &str, to: &str) -> MoveOutcome {
        let mirror = self.mirror.snapshot().await;
        let game = self.game.view().await;

        if !mirror.player1_joined || !mirror.player2_joined || game.current_player.is_none() {
            self.notices.info(
                NoticeKind::MoveBlocked,
                "Both Player 1 and Player 2 need to join before you can play.",
            );
            return MoveOutcome::rejected("both players must join first", game.game_over);
        }
        if game.game_over {
            self.notices.info(
                NoticeKind::MoveBlocked,
                "The game is over. You can withdraw your stake.",
            );
            return MoveOutcome::rejected("game is over", game.game_over);
        }

        let applied = self
            .game
            .apply(GameCommand::ApplyMove {
                from: from.to_string(),
                to: to.to_string(),
            })
            .await;
        let Some(applied) = applied else {
            self.notices
                .error(NoticeKind::MoveRejected, "Invalid move. Please try again.");
            return MoveOutcome::rejected("illegal move", game.game_over);
        };

        if let Some(piece_code) = applied.captured_piece_code {
            self.report_piece_taken(piece_code).await;
        }
        if applied.game_over {
            self.report_game_end().await;
        }

        MoveOutcome {
            accepted: true,
            reason: None,
            fen: Some(applied.fen),
            captured_piece_code: applied.captured_piece_code,
            game_over: applied.game_over,
            winner: applied.winner.map(|w| w.to_string()),
        }
    }

    /// Tells the contract a piece was captured so it can slash the stake.
    /// Failures are logged and dropped; the local move stands either way.
    async fn report_piece_taken(&self, piece_code: u8) {
        let Some(player) = self.gateway.wallet_address() else {
            return;
        };
        let Some(game_id) = self.mirror.snapshot().await.game_id else {
            return;
        };
        match self.gateway.piece_taken(game_id, player, piece_code).await {
            Ok(tx_hash) => {
                tracing::info!(
                    "Reported captured piece {} for game {}: {:#x}",
                    piece_code,
                    game_id,
                    tx_hash
                );
                self.record_dispatch(tx_hash).await;
            }
            Err(e) => {
                tracing::warn!("Failed to report captured piece for game {}: {}", game_id, e);
            }
        }
    }

    async fn report_game_end(&self) {
        let Some(player) = self.gateway.wallet_address() else {
            return;
        };
        let Some(game_id) = self.mirror.snapshot().await.game_id else {
            return;
        };
        match self.gateway.end_game(game_id, player).await {
            Ok(tx_hash) => {
                tracing::info!("Reported game end for game {}: {:#x}", game_id, tx_hash);
                self.record_dispatch(tx_hash).await;
            }
            Err(e) => {
                tracing::warn!("Failed to report game end for game {}: {}", game_id, e);
            }
        }
    }

    // ==================== CONTRACT WRITES ====================

    pub async fn create_game(&self, stake_input: &str) -> ActionOutcome {
        if self.gateway.wallet_address().is_none() {
            return ActionOutcome::skipped("wallet is not connected");
        }
        let Some(stake) = parse_stake_amount(stake_input) else {
            return ActionOutcome::skipped("stake amount is empty or invalid");
        };
        if self.mirror.snapshot().await.is_creating_game {
            return ActionOutcome::skipped("a create request is already pending");
        }

        self.set_pending(PendingAction::Create, true).await;
        let outcome = match self.gateway.create_game(stake).await {
            Ok(tx_hash) => {
                self.set_confirming(PendingAction::Create, true).await;
                self.record_dispatch(tx_hash).await;
                self.notices.success(
                    NoticeKind::TxSubmitted,
                    "Game creation transaction submitted. Waiting for confirmation...",
                );
                ActionOutcome::dispatched(format!("{:#x}", tx_hash))
            }
            Err(e) => {
                self.notices
                    .error(NoticeKind::TxFailed, format!("Failed to create game: {}", e));
                ActionOutcome::failed(e.to_string())
            }
        };
        // Cleared once the dispatch attempt is over, not when the
        // transaction confirms. The confirming flag covers the gap.
        self.set_pending(PendingAction::Create, false).await;
        outcome
    }

    pub async fn join_game(&self) -> ActionOutcome {
        if self.gateway.wallet_address().is_none() {
            return ActionOutcome::skipped("wallet is not connected");
        }
        let mirror = self.mirror.snapshot().await;
        let Some(game_id) = mirror.game_id else {
            return ActionOutcome::skipped("no game is known yet");
        };
        if mirror.is_joining_game {
            return ActionOutcome::skipped("a join request is already pending");
        }

        self.set_pending(PendingAction::Join, true).await;
        let outcome = match self.gateway.join_game(game_id).await {
            Ok(tx_hash) => {
                self.set_confirming(PendingAction::Join, true).await;
                self.record_dispatch(tx_hash).await;
                self.notices.success(
                    NoticeKind::TxSubmitted,
                    "Join game transaction submitted. Waiting for confirmation...",
                );
                ActionOutcome::dispatched(format!("{:#x}", tx_hash))
            }
            Err(e) => {
                self.notices
                    .error(NoticeKind::TxFailed, format!("Failed to join game: {}", e));
                ActionOutcome::failed(e.to_string())
            }
        };
        self.set_pending(PendingAction::Join, false).await;
        outcome
    }

    pub async fn withdraw(&self) -> ActionOutcome {
        if self.gateway.wallet_address().is_none() {
            return ActionOutcome::skipped("wallet is not connected");
        }
        let mirror = self.mirror.snapshot().await;
        let Some(game_id) = mirror.game_id else {
            return ActionOutcome::skipped("no game is known yet");
        };
        if mirror.is_withdrawing {
            return ActionOutcome::skipped("a withdraw request is already pending");
        }

        self.set_pending(PendingAction::Withdraw, true).await;
        let outcome = match self.gateway.withdraw(game_id).await {
            Ok(tx_hash) => {
                self.set_confirming(PendingAction::Withdraw, true).await;
                self.record_dispatch(tx_hash).await;
                self.notices.success(
                    NoticeKind::TxSubmitted,
                    "Withdrawal transaction submitted. Waiting for confirmation...",
                );
                ActionOutcome::dispatched(format!("{:#x}", tx_hash))
            }
            Err(e) => {
                self.notices
                    .error(NoticeKind::TxFailed, format!("Failed to withdraw: {}", e));
                ActionOutcome::failed(e.to_string())
            }
        };
        self.set_pending(PendingAction::Withdraw, false).await;
        outcome
    }

    /// ERC20 approval for the stake. The spender defaults to the chess
    /// contract when none is given.
    pub async fn approve(&self, amount_input: &str, spender: Option<&str>) -> ActionOutcome {
        if self.gateway.wallet_address().is_none() {
            return ActionOutcome::skipped("wallet is not connected");
        }
        let Some(amount) = parse_stake_amount(amount_input) else {
            return ActionOutcome::skipped("approval amount is empty or invalid");
        };
        let spender = match spender {
            Some(raw) => match Address::from_str(raw) {
                Ok(addr) => addr,
                Err(_) => return ActionOutcome::skipped("spender is not a valid address"),
            },
            None => self.gateway.contract_address(),
        };

        match self.gateway.approve(spender, amount).await {
            Ok(tx_hash) => {
                self.record_dispatch(tx_hash).await;
                self.notices.success(
                    NoticeKind::TxSubmitted,
                    "Approve transaction submitted. Waiting for confirmation...",
                );
                ActionOutcome::dispatched(format!("{:#x}", tx_hash))
            }
            Err(e) => {
                self.notices
                    .error(NoticeKind::TxFailed, format!("Failed to approve: {}", e));
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    /// Starts a fresh board. The contract mirror is left alone; resetting
    /// on-chain state means creating a new game.
    pub async fn reset_session(&self) {
        self.game.apply(GameCommand::Reset).await;
        tracing::info!("Local game session reset");
    }

    // ==================== EVENTS ====================

    /// Folds a contract event into the stores and surfaces the matching
    /// notice. Refresh failures are logged, never fatal.
    ///
    /// The watcher's first scan backfills history, so events from earlier
    /// games can arrive here. Anything not about the tracked game is
    /// dropped: the tracked id only moves forward, and joins, captures and
    /// endings must carry the id itself.
    pub async fn handle_event(&self, event: ChessGameEvent) {
        let tracked = self.mirror.snapshot().await.game_id;
        match event {
            ChessGameEvent::GameCreated { game_id } => {
                if let Some(current) = tracked {
                    if game_id < current {
                        tracing::debug!(
                            "Ignoring replayed GameCreated({}) behind tracked game {}",
                            game_id,
                            current
                        );
                        return;
                    }
                }
                self.mirror.apply(MirrorCommand::SetGameId(Some(game_id))).await;
                self.mirror
                    .apply(MirrorCommand::SetPlayerJoined {
                        slot: PlayerSlot::Player1,
                        joined: true,
                    })
                    .await;
                self.notices.success(
                    NoticeKind::GameCreated,
                    "Game created, waiting for Player 2 to join",
                );
            }
            ChessGameEvent::PlayerJoined { game_id, .. } => {
                if tracked != Some(game_id) {
                    tracing::debug!("Ignoring PlayerJoined for untracked game {}", game_id);
                    return;
                }
                self.mirror
                    .apply(MirrorCommand::SetPlayerJoined {
                        slot: PlayerSlot::Player2,
                        joined: true,
                    })
                    .await;
                self.notices
                    .success(NoticeKind::PlayerJoined, "Player 2 has joined the game!");
                if let Err(e) = self.refresh_game_details().await {
                    tracing::warn!("Refresh after PlayerJoined({}) failed: {}", game_id, e);
                }
            }
            ChessGameEvent::PieceTaken { game_id, .. } => {
                if tracked != Some(game_id) {
                    tracing::debug!("Ignoring PieceTaken for untracked game {}", game_id);
                    return;
                }
                self.notices.info(
                    NoticeKind::PieceTaken,
                    "A piece has been captured! Stakes updated.",
                );
                if let Err(e) = self.refresh_game_details().await {
                    tracing::warn!("Refresh after PieceTaken({}) failed: {}", game_id, e);
                }
            }
            ChessGameEvent::GameEnded { game_id, .. } => {
                if tracked != Some(game_id) {
                    tracing::debug!("Ignoring GameEnded for untracked game {}", game_id);
                    return;
                }
                self.game.apply(GameCommand::SetGameOver(true)).await;
                self.notices.success(
                    NoticeKind::GameEnded,
                    "Game has ended! You can now withdraw your stake.",
                );
            }
        }
    }

    // ==================== RECEIPT TRACKING ====================

    /// Remembers the newest dispatched transaction and spawns a watcher
    /// for its receipt. Only the latest hash is ever acted on.
    async fn record_dispatch(&self, tx_hash: TxHash) {
        *self.last_tx.write().await = Some(tx_hash);
        let this = self.clone();
        tokio::spawn(async move {
            this.watch_receipt(tx_hash).await;
        });
    }

    async fn watch_receipt(&self, tx_hash: TxHash) {
        let poll_attempts = std::env::var("RECEIPT_POLL_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_RECEIPT_POLL_ATTEMPTS);
        let poll_interval_ms = std::env::var("RECEIPT_POLL_INTERVAL_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_RECEIPT_POLL_INTERVAL_MS);

        for attempt in 0..poll_attempts {
            match self.gateway.receipt_status(tx_hash).await {
                Ok(Some(success)) => {
                    if *self.last_tx.read().await != Some(tx_hash) {
                        tracing::debug!("Receipt for superseded tx {:#x} ignored", tx_hash);
                        return;
                    }
                    self.clear_confirming_flags().await;
                    if let Err(e) = self.refresh_game_details().await {
                        tracing::warn!("Refresh after receipt of {:#x} failed: {}", tx_hash, e);
                    }
                    if success {
                        self.notices
                            .success(NoticeKind::TxConfirmed, "Transaction confirmed!");
                    } else {
                        tracing::warn!("Transaction {:#x} reverted", tx_hash);
                    }
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        "Receipt poll {}/{} for {:#x} failed: {}",
                        attempt + 1,
                        poll_attempts,
                        tx_hash,
                        e
                    );
                }
            }
            if attempt + 1 < poll_attempts {
                sleep(Duration::from_millis(poll_interval_ms)).await;
            }
        }

        if *self.last_tx.read().await != Some(tx_hash) {
            return;
        }
        tracing::warn!(
            "No receipt for {:#x} after {} attempts; clearing confirming flags",
            tx_hash,
            poll_attempts
        );
        self.clear_confirming_flags().await;
    }

    async fn clear_confirming_flags(&self) {
        // The UI tracks one transaction at a time, so a receipt settles
        // every confirming flag at once.
        for action in PendingAction::ALL {
            self.set_confirming(action, false).await;
        }
    }

    async fn set_pending(&self, action: PendingAction, value: bool) {
        self.mirror
            .apply(MirrorCommand::SetPendingFlag { action, value })
            .await;
    }

    async fn set_confirming(&self, action: PendingAction, value: bool) {
        self.mirror
            .apply(MirrorCommand::SetConfirmingFlag { action, value })
            .await;
    }
}

/// Parses a user-supplied token amount into 18-decimal base units.
/// Empty, negative, and malformed inputs are all rejected.
fn parse_stake_amount(input: &str) -> Option<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let amount = Decimal::from_str(trimmed).ok()?;
    if amount.is_sign_negative() {
        return None;
    }
    parse_ether(amount).ok()
}
