use crate::models::{PendingAction, PlayerSlot};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cached view of the on-chain game the backend is tracking. Everything in
/// here is derived from contract reads and events; the chain stays the
/// source of truth.
#[derive(Debug, Clone, Default)]
pub struct MirrorSnapshot {
    pub game_id: Option<u64>,
    pub player1_stake: Decimal,
    pub player2_stake: Decimal,
    pub player1_joined: bool,
    pub player2_joined: bool,
    pub is_creating_game: bool,
    pub is_joining_game: bool,
    pub is_withdrawing: bool,
    pub is_creating_confirming: bool,
    pub is_joining_confirming: bool,
    pub is_withdrawing_confirming: bool,
}

#[derive(Debug, Clone)]
pub enum MirrorCommand {
    SetGameId(Option<u64>),
    SetStakes { player1: Decimal, player2: Decimal },
    SetPlayerJoined { slot: PlayerSlot, joined: bool },
    SetPendingFlag { action: PendingAction, value: bool },
    SetConfirmingFlag { action: PendingAction, value: bool },
}

#[derive(Clone)]
pub struct ContractMirrorStore {
    inner: Arc<RwLock<MirrorSnapshot>>,
}

impl ContractMirrorStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MirrorSnapshot::default())),
        }
    }

    pub async fn apply(&self, command: MirrorCommand) {
        let mut state = self.inner.write().await;
        match command {
            MirrorCommand::SetGameId(game_id) => {
                if state.game_id != game_id {
                    state.game_id = game_id;
                    // Joined flags belong to the previous game
                    state.player1_joined = false;
                    state.player2_joined = false;
                }
            }
            MirrorCommand::SetStakes { player1, player2 } => {
                state.player1_stake = player1;
                state.player2_stake = player2;
            }
            MirrorCommand::SetPlayerJoined { slot, joined } => {
                let flag = match slot {
                    PlayerSlot::Player1 => &mut state.player1_joined,
                    PlayerSlot::Player2 => &mut state.player2_joined,
                };
                // Join flags only move forward within a game; a stale read
                // must not un-join a player.
                if !joined && *flag {
                    tracing::debug!("Ignoring stale joined=false for {}", slot.to_string());
                    return;
                }
                *flag = joined;
            }
            MirrorCommand::SetPendingFlag { action, value } => {
                let flag = match action {
                    PendingAction::Create => &mut state.is_creating_game,
                    PendingAction::Join => &mut state.is_joining_game,
                    PendingAction::Withdraw => &mut state.is_withdrawing,
                };
                *flag = value;
            }
            MirrorCommand::SetConfirmingFlag { action, value } => {
                let flag = match action {
                    PendingAction::Create => &mut state.is_creating_confirming,
                    PendingAction::Join => &mut state.is_joining_confirming,
                    PendingAction::Withdraw => &mut state.is_withdrawing_confirming,
                };
                *flag = value;
            }
        }
    }

    pub async fn snapshot(&self) -> MirrorSnapshot {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_flag_ignores_stale_false() {
        let store = ContractMirrorStore::new();
        store.apply(MirrorCommand::SetGameId(Some(3))).await;
        store
            .apply(MirrorCommand::SetPlayerJoined {
                slot: PlayerSlot::Player2,
                joined: true,
            })
            .await;
        store
            .apply(MirrorCommand::SetPlayerJoined {
                slot: PlayerSlot::Player2,
                joined: false,
            })
            .await;
        assert!(store.snapshot().await.player2_joined);
    }

    #[tokio::test]
    async fn changed_game_id_resets_joined_flags() {
        let store = ContractMirrorStore::new();
        store.apply(MirrorCommand::SetGameId(Some(3))).await;
        store
            .apply(MirrorCommand::SetPlayerJoined {
                slot: PlayerSlot::Player1,
                joined: true,
            })
            .await;
        store.apply(MirrorCommand::SetGameId(Some(4))).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.game_id, Some(4));
        assert!(!snapshot.player1_joined);
        assert!(!snapshot.player2_joined);
    }

    #[tokio::test]
    async fn rewriting_same_game_id_keeps_joined_flags() {
        let store = ContractMirrorStore::new();
        store.apply(MirrorCommand::SetGameId(Some(3))).await;
        store
            .apply(MirrorCommand::SetPlayerJoined {
                slot: PlayerSlot::Player1,
                joined: true,
            })
            .await;
        store.apply(MirrorCommand::SetGameId(Some(3))).await;
        assert!(store.snapshot().await.player1_joined);
    }

    #[tokio::test]
    async fn pending_and_confirming_flags_toggle_independently() {
        let store = ContractMirrorStore::new();
        store
            .apply(MirrorCommand::SetPendingFlag {
                action: PendingAction::Create,
                value: true,
            })
            .await;
        store
            .apply(MirrorCommand::SetConfirmingFlag {
                action: PendingAction::Create,
                value: true,
            })
            .await;
        store
            .apply(MirrorCommand::SetPendingFlag {
                action: PendingAction::Create,
                value: false,
            })
            .await;

        let snapshot = store.snapshot().await;
        assert!(!snapshot.is_creating_game);
        assert!(snapshot.is_creating_confirming);
        assert!(!snapshot.is_joining_game);
    }

    #[tokio::test]
    async fn set_stakes_overwrites_both_sides() {
        let store = ContractMirrorStore::new();
        store
            .apply(MirrorCommand::SetStakes {
                player1: Decimal::new(5, 1),
                player2: Decimal::new(5, 1),
            })
            .await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.player1_stake, Decimal::new(5, 1));
        assert_eq!(snapshot.player2_stake, Decimal::new(5, 1));
    }
}
