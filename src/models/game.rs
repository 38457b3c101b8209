use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==================== PLAYERS ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl ToString for PlayerSlot {
    fn to_string(&self) -> String {
        match self {
            PlayerSlot::Player1 => "player1".to_string(),
            PlayerSlot::Player2 => "player2".to_string(),
        }
    }
}

/// Contract writes that carry an in-flight flag in the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Create,
    Join,
    Withdraw,
}

impl PendingAction {
    pub const ALL: [PendingAction; 3] =
        [PendingAction::Create, PendingAction::Join, PendingAction::Withdraw];
}

// ==================== SNAPSHOT ====================
/// Combined view over the local game state and the contract mirror.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub fen: String,
    pub game_over: bool,
    pub current_player: Option<PlayerSlot>,
    pub game_id: Option<u64>,
    pub player1_stake: Decimal,
    pub player2_stake: Decimal,
    pub player1_joined: bool,
    pub player2_joined: bool,
    pub is_creating_game: bool,
    pub is_creating_confirming: bool,
    pub is_joining_game: bool,
    pub is_joining_confirming: bool,
    pub is_withdrawing: bool,
    pub is_withdrawing_confirming: bool,
    pub wallet_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tx_hash: Option<String>,
}

// ==================== OUTCOMES ====================
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_piece_code: Option<u8>,
    pub game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl MoveOutcome {
    pub fn rejected(reason: &str, game_over: bool) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.to_string()),
            fen: None,
            captured_piece_code: None,
            game_over,
            winner: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Dispatched,
    Skipped,
    Failed,
}

/// Result of a contract write request. `Skipped` means a guard decided the
/// request is currently not actionable; no transaction was sent.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl ActionOutcome {
    pub fn dispatched(tx_hash: String) -> Self {
        Self {
            status: ActionStatus::Dispatched,
            reason: None,
            tx_hash: Some(tx_hash),
        }
    }

    pub fn skipped(reason: &str) -> Self {
        Self {
            status: ActionStatus::Skipped,
            reason: Some(reason.to_string()),
            tx_hash: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            status: ActionStatus::Failed,
            reason: Some(message),
            tx_hash: None,
        }
    }
}

// ==================== NOTICES ====================
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: String,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ==================== REQUEST PAYLOADS ====================
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub stake: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub amount: String,
    #[serde(default)]
    pub spender: Option<String>,
}

// ==================== API RESPONSE ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, "ok");
    }

    #[test]
    fn action_outcome_constructors() {
        let dispatched = ActionOutcome::dispatched("0xabc".to_string());
        assert_eq!(dispatched.status, ActionStatus::Dispatched);
        assert_eq!(dispatched.tx_hash.as_deref(), Some("0xabc"));

        let skipped = ActionOutcome::skipped("wallet is not connected");
        assert_eq!(skipped.status, ActionStatus::Skipped);
        assert!(skipped.tx_hash.is_none());
    }

    #[test]
    fn player_slot_serializes_lowercase() {
        let json = serde_json::to_string(&PlayerSlot::Player1).unwrap();
        assert_eq!(json, "\"player1\"");
    }
}
