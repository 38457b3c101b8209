use crate::board::{AppliedMove, BoardSession};
use crate::models::PlayerSlot;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub enum GameCommand {
    ApplyMove { from: String, to: String },
    SetCurrentPlayer(Option<PlayerSlot>),
    SetGameOver(bool),
    Reset,
}

#[derive(Debug, Clone)]
pub struct GameView {
    pub fen: String,
    pub game_over: bool,
    pub current_player: Option<PlayerSlot>,
}

struct GameInner {
    session: BoardSession,
    game_over: bool,
    current_player: Option<PlayerSlot>,
}

/// Holds the board the players actually see. Moves mutate this store
/// directly; the chain is only told about captures and game ends after the
/// fact.
#[derive(Clone)]
pub struct GameStateStore {
    inner: Arc<RwLock<GameInner>>,
}

impl GameStateStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(GameInner {
                session: BoardSession::new(),
                game_over: false,
                current_player: None,
            })),
        }
    }

    /// Applies one command. Returns the applied move for an accepted
    /// `ApplyMove`; `None` for a rejected move and for every other command.
    pub async fn apply(&self, command: GameCommand) -> Option<AppliedMove> {
        let mut state = self.inner.write().await;
        match command {
            GameCommand::ApplyMove { from, to } => {
                let applied = state.session.apply_move(&from, &to)?;
                state.game_over = applied.game_over;
                Some(applied)
            }
            GameCommand::SetCurrentPlayer(slot) => {
                state.current_player = slot;
                None
            }
            GameCommand::SetGameOver(value) => {
                state.game_over = value;
                None
            }
            GameCommand::Reset => {
                state.session = BoardSession::new();
                state.game_over = false;
                state.current_player = None;
                None
            }
        }
    }

    pub async fn view(&self) -> GameView {
        let state = self.inner.read().await;
        GameView {
            fen: state.session.fen(),
            game_over: state.game_over,
            current_player: state.current_player,
        }
    }

    #[cfg(test)]
    pub async fn load_position(&self, fen: &str) {
        let mut state = self.inner.write().await;
        state.session = BoardSession::from_fen(fen).expect("test position must parse");
        state.game_over = state.session.game_over();
    }
}
