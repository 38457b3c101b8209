// src/models/mod.rs
pub mod game;

// Re-export commonly used types from game.rs so other modules can use `crate::models::X`
pub use game::{
    ActionOutcome,
    ActionStatus,
    ApiResponse,
    ApproveRequest,
    CreateGameRequest,
    GameSnapshot,
    MoveOutcome,
    MoveRequest,
    Notice,
    PendingAction,
    PlayerSlot,
};
