/// Application constants

// Piece type codes reported to the contract on captures
pub const PIECE_CODE_PAWN: u8 = 1;
pub const PIECE_CODE_KNIGHT: u8 = 2;
pub const PIECE_CODE_BISHOP: u8 = 3;
pub const PIECE_CODE_ROOK: u8 = 4;
pub const PIECE_CODE_QUEEN: u8 = 5;
pub const PIECE_CODE_KING: u8 = 6;

// API version
pub const API_VERSION: &str = "v1";

// WebSocket configuration
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const WS_CLIENT_TIMEOUT_SECS: u64 = 60;

// Background service intervals
pub const WATCHER_INTERVAL_SECS: u64 = 5;
