use crate::models::Notice;
use tokio::sync::broadcast;

const NOTICE_CHANNEL_CAPACITY: usize = 100;

/// Fan-out hub for user-facing notices. Every WebSocket client subscribes to
/// the same broadcast channel; emitting never blocks and never fails when no
/// client is listening.
#[derive(Clone)]
pub struct NoticeCenter {
    tx: broadcast::Sender<Notice>,
}

impl NoticeCenter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn success(&self, kind: NoticeKind, message: impl Into<String>) {
        self.emit(kind, NoticeLevel::Success, message.into());
    }

    pub fn info(&self, kind: NoticeKind, message: impl Into<String>) {
        self.emit(kind, NoticeLevel::Info, message.into());
    }

    pub fn error(&self, kind: NoticeKind, message: impl Into<String>) {
        self.emit(kind, NoticeLevel::Error, message.into());
    }

    fn emit(&self, kind: NoticeKind, level: NoticeLevel, message: String) {
        let notice = Notice {
            kind: kind.to_string(),
            level: level.to_string(),
            message,
            timestamp: chrono::Utc::now(),
        };
        tracing::debug!("Notice {}: {}", notice.kind, notice.message);
        let _ = self.tx.send(notice);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NoticeKind {
    GameCreated,
    PlayerJoined,
    PieceTaken,
    GameEnded,
    TxSubmitted,
    TxConfirmed,
    TxFailed,
    MoveBlocked,
    MoveRejected,
}

impl ToString for NoticeKind {
    fn to_string(&self) -> String {
        match self {
            Self::GameCreated => "game.created",
            Self::PlayerJoined => "player.joined",
            Self::PieceTaken => "piece.taken",
            Self::GameEnded => "game.ended",
            Self::TxSubmitted => "tx.submitted",
            Self::TxConfirmed => "tx.confirmed",
            Self::TxFailed => "tx.failed",
            Self::MoveBlocked => "move.blocked",
            Self::MoveRejected => "move.rejected",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Copy)]
enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl ToString for NoticeLevel {
    fn to_string(&self) -> String {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
        .to_string()
    }
}
