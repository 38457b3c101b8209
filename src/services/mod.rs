// All service modules
pub mod contract_mirror;
pub mod event_watcher;
pub mod game_state;
pub mod notice_center;
pub mod onchain;
pub mod reconciler;

// Re-export for convenience
pub use contract_mirror::ContractMirrorStore;
pub use event_watcher::EventWatcher;
pub use game_state::GameStateStore;
pub use notice_center::NoticeCenter;
pub use reconciler::Reconciler;

use onchain::OnchainReader;
use std::sync::Arc;

// Internal helper that checks conditions for `is_env_flag_enabled`.
fn is_env_flag_enabled(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        })
        .unwrap_or(false)
}

/// Start all background services
pub async fn start_background_services(reconciler: Reconciler, reader: OnchainReader) {
    tracing::info!("Starting background services...");

    // Seed the mirror before the watcher starts feeding deltas.
    if let Err(e) = reconciler.bootstrap().await {
        tracing::warn!("Initial contract sync failed: {}", e);
    }

    let enable_event_watcher = if std::env::var("ENABLE_EVENT_WATCHER").is_ok() {
        is_env_flag_enabled("ENABLE_EVENT_WATCHER")
    } else {
        true
    };
    if enable_event_watcher {
        let event_watcher = Arc::new(EventWatcher::new(reader, reconciler.clone()));
        event_watcher.clone().start().await;
    } else {
        tracing::warn!("Event watcher disabled via ENABLE_EVENT_WATCHER");
    }

    tracing::info!("All background services started successfully");
}
