use crate::{constants::WATCHER_INTERVAL_SECS, error::Result, indexer::event_parser::EventParser};
use std::sync::Arc;
use tokio::time::{interval, sleep, Duration};

use super::onchain::OnchainReader;
use super::reconciler::Reconciler;

const WATCHER_DEFAULT_INITIAL_BACKFILL_BLOCKS: u64 = 128;
const WATCHER_DEFAULT_MAX_BLOCKS_PER_TICK: u64 = 32;
const WATCHER_TRANSIENT_BACKOFF_MAX_SECS: u64 = 300;

// Internal helper that checks conditions for `is_transient_rpc_error`.
fn is_transient_rpc_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("error decoding response body")
        || lower.contains("too many requests")
        || lower.contains("429")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("gateway")
        || lower.contains("temporarily unavailable")
        || lower.contains("connection reset")
        || lower.contains("eof while parsing")
}

// Internal helper that supports `transient_backoff_secs` operations.
fn transient_backoff_secs(failures: u32) -> u64 {
    let exponent = failures.saturating_sub(1).min(5);
    let multiplier = 1_u64 << exponent;
    let candidate = WATCHER_INTERVAL_SECS.saturating_mul(multiplier);
    candidate.clamp(WATCHER_INTERVAL_SECS, WATCHER_TRANSIENT_BACKOFF_MAX_SECS)
}

// Internal helper that computes the block window for one scan tick.
fn scan_window(
    previous_last_block: u64,
    head: u64,
    initial_backfill: u64,
    max_blocks_per_tick: u64,
) -> Option<(u64, u64)> {
    if head <= previous_last_block {
        return None;
    }
    let start_block = if previous_last_block == 0 {
        head.saturating_sub(initial_backfill.saturating_sub(1))
    } else {
        previous_last_block + 1
    };
    if start_block > head {
        return None;
    }
    let end_block = start_block
        .saturating_add(max_blocks_per_tick.saturating_sub(1))
        .min(head);
    Some((start_block, end_block))
}

/// Event Watcher - Scans the chain for chess contract events
pub struct EventWatcher {
    reader: OnchainReader,
    parser: EventParser,
    reconciler: Reconciler,
    last_block: Arc<tokio::sync::RwLock<u64>>,
}

impl EventWatcher {
    pub fn new(reader: OnchainReader, reconciler: Reconciler) -> Self {
        Self {
            reader,
            parser: EventParser::new(),
            reconciler,
            last_block: Arc::new(tokio::sync::RwLock::new(0)),
        }
    }

    // Internal helper that supports `initial_backfill_blocks` operations.
    fn initial_backfill_blocks(&self) -> u64 {
        std::env::var("WATCHER_INITIAL_BACKFILL_BLOCKS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(WATCHER_DEFAULT_INITIAL_BACKFILL_BLOCKS)
    }

    // Internal helper that supports `max_blocks_per_tick` operations.
    fn max_blocks_per_tick(&self) -> u64 {
        std::env::var("WATCHER_MAX_BLOCKS_PER_TICK")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(WATCHER_DEFAULT_MAX_BLOCKS_PER_TICK)
    }

    /// Start the event watcher loop
    pub async fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            tracing::info!(
                "Watching contract {:#x} for game events",
                self.reader.contract_address()
            );

            let mut ticker = interval(Duration::from_secs(WATCHER_INTERVAL_SECS));
            let mut transient_failures: u32 = 0;

            loop {
                ticker.tick().await;

                match self.scan_events().await {
                    Ok(()) => {
                        transient_failures = 0;
                    }
                    Err(e) => {
                        let err_text = e.to_string();
                        if is_transient_rpc_error(&err_text) {
                            transient_failures = transient_failures.saturating_add(1);
                            let backoff_secs = transient_backoff_secs(transient_failures);
                            tracing::warn!(
                                "Event watcher transient error: {} (backoff={}s, failures={})",
                                err_text,
                                backoff_secs,
                                transient_failures
                            );
                            sleep(Duration::from_secs(backoff_secs)).await;
                        } else {
                            transient_failures = 0;
                            tracing::error!("Event watcher error: {}", err_text);
                        }
                    }
                }
            }
        });
    }

    /// Scan for new events from last block to current
    async fn scan_events(&self) -> Result<()> {
        let previous_last_block = *self.last_block.read().await;
        let head = self.reader.block_number().await?;

        let Some((start_block, end_block)) = scan_window(
            previous_last_block,
            head,
            self.initial_backfill_blocks(),
            self.max_blocks_per_tick(),
        ) else {
            return Ok(());
        };

        tracing::debug!(
            "Scanning blocks {} to {} (head: {}, previous_last: {})",
            start_block,
            end_block,
            head,
            previous_last_block
        );

        let logs = self.reader.game_logs(start_block, end_block).await?;
        for log in &logs {
            if let Some(event) = self.parser.parse_event(log) {
                tracing::info!("Contract event at block {:?}: {:?}", log.block_number, event);
                self.reconciler.handle_event(event).await;
            }
        }

        // Only advance past blocks that were fully scanned; a failed range
        // is retried from the same spot on the next tick.
        *self.last_block.write().await = end_block;
        Ok(())
    }
}
