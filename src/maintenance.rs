use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::ledger::Ledger;

/// Background task that rewrites the journal once enough appends accumulate.
/// Bookings are never deleted, so the rewrite mostly folds away re-upserted
/// facilities and keeps the log bounded by live state.
pub async fn run_compactor(ledger: Arc<Ledger>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let entries = ledger.journal_entries_since_rewrite().await;
        if entries < threshold {
            continue;
        }
        match ledger.compact_journal().await {
            Ok(()) => info!("journal compacted after {entries} appends"),
            Err(e) => tracing::warn!("journal compaction failed: {e}"),
        }
    }
}
