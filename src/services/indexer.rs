use std::time::Duration;

use metrics::counter;
use serde::Serialize;

use crate::chain::Ledger;
use crate::db::MarketCache;
use crate::models::{CastSnapshot, MarketRow};
use crate::social::SocialApi;

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Pause between markets.
    pub delay: Duration,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexerReport {
    pub total: u64,
    pub indexed: u64,
    /// Indexed without cast metadata (social lookup failed).
    pub metadata_missing: u64,
    pub errors: u64,
    pub failed_ids: Vec<u64>,
}

/// Mirror every on-chain market into the index cache.
///
/// Per-market failures are logged and counted; the scan continues. Rows are
/// upserted by market id, so re-running is idempotent.
pub async fn run_indexer(
    ledger: &dyn Ledger,
    social: &dyn SocialApi,
    cache: &dyn MarketCache,
    config: &IndexerConfig,
) -> anyhow::Result<IndexerReport> {
    let total = ledger.market_count().await?;
    let mut report = IndexerReport {
        total,
        ..Default::default()
    };

    tracing::info!(total, "Indexer: scanning markets");

    for market_id in 1..=total {
        match index_market(market_id, ledger, social, cache).await {
            Ok(with_metadata) => {
                report.indexed += 1;
                if !with_metadata {
                    report.metadata_missing += 1;
                }
                counter!("markets_indexed_total").increment(1);
            }
            Err(e) => {
                tracing::warn!(error = %e, market_id, "Indexer: failed to index market");
                report.errors += 1;
                report.failed_ids.push(market_id);
                counter!("index_errors_total").increment(1);
            }
        }

        if market_id < total {
            super::throttle(config.delay).await;
        }
    }

    tracing::info!(
        indexed = report.indexed,
        errors = report.errors,
        metadata_missing = report.metadata_missing,
        "Indexer finished"
    );

    Ok(report)
}

/// Index one market. Returns whether cast metadata was attached.
async fn index_market(
    market_id: u64,
    ledger: &dyn Ledger,
    social: &dyn SocialApi,
    cache: &dyn MarketCache,
) -> anyhow::Result<bool> {
    let market = ledger.get_market(market_id).await?;
    let identifier = super::cast_identifier(&market, cache).await;

    let mut row = MarketRow::from_market(&market);
    let with_metadata = match social.lookup_cast(&identifier).await {
        Ok(cast) => {
            if let Err(e) = cache.record_snapshot(&CastSnapshot::of(&cast)).await {
                tracing::warn!(error = %e, market_id, "Indexer: failed to record cast snapshot");
            }
            row = row.with_cast(&cast);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, market_id, identifier = %identifier, "Indexer: cast lookup failed");
            false
        }
    };

    cache.upsert_market(&row).await?;
    Ok(with_metadata)
}
