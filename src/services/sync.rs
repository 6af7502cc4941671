use std::time::Duration;

use metrics::counter;
use serde::Serialize;

use crate::db::MarketCache;
use crate::models::{is_full_cast_hash, same_cast, LikeUpdate, MarketRow, MarketStatus};
use crate::social::{cast_url, IdentifierKind, SocialApi};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hashes per bulk lookup.
    pub batch_size: usize,
    /// Pause between API calls.
    pub delay: Duration,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub active: usize,
    pub healed: usize,
    pub heal_failures: usize,
    pub refreshed: usize,
    pub batches: usize,
    pub batch_errors: usize,
    pub written: u64,
}

/// True when a cached identifier must be re-resolved before it can be batched.
pub fn needs_healing(cast_hash: &str) -> bool {
    !is_full_cast_hash(cast_hash)
}

/// Split active rows into (heal path, batch path).
pub fn partition_rows(rows: Vec<MarketRow>) -> (Vec<MarketRow>, Vec<MarketRow>) {
    rows.into_iter().partition(|row| needs_healing(&row.cast_hash))
}

/// Refresh cached like counts for active markets.
///
/// Truncated identifiers are resolved one by one and the full hash is written
/// back, so the next run batches them. Valid hashes go through the bulk
/// endpoint. All counts land in one bulk write at the end.
pub async fn run_sync(
    social: &dyn SocialApi,
    cache: &dyn MarketCache,
    config: &SyncConfig,
) -> anyhow::Result<SyncReport> {
    let rows = cache.get_markets_by_status(MarketStatus::Active).await?;
    let mut report = SyncReport {
        active: rows.len(),
        ..Default::default()
    };

    let (to_heal, to_batch) = partition_rows(rows);
    tracing::info!(
        heal = to_heal.len(),
        batch = to_batch.len(),
        "Sync: refreshing active markets"
    );

    let mut updates: Vec<LikeUpdate> = Vec::new();

    for row in &to_heal {
        match heal_row(row, social, cache).await {
            Some(update) => {
                report.healed += 1;
                updates.push(update);
            }
            None => report.heal_failures += 1,
        }
        super::throttle(config.delay).await;
    }

    for chunk in to_batch.chunks(config.batch_size.max(1)) {
        report.batches += 1;
        let hashes: Vec<String> = chunk.iter().map(|r| r.cast_hash.clone()).collect();

        match social.lookup_casts(&hashes).await {
            Ok(casts) => {
                for row in chunk {
                    if let Some(cast) = casts.iter().find(|c| same_cast(&c.hash, &row.cast_hash)) {
                        updates.push(LikeUpdate {
                            market_id: row.market_id,
                            likes_count: cast.likes_count as i64,
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, size = chunk.len(), "Sync: bulk cast lookup failed");
                report.batch_errors += 1;
            }
        }
        super::throttle(config.delay).await;
    }

    report.refreshed = updates.len();
    match cache.bulk_update_likes(&updates).await {
        Ok(written) => {
            report.written = written;
            counter!("likes_synced_total").increment(written);
        }
        Err(e) => tracing::error!(error = %e, "Sync: bulk like update failed"),
    }

    tracing::info!(
        healed = report.healed,
        refreshed = report.refreshed,
        written = report.written,
        "Sync finished"
    );

    Ok(report)
}

/// Re-resolve a truncated identifier; persist the full hash on success.
async fn heal_row(
    row: &MarketRow,
    social: &dyn SocialApi,
    cache: &dyn MarketCache,
) -> Option<LikeUpdate> {
    let identifier = if IdentifierKind::classify(&row.cast_hash) == IdentifierKind::Url {
        row.cast_hash.clone()
    } else {
        let Some(username) = row.author_username.as_deref() else {
            tracing::debug!(market_id = row.market_id, "Sync: no author to heal truncated hash with");
            return None;
        };
        cast_url(username, &row.cast_hash)
    };

    let cast = match social.lookup_cast(&identifier).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, market_id = row.market_id, identifier = %identifier, "Sync: heal lookup failed");
            return None;
        }
    };

    if is_full_cast_hash(&cast.hash) {
        match cache.update_cast_hash(row.market_id, &cast.hash).await {
            Ok(()) => {
                counter!("casts_healed_total").increment(1);
                tracing::info!(market_id = row.market_id, from = %row.cast_hash, to = %cast.hash, "Sync: healed cast hash");
            }
            Err(e) => tracing::warn!(error = %e, market_id = row.market_id, "Sync: failed to persist healed hash"),
        }
    }

    Some(LikeUpdate {
        market_id: row.market_id,
        likes_count: cast.likes_count as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn row(id: i64, hash: &str) -> MarketRow {
        MarketRow {
            market_id: id,
            cast_hash: hash.into(),
            creator: "0x1111111111111111111111111111111111111111".into(),
            threshold: 100,
            deadline: 0,
            resolved: false,
            outcome: "UNRESOLVED".into(),
            status: "active".into(),
            moon_pool: Decimal::ZERO,
            doom_pool: Decimal::ZERO,
            author_fid: None,
            author_username: None,
            author_display_name: None,
            author_pfp_url: None,
            cast_text: None,
            likes_count: None,
            updated_at: None,
        }
    }

    #[test]
    fn short_identifiers_take_the_heal_path() {
        let rows = vec![
            row(1, "0x5a1b2c3d"),
            row(2, "0x5a1b2c3d4e5f60718293a4b5c6d7e8f901234567"),
            row(3, "https://warpcast.com/dan/0x5a1b2c3d"),
            row(4, "0x1234567890abcdef12"), // 20 chars
        ];
        let (heal, batch) = partition_rows(rows);
        let heal_ids: Vec<i64> = heal.iter().map(|r| r.market_id).collect();
        let batch_ids: Vec<i64> = batch.iter().map(|r| r.market_id).collect();
        assert_eq!(heal_ids, vec![1, 3]);
        assert_eq!(batch_ids, vec![2, 4]);
    }
}
