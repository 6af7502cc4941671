pub mod command;
pub mod indexer;
pub mod oracle;
pub mod settlement;
pub mod sync;
pub mod webhook;

use std::time::Duration;

use crate::db::MarketCache;
use crate::models::{is_full_cast_hash, Market};
use crate::social::{cast_url, IdentifierKind};

/// Pick the identifier most likely to resolve a market's cast.
///
/// The ledger may hold a truncated hash copied from a cast URL. A healed full
/// hash in the cache wins; failing that, a URL is rebuilt from the cached author.
pub(crate) async fn cast_identifier(market: &Market, cache: &dyn MarketCache) -> String {
    if is_full_cast_hash(&market.cast_hash)
        || IdentifierKind::classify(&market.cast_hash) == IdentifierKind::Url
    {
        return market.cast_hash.clone();
    }

    match cache.get_market(market.id as i64).await {
        Ok(Some(row)) if is_full_cast_hash(&row.cast_hash) => row.cast_hash,
        Ok(Some(row)) => match row.author_username.as_deref() {
            Some(username) => cast_url(username, &market.cast_hash),
            None => market.cast_hash.clone(),
        },
        Ok(None) => market.cast_hash.clone(),
        Err(e) => {
            tracing::warn!(error = %e, market_id = market.id, "Cache read failed while picking cast identifier");
            market.cast_hash.clone()
        }
    }
}

/// Fixed inter-item delay used by the jobs to stay under API rate limits.
pub(crate) async fn throttle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
