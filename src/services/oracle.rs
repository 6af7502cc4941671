use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;

use crate::chain::Ledger;
use crate::db::MarketCache;
use crate::models::{is_full_cast_hash, Market, MarketRow, Outcome};
use crate::social::{LikeTally, SocialApi, SocialError};

#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Pause between unresolved markets.
    pub delay: Duration,
    /// Reaction pages (100 likes each) read per cast before giving up.
    pub max_reaction_pages: u32,
    /// When set, report how many likers have at least this reputation score.
    pub reputation_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveReason {
    ThresholdReached,
    CastDeleted,
    DeadlinePassed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Resolve { outcome: Outcome, reason: ResolveReason },
    Pending,
}

/// Decide a market from its current like count.
///
/// Rules, in order:
/// 1. likes at or above the threshold resolve MOON, even before the deadline;
/// 2. zero likes on a cast we have seen before means it was deleted: DOOM;
/// 3. past the deadline: DOOM;
/// 4. otherwise the market stays open.
pub fn decide_outcome(likes: u64, threshold: u64, deadline: i64, now: i64, has_snapshot: bool) -> Decision {
    if likes >= threshold {
        return Decision::Resolve {
            outcome: Outcome::Moon,
            reason: ResolveReason::ThresholdReached,
        };
    }
    if likes == 0 && has_snapshot {
        return Decision::Resolve {
            outcome: Outcome::Doom,
            reason: ResolveReason::CastDeleted,
        };
    }
    if now > deadline {
        return Decision::Resolve {
            outcome: Outcome::Doom,
            reason: ResolveReason::DeadlinePassed,
        };
    }
    Decision::Pending
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    Pending,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketResolution {
    pub market_id: u64,
    pub status: ResolutionStatus,
    pub outcome: Option<Outcome>,
    pub reason: Option<ResolveReason>,
    pub likes: Option<u64>,
    pub threshold: Option<u64>,
    pub truncated: bool,
    pub reputable_likes: Option<u64>,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl MarketResolution {
    fn new(market_id: u64, status: ResolutionStatus) -> Self {
        Self {
            market_id,
            status,
            outcome: None,
            reason: None,
            likes: None,
            threshold: None,
            truncated: false,
            reputable_likes: None,
            tx_hash: None,
            error: None,
        }
    }

    fn failed(market_id: u64, error: impl ToString) -> Self {
        let mut r = Self::new(market_id, ResolutionStatus::Error);
        r.error = Some(error.to_string());
        r
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OracleReport {
    pub total: u64,
    pub checked: u64,
    pub resolved: u64,
    pub pending: u64,
    pub skipped: u64,
    pub errors: u64,
    pub results: Vec<MarketResolution>,
}

impl OracleReport {
    fn record(&mut self, result: MarketResolution) {
        match result.status {
            ResolutionStatus::Resolved => self.resolved += 1,
            ResolutionStatus::Pending => self.pending += 1,
            ResolutionStatus::Skipped => self.skipped += 1,
            ResolutionStatus::Error => self.errors += 1,
        }
        self.results.push(result);
    }
}

/// Scan every unresolved market and settle those whose outcome is decided.
///
/// A failed settlement leaves the market unresolved on-chain; the next
/// scheduled run retries it.
pub async fn run_oracle(
    ledger: &dyn Ledger,
    social: &dyn SocialApi,
    cache: &dyn MarketCache,
    config: &OracleConfig,
) -> anyhow::Result<OracleReport> {
    let total = ledger.market_count().await?;
    let mut report = OracleReport {
        total,
        ..Default::default()
    };

    tracing::info!(total, "Oracle: checking markets");

    for market_id in 1..=total {
        let market = match ledger.get_market(market_id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, market_id, "Oracle: failed to read market");
                report.record(MarketResolution::failed(market_id, e));
                counter!("resolve_errors_total").increment(1);
                continue;
            }
        };

        if market.resolved {
            report.skipped += 1;
            continue;
        }

        report.checked += 1;
        let result = check_market(&market, ledger, social, cache, config).await;
        if result.status == ResolutionStatus::Error {
            counter!("resolve_errors_total").increment(1);
        }
        report.record(result);

        super::throttle(config.delay).await;
    }

    tracing::info!(
        checked = report.checked,
        resolved = report.resolved,
        pending = report.pending,
        errors = report.errors,
        "Oracle finished"
    );

    Ok(report)
}

async fn check_market(
    market: &Market,
    ledger: &dyn Ledger,
    social: &dyn SocialApi,
    cache: &dyn MarketCache,
    config: &OracleConfig,
) -> MarketResolution {
    let market_id = market.id;

    // A cast the API no longer knows counts as zero likes so the snapshot
    // and deadline rules can settle it. Any other fetch error is "count
    // unknown", never zero likes.
    let identifier = super::cast_identifier(market, cache).await;
    let cast_hash = match full_cast_hash(&identifier, social).await {
        Ok(h) => Some(h),
        Err(SocialError::NotFound(what)) => {
            tracing::info!(market_id, what = %what, "Oracle: cast not found, counting zero likes");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, market_id, "Oracle: could not resolve cast hash");
            return MarketResolution::failed(market_id, format!("cast lookup failed: {e}"));
        }
    };

    let tally = match cast_hash.as_deref() {
        Some(hash) => match social.count_likes(hash, config.max_reaction_pages).await {
            Ok(t) => t,
            Err(SocialError::NotFound(what)) => {
                tracing::info!(market_id, what = %what, "Oracle: reactions not found, counting zero likes");
                LikeTally::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, market_id, "Oracle: failed to count likes");
                return MarketResolution::failed(market_id, format!("like count failed: {e}"));
            }
        },
        None => LikeTally::default(),
    };
    let cast_hash = cast_hash.unwrap_or(identifier);

    let has_snapshot = if tally.likes == 0 {
        match cache.get_snapshot(&cast_hash).await {
            Ok(s) => s.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, market_id, "Oracle: snapshot lookup failed");
                false
            }
        }
    } else {
        false
    };

    let reputable_likes = match config.reputation_score {
        Some(min_score) if !tally.liker_fids.is_empty() => {
            count_reputable(social, &tally.liker_fids, min_score, market_id).await
        }
        _ => None,
    };

    let now = Utc::now().timestamp();
    let mut result = MarketResolution::new(market_id, ResolutionStatus::Pending);
    result.likes = Some(tally.likes);
    result.threshold = Some(market.threshold);
    result.truncated = tally.truncated;
    result.reputable_likes = reputable_likes;

    let (outcome, reason) = match decide_outcome(
        tally.likes,
        market.threshold,
        market.deadline,
        now,
        has_snapshot,
    ) {
        Decision::Pending => {
            tracing::debug!(market_id, likes = tally.likes, threshold = market.threshold, "Oracle: still pending");
            return result;
        }
        Decision::Resolve { outcome, reason } => (outcome, reason),
    };
    result.outcome = Some(outcome);
    result.reason = Some(reason);

    // Another run may have settled it since the scan read it.
    match ledger.get_market(market_id).await {
        Ok(fresh) if fresh.resolved => {
            tracing::info!(market_id, "Oracle: market resolved concurrently, skipping");
            result.status = ResolutionStatus::Skipped;
            return result;
        }
        Ok(_) => {}
        Err(e) => {
            result.status = ResolutionStatus::Error;
            result.error = Some(format!("re-read before settlement failed: {e}"));
            return result;
        }
    }

    match ledger.resolve_market(market_id, outcome).await {
        Ok(tx_hash) => {
            tracing::info!(
                market_id,
                outcome = %outcome,
                reason = ?reason,
                likes = tally.likes,
                tx = %tx_hash,
                "Market resolved"
            );
            counter!("markets_resolved_total", "outcome" => outcome.as_str()).increment(1);

            let mut settled = market.clone();
            settled.resolved = true;
            settled.outcome = outcome;
            if let Err(e) = cache.upsert_market(&MarketRow::from_market(&settled)).await {
                tracing::warn!(error = %e, market_id, "Oracle: failed to mirror resolution into cache");
            }

            result.status = ResolutionStatus::Resolved;
            result.tx_hash = Some(tx_hash);
        }
        Err(e) => {
            tracing::error!(error = %e, market_id, outcome = %outcome, "Oracle: settlement transaction failed");
            result.status = ResolutionStatus::Error;
            result.error = Some(e.to_string());
        }
    }

    result
}

/// The full hash for a cast identifier, resolving URLs and truncated hashes.
async fn full_cast_hash(identifier: &str, social: &dyn SocialApi) -> Result<String, SocialError> {
    if is_full_cast_hash(identifier) {
        return Ok(identifier.to_string());
    }
    let cast = social.lookup_cast(identifier).await?;
    Ok(cast.hash)
}

async fn count_reputable(
    social: &dyn SocialApi,
    fids: &[u64],
    min_score: f64,
    market_id: u64,
) -> Option<u64> {
    match social.lookup_users(fids).await {
        Ok(users) => Some(
            users
                .iter()
                .filter(|u| u.score.is_some_and(|s| s >= min_score))
                .count() as u64,
        ),
        Err(e) => {
            tracing::warn!(error = %e, market_id, "Oracle: reputation lookup failed");
            None
        }
    }
}
