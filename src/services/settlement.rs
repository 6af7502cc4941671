use serde::Serialize;
use thiserror::Error;

use crate::chain::{Ledger, LedgerError};
use crate::db::MarketCache;
use crate::errors::AppError;
use crate::models::{MarketRow, MarketStatus, Outcome};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("cache write failed: {0}")]
    Cache(anyhow::Error),
}

impl From<SettlementError> for AppError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::Ledger(e) => e.into(),
            SettlementError::Cache(e) => AppError::Internal(e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementSync {
    pub market_id: u64,
    pub resolved: bool,
    pub outcome: Outcome,
    pub status: MarketStatus,
}

/// Reconcile one cached row with the ledger after a wallet transaction.
///
/// Resolved markets get their outcome and status written; unresolved ones
/// only have their pools refreshed. Known cast metadata is kept by the upsert.
pub async fn sync_market(
    market_id: u64,
    ledger: &dyn Ledger,
    cache: &dyn MarketCache,
) -> Result<SettlementSync, SettlementError> {
    let market = ledger.get_market(market_id).await?;

    cache
        .upsert_market(&MarketRow::from_market(&market))
        .await
        .map_err(SettlementError::Cache)?;

    let status = market.display_status();
    tracing::info!(market_id, resolved = market.resolved, status = %status, "Settlement synced");

    Ok(SettlementSync {
        market_id,
        resolved: market.resolved,
        outcome: market.outcome,
        status,
    })
}
