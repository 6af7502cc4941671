use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::{MarketRow, MarketStatus, UserBet};
use crate::services::settlement::{self, SettlementSync};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// GET /api/markets?status=active
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<MarketRow>>>, AppError> {
    let status = match query.status.as_deref() {
        None | Some("") => MarketStatus::Active,
        Some(s) => MarketStatus::from_db_str(s)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status {s:?}")))?,
    };

    let rows = state.cache.get_markets_by_status(status).await?;
    Ok(ApiResponse::ok(rows))
}

/// GET /api/markets/:id: the cached row.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MarketRow>>, AppError> {
    let row = state
        .cache
        .get_market(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("market {id} is not indexed")))?;
    Ok(ApiResponse::ok(row))
}

/// GET /api/markets/:id/bets/:address: read straight from the ledger.
pub async fn user_bet(
    State(state): State<AppState>,
    Path((id, address)): Path<(u64, String)>,
) -> Result<Json<ApiResponse<UserBet>>, AppError> {
    let bet = state.ledger.get_user_bet(id, &address).await.map_err(|e| match e {
        crate::chain::LedgerError::InvalidAddress(a) => AppError::BadRequest(format!("invalid address {a}")),
        other => other.into(),
    })?;
    Ok(ApiResponse::ok(bet))
}

/// POST /api/markets/:id/sync: reconcile the cache after a wallet transaction.
pub async fn sync(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<SettlementSync>>, AppError> {
    let synced = settlement::sync_market(id, state.ledger.as_ref(), state.cache.as_ref()).await?;
    Ok(ApiResponse::ok(synced))
}
