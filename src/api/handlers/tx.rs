use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::chain::TxRequest;
use crate::errors::AppError;
use crate::models::{is_full_cast_hash, CastSnapshot, Market, Side};
use crate::services::command::{
    DEFAULT_DURATION_HOURS, DEFAULT_THRESHOLD, MAX_DURATION_HOURS, MAX_THRESHOLD, MIN_DURATION_HOURS,
    MIN_THRESHOLD,
};
use crate::services::webhook::find_existing_market;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BetRequest {
    pub market_id: u64,
    pub side: String,
    pub amount_eth: String,
}

/// POST /api/tx/bet: `placeBet` transaction for the user's wallet.
pub async fn bet(
    State(state): State<AppState>,
    Json(req): Json<BetRequest>,
) -> Result<Json<TxRequest>, AppError> {
    let side = Side::from_api_str(&req.side)
        .ok_or_else(|| AppError::BadRequest(format!("side must be moon or doom, got {:?}", req.side)))?;

    ensure_open_for_bets(&state, req.market_id).await?;

    let tx = state.tx_builder.place_bet(req.market_id, side, &req.amount_eth)?;
    tracing::info!(market_id = req.market_id, side = %side, amount = %req.amount_eth, "Built bet transaction");
    Ok(Json(tx))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Cast URL or hash.
    pub cast: String,
    pub threshold: Option<u64>,
    pub duration_hours: Option<u64>,
}

/// POST /api/tx/create: `createMarket` for a cast, resolved to its full hash.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<TxRequest>, AppError> {
    let threshold = req.threshold.unwrap_or(DEFAULT_THRESHOLD);
    if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        return Err(AppError::BadRequest(format!(
            "threshold must be between {MIN_THRESHOLD} and {MAX_THRESHOLD}"
        )));
    }
    let hours = req.duration_hours.unwrap_or(DEFAULT_DURATION_HOURS);
    if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&hours) {
        return Err(AppError::BadRequest(format!(
            "duration_hours must be between {MIN_DURATION_HOURS} and {MAX_DURATION_HOURS}"
        )));
    }

    let identifier = req.cast.trim();
    if identifier.is_empty() {
        return Err(AppError::BadRequest("cast is required".into()));
    }

    let cast = state.social.lookup_cast(identifier).await?;
    if !is_full_cast_hash(&cast.hash) {
        return Err(AppError::Upstream(format!("social API returned a partial hash {}", cast.hash)));
    }
    if let Err(e) = state.cache.record_snapshot(&CastSnapshot::of(&cast)).await {
        tracing::warn!(error = %e, cast = %cast.hash, "Failed to record cast snapshot");
    }

    if let Some(market_id) =
        find_existing_market(&cast.hash, state.ledger.as_ref(), state.cache.as_ref()).await?
    {
        return Err(AppError::BadRequest(format!(
            "market {market_id} already exists for this cast: {}",
            state.config.market_url(market_id)
        )));
    }

    let tx = state.tx_builder.create_market(&cast.hash, threshold, hours * 3600);
    tracing::info!(cast = %cast.hash, threshold, hours, "Built create transaction");
    Ok(Json(tx))
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub market_id: u64,
}

/// POST /api/tx/claim
pub async fn claim(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<TxRequest>, AppError> {
    ensure_claimable(&state, req.market_id).await?;
    Ok(Json(state.tx_builder.claim(req.market_id)))
}

/// The market exists on the ledger, is unresolved and its deadline has not passed.
pub(super) async fn ensure_open_for_bets(state: &AppState, market_id: u64) -> Result<Market, AppError> {
    let market = state.ledger.get_market(market_id).await?;
    if market.resolved {
        return Err(AppError::BadRequest(format!("market {} is already resolved", market.id)));
    }
    if market.is_expired(Utc::now().timestamp()) {
        return Err(AppError::BadRequest(format!("market {} has expired", market.id)));
    }
    Ok(market)
}

/// The market exists on the ledger and has been resolved.
pub(super) async fn ensure_claimable(state: &AppState, market_id: u64) -> Result<Market, AppError> {
    let market = state.ledger.get_market(market_id).await?;
    if !market.resolved {
        return Err(AppError::BadRequest(format!("market {} is not resolved yet", market.id)));
    }
    Ok(market)
}
