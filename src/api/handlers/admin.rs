use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::MarketStatus;
use crate::AppState;

/// POST /api/admin/markets/:id/cancel: hide a market from listings.
pub async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, AppError> {
    if !state.cache.set_status(id, MarketStatus::AdminCancelled).await? {
        return Err(AppError::NotFound(format!("market {id} is not indexed")));
    }
    tracing::warn!(market_id = id, "Market cancelled by admin");
    Ok(Json(json!({ "success": true, "market_id": id, "status": MarketStatus::AdminCancelled })))
}

/// DELETE /api/admin/markets/:id: drop the cached row; the next index run restores it.
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, AppError> {
    if !state.cache.delete_market(id).await? {
        return Err(AppError::NotFound(format!("market {id} is not indexed")));
    }
    tracing::warn!(market_id = id, "Market row deleted by admin");
    Ok(Json(json!({ "success": true, "market_id": id, "deleted": true })))
}
