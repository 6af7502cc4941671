//! Scheduler-triggered jobs. Every endpoint answers 200: the body carries the
//! job report or `{success:false,error}` when the job could not start.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiResponse;
use crate::services::indexer::{self, IndexerConfig, IndexerReport};
use crate::services::oracle::{self, OracleConfig, OracleReport};
use crate::services::sync::{self, SyncConfig, SyncReport};
use crate::AppState;

fn respond<T: Serialize>(job: &str, result: anyhow::Result<T>) -> Json<ApiResponse<T>> {
    match result {
        Ok(report) => ApiResponse::ok(report),
        Err(e) => {
            tracing::error!(error = %e, job, "Cron job failed");
            ApiResponse::failed(e)
        }
    }
}

/// GET /api/cron/index
pub async fn index(State(state): State<AppState>) -> Json<ApiResponse<IndexerReport>> {
    let config = IndexerConfig {
        delay: Duration::from_millis(state.config.indexer_delay_ms),
    };
    let result = indexer::run_indexer(
        state.ledger.as_ref(),
        state.social.as_ref(),
        state.cache.as_ref(),
        &config,
    )
    .await;
    respond("index", result)
}

/// GET /api/cron/resolve
pub async fn resolve(State(state): State<AppState>) -> Json<ApiResponse<OracleReport>> {
    let config = OracleConfig {
        delay: Duration::from_millis(state.config.oracle_delay_ms),
        max_reaction_pages: state.config.oracle_max_reaction_pages,
        reputation_score: state.config.oracle_reputation_score,
    };
    let result = oracle::run_oracle(
        state.ledger.as_ref(),
        state.social.as_ref(),
        state.cache.as_ref(),
        &config,
    )
    .await;
    respond("resolve", result)
}

/// GET /api/cron/sync
pub async fn sync(State(state): State<AppState>) -> Json<ApiResponse<SyncReport>> {
    let config = SyncConfig {
        batch_size: state.config.sync_batch_size,
        delay: Duration::from_millis(state.config.indexer_delay_ms),
    };
    let result = sync::run_sync(state.social.as_ref(), state.cache.as_ref(), &config).await;
    respond("sync", result)
}
