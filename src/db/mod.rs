pub mod market_repo;
pub mod snapshot_repo;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{CastSnapshot, LikeUpdate, MarketRow, MarketStatus};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// The market index cache: a best-effort read replica of the ledger.
///
/// Upserts are keyed by market id and last-write-wins; nothing here is
/// transactional with the chain.
#[async_trait]
pub trait MarketCache: Send + Sync {
    async fn upsert_market(&self, row: &MarketRow) -> anyhow::Result<()>;
    async fn get_market(&self, market_id: i64) -> anyhow::Result<Option<MarketRow>>;
    async fn get_markets_by_status(&self, status: MarketStatus) -> anyhow::Result<Vec<MarketRow>>;
    async fn find_by_cast_hash(&self, cast_hash: &str) -> anyhow::Result<Option<MarketRow>>;
    async fn delete_market(&self, market_id: i64) -> anyhow::Result<bool>;
    async fn set_status(&self, market_id: i64, status: MarketStatus) -> anyhow::Result<bool>;
    async fn update_cast_hash(&self, market_id: i64, cast_hash: &str) -> anyhow::Result<()>;
    async fn bulk_update_likes(&self, updates: &[LikeUpdate]) -> anyhow::Result<u64>;
    async fn record_snapshot(&self, snapshot: &CastSnapshot) -> anyhow::Result<()>;
    async fn get_snapshot(&self, cast_hash: &str) -> anyhow::Result<Option<CastSnapshot>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Postgres-backed `MarketCache`.
#[derive(Debug, Clone)]
pub struct PgMarketCache {
    pool: PgPool,
}

impl PgMarketCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketCache for PgMarketCache {
    async fn upsert_market(&self, row: &MarketRow) -> anyhow::Result<()> {
        market_repo::upsert_market(&self.pool, row).await
    }

    async fn get_market(&self, market_id: i64) -> anyhow::Result<Option<MarketRow>> {
        market_repo::get_market(&self.pool, market_id).await
    }

    async fn get_markets_by_status(&self, status: MarketStatus) -> anyhow::Result<Vec<MarketRow>> {
        market_repo::get_markets_by_status(&self.pool, status).await
    }

    async fn find_by_cast_hash(&self, cast_hash: &str) -> anyhow::Result<Option<MarketRow>> {
        market_repo::find_by_cast_hash(&self.pool, cast_hash).await
    }

    async fn delete_market(&self, market_id: i64) -> anyhow::Result<bool> {
        market_repo::delete_market(&self.pool, market_id).await
    }

    async fn set_status(&self, market_id: i64, status: MarketStatus) -> anyhow::Result<bool> {
        market_repo::set_status(&self.pool, market_id, status).await
    }

    async fn update_cast_hash(&self, market_id: i64, cast_hash: &str) -> anyhow::Result<()> {
        market_repo::update_cast_hash(&self.pool, market_id, cast_hash).await
    }

    async fn bulk_update_likes(&self, updates: &[LikeUpdate]) -> anyhow::Result<u64> {
        market_repo::bulk_update_likes(&self.pool, updates).await
    }

    async fn record_snapshot(&self, snapshot: &CastSnapshot) -> anyhow::Result<()> {
        snapshot_repo::record_snapshot(&self.pool, snapshot).await
    }

    async fn get_snapshot(&self, cast_hash: &str) -> anyhow::Result<Option<CastSnapshot>> {
        snapshot_repo::get_snapshot(&self.pool, cast_hash).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
