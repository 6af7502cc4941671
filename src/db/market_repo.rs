use sqlx::PgPool;

use crate::models::{LikeUpdate, MarketRow, MarketStatus};

/// Insert or refresh a market row keyed by market_id.
///
/// Known metadata is never replaced by NULL, a full cast hash is never
/// replaced by a truncated one, and an admin-cancelled row stays hidden until
/// the ledger resolves it.
pub async fn upsert_market(pool: &PgPool, row: &MarketRow) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO market_index (
            market_id, cast_hash, creator, threshold, deadline, resolved, outcome, status,
            moon_pool, doom_pool, author_fid, author_username, author_display_name,
            author_pfp_url, cast_text, likes_count, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW())
        ON CONFLICT (market_id) DO UPDATE
        SET cast_hash = CASE
                WHEN length(EXCLUDED.cast_hash) < 20 AND length(market_index.cast_hash) >= 20
                    THEN market_index.cast_hash
                ELSE EXCLUDED.cast_hash
            END,
            creator = EXCLUDED.creator,
            threshold = EXCLUDED.threshold,
            deadline = EXCLUDED.deadline,
            resolved = EXCLUDED.resolved,
            outcome = EXCLUDED.outcome,
            status = CASE
                WHEN market_index.status = 'admin_cancelled' AND NOT EXCLUDED.resolved
                    THEN market_index.status
                ELSE EXCLUDED.status
            END,
            moon_pool = EXCLUDED.moon_pool,
            doom_pool = EXCLUDED.doom_pool,
            author_fid = COALESCE(EXCLUDED.author_fid, market_index.author_fid),
            author_username = COALESCE(EXCLUDED.author_username, market_index.author_username),
            author_display_name = COALESCE(EXCLUDED.author_display_name, market_index.author_display_name),
            author_pfp_url = COALESCE(EXCLUDED.author_pfp_url, market_index.author_pfp_url),
            cast_text = COALESCE(EXCLUDED.cast_text, market_index.cast_text),
            likes_count = COALESCE(EXCLUDED.likes_count, market_index.likes_count),
            updated_at = NOW()
        "#,
    )
    .bind(row.market_id)
    .bind(&row.cast_hash)
    .bind(&row.creator)
    .bind(row.threshold)
    .bind(row.deadline)
    .bind(row.resolved)
    .bind(&row.outcome)
    .bind(&row.status)
    .bind(row.moon_pool)
    .bind(row.doom_pool)
    .bind(row.author_fid)
    .bind(&row.author_username)
    .bind(&row.author_display_name)
    .bind(&row.author_pfp_url)
    .bind(&row.cast_text)
    .bind(row.likes_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a single market row by id.
pub async fn get_market(pool: &PgPool, market_id: i64) -> anyhow::Result<Option<MarketRow>> {
    let row = sqlx::query_as::<_, MarketRow>("SELECT * FROM market_index WHERE market_id = $1")
        .bind(market_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Get all rows with the given display status, newest market first.
pub async fn get_markets_by_status(
    pool: &PgPool,
    status: MarketStatus,
) -> anyhow::Result<Vec<MarketRow>> {
    let rows = sqlx::query_as::<_, MarketRow>(
        "SELECT * FROM market_index WHERE status = $1 ORDER BY market_id DESC",
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Find the row for a cast, accepting a truncated hash on either side.
pub async fn find_by_cast_hash(pool: &PgPool, cast_hash: &str) -> anyhow::Result<Option<MarketRow>> {
    let row = sqlx::query_as::<_, MarketRow>(
        r#"
        SELECT * FROM market_index
        WHERE lower(cast_hash) = lower($1)
           OR (length(cast_hash) >= 10 AND lower($1) LIKE lower(cast_hash) || '%')
           OR (length($1) >= 10 AND lower(cast_hash) LIKE lower($1) || '%')
        ORDER BY market_id
        LIMIT 1
        "#,
    )
    .bind(cast_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Delete a row. Returns true if a row was removed.
pub async fn delete_market(pool: &PgPool, market_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM market_index WHERE market_id = $1")
        .bind(market_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite the display status. Returns true if the row exists.
pub async fn set_status(pool: &PgPool, market_id: i64, status: MarketStatus) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE market_index SET status = $2, updated_at = NOW() WHERE market_id = $1",
    )
    .bind(market_id)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace a truncated identifier with the full cast hash.
pub async fn update_cast_hash(pool: &PgPool, market_id: i64, cast_hash: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE market_index SET cast_hash = $2, updated_at = NOW() WHERE market_id = $1")
        .bind(market_id)
        .bind(cast_hash)
        .execute(pool)
        .await?;

    Ok(())
}

/// Write many like counts in one statement.
pub async fn bulk_update_likes(pool: &PgPool, updates: &[LikeUpdate]) -> anyhow::Result<u64> {
    if updates.is_empty() {
        return Ok(0);
    }

    let ids: Vec<i64> = updates.iter().map(|u| u.market_id).collect();
    let likes: Vec<i64> = updates.iter().map(|u| u.likes_count).collect();

    let result = sqlx::query(
        r#"
        UPDATE market_index AS m
        SET likes_count = u.likes_count, updated_at = NOW()
        FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS u(market_id, likes_count)
        WHERE m.market_id = u.market_id
        "#,
    )
    .bind(&ids)
    .bind(&likes)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
