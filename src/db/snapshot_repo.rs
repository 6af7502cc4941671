use sqlx::PgPool;

use crate::models::CastSnapshot;

/// Record that a cast was seen. The first capture time is kept.
pub async fn record_snapshot(pool: &PgPool, snapshot: &CastSnapshot) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cast_snapshots (cast_hash, author_fid, likes_count, captured_at)
        VALUES (lower($1), $2, $3, $4)
        ON CONFLICT (cast_hash) DO UPDATE
        SET author_fid = COALESCE(EXCLUDED.author_fid, cast_snapshots.author_fid),
            likes_count = GREATEST(EXCLUDED.likes_count, cast_snapshots.likes_count)
        "#,
    )
    .bind(&snapshot.cast_hash)
    .bind(snapshot.author_fid)
    .bind(snapshot.likes_count)
    .bind(snapshot.captured_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_snapshot(pool: &PgPool, cast_hash: &str) -> anyhow::Result<Option<CastSnapshot>> {
    let row = sqlx::query_as::<_, CastSnapshot>(
        "SELECT * FROM cast_snapshots WHERE cast_hash = lower($1)",
    )
    .bind(cast_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
