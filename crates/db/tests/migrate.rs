use std::str::FromStr;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use temp_dir::TempDir;

#[tokio::test]
async fn test_migrate_creates_itinerary_table() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.child("db.sqlite3");
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.to_string_lossy()))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    tripweave_db::migrate(&pool).await?;
    // A second run is a no-op.
    tripweave_db::migrate(&pool).await?;

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'itinerary'",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(count, 1);

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_itinerary_share_slug'",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(count, 1);

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pragma_table_info('itinerary') WHERE name IN ('start_date', 'days_edited')",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(count, 2);

    Ok(())
}
