use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Create bundles table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bundles (
            id TEXT PRIMARY KEY,
            version TEXT NOT NULL,
            created TEXT,
            frame_type TEXT NOT NULL,
            confidence TEXT NOT NULL,
            bundle_json TEXT NOT NULL,
            search_text TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create relationships table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS relationships (
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            rel_type TEXT NOT NULL,
            strength REAL NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (from_id, to_id, rel_type),
            FOREIGN KEY (from_id) REFERENCES bundles(id),
            FOREIGN KEY (to_id) REFERENCES bundles(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bundles_indexed_at ON bundles(indexed_at DESC)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bundles_frame_type ON bundles(frame_type)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_id)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
