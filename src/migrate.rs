use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Timestamps are Unix milliseconds (UTC).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            community TEXT NOT NULL,
            text TEXT NOT NULL,
            image_url TEXT,
            category TEXT NOT NULL DEFAULT 'General',
            category_score REAL NOT NULL DEFAULT 0,
            entities_json TEXT NOT NULL DEFAULT '[]',
            tags_json TEXT NOT NULL DEFAULT '[]',
            urgency TEXT NOT NULL DEFAULT 'normal',
            urgency_score REAL NOT NULL DEFAULT 0,
            upvotes INTEGER NOT NULL DEFAULT 0,
            downvotes INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            location TEXT,
            status TEXT NOT NULL DEFAULT 'active'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_votes (
            post_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            vote INTEGER NOT NULL CHECK (vote IN (-1, 1)),
            voted_at INTEGER NOT NULL,
            PRIMARY KEY (post_id, user_id),
            FOREIGN KEY (post_id) REFERENCES posts(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One summary per (community, date); the unique key is what makes
    // concurrent first-time generation safe.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            id TEXT PRIMARY KEY,
            community TEXT NOT NULL,
            date_iso TEXT NOT NULL,
            summary_text TEXT NOT NULL,
            total INTEGER NOT NULL,
            emergency INTEGER NOT NULL,
            urgent INTEGER NOT NULL,
            normal INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(community, date_iso)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='posts_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE posts_fts USING fts5(
                post_id UNINDEXED,
                text,
                tags,
                category
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_community_created ON posts(community, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_posts_urgency_created ON posts(urgency, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_posts_community_status_created ON posts(community, status, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_posts_upvotes_created ON posts(upvotes DESC, created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_post_votes_user ON post_votes(user_id)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}
