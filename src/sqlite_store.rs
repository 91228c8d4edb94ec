//! SQLite-backed implementation of the core store traits.
//!
//! Posts live in `posts` with their vote records in `post_votes`; the
//! `posts_fts` FTS5 table backs text search. Vote and status changes run in a
//! `BEGIN IMMEDIATE` transaction that reloads the post, applies the core
//! rule, and writes the result back. Summaries rely on the
//! `UNIQUE(community, date_iso)` constraint for insert-if-absent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use bulletin_core::error::BulletinError;
use bulletin_core::models::{
    FeedQuery, FeedSort, Post, PostStatus, Summary, SummaryStats, VoteOutcome, VoteRecord,
};
use bulletin_core::store::{PostStore, SummaryStore};
use bulletin_core::vote::{self, Vote};

use crate::config::Config;
use crate::{db, migrate};

const POST_COLUMNS: &str = "p.id, p.user_id, p.community, p.text, p.image_url, p.category, \
     p.category_score, p.entities_json, p.tags_json, p.urgency, p.urgency_score, \
     p.upvotes, p.downvotes, p.created_at, p.location, p.status";

const SUMMARY_COLUMNS: &str =
    "id, community, date_iso, summary_text, total, emergency, urgent, normal, created_at";

/// SQLite implementation of [`PostStore`] and [`SummaryStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Transaction holding the write lock from `BEGIN`, for read-then-write
    /// updates. Competing writers wait out the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn hydrate(&self, rows: Vec<SqliteRow>) -> Result<Vec<Post>> {
        let mut conn = self.pool.acquire().await?;
        let mut posts = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let votes = load_votes(&mut conn, &id).await?;
            posts.push(row_to_post(row, votes)?);
        }
        Ok(posts)
    }
}

fn ts_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("timestamp out of range: {}", ms))
}

fn row_to_post(row: &SqliteRow, voted_by: Vec<VoteRecord>) -> Result<Post> {
    let category: String = row.get("category");
    let urgency: String = row.get("urgency");
    let status: String = row.get("status");
    let entities_json: String = row.get("entities_json");
    let tags_json: String = row.get("tags_json");

    Ok(Post {
        id: row.get("id"),
        user_id: row.get("user_id"),
        community: row.get("community"),
        text: row.get("text"),
        image_url: row.get("image_url"),
        category: category.parse()?,
        category_score: row.get("category_score"),
        entities: serde_json::from_str(&entities_json).context("invalid entities_json")?,
        tags: serde_json::from_str(&tags_json).context("invalid tags_json")?,
        urgency: urgency.parse()?,
        urgency_score: row.get("urgency_score"),
        upvotes: row.get("upvotes"),
        downvotes: row.get("downvotes"),
        voted_by,
        created_at: ts_from_millis(row.get("created_at"))?,
        location: row.get("location"),
        status: status.parse()?,
    })
}

fn row_to_summary(row: &SqliteRow) -> Result<Summary> {
    Ok(Summary {
        id: row.get("id"),
        community: row.get("community"),
        date_iso: row.get("date_iso"),
        summary_text: row.get("summary_text"),
        stats: SummaryStats {
            total: row.get("total"),
            emergency: row.get("emergency"),
            urgent: row.get("urgent"),
            normal: row.get("normal"),
        },
        created_at: ts_from_millis(row.get("created_at"))?,
    })
}

async fn load_votes(conn: &mut SqliteConnection, post_id: &str) -> Result<Vec<VoteRecord>> {
    let rows = sqlx::query(
        "SELECT user_id, vote, voted_at FROM post_votes WHERE post_id = ? ORDER BY rowid ASC",
    )
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let vote: i64 = row.get("vote");
            Ok(VoteRecord {
                user_id: row.get("user_id"),
                vote: if vote > 0 { 1 } else { -1 },
                timestamp: ts_from_millis(row.get("voted_at"))?,
            })
        })
        .collect()
}

async fn fetch_post(conn: &mut SqliteConnection, id: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let votes = load_votes(conn, id).await?;
            Ok(Some(row_to_post(&row, votes)?))
        }
        None => Ok(None),
    }
}

/// Quote each term so user input can't inject FTS5 query syntax.
fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn insert_post(&self, post: &Post) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, community, text, image_url, category,
                               category_score, entities_json, tags_json, urgency,
                               urgency_score, upvotes, downvotes, created_at,
                               location, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.community)
        .bind(&post.text)
        .bind(&post.image_url)
        .bind(post.category.as_str())
        .bind(post.category_score)
        .bind(serde_json::to_string(&post.entities)?)
        .bind(serde_json::to_string(&post.tags)?)
        .bind(post.urgency.as_str())
        .bind(post.urgency_score)
        .bind(post.upvotes)
        .bind(post.downvotes)
        .bind(post.created_at.timestamp_millis())
        .bind(&post.location)
        .bind(post.status.as_str())
        .execute(&mut *tx)
        .await?;

        for v in &post.voted_by {
            sqlx::query(
                "INSERT INTO post_votes (post_id, user_id, vote, voted_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&post.id)
            .bind(&v.user_id)
            .bind(v.vote as i64)
            .bind(v.timestamp.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT INTO posts_fts (post_id, text, tags, category) VALUES (?, ?, ?, ?)")
            .bind(&post.id)
            .bind(&post.text)
            .bind(post.tags.join(" "))
            .bind(post.category.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let mut conn = self.pool.acquire().await?;
        fetch_post(&mut conn, id).await
    }

    async fn find_posts_in_range(
        &self,
        community: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: PostStatus,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM posts p
            WHERE p.community = ? AND p.status = ?
              AND p.created_at >= ? AND p.created_at <= ?
            ORDER BY p.created_at ASC, p.rowid ASC
            "#,
            POST_COLUMNS
        ))
        .bind(community)
        .bind(status.as_str())
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_posts(&self, query: &FeedQuery) -> Result<Vec<Post>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM posts p WHERE p.status = ", POST_COLUMNS));
        qb.push_bind(query.status.as_str());
        if let Some(community) = &query.community {
            qb.push(" AND p.community = ").push_bind(community.clone());
        }
        if let Some(urgency) = query.urgency {
            qb.push(" AND p.urgency = ").push_bind(urgency.as_str());
        }
        if let Some(category) = query.category {
            qb.push(" AND p.category = ").push_bind(category.as_str());
        }
        qb.push(match query.sort {
            FeedSort::New => " ORDER BY p.created_at DESC, p.rowid DESC",
            FeedSort::Top => " ORDER BY p.upvotes DESC, p.created_at DESC, p.rowid DESC",
        });
        qb.push(" LIMIT ").push_bind(query.limit.max(0));

        let rows = qb.build().fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    async fn search_posts(
        &self,
        query: &str,
        community: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let match_expr = match fts_query(query) {
            Some(q) => q,
            None => return Ok(Vec::new()),
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM posts_fts JOIN posts p ON p.id = posts_fts.post_id \
             WHERE posts_fts MATCH ",
            POST_COLUMNS
        ));
        qb.push_bind(match_expr);
        qb.push(" AND p.status = 'active'");
        if let Some(c) = community {
            qb.push(" AND p.community = ").push_bind(c.to_string());
        }
        qb.push(" ORDER BY posts_fts.rank, p.created_at DESC LIMIT ")
            .push_bind(limit.max(0));

        let rows = qb.build().fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    async fn apply_vote(&self, post_id: &str, user_id: &str, vote: Vote) -> Result<VoteOutcome> {
        let mut tx = self.begin_write().await?;

        let mut post = fetch_post(&mut tx, post_id)
            .await?
            .ok_or_else(|| BulletinError::PostNotFound(post_id.to_string()))?;
        let had_vote = post.vote_of(user_id).is_some();

        let outcome = vote::apply_vote(&mut post, user_id, vote, Utc::now())?;

        match post.voted_by.iter().find(|v| v.user_id == user_id) {
            Some(record) => {
                sqlx::query(
                    r#"
                    INSERT INTO post_votes (post_id, user_id, vote, voted_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(post_id, user_id) DO UPDATE SET
                        vote = excluded.vote,
                        voted_at = excluded.voted_at
                    "#,
                )
                .bind(post_id)
                .bind(user_id)
                .bind(record.vote as i64)
                .bind(record.timestamp.timestamp_millis())
                .execute(&mut *tx)
                .await?;
            }
            None if had_vote => {
                sqlx::query("DELETE FROM post_votes WHERE post_id = ? AND user_id = ?")
                    .bind(post_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {}
        }

        sqlx::query("UPDATE posts SET upvotes = ?, downvotes = ? WHERE id = ?")
            .bind(post.upvotes)
            .bind(post.downvotes)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            post_id,
            user_id,
            ?vote,
            upvotes = outcome.upvotes,
            downvotes = outcome.downvotes,
            "vote applied"
        );
        Ok(outcome)
    }

    async fn set_status(&self, post_id: &str, status: PostStatus) -> Result<Post> {
        let mut tx = self.begin_write().await?;

        let mut post = fetch_post(&mut tx, post_id)
            .await?
            .ok_or_else(|| BulletinError::PostNotFound(post_id.to_string()))?;
        if !post.status.can_transition_to(status) {
            return Err(BulletinError::InvalidTransition {
                from: post.status,
                to: status,
            }
            .into());
        }

        sqlx::query("UPDATE posts SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        post.status = status;
        Ok(post)
    }
}

#[async_trait]
impl SummaryStore for SqliteStore {
    async fn find_summary(&self, community: &str, date_iso: &str) -> Result<Option<Summary>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM summaries WHERE community = ? AND date_iso = ?",
            SUMMARY_COLUMNS
        ))
        .bind(community)
        .bind(date_iso)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_summary).transpose()
    }

    async fn create_summary(&self, summary: &Summary) -> Result<Summary> {
        sqlx::query(
            r#"
            INSERT INTO summaries (id, community, date_iso, summary_text,
                                   total, emergency, urgent, normal, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(community, date_iso) DO NOTHING
            "#,
        )
        .bind(&summary.id)
        .bind(&summary.community)
        .bind(&summary.date_iso)
        .bind(&summary.summary_text)
        .bind(summary.stats.total)
        .bind(summary.stats.emergency)
        .bind(summary.stats.urgent)
        .bind(summary.stats.normal)
        .bind(summary.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.find_summary(&summary.community, &summary.date_iso)
            .await?
            .with_context(|| {
                format!(
                    "summary for {} on {} missing after insert",
                    summary.community, summary.date_iso
                )
            })
    }

    async fn list_summaries(&self, community: &str, limit: i64) -> Result<Vec<Summary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM summaries WHERE community = ? ORDER BY date_iso DESC LIMIT ?",
            SUMMARY_COLUMNS
        ))
        .bind(community)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_query_quotes_terms() {
        assert_eq!(fts_query("water main").as_deref(), Some("\"water\" \"main\""));
        assert_eq!(fts_query("say \"hi\"").as_deref(), Some("\"say\" \"\"\"hi\"\"\""));
        assert_eq!(fts_query("   "), None);
    }
}
