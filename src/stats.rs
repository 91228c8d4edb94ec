//! Database statistics and health overview.
//!
//! Provides a quick summary of what's stored: post counts by status, vote
//! and summary counts, and a per-community breakdown. Used by
//! `bulletin stats`.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Per-community breakdown.
struct CommunityStats {
    community: String,
    active: i64,
    emergency: i64,
    summaries: i64,
    last_post_ms: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let pool = store.pool();

    let status_rows = sqlx::query("SELECT status, COUNT(*) AS n FROM posts GROUP BY status")
        .fetch_all(pool)
        .await?;
    let count_for = |status: &str| -> i64 {
        status_rows
            .iter()
            .find(|r| r.get::<String, _>("status") == status)
            .map(|r| r.get::<i64, _>("n"))
            .unwrap_or(0)
    };
    let active = count_for("active");
    let flagged = count_for("flagged");
    let removed = count_for("removed");

    let total_votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_votes")
        .fetch_one(pool)
        .await?;

    let total_summaries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM summaries")
        .fetch_one(pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Community Bulletin Database Stats");
    println!("================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!(
        "  Posts:       {} ({} active, {} flagged, {} removed)",
        active + flagged + removed,
        active,
        flagged,
        removed
    );
    println!("  Votes:       {}", total_votes);
    println!("  Summaries:   {}", total_summaries);

    let community_rows = sqlx::query(
        r#"
        SELECT
            p.community,
            SUM(CASE WHEN p.status = 'active' THEN 1 ELSE 0 END) AS active,
            SUM(CASE WHEN p.status = 'active' AND p.urgency = 'emergency' THEN 1 ELSE 0 END) AS emergency,
            MAX(p.created_at) AS last_post,
            (SELECT COUNT(*) FROM summaries s WHERE s.community = p.community) AS summaries
        FROM posts p
        GROUP BY p.community
        ORDER BY active DESC, p.community ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let communities: Vec<CommunityStats> = community_rows
        .iter()
        .map(|row| CommunityStats {
            community: row.get("community"),
            active: row.get("active"),
            emergency: row.get("emergency"),
            summaries: row.get("summaries"),
            last_post_ms: row.get("last_post"),
        })
        .collect();

    if !communities.is_empty() {
        println!();
        println!("  By community:");
        println!(
            "  {:<24} {:>7} {:>10} {:>10}   {}",
            "COMMUNITY", "ACTIVE", "EMERGENCY", "SUMMARIES", "LAST POST"
        );
        println!("  {}", "-".repeat(76));

        let now_ms = chrono::Utc::now().timestamp_millis();
        for c in &communities {
            let last = c
                .last_post_ms
                .map_or_else(|| "never".to_string(), |ms| format_post_age(ms, now_ms));
            println!(
                "  {:<24} {:>7} {:>10} {:>10}   {}",
                c.community, c.active, c.emergency, c.summaries, last
            );
        }
    }

    println!();

    store.close().await;
    Ok(())
}

/// Database file size, e.g. `"512 B"`, `"2.0 KB"`, `"3.0 MB"`.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Age of a post timestamp (Unix ms) relative to `now_ms`, e.g. "3h ago".
/// Anything older than a month, or in the future, prints as a UTC date.
fn format_post_age(ts_ms: i64, now_ms: i64) -> String {
    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let age = now_ms - ts_ms;
    match age {
        a if a < 0 || a >= 30 * DAY => format_post_date(ts_ms),
        a if a < MINUTE => "just now".to_string(),
        a if a < HOUR => format!("{}m ago", a / MINUTE),
        a if a < DAY => format!("{}h ago", a / HOUR),
        a => format!("{}d ago", a / DAY),
    }
}

fn format_post_date(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_format_post_age() {
        // 2024-03-15T12:00:00Z
        let now = 1_710_504_000_000;
        assert_eq!(format_post_age(now - 5_000, now), "just now");
        assert_eq!(format_post_age(now - 2 * 60_000, now), "2m ago");
        assert_eq!(format_post_age(now - 3 * 3_600_000, now), "3h ago");
        assert_eq!(format_post_age(now - 2 * 86_400_000, now), "2d ago");
        assert_eq!(format_post_age(now - 40 * 86_400_000, now), "2024-02-04 12:00");
        assert_eq!(format_post_age(now + 60_000, now), "2024-03-15 12:01");
    }
}
