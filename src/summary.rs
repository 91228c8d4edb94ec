//! Daily summary commands.
//!
//! Used by `bulletin summary` / `bulletin summaries` and by the
//! `GET /communities/{community}/summary` endpoint.

use anyhow::Result;
use chrono::Utc;

use bulletin_core::digest::get_or_create_daily_summary;
use bulletin_core::models::Summary;
use bulletin_core::store::{Store, SummaryStore};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Get or create the digest for `community` on `date` (today in the digest
/// timezone when `None`).
pub async fn daily_summary<S: Store + ?Sized>(
    store: &S,
    config: &Config,
    community: &str,
    date: Option<&str>,
) -> Result<Summary> {
    let offset = config.digest.offset()?;
    get_or_create_daily_summary(store, community, date, offset, Utc::now()).await
}

/// CLI entry point for `bulletin summary`.
pub async fn run_summary(config: &Config, community: &str, date: Option<String>) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let summary = daily_summary(&store, config, community, date.as_deref()).await;
    store.close().await;
    let summary = summary?;

    println!("{}", summary.summary_text);
    println!();
    println!(
        "stats: total={} emergency={} urgent={} normal={}",
        summary.stats.total, summary.stats.emergency, summary.stats.urgent, summary.stats.normal
    );
    Ok(())
}

/// CLI entry point for `bulletin summaries`.
pub async fn run_list_summaries(config: &Config, community: &str, limit: Option<i64>) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let summaries = store
        .list_summaries(community, config.feed.clamp(limit))
        .await?;
    store.close().await;

    if summaries.is_empty() {
        println!("No summaries for {}.", community);
        return Ok(());
    }
    println!(
        "  {:<12} {:>6} {:>10} {:>7} {:>7}",
        "DATE", "TOTAL", "EMERGENCY", "URGENT", "NORMAL"
    );
    println!("  {}", "-".repeat(46));
    for s in &summaries {
        println!(
            "  {:<12} {:>6} {:>10} {:>7} {:>7}",
            s.date_iso, s.stats.total, s.stats.emergency, s.stats.urgent, s.stats.normal
        );
    }
    Ok(())
}
