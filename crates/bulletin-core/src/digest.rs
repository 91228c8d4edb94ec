//! Daily summary generation.
//!
//! One summary per `(community, date)`, created on first request and served
//! verbatim afterwards:
//!
//! 1. validate the community and date
//! 2. return the cached summary if one exists
//! 3. load the day's active posts (day bounds in the digest timezone)
//! 4. aggregate and render, or use the fixed no-activity text for an empty day
//! 5. persist through [`SummaryStore::create_summary`], which keeps the first
//!    record if a concurrent request got there first
//!
//! Store failures abort the whole operation and are returned unchanged.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};

use crate::aggregate::aggregate_posts;
use crate::error::BulletinError;
use crate::models::{PostStatus, Summary};
use crate::render::{no_activity_text, render_summary};
use crate::store::{PostStore, SummaryStore};
use crate::window::{parse_date_iso, today_iso, DayWindow};

/// Return the summary for `community` on `date_iso`, generating and caching
/// it on first request.
pub async fn generate_daily_summary<S>(
    store: &S,
    community: &str,
    date_iso: &str,
    offset: FixedOffset,
) -> Result<Summary>
where
    S: PostStore + SummaryStore + ?Sized,
{
    let community = community.trim();
    if community.is_empty() {
        return Err(BulletinError::InvalidInput("community must not be empty".into()).into());
    }
    let date = parse_date_iso(date_iso)?;

    match build_summary(store, community, date_iso, date, offset).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            tracing::error!(community, date_iso, error = %e, "failed to generate daily summary");
            Err(e)
        }
    }
}

async fn build_summary<S>(
    store: &S,
    community: &str,
    date_iso: &str,
    date: chrono::NaiveDate,
    offset: FixedOffset,
) -> Result<Summary>
where
    S: PostStore + SummaryStore + ?Sized,
{
    if let Some(existing) = store.find_summary(community, date_iso).await? {
        tracing::debug!(community, date_iso, "daily summary cache hit");
        return Ok(existing);
    }

    let window = DayWindow::for_date(date, offset)?;
    let posts = store
        .find_posts_in_range(community, window.start, window.end, PostStatus::Active)
        .await?;

    let agg = aggregate_posts(&posts);
    let summary_text = if agg.is_empty() {
        no_activity_text(community, date_iso)
    } else {
        render_summary(community, date, &agg)
    };

    let record = Summary {
        id: uuid::Uuid::new_v4().to_string(),
        community: community.to_string(),
        date_iso: date_iso.to_string(),
        summary_text,
        stats: agg.stats,
        created_at: Utc::now(),
    };
    let stored = store.create_summary(&record).await?;

    if stored.id == record.id {
        tracing::info!(
            community,
            date_iso,
            total = stored.stats.total,
            emergency = stored.stats.emergency,
            urgent = stored.stats.urgent,
            normal = stored.stats.normal,
            "daily summary generated"
        );
    } else {
        tracing::debug!(
            community,
            date_iso,
            "daily summary created concurrently; using stored record"
        );
    }
    Ok(stored)
}

/// Like [`generate_daily_summary`], defaulting the date to today in the
/// digest timezone.
pub async fn get_or_create_daily_summary<S>(
    store: &S,
    community: &str,
    date_iso: Option<&str>,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<Summary>
where
    S: PostStore + SummaryStore + ?Sized,
{
    let date_iso = match date_iso {
        Some(d) => d.to_string(),
        None => today_iso(now, offset),
    };
    generate_daily_summary(store, community, &date_iso, offset).await
}
