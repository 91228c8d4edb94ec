//! Storage abstraction for Community Bulletin.
//!
//! [`PostStore`] and [`SummaryStore`] define the operations the summary
//! generator, the CLI and the HTTP server need. Backends (SQLite, in-memory)
//! implement both; [`Store`] is the combined bound used where a single
//! handle serves both roles.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{FeedQuery, Post, PostStatus, Summary, VoteOutcome};
use crate::vote::Vote;

/// Post persistence.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_post`](PostStore::insert_post) | Persist a new post |
/// | [`get_post`](PostStore::get_post) | Fetch a post with its vote records |
/// | [`find_posts_in_range`](PostStore::find_posts_in_range) | Posts of a community in a time window |
/// | [`list_posts`](PostStore::list_posts) | Feed listing with filters and sort |
/// | [`search_posts`](PostStore::search_posts) | Text search over active posts |
/// | [`apply_vote`](PostStore::apply_vote) | Atomic vote mutation |
/// | [`set_status`](PostStore::set_status) | Moderation status transition |
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: &Post) -> Result<()>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>>;

    /// Posts of `community` with `status` created within `[start, end]`
    /// (both inclusive), oldest first. Posts created at the same instant
    /// keep insertion order.
    async fn find_posts_in_range(
        &self,
        community: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: PostStatus,
    ) -> Result<Vec<Post>>;

    async fn list_posts(&self, query: &FeedQuery) -> Result<Vec<Post>>;

    /// Match every whitespace-separated term of `query` against post text,
    /// tags and category. Active posts only.
    async fn search_posts(
        &self,
        query: &str,
        community: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Post>>;

    /// Apply a vote as one atomic step per post (see [`crate::vote::apply_vote`]).
    async fn apply_vote(&self, post_id: &str, user_id: &str, vote: Vote) -> Result<VoteOutcome>;

    async fn set_status(&self, post_id: &str, status: PostStatus) -> Result<Post>;
}

/// Daily summary persistence, keyed by `(community, date_iso)`.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn find_summary(&self, community: &str, date_iso: &str) -> Result<Option<Summary>>;

    /// Insert `summary` unless one already exists for its key.
    ///
    /// Returns the stored record: the new one, or the existing one when the
    /// key was already taken. Callers racing on the same key therefore all
    /// observe a single summary.
    async fn create_summary(&self, summary: &Summary) -> Result<Summary>;

    /// Summaries for `community`, newest date first.
    async fn list_summaries(&self, community: &str, limit: i64) -> Result<Vec<Summary>>;
}

/// A backend that stores both posts and summaries.
pub trait Store: PostStore + SummaryStore {}

impl<T: PostStore + SummaryStore + ?Sized> Store for T {}
