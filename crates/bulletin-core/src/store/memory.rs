//! In-memory store for testing and embedded use.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock`. Posts are kept in
//! insertion order so that range queries reproduce the encounter order a
//! database would give for equal timestamps. Search is a case-insensitive
//! substring match over text, tags and category (no FTS index).

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BulletinError;
use crate::models::{FeedQuery, FeedSort, Post, PostStatus, Summary, VoteOutcome};
use crate::vote::{apply_vote, Vote};

use super::{PostStore, SummaryStore};

pub struct InMemoryStore {
    posts: RwLock<Vec<Post>>,
    summaries: RwLock<HashMap<(String, String), Summary>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            posts: RwLock::new(Vec::new()),
            summaries: RwLock::new(HashMap::new()),
        }
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

fn matches_terms(post: &Post, terms: &[String]) -> bool {
    let haystack = format!(
        "{} {} {}",
        post.text.to_lowercase(),
        post.tags.join(" ").to_lowercase(),
        post.category.as_str().to_lowercase()
    );
    terms.iter().all(|t| haystack.contains(t.as_str()))
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        if posts.iter().any(|p| p.id == post.id) {
            anyhow::bail!("duplicate post id: {}", post.id);
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let posts = self.posts.read().map_err(poisoned)?;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find_posts_in_range(
        &self,
        community: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: PostStatus,
    ) -> Result<Vec<Post>> {
        let posts = self.posts.read().map_err(poisoned)?;
        let mut found: Vec<Post> = posts
            .iter()
            .filter(|p| {
                p.community == community
                    && p.status == status
                    && p.created_at >= start
                    && p.created_at <= end
            })
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }

    async fn list_posts(&self, query: &FeedQuery) -> Result<Vec<Post>> {
        let posts = self.posts.read().map_err(poisoned)?;
        let mut found: Vec<Post> = posts
            .iter()
            .rev()
            .filter(|p| {
                p.status == query.status
                    && query.community.as_deref().map_or(true, |c| p.community == c)
                    && query.urgency.map_or(true, |u| p.urgency == u)
                    && query.category.map_or(true, |c| p.category == c)
            })
            .cloned()
            .collect();
        match query.sort {
            FeedSort::New => found.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            FeedSort::Top => found.sort_by(|a, b| {
                b.upvotes
                    .cmp(&a.upvotes)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
        found.truncate(query.limit.max(0) as usize);
        Ok(found)
    }

    async fn search_posts(
        &self,
        query: &str,
        community: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let posts = self.posts.read().map_err(poisoned)?;
        let mut found: Vec<Post> = posts
            .iter()
            .filter(|p| {
                p.status == PostStatus::Active
                    && community.map_or(true, |c| p.community == c)
                    && matches_terms(p, &terms)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn apply_vote(&self, post_id: &str, user_id: &str, vote: Vote) -> Result<VoteOutcome> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| BulletinError::PostNotFound(post_id.to_string()))?;

        // Mutate a copy so a rejected vote leaves the stored post untouched.
        let mut updated = post.clone();
        let outcome = apply_vote(&mut updated, user_id, vote, Utc::now())?;
        *post = updated;
        Ok(outcome)
    }

    async fn set_status(&self, post_id: &str, status: PostStatus) -> Result<Post> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| BulletinError::PostNotFound(post_id.to_string()))?;
        if !post.status.can_transition_to(status) {
            return Err(BulletinError::InvalidTransition {
                from: post.status,
                to: status,
            }
            .into());
        }
        post.status = status;
        Ok(post.clone())
    }
}

#[async_trait]
impl SummaryStore for InMemoryStore {
    async fn find_summary(&self, community: &str, date_iso: &str) -> Result<Option<Summary>> {
        let summaries = self.summaries.read().map_err(poisoned)?;
        Ok(summaries
            .get(&(community.to_string(), date_iso.to_string()))
            .cloned())
    }

    async fn create_summary(&self, summary: &Summary) -> Result<Summary> {
        let mut summaries = self.summaries.write().map_err(poisoned)?;
        let stored = summaries
            .entry((summary.community.clone(), summary.date_iso.clone()))
            .or_insert_with(|| summary.clone());
        Ok(stored.clone())
    }

    async fn list_summaries(&self, community: &str, limit: i64) -> Result<Vec<Summary>> {
        let summaries = self.summaries.read().map_err(poisoned)?;
        let mut found: Vec<Summary> = summaries
            .values()
            .filter(|s| s.community == community)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date_iso.cmp(&a.date_iso));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }
}
