//! Core data models used throughout Community Bulletin.
//!
//! Posts carry AI-derived fields (category, urgency, entities and their
//! confidence scores). Those are produced by external classifiers and are
//! treated here as opaque inputs: they are validated for range, never
//! recomputed.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BulletinError;

/// Fixed post category enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    Safety,
    Events,
    #[serde(rename = "Lost & Found")]
    LostAndFound,
    #[serde(rename = "Public Works")]
    PublicWorks,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Safety,
        Category::Events,
        Category::LostAndFound,
        Category::PublicWorks,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safety => "Safety",
            Category::Events => "Events",
            Category::LostAndFound => "Lost & Found",
            Category::PublicWorks => "Public Works",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = BulletinError;

    /// Accepts the display name case-insensitively (`"Lost & Found"`,
    /// `"public works"`) as well as the snake-case CLI spelling
    /// (`"lost_and_found"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "safety" => Ok(Category::Safety),
            "events" => Ok(Category::Events),
            "lost & found" | "lost and found" => Ok(Category::LostAndFound),
            "public works" => Ok(Category::PublicWorks),
            "general" => Ok(Category::General),
            _ => Err(BulletinError::InvalidInput(format!(
                "unknown category '{}'",
                s
            ))),
        }
    }
}

/// Urgency classification. Every post has exactly one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Urgency::Normal),
            "urgent" => Ok(Urgency::Urgent),
            "emergency" => Ok(Urgency::Emergency),
            _ => Err(BulletinError::InvalidInput(format!(
                "unknown urgency '{}'",
                s
            ))),
        }
    }
}

/// Post lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Active,
    Removed,
    Flagged,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Removed => "removed",
            PostStatus::Flagged => "flagged",
        }
    }

    /// Moderation only moves forward: active → flagged → removed, or
    /// active → removed directly.
    pub fn can_transition_to(&self, next: PostStatus) -> bool {
        matches!(
            (self, next),
            (PostStatus::Active, PostStatus::Flagged)
                | (PostStatus::Active, PostStatus::Removed)
                | (PostStatus::Flagged, PostStatus::Removed)
        )
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(PostStatus::Active),
            "removed" => Ok(PostStatus::Removed),
            "flagged" => Ok(PostStatus::Flagged),
            _ => Err(BulletinError::InvalidInput(format!(
                "unknown status '{}'",
                s
            ))),
        }
    }
}

/// A single user's current vote on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub user_id: String,
    /// `1` or `-1`.
    pub vote: i8,
    pub timestamp: DateTime<Utc>,
}

/// A persisted community post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub community: String,
    pub text: String,
    pub image_url: Option<String>,
    pub category: Category,
    pub category_score: f64,
    pub entities: Vec<String>,
    pub tags: Vec<String>,
    pub urgency: Urgency,
    pub urgency_score: f64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub voted_by: Vec<VoteRecord>,
    pub created_at: DateTime<Utc>,
    pub location: Option<String>,
    pub status: PostStatus,
}

impl Post {
    /// The acting user's current vote, if any.
    pub fn vote_of(&self, user_id: &str) -> Option<i8> {
        self.voted_by
            .iter()
            .find(|v| v.user_id == user_id)
            .map(|v| v.vote)
    }

    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// Input for creating a post.
///
/// The AI-derived fields default the same way an unclassified post would:
/// `General` at score 0, `normal` urgency at score 0, no entities or tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    pub user_id: String,
    pub community: String,
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub category_score: f64,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub urgency_score: f64,
    #[serde(default)]
    pub location: Option<String>,
    /// Backdated creation time; `None` means "now".
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Validate and materialize into an active post with no votes.
    pub fn into_post(self, now: DateTime<Utc>) -> Result<Post> {
        let user_id = self.user_id.trim().to_string();
        let community = self.community.trim().to_string();
        if user_id.is_empty() {
            return Err(BulletinError::InvalidInput("user_id must not be empty".into()).into());
        }
        if community.is_empty() {
            return Err(BulletinError::InvalidInput("community must not be empty".into()).into());
        }
        if self.text.trim().is_empty() {
            return Err(BulletinError::InvalidInput("text must not be empty".into()).into());
        }
        check_score("category_score", self.category_score)?;
        check_score("urgency_score", self.urgency_score)?;

        Ok(Post {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            community,
            text: self.text,
            image_url: self.image_url.filter(|s| !s.trim().is_empty()),
            category: self.category,
            category_score: self.category_score,
            entities: self.entities,
            tags: self.tags,
            urgency: self.urgency,
            urgency_score: self.urgency_score,
            upvotes: 0,
            downvotes: 0,
            voted_by: Vec::new(),
            created_at: self.created_at.unwrap_or(now),
            location: self.location.filter(|s| !s.trim().is_empty()),
            status: PostStatus::Active,
        })
    }
}

fn check_score(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(
            BulletinError::InvalidInput(format!("{} must be in [0.0, 1.0], got {}", field, value))
                .into(),
        );
    }
    Ok(())
}

/// Aggregate counts for a day (or for one category within a day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total: i64,
    pub emergency: i64,
    pub urgent: i64,
    pub normal: i64,
}

impl SummaryStats {
    pub fn record(&mut self, urgency: Urgency) {
        self.total += 1;
        match urgency {
            Urgency::Emergency => self.emergency += 1,
            Urgency::Urgent => self.urgent += 1,
            Urgency::Normal => self.normal += 1,
        }
    }
}

/// The cached daily digest for one (community, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: String,
    pub community: String,
    pub date_iso: String,
    pub summary_text: String,
    pub stats: SummaryStats,
    pub created_at: DateTime<Utc>,
}

/// Result of applying a vote, as seen by the voting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub user_vote: Option<i8>,
}

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    /// Newest first.
    #[default]
    New,
    /// Most upvoted first, newest breaking ties.
    Top,
}

impl FromStr for FeedSort {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(FeedSort::New),
            "top" => Ok(FeedSort::Top),
            _ => Err(BulletinError::InvalidInput(format!(
                "unknown sort '{}': expected new or top",
                s
            ))),
        }
    }
}

/// Filters for listing a feed.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub community: Option<String>,
    pub status: PostStatus,
    pub urgency: Option<Urgency>,
    pub category: Option<Category>,
    pub sort: FeedSort,
    pub limit: i64,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            community: None,
            status: PostStatus::Active,
            urgency: None,
            category: None,
            sort: FeedSort::New,
            limit: 20,
        }
    }
}
