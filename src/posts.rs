//! Post commands: create, show, feed, vote, moderate, search.
//!
//! The `create_post` / `cast_vote` / `change_status` functions hold the
//! logic shared by the CLI (`bulletin post`, `bulletin vote`, ...) and the
//! HTTP server; the `run_*` functions are the CLI entry points that print
//! to stdout.

use anyhow::Result;
use chrono::Utc;

use bulletin_core::models::{
    Category, FeedQuery, FeedSort, NewPost, Post, PostStatus, Urgency, VoteOutcome,
};
use bulletin_core::store::PostStore;
use bulletin_core::vote::Vote;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Validate `input` and persist it as a new active post.
pub async fn create_post<S: PostStore + ?Sized>(store: &S, input: NewPost) -> Result<Post> {
    let post = input.into_post(Utc::now())?;
    store.insert_post(&post).await?;
    tracing::info!(
        post_id = %post.id,
        community = %post.community,
        category = %post.category,
        urgency = %post.urgency,
        "post created"
    );
    Ok(post)
}

/// Parse a raw vote value and apply it.
pub async fn cast_vote<S: PostStore + ?Sized>(
    store: &S,
    post_id: &str,
    user_id: &str,
    value: i64,
) -> Result<VoteOutcome> {
    let vote = Vote::try_from(value)?;
    store.apply_vote(post_id, user_id, vote).await
}

pub async fn change_status<S: PostStore + ?Sized>(
    store: &S,
    post_id: &str,
    status: PostStatus,
) -> Result<Post> {
    let post = store.set_status(post_id, status).await?;
    tracing::info!(post_id, status = %post.status, "post status changed");
    Ok(post)
}

fn print_post_line(post: &Post) {
    println!(
        "{}  [{} | {}]  {:+}  {}  {}",
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.category,
        post.urgency,
        post.score(),
        post.id,
        truncate(&post.text, 72)
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        single_line
    } else {
        let cut: String = single_line.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

/// CLI entry point for `bulletin post`.
pub async fn run_post(config: &Config, input: NewPost) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let post = create_post(&store, input).await?;
    println!("created post {}", post.id);
    println!("community: {}", post.community);
    println!("category:  {} ({:.2})", post.category, post.category_score);
    println!("urgency:   {} ({:.2})", post.urgency, post.urgency_score);
    store.close().await;
    Ok(())
}

/// CLI entry point for `bulletin get`.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let post = store.get_post(id).await?;
    store.close().await;

    let post = match post {
        Some(p) => p,
        None => anyhow::bail!("post not found: {}", id),
    };

    println!("--- Post ---");
    println!("id:          {}", post.id);
    println!("author:      {}", post.user_id);
    println!("community:   {}", post.community);
    println!("status:      {}", post.status);
    println!("created_at:  {}", post.created_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!("category:    {} ({:.2})", post.category, post.category_score);
    println!("urgency:     {} ({:.2})", post.urgency, post.urgency_score);
    if let Some(ref loc) = post.location {
        println!("location:    {}", loc);
    }
    if let Some(ref url) = post.image_url {
        println!("image_url:   {}", url);
    }
    if !post.tags.is_empty() {
        println!("tags:        {}", post.tags.join(", "));
    }
    if !post.entities.is_empty() {
        println!("entities:    {}", post.entities.join(", "));
    }
    println!(
        "votes:       +{} / -{} (score {})",
        post.upvotes,
        post.downvotes,
        post.score()
    );
    println!();
    println!("{}", post.text);

    Ok(())
}

/// CLI entry point for `bulletin feed`.
pub async fn run_feed(
    config: &Config,
    community: &str,
    sort: FeedSort,
    urgency: Option<Urgency>,
    category: Option<Category>,
    limit: Option<i64>,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let query = FeedQuery {
        community: Some(community.to_string()),
        urgency,
        category,
        sort,
        limit: config.feed.clamp(limit),
        ..Default::default()
    };
    let posts = store.list_posts(&query).await?;
    store.close().await;

    if posts.is_empty() {
        println!("No posts in {}.", community);
        return Ok(());
    }
    for post in &posts {
        print_post_line(post);
    }
    Ok(())
}

/// CLI entry point for `bulletin vote`.
pub async fn run_vote(config: &Config, post_id: &str, user_id: &str, value: i64) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let outcome = cast_vote(&store, post_id, user_id, value).await;
    store.close().await;
    let outcome = outcome?;

    let user_vote = match outcome.user_vote {
        Some(v) => format!("{:+}", v),
        None => "none".to_string(),
    };
    println!(
        "upvotes: {}  downvotes: {}  score: {}  your vote: {}",
        outcome.upvotes, outcome.downvotes, outcome.score, user_vote
    );
    Ok(())
}

/// CLI entry point for `bulletin status`.
pub async fn run_status(config: &Config, post_id: &str, status: PostStatus) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let post = change_status(&store, post_id, status).await;
    store.close().await;
    let post = post?;
    println!("post {} is now {}", post.id, post.status);
    Ok(())
}

/// CLI entry point for `bulletin search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    community: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }
    let store = SqliteStore::open(config).await?;
    let posts = store
        .search_posts(query, community.as_deref(), config.feed.clamp(limit))
        .await?;
    store.close().await;

    if posts.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for post in &posts {
        print_post_line(post);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulletin_core::error::BulletinError;
    use bulletin_core::store::memory::InMemoryStore;

    fn input(text: &str) -> NewPost {
        NewPost {
            user_id: "u1".to_string(),
            community: "riverside".to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 8), "line one…");
    }

    #[tokio::test]
    async fn test_create_and_vote() {
        let store = InMemoryStore::new();
        let post = create_post(&store, input("Lost cat near the library"))
            .await
            .unwrap();

        cast_vote(&store, &post.id, "u2", 1).await.unwrap();
        let outcome = cast_vote(&store, &post.id, "u2", -1).await.unwrap();
        assert_eq!(outcome.upvotes, 0);
        assert_eq!(outcome.downvotes, 1);

        let stored = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.voted_by.len(), 1);
        assert_eq!(stored.voted_by[0].vote, -1);
    }

    #[tokio::test]
    async fn test_cast_vote_rejects_bad_value() {
        let store = InMemoryStore::new();
        let post = create_post(&store, input("hello")).await.unwrap();
        let err = cast_vote(&store, &post.id, "u2", 5).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<BulletinError>(),
            Some(&BulletinError::InvalidVote(5))
        );
    }

    #[tokio::test]
    async fn test_vote_on_missing_post() {
        let store = InMemoryStore::new();
        let err = cast_vote(&store, "nope", "u2", 1).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BulletinError>(),
            Some(BulletinError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_status_rules() {
        let store = InMemoryStore::new();
        let post = create_post(&store, input("hello")).await.unwrap();
        change_status(&store, &post.id, PostStatus::Flagged)
            .await
            .unwrap();
        assert!(change_status(&store, &post.id, PostStatus::Active)
            .await
            .is_err());
        let removed = change_status(&store, &post.id, PostStatus::Removed)
            .await
            .unwrap();
        assert_eq!(removed.status, PostStatus::Removed);
    }
}
