//! Vote rules.
//!
//! [`apply_vote`] is the single place that mutates a post's vote list and
//! counters. Store implementations load the post inside their own
//! transaction, call it, and write the result back, so the
//! one-vote-per-user and counters-match-records invariants hold for every
//! backend.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::error::BulletinError;
use crate::models::{Post, PostStatus, VoteOutcome, VoteRecord};

/// A requested vote action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
    /// Clear any existing vote.
    Retract,
}

impl Vote {
    fn value(&self) -> Option<i8> {
        match self {
            Vote::Up => Some(1),
            Vote::Down => Some(-1),
            Vote::Retract => None,
        }
    }
}

impl TryFrom<i64> for Vote {
    type Error = BulletinError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Vote::Up),
            -1 => Ok(Vote::Down),
            0 => Ok(Vote::Retract),
            other => Err(BulletinError::InvalidVote(other)),
        }
    }
}

/// Apply `vote` from `user_id` to `post`.
///
/// Repeating the user's current vote toggles it off. Switching sides moves
/// one count from one counter to the other. Only active posts accept votes.
pub fn apply_vote(
    post: &mut Post,
    user_id: &str,
    vote: Vote,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    if post.status != PostStatus::Active {
        return Err(BulletinError::PostNotActive(post.id.clone()).into());
    }
    if user_id.trim().is_empty() {
        return Err(BulletinError::InvalidInput("user_id must not be empty".into()).into());
    }

    let existing = post.voted_by.iter().position(|v| v.user_id == user_id);
    let previous = existing.map(|i| post.voted_by[i].vote);

    let next = match (previous, vote.value()) {
        (Some(prev), Some(val)) if prev == val => None,
        (_, val) => val,
    };

    if let Some(prev) = previous {
        adjust(post, prev, -1);
    }
    if let Some(val) = next {
        adjust(post, val, 1);
    }

    match (existing, next) {
        (Some(i), Some(val)) => {
            post.voted_by[i].vote = val;
            post.voted_by[i].timestamp = now;
        }
        (Some(i), None) => {
            post.voted_by.remove(i);
        }
        (None, Some(val)) => post.voted_by.push(VoteRecord {
            user_id: user_id.to_string(),
            vote: val,
            timestamp: now,
        }),
        (None, None) => {}
    }

    Ok(VoteOutcome {
        upvotes: post.upvotes,
        downvotes: post.downvotes,
        score: post.score(),
        user_vote: next,
    })
}

fn adjust(post: &mut Post, value: i8, delta: i64) {
    if value > 0 {
        post.upvotes += delta;
    } else {
        post.downvotes += delta;
    }
}
