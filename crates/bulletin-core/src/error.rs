//! Domain error types.
//!
//! Operations return `anyhow::Result`; these variants travel inside the
//! `anyhow::Error` so callers that care (the HTTP layer) can recover them
//! with `downcast_ref` and choose a status code.

use thiserror::Error;

use crate::models::PostStatus;

/// Errors raised by validation and domain rules (as opposed to storage failures).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BulletinError {
    /// Date string is not a canonical `YYYY-MM-DD` calendar date.
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// UTC offset string could not be parsed.
    #[error("invalid utc offset '{0}': expected Z, UTC, +HH:MM or -HH:MM")]
    InvalidOffset(String),

    /// A request field failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Vote value outside {-1, 0, 1}.
    #[error("invalid vote value {0}: must be 1, -1 or 0")]
    InvalidVote(i64),

    #[error("post not found: {0}")]
    PostNotFound(String),

    /// Votes are only accepted on active posts.
    #[error("post {0} is not active")]
    PostNotActive(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: PostStatus, to: PostStatus },
}
