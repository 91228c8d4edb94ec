//! # Community Bulletin Core
//!
//! Shared, runtime-agnostic logic for Community Bulletin: the post and
//! summary data model, vote rules, day-window computation, the daily
//! summary aggregator and its text renderer, and the store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Storage backends live behind the
//! [`store::PostStore`] and [`store::SummaryStore`] traits.

pub mod aggregate;
pub mod digest;
pub mod error;
pub mod models;
pub mod render;
pub mod store;
pub mod vote;
pub mod window;

pub use error::BulletinError;
