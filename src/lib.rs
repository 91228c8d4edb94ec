//! # Community Bulletin
//!
//! A neighborhood bulletin board: residents post short classified notices
//! (safety alerts, lost & found, events, ...), vote on them, and each
//! community gets a cached markdown digest of the day's activity.
//!
//! Domain types, the vote rule, day windows, aggregation and the digest
//! renderer live in the [`bulletin_core`] crate. This crate hosts them on
//! SQLite and exposes them through the `bulletin` CLI and an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────────┐
//! │   CLI    │──▶│ posts/summary│──▶│  bulletin-core   │
//! │ (bulletin│   │   commands   │   │ digest · vote ·  │
//! └──────────┘   └──────┬───────┘   │ window · render  │
//! ┌──────────┐          │           └────────┬─────────┘
//! │   HTTP   │──────────┘                    │ Store trait
//! │  (axum)  │                       ┌───────▼────────┐
//! └──────────┘                       │  SqliteStore   │
//!                                    │ posts+FTS5     │
//!                                    └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bulletin init
//! bulletin post --user u1 --community riverside --text "Lost cat near the library" --category "Lost & Found"
//! bulletin feed riverside --sort top
//! bulletin summary riverside --date 2024-03-15
//! bulletin serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the store traits |
//! | [`posts`] | Post, vote, moderation and search commands |
//! | [`summary`] | Daily summary commands |
//! | [`stats`] | Database statistics |
//! | [`server`] | HTTP API server |

pub mod config;
pub mod db;
pub mod migrate;
pub mod posts;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod summary;

pub use bulletin_core;
