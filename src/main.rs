//! # Community Bulletin CLI (`bulletin`)
//!
//! ## Usage
//!
//! ```bash
//! bulletin --config ./config/bulletin.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bulletin init` | Create the SQLite database and run schema migrations |
//! | `bulletin post` | Create a post |
//! | `bulletin get <id>` | Show a post |
//! | `bulletin feed <community>` | List a community feed |
//! | `bulletin vote <post-id>` | Up/down vote or retract a vote |
//! | `bulletin status <post-id> <status>` | Flag or remove a post |
//! | `bulletin search "<query>"` | Full-text search over active posts |
//! | `bulletin summary <community>` | Get or create the daily summary |
//! | `bulletin summaries <community>` | List stored summaries |
//! | `bulletin stats` | Database overview |
//! | `bulletin serve` | Start the HTTP API server |

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use community_bulletin::bulletin_core::models::{
    Category, FeedSort, NewPost, PostStatus, Urgency,
};
use community_bulletin::{config, migrate, posts, server, stats, summary};

/// Community Bulletin: neighborhood posts, votes and daily digests.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/bulletin.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "bulletin", version, about = "Community bulletin board with daily digests")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bulletin.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Create a post.
    Post {
        /// Author id.
        #[arg(long)]
        user: String,

        #[arg(long)]
        community: String,

        /// Post body.
        #[arg(long)]
        text: String,

        /// `Safety`, `Lost & Found`, `Events`, `Public Works` or `General`.
        #[arg(long, default_value = "General")]
        category: Category,

        #[arg(long, default_value_t = 0.0)]
        category_score: f64,

        /// `normal`, `urgent` or `emergency`.
        #[arg(long, default_value = "normal")]
        urgency: Urgency,

        #[arg(long, default_value_t = 0.0)]
        urgency_score: f64,

        /// Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Repeatable.
        #[arg(long = "entity")]
        entities: Vec<String>,

        #[arg(long)]
        image_url: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Backdate the post (RFC 3339, e.g. `2024-03-15T09:30:00Z`).
        #[arg(long)]
        at: Option<String>,
    },

    /// Show a post by id.
    Get { id: String },

    /// List a community feed.
    Feed {
        community: String,

        /// `new` (newest first) or `top` (most upvoted first).
        #[arg(long, default_value = "new")]
        sort: FeedSort,

        #[arg(long)]
        urgency: Option<Urgency>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Vote on a post: 1 (up), -1 (down) or 0 (retract).
    ///
    /// Repeating the same vote removes it.
    Vote {
        post_id: String,

        #[arg(long)]
        user: String,

        #[arg(long, allow_hyphen_values = true)]
        value: i64,
    },

    /// Change a post's moderation status (`flagged` or `removed`).
    Status { post_id: String, status: PostStatus },

    /// Full-text search over active posts.
    Search {
        query: String,

        #[arg(long)]
        community: Option<String>,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Get or create the daily summary for a community.
    Summary {
        community: String,

        /// Day to summarize (YYYY-MM-DD). Defaults to today in the
        /// configured `[digest].utc_offset`.
        #[arg(long)]
        date: Option<String>,
    },

    /// List stored summaries for a community, newest first.
    Summaries {
        community: String,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show database statistics.
    Stats,

    /// Start the HTTP API server on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "community_bulletin=debug,bulletin_core=debug,tower_http=debug"
    } else {
        "community_bulletin=info,bulletin_core=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_at(at: Option<String>) -> anyhow::Result<Option<DateTime<Utc>>> {
    at.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("invalid --at '{}': expected RFC 3339", s))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Post {
            user,
            community,
            text,
            category,
            category_score,
            urgency,
            urgency_score,
            tags,
            entities,
            image_url,
            location,
            at,
        } => {
            let input = NewPost {
                user_id: user,
                community,
                text,
                image_url,
                category,
                category_score,
                entities,
                tags,
                urgency,
                urgency_score,
                location,
                created_at: parse_at(at)?,
            };
            posts::run_post(&cfg, input).await?;
        }
        Commands::Get { id } => {
            posts::run_get(&cfg, &id).await?;
        }
        Commands::Feed {
            community,
            sort,
            urgency,
            category,
            limit,
        } => {
            posts::run_feed(&cfg, &community, sort, urgency, category, limit).await?;
        }
        Commands::Vote {
            post_id,
            user,
            value,
        } => {
            posts::run_vote(&cfg, &post_id, &user, value).await?;
        }
        Commands::Status { post_id, status } => {
            posts::run_status(&cfg, &post_id, status).await?;
        }
        Commands::Search {
            query,
            community,
            limit,
        } => {
            posts::run_search(&cfg, &query, community, limit).await?;
        }
        Commands::Summary { community, date } => {
            summary::run_summary(&cfg, &community, date).await?;
        }
        Commands::Summaries { community, limit } => {
            summary::run_list_summaries(&cfg, &community, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
