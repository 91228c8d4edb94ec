//! HTTP API server.
//!
//! Exposes posts, votes, moderation, search and daily summaries as a JSON
//! API for the web client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/posts` | Create a post |
//! | `GET`  | `/posts` | List a feed (`community`, `sort`, `urgency`, `category`, `limit`) |
//! | `GET`  | `/posts/{id}` | Fetch a post |
//! | `POST` | `/posts/{id}/vote` | Vote (`{"user_id": "...", "vote": 1 \| -1 \| 0}`) |
//! | `POST` | `/posts/{id}/status` | Moderate (`{"status": "flagged" \| "removed"}`) |
//! | `GET`  | `/search` | Text search (`q`, `community`, `limit`) |
//! | `GET`  | `/communities/{community}/summary` | Daily summary (`date`, default today) |
//! | `GET`  | `/communities/{community}/summaries` | Past summaries, newest first |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid date '2024-13-01': expected YYYY-MM-DD" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bulletin_core::error::BulletinError;
use bulletin_core::models::{
    Category, FeedQuery, FeedSort, NewPost, Post, PostStatus, Summary, Urgency, VoteOutcome,
};
use bulletin_core::store::Store;

use crate::config::Config;
use crate::posts::{cast_vote, change_status, create_post};
use crate::sqlite_store::SqliteStore;
use crate::summary::daily_summary;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Build the router. Separated from [`run_server`] so tests can drive it
/// without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/posts", post(handle_create_post).get(handle_list_posts))
        .route("/posts/{id}", get(handle_get_post))
        .route("/posts/{id}/vote", post(handle_vote))
        .route("/posts/{id}/status", post(handle_status))
        .route("/search", get(handle_search))
        .route("/communities/{community}/summary", get(handle_summary))
        .route("/communities/{community}/summaries", get(handle_list_summaries))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config.clone(), Arc::new(store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("bulletin server listening on http://{}", bind_addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "conflict",
        message: message.into(),
    }
}

/// Domain errors map to client statuses; anything else (storage, I/O) is a
/// 500 and gets logged.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<BulletinError>() {
            Some(
                e @ (BulletinError::InvalidDate(_)
                | BulletinError::InvalidOffset(_)
                | BulletinError::InvalidInput(_)
                | BulletinError::InvalidVote(_)),
            ) => bad_request(e.to_string()),
            Some(e @ BulletinError::PostNotFound(_)) => not_found(e.to_string()),
            Some(
                e @ (BulletinError::PostNotActive(_) | BulletinError::InvalidTransition { .. }),
            ) => conflict(e.to_string()),
            None => {
                tracing::error!(error = %err, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<BulletinError> for AppError {
    fn from(err: BulletinError) -> Self {
        anyhow::Error::from(err).into()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Posts ============

#[derive(Serialize)]
struct PostsResponse {
    posts: Vec<Post>,
}

async fn handle_create_post(
    State(state): State<AppState>,
    Json(input): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = create_post(state.store.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Deserialize)]
struct FeedParams {
    community: Option<String>,
    sort: Option<String>,
    urgency: Option<String>,
    category: Option<String>,
    limit: Option<i64>,
}

async fn handle_list_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<PostsResponse>, AppError> {
    let query = FeedQuery {
        community: params.community.filter(|c| !c.trim().is_empty()),
        sort: params
            .sort
            .as_deref()
            .map(str::parse::<FeedSort>)
            .transpose()?
            .unwrap_or_default(),
        urgency: params.urgency.as_deref().map(str::parse::<Urgency>).transpose()?,
        category: params
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?,
        limit: state.config.feed.clamp(params.limit),
        ..Default::default()
    };
    let posts = state.store.list_posts(&query).await?;
    Ok(Json(PostsResponse { posts }))
}

async fn handle_get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    state
        .store
        .get_post(&id)
        .await?
        .map(Json)
        .ok_or_else(|| BulletinError::PostNotFound(id).into())
}

#[derive(Deserialize)]
struct VoteRequest {
    user_id: String,
    vote: i64,
}

async fn handle_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>, AppError> {
    let outcome = cast_vote(state.store.as_ref(), &id, &req.user_id, req.vote).await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: String,
}

async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Post>, AppError> {
    let status: PostStatus = req.status.parse()?;
    let post = change_status(state.store.as_ref(), &id, status).await?;
    Ok(Json(post))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    community: Option<String>,
    limit: Option<i64>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PostsResponse>, AppError> {
    let q = params.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }
    let posts = state
        .store
        .search_posts(&q, params.community.as_deref(), state.config.feed.clamp(params.limit))
        .await?;
    Ok(Json(PostsResponse { posts }))
}

// ============ Summaries ============

#[derive(Deserialize)]
struct SummaryParams {
    date: Option<String>,
}

async fn handle_summary(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Summary>, AppError> {
    let summary = daily_summary(
        state.store.as_ref(),
        &state.config,
        &community,
        params.date.as_deref(),
    )
    .await?;
    Ok(Json(summary))
}

#[derive(Serialize)]
struct SummariesResponse {
    summaries: Vec<Summary>,
}

#[derive(Deserialize)]
struct LimitParams {
    limit: Option<i64>,
}

async fn handle_list_summaries(
    State(state): State<AppState>,
    Path(community): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<SummariesResponse>, AppError> {
    let summaries = state
        .store
        .list_summaries(&community, state.config.feed.clamp(params.limit))
        .await?;
    Ok(Json(SummariesResponse { summaries }))
}
