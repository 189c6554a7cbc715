//! HTTP surface.  Routes are grouped by actor: authors (`/user`), journal
//! editors (`/journal`) and administrators (`/admin`).

mod admin;
mod journal;
mod user;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts},
    http::Method,
    routing::{delete, get, post},
    Json, Router,
};
use referee_store::{Database, Listing};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::peers::{LocalDirectory, LogNotifier};
use crate::service::{SharedDb, WorkflowService};
use crate::workflow::Workflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the service, the local peers and the workflow over one database.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let db: SharedDb = Arc::new(std::sync::Mutex::new(db));
        let workflow = Workflow::new(
            WorkflowService::new(db.clone()),
            Arc::new(LocalDirectory::new(db)),
            Arc::new(LogNotifier),
            config.default_reviewer_password.clone(),
        );
        Self {
            workflow: Arc::new(workflow),
            config: Arc::new(config),
        }
    }

    pub fn service(&self) -> &WorkflowService {
        self.workflow.service()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Author / self-service
        .route(
            "/user/{user_id}/draft",
            post(user::create_draft)
                .put(user::update_draft)
                .get(user::list_drafts),
        )
        .route(
            "/user/{user_id}/draft/{draft_id}",
            get(user::get_draft).delete(user::delete_draft),
        )
        .route(
            "/user/{user_id}/draft/{draft_id}/file",
            post(user::add_file)
                .get(user::list_files)
                .delete(user::delete_files),
        )
        .route(
            "/user/{user_id}/draft/{draft_id}/co-author",
            post(user::add_co_author)
                .get(user::list_co_authors)
                .delete(user::delete_co_authors),
        )
        .route(
            "/user/{user_id}/review",
            get(user::list_reviews).put(user::submit_review),
        )
        // Journal-scoped
        .route("/journal/{journal_id}/draft", get(journal::list_drafts))
        .route(
            "/journal/{journal_id}/draft/{draft_id}",
            get(journal::get_draft),
        )
        .route(
            "/journal/{journal_id}/draft/{draft_id}/check",
            post(journal::create_check)
                .put(journal::update_check)
                .get(journal::list_checks),
        )
        .route(
            "/journal/{journal_id}/draft/{draft_id}/check/{check_id}",
            get(journal::get_check).delete(journal::delete_check),
        )
        .route(
            "/journal/{journal_id}/draft/{draft_id}/reviewer",
            post(journal::assign_reviewer),
        )
        .route(
            "/journal/{journal_id}/draft/{draft_id}/reviewer/{reviewer_id}",
            delete(journal::remove_reviewer),
        )
        .route(
            "/journal/{journal_id}/draft/{draft_id}/review",
            get(journal::list_reviews),
        )
        .route(
            "/journal/{journal_id}/draft/{draft_id}/review/{review_id}",
            get(journal::get_review),
        )
        // Administrative
        .route(
            "/admin/draft",
            get(admin::list_drafts).put(admin::update_draft),
        )
        .route("/admin/draft/{draft_id}", delete(admin::delete_draft))
        .route(
            "/admin/checker/{checker_id}/check",
            delete(admin::delete_checks_by_checker),
        )
        .route(
            "/admin/reviewer/{reviewer_id}/review",
            delete(admin::delete_reviews_by_reviewer),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Extractors and shared response bodies
// ---------------------------------------------------------------------------

/// JSON body whose rejection renders the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection renders the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServerError))]
pub struct ApiQuery<T>(pub T);

/// `{data, count}` list envelope.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub count: i64,
}

impl<T> From<Listing<T>> for ListResponse<T> {
    fn from(listing: Listing<T>) -> Self {
        Self {
            data: listing.items,
            count: listing.count,
        }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        let count = data.len() as i64;
        Self { data, count }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsAffected {
    pub rows_affected: usize,
}

/// Parse a path identifier.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| ServerError::BadRequest(format!("Invalid {what} {raw:?}: {e}")))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
