use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tr_core::core::{CriteriaCatalog, UserId};
use tr_store::{ReviewStore, ReviewStoreError};

use crate::{annotations, conversations, projects};

pub type ApiError = (StatusCode, Json<serde_json::Value>);
pub type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// AppState: shared state for all handlers
// ---------------------------------------------------------------------------

pub struct AppState {
    pub store: Arc<dyn ReviewStore>,
    pub catalog: Arc<CriteriaCatalog>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/criteria", get(get_criteria))
        .route("/api/progress", get(get_progress))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/api/projects/{project_id}", get(projects::get_project))
        .route(
            "/api/projects/{project_id}/members",
            post(projects::add_member),
        )
        .route(
            "/api/projects/{project_id}/members/{user_id}",
            delete(projects::remove_member),
        )
        .route(
            "/api/projects/{project_id}/export",
            get(projects::export_project),
        )
        .route(
            "/api/projects/{project_id}/conversations",
            get(conversations::list_conversations).post(conversations::import_conversations),
        )
        .route(
            "/api/projects/{project_id}/conversations/next",
            get(conversations::next_conversation),
        )
        .route(
            "/api/conversations/{conversation_id}",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/api/projects/{project_id}/annotations",
            get(annotations::list_annotations),
        )
        .route(
            "/api/projects/{project_id}/conversations/{conversation_id}/annotations/{user_id}",
            get(annotations::get_annotation).put(annotations::upsert_annotation),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Catalog and progress
// ---------------------------------------------------------------------------

pub async fn get_criteria(State(state): State<Arc<AppState>>) -> Json<CriteriaCatalog> {
    Json(state.catalog.as_ref().clone())
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub user_id: Option<String>,
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<impl IntoResponse> {
    let user_id = query.user_id.map(UserId::new);
    let progress = run_store(&state, "progress", move |store| {
        tr_store::project_progress(store, user_id.as_ref())
    })
    .await?;
    Ok(Json(progress))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Runs a blocking store call off the async runtime.
pub async fn run_store<T, F>(state: &AppState, op: &'static str, f: F) -> ApiResult<T>
where
    F: FnOnce(&dyn ReviewStore) -> Result<T, ReviewStoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|err| {
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                format!("failed to join {op} task: {err}"),
            )
        })?
        .map_err(|err| store_error(op, err))
}

pub fn store_error(op: &'static str, err: ReviewStoreError) -> ApiError {
    match err {
        ReviewStoreError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found_error", format!("not found: {what}"))
        }
        ReviewStoreError::MalformedImport(reason) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            format!("malformed input: {reason}"),
        ),
        other => {
            tracing::error!(op, error = %other, "store operation failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                format!("failed to {op}: {other}"),
            )
        }
    }
}

/// Parses a JSON request body, answering 400 on failure.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|err| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            format!("invalid request body: {err}"),
        )
    })
}

/// Rejects ids that were not minted by this server.
pub fn require_uuid(kind: &str, value: &str) -> ApiResult<()> {
    uuid::Uuid::parse_str(value).map(|_| ()).map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            format!("invalid {kind} id: {value}"),
        )
    })
}

pub fn json_error(
    status: StatusCode,
    error_type: &'static str,
    message: impl Into<String>,
) -> ApiError {
    let message = message.into();
    (
        status,
        Json(json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": status.as_u16(),
            }
        })),
    )
}
