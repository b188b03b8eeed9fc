use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tr_core::core::{ProjectId, UserId};
use tr_store::ReviewStoreError;

use crate::handler::{json_error, parse_body, require_uuid, run_store, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request: CreateProjectRequest = parse_body(&body)?;
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "project name must not be empty",
        ));
    }

    let project = run_store(&state, "create project", move |store| {
        store.create_project(&name)
    })
    .await?;
    tracing::info!(project_id = %project.id, name = %project.name, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let projects = run_store(&state, "list projects", |store| store.list_projects()).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let id = ProjectId::new(project_id);
    let project = run_store(&state, "load project", move |store| {
        store
            .get_project(&id)?
            .ok_or_else(|| ReviewStoreError::NotFound(format!("project {id}")))
    })
    .await?;
    Ok(Json(project))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let request: AddMemberRequest = parse_body(&body)?;
    let user = request.user_id.trim().to_owned();
    if user.is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "user_id must not be empty",
        ));
    }

    let id = ProjectId::new(project_id);
    let project = run_store(&state, "add member", move |store| {
        store.add_member(&id, &UserId::new(user))?;
        store
            .get_project(&id)?
            .ok_or_else(|| ReviewStoreError::NotFound(format!("project {id}")))
    })
    .await?;
    Ok(Json(project))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path((project_id, user_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let id = ProjectId::new(project_id);
    let user = UserId::new(user_id);
    run_store(&state, "remove member", move |store| {
        store.remove_member(&id, &user)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Completed annotations of the project, flattened for downstream training.
pub async fn export_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let id = ProjectId::new(project_id);
    let records = run_store(&state, "export project", move |store| {
        if store.get_project(&id)?.is_none() {
            return Err(ReviewStoreError::NotFound(format!("project {id}")));
        }
        tr_store::export_project(store, &id)
    })
    .await?;
    Ok(Json(records))
}
