use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tr_core::core::{
    AnnotationKey, AnnotationState, AnnotationStatus, ConversationId, ProjectId, UserId,
};
use tr_store::{AnnotationFilter, ReviewStoreError};

use crate::handler::{json_error, parse_body, require_uuid, run_store, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ListAnnotationsQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
}

fn annotation_key(
    project_id: String,
    conversation_id: String,
    user_id: String,
) -> ApiResult<AnnotationKey> {
    require_uuid("project", &project_id)?;
    require_uuid("conversation", &conversation_id)?;
    Ok(AnnotationKey::new(
        ConversationId::new(conversation_id),
        ProjectId::new(project_id),
        UserId::new(user_id),
    ))
}

/// Full-state overwrite of the reviewer's record; creates it on first write.
pub async fn upsert_annotation(
    State(state): State<Arc<AppState>>,
    Path((project_id, conversation_id, user_id)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let key = annotation_key(project_id, conversation_id, user_id)?;
    let annotation: AnnotationState = parse_body(&body)?;

    let status = annotation.status;
    let log_key = key.clone();
    let record = run_store(&state, "save annotation", move |store| {
        store.upsert_annotation(&key, &annotation)
    })
    .await?;

    if status == AnnotationStatus::Completed {
        tracing::info!(key = %log_key, "annotation submitted");
    } else {
        tracing::debug!(key = %log_key, "annotation saved");
    }
    Ok(Json(record))
}

pub async fn get_annotation(
    State(state): State<Arc<AppState>>,
    Path((project_id, conversation_id, user_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let key = annotation_key(project_id, conversation_id, user_id)?;
    let record = run_store(&state, "load annotation", move |store| {
        store
            .get_annotation(&key)?
            .ok_or_else(|| ReviewStoreError::NotFound(format!("annotation {key}")))
    })
    .await?;
    Ok(Json(record))
}

pub async fn list_annotations(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<ListAnnotationsQuery>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(AnnotationStatus::parse(raw).ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                format!("unknown status: {raw}"),
            )
        })?),
    };
    let filter = AnnotationFilter {
        user_id: query.user_id.map(UserId::new),
        status,
    };

    let id = ProjectId::new(project_id);
    let records = run_store(&state, "list annotations", move |store| {
        store.list_annotations(&id, &filter)
    })
    .await?;
    Ok(Json(records))
}
