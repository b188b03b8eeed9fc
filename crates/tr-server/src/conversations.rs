use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rand::Rng;
use serde_json::json;
use tr_core::core::{ConversationId, ProjectId};
use tr_store::ReviewStoreError;

use crate::handler::{parse_body, require_uuid, run_store, ApiResult, AppState};

pub async fn import_conversations(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let payload: serde_json::Value = parse_body(&body)?;
    let id = ProjectId::new(project_id);

    let log_id = id.clone();
    let inserted = run_store(&state, "import conversations", move |store| {
        tr_store::import_conversations(store, &id, payload)
    })
    .await?;
    tracing::info!(project_id = %log_id, count = inserted.len(), "conversations imported");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "inserted": inserted.len(),
            "conversation_ids": inserted,
        })),
    ))
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let id = ProjectId::new(project_id);
    let conversations = run_store(&state, "list conversations", move |store| {
        store.list_conversations(&id)
    })
    .await?;
    Ok(Json(conversations))
}

/// A uniformly random conversation of the project.
pub async fn next_conversation(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("project", &project_id)?;
    let id = ProjectId::new(project_id);
    let conversation = run_store(&state, "pick conversation", move |store| {
        let count = store.count_conversations(&id)?;
        if count == 0 {
            return Err(ReviewStoreError::NotFound(format!(
                "conversations in project {id}"
            )));
        }
        let offset = rand::rng().random_range(0..count);
        store
            .conversation_at(&id, offset)?
            .ok_or_else(|| ReviewStoreError::NotFound(format!("conversations in project {id}")))
    })
    .await?;
    Ok(Json(conversation))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("conversation", &conversation_id)?;
    let id = ConversationId::new(conversation_id);
    let conversation = run_store(&state, "load conversation", move |store| {
        store
            .get_conversation(&id)?
            .ok_or_else(|| ReviewStoreError::NotFound(format!("conversation {id}")))
    })
    .await?;
    Ok(Json(conversation))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_uuid("conversation", &conversation_id)?;
    let id = ConversationId::new(conversation_id);
    let log_id = id.clone();
    run_store(&state, "delete conversation", move |store| {
        store.delete_conversation(&id)
    })
    .await?;
    tracing::info!(conversation_id = %log_id, "conversation deleted");
    Ok(StatusCode::NO_CONTENT)
}
