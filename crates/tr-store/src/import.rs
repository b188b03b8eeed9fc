use chrono::Utc;
use serde_json::Value;
use tr_core::core::{ConversationId, Message, ProjectId, TurnId};
use uuid::Uuid;

use crate::models::ConversationRecord;
use crate::store::{ReviewStore, ReviewStoreError};

/// Turns an uploaded JSON document into conversation records for `project_id`.
///
/// The payload must be a non-empty array. Every element is an object with a
/// `conversation` array of messages; its remaining fields are kept as metadata.
/// Messages without a `turn_id` (or `turnId`) get a fresh one.
pub fn parse_import(
    project_id: &ProjectId,
    payload: Value,
) -> Result<Vec<ConversationRecord>, ReviewStoreError> {
    let Value::Array(items) = payload else {
        return Err(ReviewStoreError::MalformedImport(
            "expected a JSON array of conversations".to_owned(),
        ));
    };
    if items.is_empty() {
        return Err(ReviewStoreError::MalformedImport(
            "no conversations to import".to_owned(),
        ));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_item(project_id, index, item))
        .collect()
}

fn parse_item(
    project_id: &ProjectId,
    index: usize,
    item: Value,
) -> Result<ConversationRecord, ReviewStoreError> {
    let Value::Object(mut fields) = item else {
        return Err(ReviewStoreError::MalformedImport(format!(
            "item {index} is not an object"
        )));
    };

    let conversation = fields.remove("conversation").ok_or_else(|| {
        ReviewStoreError::MalformedImport(format!("item {index} has no conversation field"))
    })?;
    let messages: Vec<Message> = serde_json::from_value(conversation).map_err(|err| {
        ReviewStoreError::MalformedImport(format!("item {index} has invalid messages: {err}"))
    })?;

    let messages = messages
        .into_iter()
        .map(|message| match message.turn_id {
            Some(_) => message,
            None => message.with_turn_id(TurnId::new(Uuid::new_v4().to_string())),
        })
        .collect();

    // Server-owned fields are never taken from the upload.
    for reserved in ["_id", "id", "project_id", "projectId", "created_at", "updated_at"] {
        fields.remove(reserved);
    }

    let now = Utc::now();
    Ok(ConversationRecord {
        id: ConversationId::new(Uuid::new_v4().to_string()),
        project_id: project_id.clone(),
        conversation: messages,
        metadata: fields,
        created_at: now,
        updated_at: now,
    })
}

/// Validates and stores an upload; nothing is written if any item is malformed.
pub fn import_conversations(
    store: &dyn ReviewStore,
    project_id: &ProjectId,
    payload: Value,
) -> Result<Vec<ConversationId>, ReviewStoreError> {
    if store.get_project(project_id)?.is_none() {
        return Err(ReviewStoreError::NotFound(format!("project {project_id}")));
    }

    let records = parse_import(project_id, payload)?;
    let mut inserted = Vec::with_capacity(records.len());
    for record in &records {
        store.insert_conversation(record)?;
        inserted.push(record.id.clone());
    }
    Ok(inserted)
}
