use std::collections::HashMap;

use tr_core::core::{segment, AnnotationStatus, ProjectId, RatingSet};

use crate::models::{AnnotationFilter, ConversationExport, ExportRecord, TurnExport};
use crate::store::{ReviewStore, ReviewStoreError};

/// Flattens every completed annotation in a project into export records.
///
/// Each annotation yields one conversation record followed by one turn
/// record per turn unit, using the same segmentation the wizard showed.
/// Annotations whose conversation has since been deleted are skipped.
pub fn export_project(
    store: &dyn ReviewStore,
    project_id: &ProjectId,
) -> Result<Vec<ExportRecord>, ReviewStoreError> {
    let filter = AnnotationFilter {
        user_id: None,
        status: Some(AnnotationStatus::Completed),
    };
    let annotations = store.list_annotations(project_id, &filter)?;
    let conversations: HashMap<_, _> = store
        .list_conversations(project_id)?
        .into_iter()
        .map(|conv| (conv.id.clone(), conv))
        .collect();

    let mut records = Vec::new();
    for annotation in annotations {
        let Some(conv) = conversations.get(&annotation.key.conversation_id) else {
            continue;
        };
        let state = &annotation.state;

        records.push(ExportRecord::Conversation(ConversationExport {
            conversation_id: conv.id.clone(),
            project_id: conv.project_id.clone(),
            user_id: annotation.key.user_id.clone(),
            conversation: conv.conversation.clone(),
            conversation_ratings: state.conversation_ratings.clone(),
            conversation_comment: state.conversation_comment.clone(),
            conversation_skipped: state.conversation_skipped,
            annotated_at: annotation.updated_at,
            metadata: conv.metadata.clone(),
        }));

        for (turn_index, unit) in segment(&conv.conversation).into_iter().enumerate() {
            records.push(ExportRecord::Turn(TurnExport {
                conversation_id: conv.id.clone(),
                project_id: conv.project_id.clone(),
                user_id: annotation.key.user_id.clone(),
                turn_index,
                messages: unit.messages().to_vec(),
                turn_ratings: state
                    .turn_ratings
                    .get(turn_index)
                    .cloned()
                    .unwrap_or_else(RatingSet::new),
                turn_comment: state.turn_comments.get(turn_index).cloned().unwrap_or_default(),
                turn_skipped: state.turn_skipped.get(turn_index).copied().unwrap_or(false),
                annotated_at: annotation.updated_at,
                metadata: conv.metadata.clone(),
            }));
        }
    }

    Ok(records)
}

/// Serializes export records as a JSON array.
pub fn export_to_json(records: &[ExportRecord]) -> Result<String, ReviewStoreError> {
    Ok(serde_json::to_string(records)?)
}
