use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tr_core::core::{
    AnnotationKey, AnnotationState, AnnotationStatus, ConversationId, Message, ProjectId,
    RatingSet, UserId,
};

/// A group of conversations and the reviewers allowed to annotate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A stored conversation plus whatever extra fields came with the import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub project_id: ProjectId,
    pub conversation: Vec<Message>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The annotation document filed under a (conversation, project, user) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(flatten)]
    pub key: AnnotationKey,
    pub state: AnnotationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationFilter {
    pub user_id: Option<UserId>,
    pub status: Option<AnnotationStatus>,
}

/// Annotation counts for one reviewer in one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub total_conversations: u64,
    pub annotated_count: u64,
}

/// One row of a project export.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExportRecord {
    Conversation(ConversationExport),
    Turn(TurnExport),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationExport {
    pub conversation_id: ConversationId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub conversation: Vec<Message>,
    pub conversation_ratings: RatingSet,
    pub conversation_comment: String,
    pub conversation_skipped: bool,
    pub annotated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnExport {
    pub conversation_id: ConversationId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub turn_index: usize,
    pub messages: Vec<Message>,
    pub turn_ratings: RatingSet,
    pub turn_comment: String,
    pub turn_skipped: bool,
    pub annotated_at: DateTime<Utc>,
    /// The conversation's import metadata, repeated on every turn.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
