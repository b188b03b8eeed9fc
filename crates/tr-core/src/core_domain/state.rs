use serde::{Deserialize, Serialize};

use crate::core::RatingSet;

// ---------------------------------------------------------------------------
// Phase / status
// ---------------------------------------------------------------------------

/// Which rating surface is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Turns,
    Conversation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    #[default]
    InProgress,
    Completed,
}

impl AnnotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStatus::InProgress => "in_progress",
            AnnotationStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(AnnotationStatus::InProgress),
            "completed" => Some(AnnotationStatus::Completed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AnnotationState: the session's mutable record
// ---------------------------------------------------------------------------

/// Everything a reviewer has entered for one conversation.
///
/// Serialized as-is for the local cache and the remote annotation record.
/// Every field defaults so partial snapshots from older clients still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationState {
    pub current_phase: Phase,
    pub current_turn_index: usize,
    pub conversation_ratings: RatingSet,
    pub turn_ratings: Vec<RatingSet>,
    pub conversation_comment: String,
    pub turn_comments: Vec<String>,
    pub conversation_skipped: bool,
    pub turn_skipped: Vec<bool>,
    pub status: AnnotationStatus,
}

impl AnnotationState {
    /// Fresh state for a conversation of `unit_count` turn units.
    pub fn for_units(unit_count: usize) -> Self {
        let mut state = Self::default();
        state.fit_to(unit_count);
        state
    }

    /// Reconciles a restored snapshot with the units actually loaded.
    ///
    /// Per-turn vectors are padded or truncated to `unit_count`, the turn
    /// index is clamped into range, and single-unit conversations are pinned
    /// to the conversation phase.
    pub fn fit_to(&mut self, unit_count: usize) {
        self.turn_ratings.resize_with(unit_count, RatingSet::default);
        self.turn_comments.resize_with(unit_count, String::new);
        self.turn_skipped.resize(unit_count, false);

        let last = unit_count.saturating_sub(1);
        self.current_turn_index = self.current_turn_index.min(last);

        if unit_count == 1 {
            self.current_phase = Phase::Conversation;
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnnotationStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
