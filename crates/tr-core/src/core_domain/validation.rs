use crate::core::{AnnotationState, CriteriaCatalog, Phase, RatingSet, Surface};

/// Verdict of the validation gate for a forward transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Ok,
    /// Labels of the unrated criteria, in display order.
    Blocked { missing_labels: Vec<String> },
}

impl Advance {
    pub fn is_ok(&self) -> bool {
        matches!(self, Advance::Ok)
    }
}

/// Checks whether the active rating set is fully rated. Never mutates state.
pub fn can_advance(state: &AnnotationState, catalog: &CriteriaCatalog) -> Advance {
    let (surface, ratings) = active_ratings(state);
    let missing_labels: Vec<String> = ratings
        .map(|r| r.missing(catalog.set(surface)))
        .unwrap_or_else(|| catalog.set(surface).criteria().collect())
        .into_iter()
        .map(|c| c.label.clone())
        .collect();

    if missing_labels.is_empty() {
        Advance::Ok
    } else {
        Advance::Blocked { missing_labels }
    }
}

/// The rating set the current phase edits, with the surface its criteria come from.
///
/// `None` when the turn index has no rating set yet (treated as all unrated).
pub(crate) fn active_ratings(state: &AnnotationState) -> (Surface, Option<&RatingSet>) {
    match state.current_phase {
        Phase::Conversation => (Surface::Conversation, Some(&state.conversation_ratings)),
        Phase::Turns => (
            Surface::Turn,
            state.turn_ratings.get(state.current_turn_index),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
