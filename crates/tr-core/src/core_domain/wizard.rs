use std::sync::Arc;

use crate::core::{
    can_advance, validation::active_ratings, Advance, AnnotationState, AnnotationStatus,
    CriteriaCatalog, CriteriaSet, CriterionId, Phase, RatingSet, Surface, TurnUnit, WizardError,
};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a navigation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Moved { phase: Phase, turn_index: usize },
    /// Nothing to do (e.g. Back on the first step).
    Stayed,
    /// Forward move refused; the advisory lists what is still unrated.
    Blocked { missing_labels: Vec<String> },
    /// The reviewer should confirm the final submission.
    ReadyToSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingOutcome {
    /// Value after the toggle; `None` when the click cleared it.
    pub value: Option<u8>,
    /// The edited rating set is now fully rated.
    pub surface_complete: bool,
    /// A skip flag lapsed because of this rating.
    pub skip_cleared: bool,
}

/// Step counter for the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current_step: usize,
    pub total_steps: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total_steps == 0 {
            return 0;
        }
        let pct = (self.current_step as f64 / self.total_steps as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

// ---------------------------------------------------------------------------
// AnnotationWizard: the progress state machine
// ---------------------------------------------------------------------------

/// Drives one reviewer through the turn units of a conversation and then the
/// conversation-level ratings.
///
/// Forward moves go through the validation gate; Back and Skip do not.
/// Every state change bumps [`revision`](Self::revision) so callers can mirror
/// the state after mutations only.
pub struct AnnotationWizard {
    units: Vec<TurnUnit>,
    catalog: Arc<CriteriaCatalog>,
    state: AnnotationState,
    revision: u64,
}

impl AnnotationWizard {
    pub fn new(units: Vec<TurnUnit>, catalog: Arc<CriteriaCatalog>) -> Result<Self, WizardError> {
        let state = AnnotationState::for_units(units.len());
        Self::restore(units, catalog, state)
    }

    /// Resumes from a saved snapshot.
    ///
    /// Out-of-range indices are clamped and per-turn data is resized to the
    /// loaded units. A previously submitted snapshot is reopened for editing;
    /// submitting again overwrites the earlier record.
    pub fn restore(
        units: Vec<TurnUnit>,
        catalog: Arc<CriteriaCatalog>,
        mut state: AnnotationState,
    ) -> Result<Self, WizardError> {
        if units.is_empty() {
            return Err(WizardError::NothingToAnnotate);
        }
        state.fit_to(units.len());
        state.status = AnnotationStatus::InProgress;

        Ok(Self {
            units,
            catalog,
            state,
            revision: 0,
        })
    }

    pub fn state(&self) -> &AnnotationState {
        &self.state
    }

    pub fn units(&self) -> &[TurnUnit] {
        &self.units
    }

    pub fn catalog(&self) -> &CriteriaCatalog {
        &self.catalog
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_single_unit(&self) -> bool {
        self.units.len() == 1
    }

    /// The unit on screen during the Turns phase.
    pub fn current_unit(&self) -> Option<&TurnUnit> {
        match self.state.current_phase {
            Phase::Turns => self.units.get(self.state.current_turn_index),
            Phase::Conversation => None,
        }
    }

    /// Criteria the active phase is rated against.
    pub fn active_criteria(&self) -> &CriteriaSet {
        self.catalog.set(active_ratings(&self.state).0)
    }

    /// Ratings of the active phase.
    pub fn active_ratings(&self) -> &RatingSet {
        match self.state.current_phase {
            Phase::Conversation => &self.state.conversation_ratings,
            Phase::Turns => &self.state.turn_ratings[self.state.current_turn_index],
        }
    }

    pub fn active_comment(&self) -> &str {
        match self.state.current_phase {
            Phase::Conversation => &self.state.conversation_comment,
            Phase::Turns => &self.state.turn_comments[self.state.current_turn_index],
        }
    }

    pub fn active_skipped(&self) -> bool {
        match self.state.current_phase {
            Phase::Conversation => self.state.conversation_skipped,
            Phase::Turns => self.state.turn_skipped[self.state.current_turn_index],
        }
    }

    pub fn progress(&self) -> Progress {
        if self.is_single_unit() {
            return Progress {
                current_step: 1,
                total_steps: 1,
            };
        }
        let total_steps = self.units.len() + 1;
        let current_step = match self.state.current_phase {
            Phase::Turns => self.state.current_turn_index + 1,
            Phase::Conversation => total_steps,
        };
        Progress {
            current_step,
            total_steps,
        }
    }

    pub fn validate(&self) -> Advance {
        can_advance(&self.state, &self.catalog)
    }

    // -- mutations --

    /// Toggles a rating on the active surface, then lets a satisfied skip flag lapse.
    pub fn rate(&mut self, id: &CriterionId, value: u8) -> Result<RatingOutcome, WizardError> {
        self.ensure_open()?;
        let catalog = Arc::clone(&self.catalog);
        let index = self.state.current_turn_index;

        let (surface, ratings) = match self.state.current_phase {
            Phase::Conversation => (Surface::Conversation, &mut self.state.conversation_ratings),
            Phase::Turns => (Surface::Turn, &mut self.state.turn_ratings[index]),
        };
        let criteria = catalog.set(surface);
        let value = ratings.toggle(criteria, id, value)?;
        let surface_complete = ratings.is_complete(criteria);
        self.bump();

        let skip_cleared = surface_complete && self.clear_active_skip();

        Ok(RatingOutcome {
            value,
            surface_complete,
            skip_cleared,
        })
    }

    pub fn set_comment(&mut self, text: impl Into<String>) -> Result<(), WizardError> {
        self.ensure_open()?;
        let index = self.state.current_turn_index;
        let slot = match self.state.current_phase {
            Phase::Conversation => &mut self.state.conversation_comment,
            Phase::Turns => &mut self.state.turn_comments[index],
        };
        *slot = text.into();
        self.bump();
        Ok(())
    }

    pub fn next(&mut self) -> Result<Transition, WizardError> {
        self.ensure_open()?;
        if let Advance::Blocked { missing_labels } = self.validate() {
            return Ok(Transition::Blocked { missing_labels });
        }

        Ok(match self.state.current_phase {
            Phase::Turns => self.advance_turn(),
            Phase::Conversation => Transition::ReadyToSubmit,
        })
    }

    pub fn back(&mut self) -> Result<Transition, WizardError> {
        self.ensure_open()?;
        let index = self.state.current_turn_index;

        Ok(match self.state.current_phase {
            Phase::Turns if index > 0 => self.move_to(Phase::Turns, index - 1),
            Phase::Turns => Transition::Stayed,
            Phase::Conversation if self.is_single_unit() => Transition::Stayed,
            Phase::Conversation => self.move_to(Phase::Turns, self.units.len() - 1),
        })
    }

    /// Flags the active surface as intentionally unrated and moves on.
    pub fn skip(&mut self) -> Result<Transition, WizardError> {
        self.ensure_open()?;

        Ok(match self.state.current_phase {
            Phase::Turns => {
                let index = self.state.current_turn_index;
                self.state.turn_skipped[index] = true;
                self.bump();
                self.advance_turn()
            }
            Phase::Conversation => {
                self.state.conversation_skipped = true;
                self.bump();
                if self.is_single_unit() {
                    Transition::ReadyToSubmit
                } else {
                    self.move_to(Phase::Turns, 0)
                }
            }
        })
    }

    pub fn unskip(&mut self) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.clear_active_skip() {
            self.bump();
        }
        Ok(())
    }

    /// The record to send as the final submission. Does not change the session.
    pub fn submission(&self) -> AnnotationState {
        AnnotationState {
            status: AnnotationStatus::Completed,
            ..self.state.clone()
        }
    }

    /// Marks the session finished once the submission has been stored.
    pub fn mark_submitted(&mut self) -> Result<&AnnotationState, WizardError> {
        self.ensure_open()?;
        self.state.status = AnnotationStatus::Completed;
        self.bump();
        Ok(&self.state)
    }

    // -- internals --

    fn advance_turn(&mut self) -> Transition {
        let index = self.state.current_turn_index;
        if index + 1 < self.units.len() {
            self.move_to(Phase::Turns, index + 1)
        } else {
            self.move_to(Phase::Conversation, index)
        }
    }

    fn move_to(&mut self, phase: Phase, turn_index: usize) -> Transition {
        self.state.current_phase = phase;
        self.state.current_turn_index = turn_index;
        self.bump();
        Transition::Moved { phase, turn_index }
    }

    fn clear_active_skip(&mut self) -> bool {
        let index = self.state.current_turn_index;
        let flag = match self.state.current_phase {
            Phase::Conversation => &mut self.state.conversation_skipped,
            Phase::Turns => &mut self.state.turn_skipped[index],
        };
        std::mem::replace(flag, false)
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.state.is_completed() {
            Err(WizardError::AlreadyCompleted)
        } else {
            Ok(())
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
