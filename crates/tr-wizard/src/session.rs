use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tr_core::core::{
    segment, AnnotationKey, AnnotationRemote, AnnotationState, AnnotationTimer, AnnotationWizard,
    Clock, ConversationSource, CriteriaCatalog, CriterionId, LocalCache, RatingOutcome,
    StoreError, TimerContext, Transition, WizardError,
};

use crate::autosave::AutosaveCoordinator;
use crate::cache::SESSION_CACHE_KEY;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("failed to load conversation: {0}")]
    Load(StoreError),
    #[error("submission failed: {0}")]
    Submit(StoreError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// Where a session's starting state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Remote,
    LocalCache,
    Fresh,
}

pub struct Collaborators {
    pub conversations: Arc<dyn ConversationSource>,
    pub remote: Arc<dyn AnnotationRemote>,
    pub cache: Arc<dyn LocalCache>,
    pub clock: Arc<dyn Clock>,
}

// ---------------------------------------------------------------------------
// AnnotationSession: one reviewer on one conversation
// ---------------------------------------------------------------------------

/// The wizard wired to its persistence.
///
/// Every mutation that changes the wizard state is handed to the autosave
/// coordinator. The annotation timer runs while the session is open.
pub struct AnnotationSession {
    wizard: AnnotationWizard,
    autosave: AutosaveCoordinator,
    timers: TimerContext,
    clock: Arc<dyn Clock>,
    source: RestoreSource,
}

impl AnnotationSession {
    /// Loads the conversation and resumes from remote, then local cache, then empty.
    pub async fn open(
        key: AnnotationKey,
        deps: Collaborators,
        catalog: Arc<CriteriaCatalog>,
        debounce: Duration,
    ) -> Result<Self, SessionError> {
        let messages = deps
            .conversations
            .messages(&key.conversation_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound(_) => {
                    SessionError::ConversationNotFound(key.conversation_id.to_string())
                }
                other => SessionError::Load(other),
            })?;
        let units = segment(&messages);

        let cached = match deps.cache.get(SESSION_CACHE_KEY) {
            Ok(Some(entry)) if entry.key == key => Some(entry),
            Ok(Some(entry)) => {
                tracing::debug!(cached = %entry.key, opening = %key, "ignoring cache entry for another conversation");
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "local cache unreadable");
                None
            }
        };

        let remote_state = match deps.remote.fetch(&key).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "remote annotation fetch failed");
                None
            }
        };

        let timer_record = cached.as_ref().map(|entry| entry.timer).unwrap_or_default();
        let (source, wizard) = match (remote_state, cached) {
            (Some(state), _) => (
                RestoreSource::Remote,
                AnnotationWizard::restore(units, catalog, state)?,
            ),
            (None, Some(entry)) => (
                RestoreSource::LocalCache,
                AnnotationWizard::restore(units, catalog, entry.state)?,
            ),
            (None, None) => (RestoreSource::Fresh, AnnotationWizard::new(units, catalog)?),
        };
        tracing::info!(key = %key, source = ?source, units = wizard.unit_count(), "session opened");

        let mut timer = AnnotationTimer::from_record(timer_record);
        if timer.is_completed() {
            timer.reset();
        }
        let mut timers = TimerContext::new(deps.clock.as_ref(), timer);
        timers.annotation.start(deps.clock.as_ref());

        let autosave = AutosaveCoordinator::spawn(key, deps.cache, deps.remote, debounce);

        Ok(Self {
            wizard,
            autosave,
            timers,
            clock: deps.clock,
            source,
        })
    }

    pub fn wizard(&self) -> &AnnotationWizard {
        &self.wizard
    }

    pub fn key(&self) -> &AnnotationKey {
        self.autosave.key()
    }

    pub fn restored_from(&self) -> RestoreSource {
        self.source
    }

    pub fn annotation_elapsed_ms(&self) -> u64 {
        self.timers.annotation.elapsed_ms(self.clock.as_ref())
    }

    pub fn session_elapsed_ms(&self) -> u64 {
        self.timers.session_elapsed_ms(self.clock.as_ref())
    }

    // -- mutations --

    pub fn rate(&mut self, id: &CriterionId, value: u8) -> Result<RatingOutcome, SessionError> {
        self.tracked(|wizard| wizard.rate(id, value))
    }

    pub fn set_comment(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.tracked(|wizard| wizard.set_comment(text))
    }

    pub fn next(&mut self) -> Result<Transition, SessionError> {
        self.tracked(AnnotationWizard::next)
    }

    pub fn back(&mut self) -> Result<Transition, SessionError> {
        self.tracked(AnnotationWizard::back)
    }

    pub fn skip(&mut self) -> Result<Transition, SessionError> {
        self.tracked(AnnotationWizard::skip)
    }

    pub fn unskip(&mut self) -> Result<(), SessionError> {
        self.tracked(AnnotationWizard::unskip)
    }

    /// Sends the completed annotation. On failure nothing is lost and the
    /// reviewer may call this again.
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        let submission = self.wizard.submission();
        self.autosave
            .submit(&submission)
            .await
            .map_err(SessionError::Submit)?;

        let spent = self.timers.annotation.finish(self.clock.as_ref());
        tracing::info!(key = %self.autosave.key(), elapsed_ms = spent, "annotation completed");
        self.wizard.mark_submitted()?;
        Ok(())
    }

    /// Ends the session with a best-effort flush of unsent changes.
    pub fn close(mut self) -> JoinHandle<()> {
        self.timers.annotation.pause(self.clock.as_ref());
        if self.wizard.state().is_completed() {
            return self.autosave.close(None);
        }
        let timer = self.timers.annotation.record(self.clock.as_ref());
        self.autosave.record(self.wizard.state(), timer);
        self.autosave.close(Some(self.wizard.state()))
    }

    fn tracked<T>(
        &mut self,
        op: impl FnOnce(&mut AnnotationWizard) -> Result<T, WizardError>,
    ) -> Result<T, SessionError> {
        let before = self.wizard.revision();
        let result = op(&mut self.wizard)?;
        if self.wizard.revision() != before {
            let timer = self.timers.annotation.record(self.clock.as_ref());
            self.autosave.record(self.wizard.state(), timer);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for AnnotationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationSession")
            .field("key", self.autosave.key())
            .field("source", &self.source)
            .field("state", self.wizard.state())
            .finish()
    }
}
