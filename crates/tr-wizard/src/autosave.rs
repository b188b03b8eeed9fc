use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tr_core::core::{
    AnnotationKey, AnnotationRemote, AnnotationState, CachedSession, LocalCache, StoreError,
    TimerRecord,
};

use crate::cache::SESSION_CACHE_KEY;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

enum Intent {
    Save(AnnotationState),
    Submit(AnnotationState, oneshot::Sender<Result<(), StoreError>>),
}

// ---------------------------------------------------------------------------
// AutosaveCoordinator: local mirror plus debounced remote save
// ---------------------------------------------------------------------------

/// Persists every state change of one annotation session.
///
/// Each change is written to the local cache immediately and queued for the
/// remote store. A background task sends the newest queued state once no
/// change has arrived for the debounce interval. Remote save failures are
/// logged and dropped; the local cache keeps the latest state.
///
/// The final submission goes through the same task, so no pending or
/// in-flight autosave can land after it.
pub struct AutosaveCoordinator {
    key: AnnotationKey,
    cache: Arc<dyn LocalCache>,
    intents: mpsc::UnboundedSender<Intent>,
    worker: JoinHandle<()>,
}

impl AutosaveCoordinator {
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        key: AnnotationKey,
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn AnnotationRemote>,
        debounce: Duration,
    ) -> Self {
        let (intents, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_saver(rx, remote, key.clone(), debounce));

        Self {
            key,
            cache,
            intents,
            worker,
        }
    }

    pub fn key(&self) -> &AnnotationKey {
        &self.key
    }

    /// Mirrors `state` locally and schedules a remote save.
    pub fn record(&self, state: &AnnotationState, timer: TimerRecord) {
        let entry = CachedSession {
            key: self.key.clone(),
            state: state.clone(),
            timer,
        };
        if let Err(err) = self.cache.set(SESSION_CACHE_KEY, &entry) {
            tracing::warn!(key = %self.key, error = %err, "local cache write failed");
        }

        if self.intents.send(Intent::Save(entry.state)).is_err() {
            tracing::debug!(key = %self.key, "autosave task gone, remote save dropped");
        }
    }

    /// Sends the final state and, on success, clears the local cache.
    ///
    /// Any autosave still waiting for its quiet period is discarded. On
    /// failure the cache is left in place so the reviewer can resubmit.
    pub async fn submit(&self, state: &AnnotationState) -> Result<(), StoreError> {
        let (reply, outcome) = oneshot::channel();
        self.intents
            .send(Intent::Submit(state.clone(), reply))
            .map_err(|_| StoreError::Unavailable("autosave task stopped".to_owned()))?;

        outcome
            .await
            .map_err(|_| StoreError::Unavailable("autosave task stopped".to_owned()))??;

        if let Err(err) = self.cache.delete(SESSION_CACHE_KEY) {
            tracing::warn!(key = %self.key, error = %err, "failed to clear local cache");
        }
        tracing::info!(key = %self.key, "annotation submitted");
        Ok(())
    }

    /// Best-effort final flush on teardown.
    ///
    /// Queues `state` (when given) and lets the background task send it right
    /// away instead of waiting out the debounce. Callers may await the handle
    /// with a deadline or drop it; delivery is not guaranteed either way.
    pub fn close(self, state: Option<&AnnotationState>) -> JoinHandle<()> {
        if let Some(state) = state {
            let _ = self.intents.send(Intent::Save(state.clone()));
        }
        drop(self.intents);
        self.worker
    }
}

async fn run_saver(
    mut rx: mpsc::UnboundedReceiver<Intent>,
    remote: Arc<dyn AnnotationRemote>,
    key: AnnotationKey,
    debounce: Duration,
) {
    let mut pending: Option<AnnotationState> = None;

    loop {
        let intent = if pending.is_some() {
            tokio::select! {
                intent = rx.recv() => intent,
                _ = tokio::time::sleep(debounce) => {
                    if let Some(state) = pending.take() {
                        save(remote.as_ref(), &key, &state).await;
                    }
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match intent {
            Some(Intent::Save(state)) => pending = Some(state),
            Some(Intent::Submit(state, reply)) => {
                pending = None;
                let result = remote.upsert(&key, &state).await;
                let _ = reply.send(result);
            }
            None => {
                if let Some(state) = pending.take() {
                    save(remote.as_ref(), &key, &state).await;
                }
                break;
            }
        }
    }
}

async fn save(remote: &dyn AnnotationRemote, key: &AnnotationKey, state: &AnnotationState) {
    match remote.upsert(key, state).await {
        Ok(()) => tracing::debug!(key = %key, "autosaved"),
        Err(err) => tracing::warn!(key = %key, error = %err, "autosave failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tr_core::core::{ConversationId, PortFuture, ProjectId, UserId};

    use super::*;

    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<std::collections::HashMap<String, CachedSession>>,
    }

    impl LocalCache for MemoryCache {
        fn get(&self, key: &str) -> Result<Option<CachedSession>, StoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, entry: &CachedSession) -> Result<(), StoreError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_owned(), entry.clone());
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRemote {
        saved: Mutex<Vec<AnnotationState>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingRemote {
        fn saved(&self) -> Vec<AnnotationState> {
            self.saved.lock().unwrap().clone()
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl AnnotationRemote for RecordingRemote {
        fn fetch<'a>(&'a self, _key: &'a AnnotationKey) -> PortFuture<'a, Option<AnnotationState>> {
            Box::pin(async { Ok(None) })
        }

        fn upsert<'a>(
            &'a self,
            _key: &'a AnnotationKey,
            state: &'a AnnotationState,
        ) -> PortFuture<'a, ()> {
            Box::pin(async move {
                if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                    return Err(StoreError::Unavailable("offline".to_owned()));
                }
                self.saved.lock().unwrap().push(state.clone());
                Ok(())
            })
        }
    }

    fn key() -> AnnotationKey {
        AnnotationKey::new(
            ConversationId::new("c1"),
            ProjectId::new("p1"),
            UserId::new("u1"),
        )
    }

    fn state_with_comment(text: &str) -> AnnotationState {
        let mut state = AnnotationState::for_units(1);
        state.conversation_comment = text.to_owned();
        state
    }

    fn setup() -> (AutosaveCoordinator, Arc<MemoryCache>, Arc<RecordingRemote>) {
        let cache = Arc::new(MemoryCache::default());
        let remote = Arc::new(RecordingRemote::default());
        let coordinator = AutosaveCoordinator::spawn(
            key(),
            cache.clone(),
            remote.clone(),
            Duration::from_millis(1000),
        );
        (coordinator, cache, remote)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    /// Lets the saver pick up queued intents, then moves the paused clock.
    async fn advance(ms: u64) {
        settle().await;
        tokio::time::advance(Duration::from_millis(ms)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_mirror_is_synchronous() {
        let (coordinator, cache, remote) = setup();

        coordinator.record(&state_with_comment("a"), TimerRecord::default());

        let entry = cache.get(SESSION_CACHE_KEY).unwrap().expect("cached");
        assert_eq!(entry.key, key());
        assert_eq!(entry.state.conversation_comment, "a");
        assert!(remote.saved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_bursts() {
        let (coordinator, _cache, remote) = setup();

        coordinator.record(&state_with_comment("a"), TimerRecord::default());
        advance(400).await;
        coordinator.record(&state_with_comment("ab"), TimerRecord::default());
        advance(400).await;
        coordinator.record(&state_with_comment("abc"), TimerRecord::default());
        advance(900).await;
        assert!(remote.saved().is_empty(), "quiet period restarted on each change");

        advance(200).await;
        let saved = remote.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].conversation_comment, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_is_swallowed() {
        let (coordinator, cache, remote) = setup();
        remote.set_failing(true);

        coordinator.record(&state_with_comment("offline edit"), TimerRecord::default());
        advance(1_100).await;
        assert!(remote.saved().is_empty());
        assert!(cache.get(SESSION_CACHE_KEY).unwrap().is_some());

        remote.set_failing(false);
        coordinator.record(&state_with_comment("back online"), TimerRecord::default());
        advance(1_100).await;
        assert_eq!(remote.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_discards_pending_and_clears_cache() {
        let (coordinator, cache, remote) = setup();

        coordinator.record(&state_with_comment("draft"), TimerRecord::default());
        let mut done = state_with_comment("final");
        done.status = tr_core::core::AnnotationStatus::Completed;
        coordinator.submit(&done).await.expect("submit");

        advance(2_000).await;
        let saved = remote.saved();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].is_completed());
        assert!(cache.get(SESSION_CACHE_KEY).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submit_keeps_cache() {
        let (coordinator, cache, remote) = setup();
        coordinator.record(&state_with_comment("draft"), TimerRecord::default());
        remote.set_failing(true);

        let err = coordinator
            .submit(&state_with_comment("final"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(cache.get(SESSION_CACHE_KEY).unwrap().is_some());

        remote.set_failing(false);
        coordinator
            .submit(&state_with_comment("final"))
            .await
            .expect("resubmit");
        assert!(cache.get(SESSION_CACHE_KEY).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_without_waiting() {
        let (coordinator, _cache, remote) = setup();

        coordinator.record(&state_with_comment("unsaved"), TimerRecord::default());
        let handle = coordinator.close(Some(&state_with_comment("last")));
        handle.await.expect("saver task");

        let saved = remote.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].conversation_comment, "last");
    }
}
