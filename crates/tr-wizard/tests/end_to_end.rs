use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tr_core::core::{
    AnnotationKey, AnnotationRemote, AnnotationState, AnnotationStatus, ConversationId, CriteriaCatalog,
    CriterionId, LocalCache, Phase, ProjectId, SystemClock, Transition, UserId,
};
use tr_server::handler::{router, AppState};
use tr_store::{ReviewStore, SqliteReviewStore};
use tr_wizard::cache::{FileCache, SESSION_CACHE_KEY};
use tr_wizard::remote::ReviewApi;
use tr_wizard::session::{AnnotationSession, Collaborators, RestoreSource};

struct Fixture {
    addr: SocketAddr,
    project_id: ProjectId,
    conversation_id: ConversationId,
    _handle: tokio::task::JoinHandle<()>,
}

impl Fixture {
    async fn start() -> Self {
        let store = SqliteReviewStore::new_in_memory().expect("store");
        store.init().expect("init");
        let project = store.create_project("e2e").expect("project");
        let ids = tr_store::import_conversations(
            &store,
            &project.id,
            json!([{
                "conversation": [
                    {"role": "system", "content": "You are a bank assistant."},
                    {"role": "user", "content": "Open an account"},
                    {"role": "assistant", "content": "Sure, which type?"},
                    {"role": "user", "content": "Savings"},
                    {"role": "assistant", "content": "Done."},
                    {"role": "user", "content": "Thanks"}
                ]
            }]),
        )
        .expect("import");

        let state = Arc::new(AppState {
            store: Arc::new(store),
            catalog: Arc::new(CriteriaCatalog::default_rubric()),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router(state)).await.ok();
        });

        Self {
            addr,
            project_id: project.id,
            conversation_id: ids[0].clone(),
            _handle: handle,
        }
    }

    fn api(&self) -> Arc<ReviewApi> {
        Arc::new(ReviewApi::new(&format!("http://{}", self.addr)))
    }

    fn key(&self) -> AnnotationKey {
        AnnotationKey::new(
            self.conversation_id.clone(),
            self.project_id.clone(),
            UserId::new("e2e@example.com"),
        )
    }

    async fn open(&self, cache: Arc<FileCache>, catalog: Arc<CriteriaCatalog>) -> AnnotationSession {
        let api = self.api();
        AnnotationSession::open(
            self.key(),
            Collaborators {
                conversations: api.clone(),
                remote: api,
                cache,
                clock: Arc::new(SystemClock),
            },
            catalog,
            Duration::from_millis(20),
        )
        .await
        .expect("open session")
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

fn criteria_ids(session: &AnnotationSession) -> Vec<CriterionId> {
    session
        .wizard()
        .active_criteria()
        .criteria()
        .map(|c| c.id.clone())
        .collect()
}

#[tokio::test]
async fn test_annotate_resume_and_submit() {
    let fixture = Fixture::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = Arc::new(FileCache::new(dir.path()).expect("cache"));
    let api = fixture.api();

    let catalog = Arc::new(api.criteria().await.expect("criteria"));
    assert_eq!(*catalog, CriteriaCatalog::default_rubric());

    // Trailing user message becomes its own unit; the system prompt is dropped.
    let mut session = fixture.open(cache.clone(), catalog.clone()).await;
    assert_eq!(session.restored_from(), RestoreSource::Fresh);
    assert_eq!(session.wizard().unit_count(), 3);

    match session.next().expect("next") {
        Transition::Blocked { missing_labels } => assert_eq!(missing_labels.len(), 17),
        other => panic!("expected a blocked transition, got {other:?}"),
    }

    for id in criteria_ids(&session) {
        session.rate(&id, 3).expect("rate");
    }
    session.set_comment("good opener").expect("comment");
    assert!(matches!(
        session.next().expect("next"),
        Transition::Moved { turn_index: 1, .. }
    ));
    session.close().await.expect("final flush");

    let saved = api
        .fetch(&fixture.key())
        .await
        .expect("fetch")
        .expect("remote record");
    assert_eq!(saved.current_turn_index, 1);
    assert_eq!(saved.turn_comments[0], "good opener");
    assert!(has_cached_session(&cache));

    // A new session resumes from the server.
    let mut session = fixture.open(cache.clone(), catalog.clone()).await;
    assert_eq!(session.restored_from(), RestoreSource::Remote);
    assert_eq!(session.wizard().state().current_turn_index, 1);

    session.skip().expect("skip");
    session.skip().expect("skip");
    assert_eq!(session.wizard().state().current_phase, Phase::Conversation);
    for id in criteria_ids(&session) {
        session.rate(&id, 2).expect("rate");
    }
    assert_eq!(session.next().expect("next"), Transition::ReadyToSubmit);
    session.submit().await.expect("submit");

    let stored = api
        .fetch(&fixture.key())
        .await
        .expect("fetch")
        .expect("remote record");
    assert_eq!(stored.status, AnnotationStatus::Completed);
    assert_eq!(stored.turn_skipped, vec![false, true, true]);
    assert!(!has_cached_session(&cache));
}

#[tokio::test]
async fn test_next_conversation_and_missing() {
    let fixture = Fixture::start().await;
    let api = fixture.api();

    let (id, messages) = api
        .next_conversation(&fixture.project_id)
        .await
        .expect("next");
    assert_eq!(id, fixture.conversation_id);
    assert_eq!(messages.len(), 6);

    let missing = AnnotationKey::new(
        ConversationId::new("6f1c1d2e-8f7a-4b7e-9a53-0d2b1f9c4e11"),
        fixture.project_id.clone(),
        UserId::new("e2e@example.com"),
    );
    assert!(api.fetch(&missing).await.expect("fetch").is_none());
}

#[tokio::test]
async fn test_user_ids_with_reserved_characters_keep_their_own_record() {
    let fixture = Fixture::start().await;
    let api = fixture.api();
    let key_for = |user: &str| {
        AnnotationKey::new(
            fixture.conversation_id.clone(),
            fixture.project_id.clone(),
            UserId::new(user),
        )
    };

    let mut lead = AnnotationState::for_units(3);
    lead.conversation_comment = "lead's work".to_owned();
    api.upsert(&key_for("qa#lead"), &lead).await.expect("upsert");
    assert!(api.fetch(&key_for("qa")).await.expect("fetch").is_none());
    let stored = api
        .fetch(&key_for("qa#lead"))
        .await
        .expect("fetch")
        .expect("record under the full id");
    assert_eq!(stored.conversation_comment, "lead's work");

    let mut alice = AnnotationState::for_units(3);
    alice.conversation_comment = "alice".to_owned();
    api.upsert(&key_for("team/alice"), &alice)
        .await
        .expect("upsert with a slash");
    let stored = api
        .fetch(&key_for("team/alice"))
        .await
        .expect("fetch")
        .expect("record under the full id");
    assert_eq!(stored.conversation_comment, "alice");

    let mut spaced = AnnotationState::for_units(3);
    spaced.conversation_comment = "percent".to_owned();
    api.upsert(&key_for("50% review?"), &spaced)
        .await
        .expect("upsert with percent and query characters");
    assert!(api
        .fetch(&key_for("50% review?"))
        .await
        .expect("fetch")
        .is_some());
}

fn has_cached_session(cache: &FileCache) -> bool {
    matches!(cache.get(SESSION_CACHE_KEY), Ok(Some(_)))
}
