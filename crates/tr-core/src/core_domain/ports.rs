use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::core::{AnnotationKey, AnnotationState, ConversationId, Message, StoreError, TimerRecord};

/// Boxed future returned by the object-safe async collaborator traits.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// ConversationSource: read-only access to stored conversations
// ---------------------------------------------------------------------------

pub trait ConversationSource: Send + Sync {
    /// Messages of a conversation; `StoreError::NotFound` when absent.
    fn messages<'a>(&'a self, conversation_id: &'a ConversationId) -> PortFuture<'a, Vec<Message>>;
}

// ---------------------------------------------------------------------------
// AnnotationRemote: the remote annotation record for a (conversation, project, user)
// ---------------------------------------------------------------------------

pub trait AnnotationRemote: Send + Sync {
    /// `Ok(None)` when no record exists yet.
    fn fetch<'a>(&'a self, key: &'a AnnotationKey) -> PortFuture<'a, Option<AnnotationState>>;

    /// Idempotent full-state overwrite.
    fn upsert<'a>(&'a self, key: &'a AnnotationKey, state: &'a AnnotationState)
        -> PortFuture<'a, ()>;
}

// ---------------------------------------------------------------------------
// LocalCache: durable per-profile cache, not shared across devices
// ---------------------------------------------------------------------------

/// What the local cache holds under the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub key: AnnotationKey,
    pub state: AnnotationState,
    #[serde(default)]
    pub timer: TimerRecord,
}

pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CachedSession>, StoreError>;

    fn set(&self, key: &str, entry: &CachedSession) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Clock: injectable time source for deterministic testing
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now(&self) -> std::time::Instant;

    fn elapsed_ms(&self, since: std::time::Instant) -> u64 {
        self.now().saturating_duration_since(since).as_millis() as u64
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }
}
