use std::io::{Error as IoError, ErrorKind};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tr_core::core::{AnnotationKey, AnnotationState, ConversationId, ProjectId, UserId};
use uuid::Uuid;

use crate::models::{AnnotationFilter, AnnotationRecord, ConversationRecord, Project};

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_members (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id),
    messages TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_conversations_project ON conversations(project_id);

CREATE TABLE IF NOT EXISTS annotations (
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    project_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    state TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (conversation_id, project_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_annotations_project ON annotations(project_id);
CREATE INDEX IF NOT EXISTS idx_annotations_user ON annotations(user_id);
"#;

#[derive(Debug, thiserror::Error)]
pub enum ReviewStoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("malformed import: {0}")]
    MalformedImport(String),
}

/// Document store behind the HTTP API.
pub trait ReviewStore: Send + Sync {
    fn init(&self) -> Result<(), ReviewStoreError>;

    // -- projects --
    fn create_project(&self, name: &str) -> Result<Project, ReviewStoreError>;
    fn list_projects(&self) -> Result<Vec<Project>, ReviewStoreError>;
    fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>, ReviewStoreError>;
    fn add_member(&self, project_id: &ProjectId, user_id: &UserId) -> Result<(), ReviewStoreError>;
    fn remove_member(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), ReviewStoreError>;

    // -- conversations --
    fn insert_conversation(&self, conv: &ConversationRecord) -> Result<(), ReviewStoreError>;
    fn list_conversations(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ConversationRecord>, ReviewStoreError>;
    fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, ReviewStoreError>;
    fn count_conversations(&self, project_id: &ProjectId) -> Result<u64, ReviewStoreError>;
    /// The `offset`-th conversation of a project in insertion order.
    fn conversation_at(
        &self,
        project_id: &ProjectId,
        offset: u64,
    ) -> Result<Option<ConversationRecord>, ReviewStoreError>;
    /// Removes the conversation and every annotation filed against it.
    fn delete_conversation(&self, conversation_id: &ConversationId)
        -> Result<(), ReviewStoreError>;

    // -- annotations --
    fn upsert_annotation(
        &self,
        key: &AnnotationKey,
        state: &AnnotationState,
    ) -> Result<AnnotationRecord, ReviewStoreError>;
    fn get_annotation(
        &self,
        key: &AnnotationKey,
    ) -> Result<Option<AnnotationRecord>, ReviewStoreError>;
    fn list_annotations(
        &self,
        project_id: &ProjectId,
        filter: &AnnotationFilter,
    ) -> Result<Vec<AnnotationRecord>, ReviewStoreError>;
    fn count_annotations(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<u64, ReviewStoreError>;
}

pub struct SqliteReviewStore {
    conn: Mutex<Connection>,
}

impl SqliteReviewStore {
    pub fn new(path: &Path) -> Result<Self, ReviewStoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn new_in_memory() -> Result<Self, ReviewStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn members_of(
        conn: &Connection,
        project_id: &str,
    ) -> Result<Vec<UserId>, ReviewStoreError> {
        let mut stmt = conn.prepare(
            "SELECT user_id FROM project_members WHERE project_id = ?1 ORDER BY user_id ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            row.get::<_, String>(0).map(UserId::new)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

const CONVERSATION_COLUMNS: &str = "id, project_id, messages, metadata, created_at, updated_at";
const ANNOTATION_COLUMNS: &str =
    "conversation_id, project_id, user_id, state, created_at, updated_at";

impl ReviewStore for SqliteReviewStore {
    fn init(&self) -> Result<(), ReviewStoreError> {
        let conn = self.lock_conn();
        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        conn.execute_batch(SCHEMA_SQL)?;
        if version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn create_project(&self, name: &str) -> Result<Project, ReviewStoreError> {
        let project = Project {
            id: ProjectId::new(Uuid::new_v4().to_string()),
            name: name.to_owned(),
            members: Vec::new(),
            created_at: Utc::now(),
        };

        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                project.id.as_str(),
                project.name.as_str(),
                project.created_at.to_rfc3339(),
            ],
        )?;
        Ok(project)
    }

    fn list_projects(&self) -> Result<Vec<Project>, ReviewStoreError> {
        let conn = self.lock_conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM projects ORDER BY created_at ASC")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let created_at: String = row.get(2)?;
            Ok((id, name, parse_datetime_utc(2, &created_at)?))
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, created_at)| {
                Ok(Project {
                    members: Self::members_of(&conn, &id)?,
                    id: ProjectId::new(id),
                    name,
                    created_at,
                })
            })
            .collect()
    }

    fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>, ReviewStoreError> {
        let conn = self.lock_conn();
        let row = conn
            .query_row(
                "SELECT name, created_at FROM projects WHERE id = ?1",
                params![project_id.as_str()],
                |row| {
                    let name: String = row.get(0)?;
                    let created_at: String = row.get(1)?;
                    Ok((name, parse_datetime_utc(1, &created_at)?))
                },
            )
            .optional()?;

        let Some((name, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Project {
            id: project_id.clone(),
            name,
            members: Self::members_of(&conn, project_id.as_str())?,
            created_at,
        }))
    }

    fn add_member(&self, project_id: &ProjectId, user_id: &UserId) -> Result<(), ReviewStoreError> {
        let conn = self.lock_conn();
        let exists = conn
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                params![project_id.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(ReviewStoreError::NotFound(format!("project {project_id}")));
        }

        conn.execute(
            "INSERT INTO project_members (project_id, user_id) VALUES (?1, ?2)
             ON CONFLICT(project_id, user_id) DO NOTHING",
            params![project_id.as_str(), user_id.as_str()],
        )?;
        Ok(())
    }

    fn remove_member(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), ReviewStoreError> {
        let conn = self.lock_conn();
        let removed = conn.execute(
            "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
            params![project_id.as_str(), user_id.as_str()],
        )?;
        if removed == 0 {
            return Err(ReviewStoreError::NotFound(format!(
                "member {user_id} of project {project_id}"
            )));
        }
        Ok(())
    }

    fn insert_conversation(&self, conv: &ConversationRecord) -> Result<(), ReviewStoreError> {
        let messages = serde_json::to_string(&conv.conversation)?;
        let metadata = serde_json::to_string(&conv.metadata)?;

        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO conversations (id, project_id, messages, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                conv.id.as_str(),
                conv.project_id.as_str(),
                messages,
                metadata,
                conv.created_at.to_rfc3339(),
                conv.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_conversations(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ConversationRecord>, ReviewStoreError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE project_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![project_id.as_str()], conversation_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, ReviewStoreError> {
        let conn = self.lock_conn();
        let conversation = conn
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![conversation_id.as_str()],
                conversation_from_row,
            )
            .optional()?;
        Ok(conversation)
    }

    fn count_conversations(&self, project_id: &ProjectId) -> Result<u64, ReviewStoreError> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE project_id = ?1",
            params![project_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn conversation_at(
        &self,
        project_id: &ProjectId,
        offset: u64,
    ) -> Result<Option<ConversationRecord>, ReviewStoreError> {
        let conn = self.lock_conn();
        let conversation = conn
            .query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE project_id = ?1
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT 1 OFFSET ?2"
                ),
                params![project_id.as_str(), offset as i64],
                conversation_from_row,
            )
            .optional()?;
        Ok(conversation)
    }

    fn delete_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<(), ReviewStoreError> {
        let conn = self.lock_conn();
        let removed = conn.execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![conversation_id.as_str()],
        )?;
        if removed == 0 {
            return Err(ReviewStoreError::NotFound(format!(
                "conversation {conversation_id}"
            )));
        }
        Ok(())
    }

    fn upsert_annotation(
        &self,
        key: &AnnotationKey,
        state: &AnnotationState,
    ) -> Result<AnnotationRecord, ReviewStoreError> {
        let state_json = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock_conn();
        let known = conn
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1 AND project_id = ?2",
                params![key.conversation_id.as_str(), key.project_id.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !known {
            return Err(ReviewStoreError::NotFound(format!(
                "conversation {} in project {}",
                key.conversation_id, key.project_id
            )));
        }

        conn.execute(
            "INSERT INTO annotations
             (conversation_id, project_id, user_id, state, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(conversation_id, project_id, user_id) DO UPDATE SET
                 state = excluded.state,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                key.conversation_id.as_str(),
                key.project_id.as_str(),
                key.user_id.as_str(),
                state_json,
                state.status.as_str(),
                now,
            ],
        )?;

        let record = conn.query_row(
            &format!(
                "SELECT {ANNOTATION_COLUMNS} FROM annotations
                 WHERE conversation_id = ?1 AND project_id = ?2 AND user_id = ?3"
            ),
            params![
                key.conversation_id.as_str(),
                key.project_id.as_str(),
                key.user_id.as_str(),
            ],
            annotation_from_row,
        )?;
        Ok(record)
    }

    fn get_annotation(
        &self,
        key: &AnnotationKey,
    ) -> Result<Option<AnnotationRecord>, ReviewStoreError> {
        let conn = self.lock_conn();
        let record = conn
            .query_row(
                &format!(
                    "SELECT {ANNOTATION_COLUMNS} FROM annotations
                     WHERE conversation_id = ?1 AND project_id = ?2 AND user_id = ?3"
                ),
                params![
                    key.conversation_id.as_str(),
                    key.project_id.as_str(),
                    key.user_id.as_str(),
                ],
                annotation_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn list_annotations(
        &self,
        project_id: &ProjectId,
        filter: &AnnotationFilter,
    ) -> Result<Vec<AnnotationRecord>, ReviewStoreError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations
             WHERE project_id = ?1
               AND (?2 IS NULL OR user_id = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(
            params![
                project_id.as_str(),
                filter.user_id.as_ref().map(UserId::as_str),
                filter.status.map(|s| s.as_str()),
            ],
            annotation_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_annotations(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<u64, ReviewStoreError> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM annotations WHERE project_id = ?1 AND user_id = ?2",
            params![project_id.as_str(), user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRecord> {
    let id: String = row.get(0)?;
    let project_id: String = row.get(1)?;
    let messages: String = row.get(2)?;
    let metadata: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(ConversationRecord {
        id: ConversationId::new(id),
        project_id: ProjectId::new(project_id),
        conversation: parse_json(2, "messages", &messages)?,
        metadata: parse_json(3, "metadata", &metadata)?,
        created_at: parse_datetime_utc(4, &created_at)?,
        updated_at: parse_datetime_utc(5, &updated_at)?,
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<AnnotationRecord> {
    let conversation_id: String = row.get(0)?;
    let project_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let state: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(AnnotationRecord {
        key: AnnotationKey::new(
            ConversationId::new(conversation_id),
            ProjectId::new(project_id),
            UserId::new(user_id),
        ),
        state: parse_json(3, "annotation state", &state)?,
        created_at: parse_datetime_utc(4, &created_at)?,
        updated_at: parse_datetime_utc(5, &updated_at)?,
    })
}

fn parse_json<T: DeserializeOwned>(
    column: usize,
    field: &'static str,
    value: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|_| sql_text_parse_error(column, field, value))
}

fn parse_datetime_utc(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| sql_text_parse_error(column, "datetime", value))
}

fn sql_text_parse_error(column: usize, field: &'static str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        Box::new(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid {field}: {value}"),
        )),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tr_core::core::{
        AnnotationKey, AnnotationState, AnnotationStatus, ConversationId, Message, ProjectId,
        UserId,
    };

    use super::{ReviewStore, ReviewStoreError, SqliteReviewStore};
    use crate::models::{AnnotationFilter, ConversationRecord};

    fn setup_store() -> SqliteReviewStore {
        let store = SqliteReviewStore::new_in_memory().expect("in-memory store");
        store.init().expect("init schema");
        store
    }

    fn insert_conversation(store: &SqliteReviewStore, project_id: &ProjectId, id: &str) {
        let now = Utc::now();
        let conv = ConversationRecord {
            id: ConversationId::new(id),
            project_id: project_id.clone(),
            conversation: vec![Message::user("hello"), Message::assistant("hi there")],
            metadata: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        };
        store.insert_conversation(&conv).expect("insert conversation");
    }

    fn key(conversation: &str, project: &ProjectId, user: &str) -> AnnotationKey {
        AnnotationKey::new(
            ConversationId::new(conversation),
            project.clone(),
            UserId::new(user),
        )
    }

    #[test]
    fn test_init_is_idempotent() {
        let store = setup_store();
        store.init().expect("second init");
    }

    #[test]
    fn test_projects_and_members() {
        let store = setup_store();
        let project = store.create_project("Banking bot").expect("create project");

        store
            .add_member(&project.id, &UserId::new("a@example.com"))
            .expect("add member");
        store
            .add_member(&project.id, &UserId::new("a@example.com"))
            .expect("adding twice is a no-op");
        store
            .add_member(&project.id, &UserId::new("b@example.com"))
            .expect("add member");

        let loaded = store
            .get_project(&project.id)
            .expect("get project")
            .expect("project exists");
        assert_eq!(loaded.name, "Banking bot");
        assert_eq!(
            loaded.members,
            vec![UserId::new("a@example.com"), UserId::new("b@example.com")]
        );

        store
            .remove_member(&project.id, &UserId::new("a@example.com"))
            .expect("remove member");
        let err = store
            .remove_member(&project.id, &UserId::new("a@example.com"))
            .unwrap_err();
        assert!(matches!(err, ReviewStoreError::NotFound(_)));

        let err = store
            .add_member(&ProjectId::new("missing"), &UserId::new("c@example.com"))
            .unwrap_err();
        assert!(matches!(err, ReviewStoreError::NotFound(_)));

        assert_eq!(store.list_projects().expect("list").len(), 1);
    }

    #[test]
    fn test_conversations_crud() {
        let store = setup_store();
        let project = store.create_project("p").expect("create project");
        insert_conversation(&store, &project.id, "c1");
        insert_conversation(&store, &project.id, "c2");

        assert_eq!(store.count_conversations(&project.id).unwrap(), 2);
        let listed = store.list_conversations(&project.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.as_str(), "c1");

        let second = store
            .conversation_at(&project.id, 1)
            .unwrap()
            .expect("offset 1 exists");
        assert_eq!(second.id.as_str(), "c2");
        assert!(store.conversation_at(&project.id, 2).unwrap().is_none());

        let loaded = store
            .get_conversation(&ConversationId::new("c1"))
            .unwrap()
            .expect("c1 exists");
        assert_eq!(loaded.conversation.len(), 2);

        store
            .delete_conversation(&ConversationId::new("c1"))
            .expect("delete");
        assert!(store
            .get_conversation(&ConversationId::new("c1"))
            .unwrap()
            .is_none());
        assert!(matches!(
            store.delete_conversation(&ConversationId::new("c1")),
            Err(ReviewStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_overwrites_and_keeps_created_at() {
        let store = setup_store();
        let project = store.create_project("p").expect("create project");
        insert_conversation(&store, &project.id, "c1");
        let k = key("c1", &project.id, "ann@example.com");

        let mut state = AnnotationState::for_units(1);
        state.conversation_comment = "first".to_owned();
        let first = store.upsert_annotation(&k, &state).expect("insert");

        state.conversation_comment = "second".to_owned();
        state.status = AnnotationStatus::Completed;
        let second = store.upsert_annotation(&k, &state).expect("update");

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);

        let loaded = store
            .get_annotation(&k)
            .unwrap()
            .expect("annotation exists");
        assert_eq!(loaded.state.conversation_comment, "second");
        assert!(loaded.state.is_completed());
        assert_eq!(
            store
                .count_annotations(&project.id, &UserId::new("ann@example.com"))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_upsert_unknown_conversation() {
        let store = setup_store();
        let project = store.create_project("p").expect("create project");
        let err = store
            .upsert_annotation(
                &key("ghost", &project.id, "u"),
                &AnnotationState::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ReviewStoreError::NotFound(_)));
    }

    #[test]
    fn test_list_annotations_filters() {
        let store = setup_store();
        let project = store.create_project("p").expect("create project");
        insert_conversation(&store, &project.id, "c1");
        insert_conversation(&store, &project.id, "c2");

        let done = AnnotationState {
            status: AnnotationStatus::Completed,
            ..AnnotationState::default()
        };
        store
            .upsert_annotation(&key("c1", &project.id, "u1"), &done)
            .unwrap();
        store
            .upsert_annotation(&key("c2", &project.id, "u1"), &AnnotationState::default())
            .unwrap();
        store
            .upsert_annotation(&key("c1", &project.id, "u2"), &AnnotationState::default())
            .unwrap();

        let all = store
            .list_annotations(&project.id, &AnnotationFilter::default())
            .unwrap();
        assert_eq!(all.len(), 3);

        let u1 = store
            .list_annotations(
                &project.id,
                &AnnotationFilter {
                    user_id: Some(UserId::new("u1")),
                    ..AnnotationFilter::default()
                },
            )
            .unwrap();
        assert_eq!(u1.len(), 2);

        let completed = store
            .list_annotations(
                &project.id,
                &AnnotationFilter {
                    status: Some(AnnotationStatus::Completed),
                    ..AnnotationFilter::default()
                },
            )
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].key.conversation_id.as_str(), "c1");
    }

    #[test]
    fn test_delete_conversation_cascades_annotations() {
        let store = setup_store();
        let project = store.create_project("p").expect("create project");
        insert_conversation(&store, &project.id, "c1");
        let k = key("c1", &project.id, "u1");
        store
            .upsert_annotation(&k, &AnnotationState::default())
            .unwrap();

        store
            .delete_conversation(&ConversationId::new("c1"))
            .unwrap();
        assert!(store.get_annotation(&k).unwrap().is_none());
    }
}
