use std::fmt;

// ---------------------------------------------------------------------------
// String-based identity newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype!(ConversationId);
string_newtype!(ProjectId);
string_newtype!(UserId);
string_newtype!(CriterionId);
string_newtype!(TurnId);

// ---------------------------------------------------------------------------
// AnnotationKey: the (conversation, project, user) triple a record is filed under
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AnnotationKey {
    pub conversation_id: ConversationId,
    pub project_id: ProjectId,
    pub user_id: UserId,
}

impl AnnotationKey {
    pub fn new(conversation_id: ConversationId, project_id: ProjectId, user_id: UserId) -> Self {
        Self {
            conversation_id,
            project_id,
            user_id,
        }
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.project_id, self.conversation_id, self.user_id
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
