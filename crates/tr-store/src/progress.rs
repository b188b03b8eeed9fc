use tr_core::core::UserId;

use crate::models::ProgressEntry;
use crate::store::{ReviewStore, ReviewStoreError};

/// Per-project annotation counts.
///
/// With `user_id`, one entry per project for that reviewer. Without it, one
/// entry per (member, project) pair across every project.
pub fn project_progress(
    store: &dyn ReviewStore,
    user_id: Option<&UserId>,
) -> Result<Vec<ProgressEntry>, ReviewStoreError> {
    let projects = store.list_projects()?;
    let mut entries = Vec::new();

    for project in &projects {
        let total_conversations = store.count_conversations(&project.id)?;
        let reviewers: Vec<&UserId> = match user_id {
            Some(user) => vec![user],
            None => project.members.iter().collect(),
        };

        for reviewer in reviewers {
            entries.push(ProgressEntry {
                user_id: reviewer.clone(),
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                total_conversations,
                annotated_count: store.count_annotations(&project.id, reviewer)?,
            });
        }
    }

    Ok(entries)
}
