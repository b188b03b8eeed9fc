use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{CriteriaSet, Criterion, CriterionId, RatingError};

/// Per-criterion ratings for one conversation or one turn unit.
///
/// A criterion that is absent and one explicitly cleared to `None` both count
/// as unrated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingSet(BTreeMap<CriterionId, Option<u8>>);

impl RatingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &CriterionId) -> Option<u8> {
        self.0.get(id).copied().flatten()
    }

    /// Click-to-clear: selecting the current value unsets it, anything else sets it.
    ///
    /// Returns the criterion's value after the toggle.
    pub fn toggle(
        &mut self,
        criteria: &CriteriaSet,
        id: &CriterionId,
        value: u8,
    ) -> Result<Option<u8>, RatingError> {
        let criterion = criteria
            .get(id)
            .ok_or_else(|| RatingError::UnknownCriterion { id: id.clone() })?;
        if !criterion.accepts(value) {
            return Err(RatingError::InvalidValue {
                id: id.clone(),
                value,
            });
        }

        let next = if self.get(id) == Some(value) {
            None
        } else {
            Some(value)
        };
        self.0.insert(id.clone(), next);
        Ok(next)
    }

    /// Criteria of `criteria` that have no value here, in display order.
    pub fn missing<'a>(&self, criteria: &'a CriteriaSet) -> Vec<&'a Criterion> {
        criteria
            .criteria()
            .filter(|c| self.get(&c.id).is_none())
            .collect()
    }

    pub fn is_complete(&self, criteria: &CriteriaSet) -> bool {
        criteria.criteria().all(|c| self.get(&c.id).is_some())
    }

    pub fn rated_count(&self) -> usize {
        self.0.values().filter(|v| v.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CriterionId, Option<u8>)> {
        self.0.iter().map(|(id, v)| (id, *v))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
