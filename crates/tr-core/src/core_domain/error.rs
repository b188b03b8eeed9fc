use crate::core::CriterionId;

// ---------------------------------------------------------------------------
// Sub-error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate {surface} criterion {id}")]
    DuplicateCriterion {
        surface: &'static str,
        id: CriterionId,
    },
    #[error("{surface} criterion {id} has no rating options")]
    NoRatingOptions {
        surface: &'static str,
        id: CriterionId,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("unknown criterion {id}")]
    UnknownCriterion { id: CriterionId },
    #[error("rating {value} is not an option for criterion {id}")]
    InvalidValue { id: CriterionId, value: u8 },
}

/// Failures reported by the external collaborators (stores, caches).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("conversation has no user messages to annotate")]
    NothingToAnnotate,
    #[error("annotation already submitted")]
    AlreadyCompleted,
    #[error(transparent)]
    Rating(#[from] RatingError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rating_error_to_wizard_error() {
        let err: WizardError = RatingError::UnknownCriterion {
            id: CriterionId::new("tone"),
        }
        .into();
        assert!(matches!(
            err,
            WizardError::Rating(RatingError::UnknownCriterion { .. })
        ));
        assert_eq!(err.to_string(), "unknown criterion tone");
    }

    #[test]
    fn test_display_invalid_value() {
        let err = RatingError::InvalidValue {
            id: CriterionId::new("clarity"),
            value: 7,
        };
        assert_eq!(
            err.to_string(),
            "rating 7 is not an option for criterion clarity"
        );
    }

    #[test]
    fn test_display_catalog_errors() {
        let err = CatalogError::DuplicateCriterion {
            surface: "turn",
            id: CriterionId::new("clarity"),
        };
        assert_eq!(err.to_string(), "duplicate turn criterion clarity");
    }

    #[test]
    fn test_display_store_errors() {
        assert_eq!(
            StoreError::NotFound("conversation c1".into()).to_string(),
            "not found: conversation c1"
        );
        assert_eq!(
            StoreError::Unavailable("connection refused".into()).to_string(),
            "store unavailable: connection refused"
        );
    }

    #[test]
    fn test_display_wizard_errors() {
        assert_eq!(
            WizardError::NothingToAnnotate.to_string(),
            "conversation has no user messages to annotate"
        );
        assert_eq!(
            WizardError::AlreadyCompleted.to_string(),
            "annotation already submitted"
        );
    }
}
