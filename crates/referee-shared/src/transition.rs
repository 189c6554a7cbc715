//! The draft state machine.
//!
//! An editor decision moves a draft between actors; a reviewer decision is
//! advisory and never moves the draft on its own.

use serde::{Deserialize, Serialize};

use crate::types::{CheckStatus, DraftStatus, ReviewStatus, Step};

/// The `(status, step)` pair a draft takes after a decision.
///
/// `step == None` means the draft is not owned by any actor (stored empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTransition {
    pub status: DraftStatus,
    pub step: Option<Step>,
}

impl DraftTransition {
    /// Derive the draft transition for an editor check outcome.
    ///
    /// | check status               | draft status          | step   |
    /// |----------------------------|-----------------------|--------|
    /// | `REJECTED`                 | `DENIED`              | AUTHOR |
    /// | `REJECTED_WITH_CORRECTION` | `BACK_FOR_CORRECTION` | AUTHOR |
    /// | `APPROVED`                 | `CONFIRMED`           | AUTHOR |
    /// | `APPROVED_WITH_CORRECTION` | `BACK_FOR_CORRECTION` | AUTHOR |
    /// | anything else              | `PENDING`             | none   |
    pub fn from_editor_decision(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Rejected => Self::to_author(DraftStatus::Denied),
            CheckStatus::RejectedWithCorrection => Self::to_author(DraftStatus::BackForCorrection),
            CheckStatus::Approved => Self::to_author(DraftStatus::Confirmed),
            CheckStatus::ApprovedWithCorrection => {
                Self::to_author(DraftStatus::BackForCorrection)
            }
            CheckStatus::New | CheckStatus::Pending => Self {
                status: DraftStatus::Pending,
                step: None,
            },
        }
    }

    /// Reviewer decisions only update the review row. The editor stays the
    /// gatekeeper, so no draft transition is ever derived from them.
    pub fn from_reviewer_decision(_status: ReviewStatus) -> Option<Self> {
        None
    }

    fn to_author(status: DraftStatus) -> Self {
        Self {
            status,
            step: Some(Step::Author),
        }
    }
}
