//! Domain model structs persisted in the submission database.
//!
//! Every persisted struct derives `Serialize` and `Deserialize` so the server
//! can hand it straight to the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use referee_shared::{CheckStatus, CheckType, DraftStatus, FileKind, ReviewStatus, Role, Step};

use crate::query::Page;

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// One revision of a manuscript submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: Uuid,
    /// Shared by every revision of the same submission.
    pub group_id: Uuid,
    pub journal_id: Option<Uuid>,
    pub author_id: Uuid,
    #[serde(rename = "type")]
    pub draft_type: String,
    pub title: String,
    pub description: String,
    pub manuscript: String,
    pub cover_letter: String,
    pub supplemental: String,
    pub status: DraftStatus,
    pub step: Option<Step>,
    pub editor_status: Option<String>,
    pub reviewer_status: Option<String>,
    pub editor_id: Option<Uuid>,
    pub editor_comment: Option<String>,
    pub editor_manuscript_comment: Option<String>,
    pub editor_cover_letter_comment: Option<String>,
    pub editor_supplemental_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Database::create_draft`](crate::Database::create_draft).
#[derive(Debug, Clone, Default)]
pub struct NewDraft {
    pub journal_id: Option<Uuid>,
    pub author_id: Uuid,
    /// `None` starts a new manuscript family.
    pub group_id: Option<Uuid>,
    pub draft_type: String,
    pub title: String,
    pub description: String,
    pub manuscript: String,
    pub cover_letter: String,
    pub supplemental: String,
    pub status: DraftStatus,
    pub step: Option<Step>,
    pub editor_status: Option<String>,
}

/// Sparse update of a draft. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPatch {
    pub journal_id: Option<Uuid>,
    pub draft_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub manuscript: Option<String>,
    pub cover_letter: Option<String>,
    pub supplemental: Option<String>,
    pub status: Option<DraftStatus>,
    pub step: Option<Step>,
    pub editor_status: Option<String>,
    pub reviewer_status: Option<String>,
    pub editor_id: Option<Uuid>,
    pub editor_comment: Option<String>,
    pub editor_manuscript_comment: Option<String>,
    pub editor_cover_letter_comment: Option<String>,
    pub editor_supplemental_comment: Option<String>,
}

impl DraftPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftFilter {
    pub journal_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// When set, the full revision history of the family is listed.
    pub group_id: Option<Uuid>,
    pub status: Option<DraftStatus>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page: Page,
}

// ---------------------------------------------------------------------------
// Editor check
// ---------------------------------------------------------------------------

/// An editor's recorded decision on a draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorCheck {
    pub id: Uuid,
    pub checker_id: Uuid,
    pub draft_id: Uuid,
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub comment: Option<String>,
    pub comments: Vec<FileComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment anchored to one attached file, owned by an [`EditorCheck`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileComment {
    pub id: Uuid,
    pub check_id: Uuid,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub file_id: Option<Uuid>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file comment to upsert: inserted when `id` is `None`, updated otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileCommentInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default)]
    pub file_id: Option<Uuid>,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct NewEditorCheck {
    pub checker_id: Uuid,
    pub draft_id: Uuid,
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub comment: Option<String>,
    pub comments: Vec<FileCommentInput>,
}

#[derive(Debug, Clone, Default)]
pub struct EditorCheckPatch {
    pub status: Option<CheckStatus>,
    pub comment: Option<String>,
    pub comments: Vec<FileCommentInput>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckFilter {
    pub draft_id: Option<Uuid>,
    pub checker_id: Option<Uuid>,
    pub check_type: Option<CheckType>,
    pub status: Option<CheckStatus>,
    pub search: Option<String>,
    pub page: Page,
}

/// Outcome of a best-effort batch of sub-item writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<FailedItem>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A sub-item that could not be written, by its position in the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub index: usize,
    pub id: Option<Uuid>,
    pub error: String,
}

/// Result of persisting an editor check together with its comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckWrite {
    pub check: EditorCheck,
    pub comments: BatchResult,
}

/// Result of a sparse editor check update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckUpdate {
    pub rows_affected: usize,
    pub comments: BatchResult,
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// A reviewer's assignment to, and decision on, a draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub draft_id: Uuid,
    pub status: ReviewStatus,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub draft_id: Option<Uuid>,
    pub reviewer_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
    pub search: Option<String>,
    pub page: Page,
}

// ---------------------------------------------------------------------------
// Attachments and collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DraftFile {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoAuthor {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Identity directory
// ---------------------------------------------------------------------------

/// A platform account. The password digest never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrant {
    pub user_id: Uuid,
    pub journal_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub count: i64,
}
