//! CRUD operations for [`EditorCheck`] records and their [`FileComment`]s.
//!
//! A check row and its file comments are written together, but the comments
//! are best-effort: each one is its own statement, a failing comment is
//! reported in the returned [`BatchResult`] and never undoes the check.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use referee_shared::{CheckType, DraftTransition, FileKind};

use crate::database::Database;
use crate::drafts::{load_draft, write_transition};
use crate::error::{Result, StoreError};
use crate::models::{
    BatchResult, CheckFilter, CheckUpdate, CheckWrite, Draft, EditorCheck, EditorCheckPatch,
    FailedItem, FileComment, FileCommentInput, Listing, NewEditorCheck,
};
use crate::query::{compose, Assignments, Filter};
use crate::rows::{enum_at, now, opt_uuid_at, ts, ts_at, uuid_at};

const CHECK_COLUMNS: &str =
    "c.id, c.checker_id, c.draft_id, c.type, c.status, c.comment, c.created_at, c.updated_at";

/// The write half of an editor decision.
#[derive(Debug, Clone)]
pub enum EditorDecision {
    Create(NewEditorCheck),
    Update { id: Uuid, patch: EditorCheckPatch },
}

/// Everything an editor decision changed.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub check: EditorCheck,
    pub comments: BatchResult,
    pub transition: DraftTransition,
    pub draft: Draft,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn create_editor_check(&self, new: &NewEditorCheck) -> Result<CheckWrite> {
        let tx = self.conn().unchecked_transaction()?;
        let written = insert_check(&tx, new)?;
        tx.commit()?;
        Ok(written)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_editor_check(&self, id: Uuid) -> Result<EditorCheck> {
        load_check(self.conn(), id)
    }

    /// The check a checker already holds on a draft for one channel, if any.
    pub fn find_editor_check(
        &self,
        checker_id: Uuid,
        draft_id: Uuid,
        check_type: CheckType,
    ) -> Result<Option<EditorCheck>> {
        let found = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CHECK_COLUMNS} FROM editor_checks c
                     WHERE c.checker_id = ?1 AND c.draft_id = ?2 AND c.type = ?3
                     ORDER BY c.created_at DESC, c.rowid DESC
                     LIMIT 1"
                ),
                params![checker_id.to_string(), draft_id.to_string(), check_type.as_str()],
                row_to_check,
            )
            .optional()?;

        match found {
            Some(mut check) => {
                check.comments = load_comments(self.conn(), check.id)?;
                Ok(Some(check))
            }
            None => Ok(None),
        }
    }

    /// List checks matching `filter`, newest first, each with its comments.
    pub fn list_editor_checks(&self, filter: &CheckFilter) -> Result<Listing<EditorCheck>> {
        let mut f = Filter::new();
        f.eq_id("c.draft_id", "draft_id", filter.draft_id)
            .eq_id("c.checker_id", "checker_id", filter.checker_id)
            .eq("c.type", "type", filter.check_type.map(|t| t.as_str().to_string()))
            .eq("c.status", "status", filter.status.map(|s| s.as_str().to_string()))
            .search(&["c.comment"], filter.search.as_deref());

        let count = self.count(&f.count_sql("editor_checks c"))?;
        let mut items = self.fetch_all(
            &f.page_sql(
                &format!("SELECT {CHECK_COLUMNS} FROM editor_checks c"),
                "c.created_at DESC, c.rowid DESC",
                filter.page,
            ),
            row_to_check,
        )?;
        for check in &mut items {
            check.comments = load_comments(self.conn(), check.id)?;
        }

        Ok(Listing { items, count })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Sparse update of a check and upsert of its comments.
    ///
    /// `rows_affected == 0` means no such check; no comment is touched then.
    pub fn update_editor_check(&self, id: Uuid, patch: &EditorCheckPatch) -> Result<CheckUpdate> {
        let tx = self.conn().unchecked_transaction()?;
        let update = patch_check(&tx, id, patch)?;
        tx.commit()?;
        Ok(update)
    }

    /// Persist an editor decision and move the draft accordingly, atomically.
    ///
    /// The transition is derived from the check status as stored after the
    /// write, so an update that leaves the status alone re-applies the
    /// current one.  Nothing is kept if the draft is missing or superseded.
    pub fn apply_editor_decision(&self, decision: &EditorDecision) -> Result<DecisionOutcome> {
        let tx = self.conn().unchecked_transaction()?;

        let (check_id, comments) = match decision {
            EditorDecision::Create(new) => {
                let written = insert_check(&tx, new)?;
                (written.check.id, written.comments)
            }
            EditorDecision::Update { id, patch } => {
                let update = patch_check(&tx, *id, patch)?;
                if update.rows_affected == 0 {
                    return Err(StoreError::NotFound);
                }
                (*id, update.comments)
            }
        };

        let check = load_check(&tx, check_id)?;
        let transition = DraftTransition::from_editor_decision(check.status);

        let mut echo = Assignments::new();
        echo.set_id("editor_id", Some(check.checker_id))
            .set("editor_status", Some(check.status.as_str().to_string()))
            .set("editor_comment", check.comment.clone())
            .set(
                "editor_manuscript_comment",
                section_comment(&check, FileKind::Manuscript),
            )
            .set(
                "editor_cover_letter_comment",
                section_comment(&check, FileKind::CoverLetter),
            )
            .set(
                "editor_supplemental_comment",
                section_comment(&check, FileKind::Supplemental),
            );

        if write_transition(&tx, check.draft_id, transition, &echo)? == 0 {
            return Err(StoreError::Invalid(format!(
                "draft {} is missing or superseded",
                check.draft_id
            )));
        }
        let draft = load_draft(&tx, check.draft_id)?;

        tx.commit()?;

        tracing::info!(
            check_id = %check.id,
            draft_id = %draft.id,
            status = %draft.status,
            "editor decision applied"
        );

        Ok(DecisionOutcome {
            check,
            comments,
            transition,
            draft,
        })
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    pub fn delete_editor_check(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM editor_checks WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Remove every check made by `checker_id`, optionally on one draft only.
    pub fn delete_editor_checks_by_checker(
        &self,
        checker_id: Uuid,
        draft_id: Option<Uuid>,
    ) -> Result<usize> {
        let mut f = Filter::new();
        f.eq_id("checker_id", "checker_id", Some(checker_id))
            .eq_id("draft_id", "draft_id", draft_id);
        self.execute(&compose(
            &format!("DELETE FROM editor_checks {}", f.where_sql()),
            f.args(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers (usable inside a transaction)
// ---------------------------------------------------------------------------

fn insert_check(conn: &Connection, new: &NewEditorCheck) -> Result<CheckWrite> {
    let id = Uuid::new_v4();
    let at = ts(&now());

    conn.execute(
        "INSERT INTO editor_checks (id, checker_id, draft_id, type, status, comment,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            id.to_string(),
            new.checker_id.to_string(),
            new.draft_id.to_string(),
            new.check_type.as_str(),
            new.status.as_str(),
            new.comment,
            at,
        ],
    )
    .map_err(StoreError::from_query)?;

    let comments = upsert_comments(conn, id, new.draft_id, &new.comments);
    let check = load_check(conn, id)?;
    Ok(CheckWrite { check, comments })
}

fn patch_check(conn: &Connection, id: Uuid, patch: &EditorCheckPatch) -> Result<CheckUpdate> {
    let mut set = Assignments::new();
    set.set("status", patch.status.map(|s| s.as_str().to_string()))
        .set("comment", patch.comment.clone())
        .always("updated_at", ts(&now()));

    let mut f = Filter::new();
    f.eq_id("id", "id", Some(id));

    let composed = set.update_sql("editor_checks", &f);
    let rows_affected = conn
        .execute(&composed.sql, composed.params())
        .map_err(StoreError::from_query)?;
    if rows_affected == 0 {
        return Ok(CheckUpdate::default());
    }

    let draft_id: String = conn.query_row(
        "SELECT draft_id FROM editor_checks WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    let draft_id = Uuid::parse_str(&draft_id)
        .map_err(|e| StoreError::Invalid(format!("stored draft id: {e}")))?;

    Ok(CheckUpdate {
        rows_affected,
        comments: upsert_comments(conn, id, draft_id, &patch.comments),
    })
}

/// Insert or update each comment on its own.  Failures are collected, never
/// propagated.
fn upsert_comments(
    conn: &Connection,
    check_id: Uuid,
    draft_id: Uuid,
    inputs: &[FileCommentInput],
) -> BatchResult {
    let mut result = BatchResult::default();

    for (index, input) in inputs.iter().enumerate() {
        match upsert_comment(conn, check_id, draft_id, input) {
            Ok(id) => result.succeeded.push(id),
            Err(e) => {
                tracing::warn!(%check_id, index, error = %e, "file comment not saved");
                result.failed.push(FailedItem {
                    index,
                    id: input.id,
                    error: e.to_string(),
                });
            }
        }
    }

    result
}

fn upsert_comment(
    conn: &Connection,
    check_id: Uuid,
    draft_id: Uuid,
    input: &FileCommentInput,
) -> Result<Uuid> {
    if input.comment.trim().is_empty() {
        return Err(StoreError::Invalid("comment is empty".into()));
    }

    if let Some(file_id) = input.file_id {
        let owner: Option<String> = conn
            .query_row(
                "SELECT draft_id FROM draft_files WHERE id = ?1",
                params![file_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if owner.as_deref() != Some(draft_id.to_string().as_str()) {
            return Err(StoreError::Invalid(format!(
                "file {file_id} is not attached to draft {draft_id}"
            )));
        }
    }

    let at = ts(&now());
    match input.id {
        None => {
            let id = Uuid::new_v4();
            conn.execute(
                "INSERT INTO file_comments (id, check_id, type, file_id, comment,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    id.to_string(),
                    check_id.to_string(),
                    input.kind.as_str(),
                    input.file_id.map(|f| f.to_string()),
                    input.comment,
                    at,
                ],
            )
            .map_err(StoreError::from_query)?;
            Ok(id)
        }
        Some(id) => {
            let affected = conn.execute(
                "UPDATE file_comments
                 SET type = ?1, file_id = ?2, comment = ?3, updated_at = ?4
                 WHERE id = ?5 AND check_id = ?6",
                params![
                    input.kind.as_str(),
                    input.file_id.map(|f| f.to_string()),
                    input.comment,
                    at,
                    id.to_string(),
                    check_id.to_string(),
                ],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(id)
        }
    }
}

fn load_check(conn: &Connection, id: Uuid) -> Result<EditorCheck> {
    let mut check = conn
        .query_row(
            &format!("SELECT {CHECK_COLUMNS} FROM editor_checks c WHERE c.id = ?1"),
            params![id.to_string()],
            row_to_check,
        )
        .map_err(StoreError::from_query)?;
    check.comments = load_comments(conn, id)?;
    Ok(check)
}

fn load_comments(conn: &Connection, check_id: Uuid) -> Result<Vec<FileComment>> {
    let mut stmt = conn.prepare(
        "SELECT id, check_id, type, file_id, comment, created_at, updated_at
         FROM file_comments
         WHERE check_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![check_id.to_string()], row_to_comment)?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row?);
    }
    Ok(comments)
}

/// The most recent comment of one section, echoed onto the draft.
fn section_comment(check: &EditorCheck, kind: FileKind) -> Option<String> {
    check
        .comments
        .iter()
        .rev()
        .find(|c| c.kind == kind)
        .map(|c| c.comment.clone())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_check(row: &Row<'_>) -> rusqlite::Result<EditorCheck> {
    Ok(EditorCheck {
        id: uuid_at(row, 0)?,
        checker_id: uuid_at(row, 1)?,
        draft_id: uuid_at(row, 2)?,
        check_type: enum_at(row, 3)?,
        status: enum_at(row, 4)?,
        comment: row.get(5)?,
        comments: Vec::new(),
        created_at: ts_at(row, 6)?,
        updated_at: ts_at(row, 7)?,
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<FileComment> {
    Ok(FileComment {
        id: uuid_at(row, 0)?,
        check_id: uuid_at(row, 1)?,
        kind: enum_at(row, 2)?,
        file_id: opt_uuid_at(row, 3)?,
        comment: row.get(4)?,
        created_at: ts_at(row, 5)?,
        updated_at: ts_at(row, 6)?,
    })
}
