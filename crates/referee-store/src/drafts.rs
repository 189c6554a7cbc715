//! CRUD operations for [`Draft`] revisions.
//!
//! A manuscript is a family of drafts sharing one `group_id`.  The current
//! revision of a family is the one with the greatest `created_at`, ties broken
//! by insertion order; every other revision is history and is never written
//! again.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use referee_shared::DraftTransition;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Draft, DraftFilter, DraftPatch, Listing, NewDraft};
use crate::query::{Assignments, Filter};
use crate::rows::{enum_at, now, opt_enum_at, opt_uuid_at, ts, ts_at, uuid_at};

const DRAFT_COLUMNS: &str = "d.id, d.group_id, d.journal_id, d.author_id, d.type, d.title, \
     d.description, d.manuscript, d.cover_letter, d.supplemental, d.status, d.step, \
     d.editor_status, d.reviewer_status, d.editor_id, d.editor_comment, \
     d.editor_manuscript_comment, d.editor_cover_letter_comment, \
     d.editor_supplemental_comment, d.created_at, d.updated_at";

/// Restrict `column` to the current revision of each family.
pub(crate) fn current_revision(column: &str) -> String {
    format!(
        "{column} IN (SELECT FIRST_VALUE(id) OVER \
         (PARTITION BY group_id ORDER BY created_at DESC, rowid DESC) FROM drafts)"
    )
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new revision.  Without a `group_id` a new family is started.
    pub fn create_draft(&self, new: &NewDraft) -> Result<Draft> {
        let id = Uuid::new_v4();
        let group_id = new.group_id.unwrap_or_else(Uuid::new_v4);
        let created_at = ts(&now());

        self.conn()
            .execute(
                "INSERT INTO drafts (id, group_id, journal_id, author_id, type, title,
                     description, manuscript, cover_letter, supplemental, status, step,
                     editor_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                params![
                    id.to_string(),
                    group_id.to_string(),
                    new.journal_id.map(|j| j.to_string()),
                    new.author_id.to_string(),
                    new.draft_type,
                    new.title,
                    new.description,
                    new.manuscript,
                    new.cover_letter,
                    new.supplemental,
                    new.status.as_str(),
                    new.step.map(|s| s.as_str()),
                    new.editor_status,
                    created_at,
                ],
            )
            .map_err(StoreError::from_query)?;

        tracing::debug!(%id, %group_id, "draft created");
        load_draft(self.conn(), id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_draft(&self, id: Uuid) -> Result<Draft> {
        load_draft(self.conn(), id)
    }

    /// List drafts matching `filter`, newest first.
    ///
    /// Only current revisions are listed unless the filter names a family, in
    /// which case its whole history is returned.
    pub fn list_drafts(&self, filter: &DraftFilter) -> Result<Listing<Draft>> {
        let mut f = Filter::new();
        if filter.group_id.is_none() {
            f.raw(current_revision("d.id"));
        }
        f.eq_id("d.group_id", "group_id", filter.group_id)
            .eq_id("d.journal_id", "journal_id", filter.journal_id)
            .eq_id("d.author_id", "author_id", filter.author_id)
            .eq("d.status", "status", filter.status.map(|s| s.as_str().to_string()))
            .search(&["d.title", "d.description"], filter.search.as_deref())
            .since("d.created_at", "since", filter.since)
            .until("d.created_at", "until", filter.until);

        let count = self.count(&f.count_sql("drafts d"))?;
        let items = self.fetch_all(
            &f.page_sql(
                &format!("SELECT {DRAFT_COLUMNS} FROM drafts d"),
                "d.created_at DESC, d.rowid DESC",
                filter.page,
            ),
            row_to_draft,
        )?;

        Ok(Listing { items, count })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Write the present fields of `patch` to the draft.
    ///
    /// Returns the number of rows changed: `0` when the draft does not exist
    /// or has been superseded by a newer revision.
    pub fn update_draft(&self, id: Uuid, patch: &DraftPatch) -> Result<usize> {
        if patch.is_empty() {
            return Err(StoreError::Invalid("empty draft update".into()));
        }

        let mut set = Assignments::new();
        set.set_id("journal_id", patch.journal_id)
            .set("type", patch.draft_type.clone())
            .set("title", patch.title.clone())
            .set("description", patch.description.clone())
            .set("manuscript", patch.manuscript.clone())
            .set("cover_letter", patch.cover_letter.clone())
            .set("supplemental", patch.supplemental.clone())
            .set("status", patch.status.map(|s| s.as_str().to_string()))
            .set("step", patch.step.map(|s| s.as_str().to_string()))
            .set("editor_status", patch.editor_status.clone())
            .set("reviewer_status", patch.reviewer_status.clone())
            .set_id("editor_id", patch.editor_id)
            .set("editor_comment", patch.editor_comment.clone())
            .set("editor_manuscript_comment", patch.editor_manuscript_comment.clone())
            .set("editor_cover_letter_comment", patch.editor_cover_letter_comment.clone())
            .set("editor_supplemental_comment", patch.editor_supplemental_comment.clone())
            .always("updated_at", ts(&now()));

        let mut f = Filter::new();
        f.eq_id("id", "id", Some(id)).raw(current_revision("id"));

        self.execute(&set.update_sql("drafts", &f))
    }

    /// Move the current revision to `transition`.  A `None` step is stored
    /// as unowned.
    pub fn apply_transition(&self, id: Uuid, transition: DraftTransition) -> Result<usize> {
        write_transition(self.conn(), id, transition, &Assignments::new())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete one revision together with its files, co-authors, checks and
    /// reviews.  Returns `true` if a row was removed.
    pub fn delete_draft(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM drafts WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers (usable inside a transaction)
// ---------------------------------------------------------------------------

pub(crate) fn load_draft(conn: &Connection, id: Uuid) -> Result<Draft> {
    conn.query_row(
        &format!("SELECT {DRAFT_COLUMNS} FROM drafts d WHERE d.id = ?1"),
        params![id.to_string()],
        row_to_draft,
    )
    .map_err(StoreError::from_query)
}

/// Write `transition` plus any `extra` assignments to the current revision.
pub(crate) fn write_transition(
    conn: &Connection,
    id: Uuid,
    transition: DraftTransition,
    extra: &Assignments,
) -> Result<usize> {
    let mut set = extra.clone();
    set.always("status", transition.status.as_str().to_string())
        .always(
            "step",
            transition
                .step
                .map(|s| SqlValue::Text(s.as_str().to_string()))
                .unwrap_or(SqlValue::Null),
        )
        .always("updated_at", ts(&now()));

    let mut f = Filter::new();
    f.eq_id("id", "id", Some(id)).raw(current_revision("id"));

    let composed = set.update_sql("drafts", &f);
    conn.execute(&composed.sql, composed.params())
        .map_err(StoreError::from_query)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_draft(row: &Row<'_>) -> rusqlite::Result<Draft> {
    Ok(Draft {
        id: uuid_at(row, 0)?,
        group_id: uuid_at(row, 1)?,
        journal_id: opt_uuid_at(row, 2)?,
        author_id: uuid_at(row, 3)?,
        draft_type: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        manuscript: row.get(7)?,
        cover_letter: row.get(8)?,
        supplemental: row.get(9)?,
        status: enum_at(row, 10)?,
        step: opt_enum_at(row, 11)?,
        editor_status: row.get(12)?,
        reviewer_status: row.get(13)?,
        editor_id: opt_uuid_at(row, 14)?,
        editor_comment: row.get(15)?,
        editor_manuscript_comment: row.get(16)?,
        editor_cover_letter_comment: row.get(17)?,
        editor_supplemental_comment: row.get(18)?,
        created_at: ts_at(row, 19)?,
        updated_at: ts_at(row, 20)?,
    })
}
