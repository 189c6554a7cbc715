//! Files attached to a draft.

use rusqlite::{params, Row};
use uuid::Uuid;

use referee_shared::FileKind;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::DraftFile;
use crate::query::{compose, Filter};
use crate::rows::{enum_at, now, ts, ts_at, uuid_at};

impl Database {
    pub fn add_file(&self, draft_id: Uuid, url: &str, kind: FileKind) -> Result<DraftFile> {
        let file = DraftFile {
            id: Uuid::new_v4(),
            draft_id,
            url: url.to_string(),
            kind,
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO draft_files (id, draft_id, url, type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    file.id.to_string(),
                    file.draft_id.to_string(),
                    file.url,
                    file.kind.as_str(),
                    ts(&file.created_at),
                ],
            )
            .map_err(StoreError::from_query)?;

        Ok(file)
    }

    /// Files of a draft in upload order, optionally of one kind only.
    pub fn list_files(&self, draft_id: Uuid, kind: Option<FileKind>) -> Result<Vec<DraftFile>> {
        let mut f = Filter::new();
        f.eq_id("draft_id", "draft_id", Some(draft_id))
            .eq("type", "type", kind.map(|k| k.as_str().to_string()));

        self.fetch_all(
            &compose(
                &format!(
                    "SELECT id, draft_id, url, type, created_at FROM draft_files {}
                     ORDER BY created_at ASC, rowid ASC",
                    f.where_sql()
                ),
                f.args(),
            ),
            row_to_file,
        )
    }

    /// Delete the listed files of one draft.  Ids belonging to another draft
    /// are ignored.
    pub fn delete_files(&self, draft_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut f = Filter::new();
        f.eq_id("draft_id", "draft_id", Some(draft_id))
            .any_id("id", "id", ids);
        self.execute(&compose(
            &format!("DELETE FROM draft_files {}", f.where_sql()),
            f.args(),
        ))
    }
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<DraftFile> {
    Ok(DraftFile {
        id: uuid_at(row, 0)?,
        draft_id: uuid_at(row, 1)?,
        url: row.get(2)?,
        kind: enum_at(row, 3)?,
        created_at: ts_at(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDraft;

    fn draft(db: &Database) -> Uuid {
        db.create_draft(&NewDraft {
            author_id: Uuid::new_v4(),
            title: "With files".into(),
            ..Default::default()
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_add_list_delete() {
        let db = Database::open_in_memory().unwrap();
        let d = draft(&db);
        let other = draft(&db);

        let a = db.add_file(d, "s3://bucket/a.pdf", FileKind::Manuscript).unwrap();
        let b = db.add_file(d, "s3://bucket/b.pdf", FileKind::CoverLetter).unwrap();
        let foreign = db.add_file(other, "s3://bucket/c.pdf", FileKind::Manuscript).unwrap();

        let all = db.list_files(d, None).unwrap();
        assert_eq!(all, vec![a.clone(), b.clone()]);

        let manuscripts = db.list_files(d, Some(FileKind::Manuscript)).unwrap();
        assert_eq!(manuscripts, vec![a.clone()]);

        assert_eq!(db.delete_files(d, &[a.id, foreign.id]).unwrap(), 1);
        assert_eq!(db.list_files(d, None).unwrap(), vec![b]);
        assert_eq!(db.list_files(other, None).unwrap().len(), 1);
        assert_eq!(db.delete_files(d, &[]).unwrap(), 0);
    }

    #[test]
    fn test_file_on_missing_draft_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db
            .add_file(Uuid::new_v4(), "s3://x", FileKind::Other)
            .is_err());
    }
}
