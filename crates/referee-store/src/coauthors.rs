//! Co-authors listed on a draft.

use rusqlite::{params, Row};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::CoAuthor;
use crate::query::{compose, Filter};
use crate::rows::{now, ts, ts_at, uuid_at};

impl Database {
    /// Listing the same user twice on one draft is a [`StoreError::Conflict`].
    pub fn add_co_author(&self, draft_id: Uuid, user_id: Uuid) -> Result<CoAuthor> {
        let co_author = CoAuthor {
            id: Uuid::new_v4(),
            draft_id,
            user_id,
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO co_authors (id, draft_id, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    co_author.id.to_string(),
                    draft_id.to_string(),
                    user_id.to_string(),
                    ts(&co_author.created_at),
                ],
            )
            .map_err(StoreError::from_query)?;

        Ok(co_author)
    }

    pub fn list_co_authors(&self, draft_id: Uuid) -> Result<Vec<CoAuthor>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, draft_id, user_id, created_at
             FROM co_authors
             WHERE draft_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![draft_id.to_string()], row_to_co_author)?;

        let mut co_authors = Vec::new();
        for row in rows {
            co_authors.push(row?);
        }
        Ok(co_authors)
    }

    pub fn delete_co_authors(&self, draft_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut f = Filter::new();
        f.eq_id("draft_id", "draft_id", Some(draft_id))
            .any_id("id", "id", ids);
        self.execute(&compose(
            &format!("DELETE FROM co_authors {}", f.where_sql()),
            f.args(),
        ))
    }
}

fn row_to_co_author(row: &Row<'_>) -> rusqlite::Result<CoAuthor> {
    Ok(CoAuthor {
        id: uuid_at(row, 0)?,
        draft_id: uuid_at(row, 1)?,
        user_id: uuid_at(row, 2)?,
        created_at: ts_at(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDraft;

    #[test]
    fn test_co_authors() {
        let db = Database::open_in_memory().unwrap();
        let d = db
            .create_draft(&NewDraft {
                author_id: Uuid::new_v4(),
                title: "Joint work".into(),
                ..Default::default()
            })
            .unwrap()
            .id;
        let user = Uuid::new_v4();

        let added = db.add_co_author(d, user).unwrap();
        assert!(matches!(
            db.add_co_author(d, user),
            Err(StoreError::Conflict(_))
        ));
        let second = db.add_co_author(d, Uuid::new_v4()).unwrap();

        assert_eq!(db.list_co_authors(d).unwrap(), vec![added.clone(), second]);
        assert_eq!(db.delete_co_authors(d, &[added.id]).unwrap(), 1);
        assert_eq!(db.list_co_authors(d).unwrap().len(), 1);
    }
}
