//! CRUD operations for [`Review`] assignments.

use rusqlite::{params, Row};
use uuid::Uuid;

use referee_shared::ReviewStatus;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Listing, Review, ReviewFilter, ReviewPatch};
use crate::query::{compose, Assignments, Filter};
use crate::rows::{enum_at, now, ts, ts_at, uuid_at};

const REVIEW_COLUMNS: &str =
    "r.id, r.reviewer_id, r.draft_id, r.status, r.comment, r.created_at, r.updated_at";

impl Database {
    /// Assign `reviewer_id` to a draft.  A second assignment of the same pair
    /// is a [`StoreError::Conflict`].
    pub fn create_review(&self, reviewer_id: Uuid, draft_id: Uuid) -> Result<Review> {
        let id = Uuid::new_v4();
        let at = ts(&now());

        self.conn()
            .execute(
                "INSERT INTO reviews (id, reviewer_id, draft_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    id.to_string(),
                    reviewer_id.to_string(),
                    draft_id.to_string(),
                    ReviewStatus::Pending.as_str(),
                    at,
                ],
            )
            .map_err(StoreError::from_query)?;

        self.get_review(id)
    }

    pub fn get_review(&self, id: Uuid) -> Result<Review> {
        self.conn()
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = ?1"),
                params![id.to_string()],
                row_to_review,
            )
            .map_err(StoreError::from_query)
    }

    pub fn list_reviews(&self, filter: &ReviewFilter) -> Result<Listing<Review>> {
        let mut f = Filter::new();
        f.eq_id("r.draft_id", "draft_id", filter.draft_id)
            .eq_id("r.reviewer_id", "reviewer_id", filter.reviewer_id)
            .eq("r.status", "status", filter.status.map(|s| s.as_str().to_string()))
            .search(&["r.comment"], filter.search.as_deref());

        let count = self.count(&f.count_sql("reviews r"))?;
        let items = self.fetch_all(
            &f.page_sql(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews r"),
                "r.created_at DESC, r.rowid DESC",
                filter.page,
            ),
            row_to_review,
        )?;

        Ok(Listing { items, count })
    }

    /// Sparse update.  Returns the number of rows changed.
    pub fn update_review(&self, id: Uuid, patch: &ReviewPatch) -> Result<usize> {
        let mut set = Assignments::new();
        set.set("status", patch.status.map(|s| s.as_str().to_string()))
            .set("comment", patch.comment.clone());
        if set.is_empty() {
            return Err(StoreError::Invalid("empty review update".into()));
        }
        set.always("updated_at", ts(&now()));

        let mut f = Filter::new();
        f.eq_id("id", "id", Some(id));
        self.execute(&set.update_sql("reviews", &f))
    }

    pub fn delete_review(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM reviews WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// Remove every review held by `reviewer_id`, optionally on one draft only.
    pub fn delete_reviews_by_reviewer(
        &self,
        reviewer_id: Uuid,
        draft_id: Option<Uuid>,
    ) -> Result<usize> {
        let mut f = Filter::new();
        f.eq_id("reviewer_id", "reviewer_id", Some(reviewer_id))
            .eq_id("draft_id", "draft_id", draft_id);
        self.execute(&compose(
            &format!("DELETE FROM reviews {}", f.where_sql()),
            f.args(),
        ))
    }
}

fn row_to_review(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: uuid_at(row, 0)?,
        reviewer_id: uuid_at(row, 1)?,
        draft_id: uuid_at(row, 2)?,
        status: enum_at(row, 3)?,
        comment: row.get(4)?,
        created_at: ts_at(row, 5)?,
        updated_at: ts_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDraft;
    use crate::query::Page;

    fn draft(db: &Database) -> Uuid {
        db.create_draft(&NewDraft {
            author_id: Uuid::new_v4(),
            title: "Reviewed".into(),
            ..Default::default()
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_assignment_is_unique_per_pair() {
        let db = Database::open_in_memory().unwrap();
        let d = draft(&db);
        let reviewer = Uuid::new_v4();

        let review = db.create_review(reviewer, d).unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
        assert!(review.comment.is_none());

        assert!(matches!(
            db.create_review(reviewer, d),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_update_and_filter() {
        let db = Database::open_in_memory().unwrap();
        let d = draft(&db);
        let a = db.create_review(Uuid::new_v4(), d).unwrap();
        db.create_review(Uuid::new_v4(), d).unwrap();

        let rows = db
            .update_review(
                a.id,
                &ReviewPatch {
                    status: Some(ReviewStatus::Approved),
                    comment: Some("solid methodology".into()),
                },
            )
            .unwrap();
        assert_eq!(rows, 1);

        let approved = db
            .list_reviews(&ReviewFilter {
                draft_id: Some(d),
                status: Some(ReviewStatus::Approved),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(approved.count, 1);
        assert_eq!(approved.items[0].comment.as_deref(), Some("solid methodology"));

        let searched = db
            .list_reviews(&ReviewFilter {
                search: Some("METHOD".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.count, 1);

        assert_eq!(
            db.update_review(
                Uuid::new_v4(),
                &ReviewPatch {
                    status: Some(ReviewStatus::Rejected),
                    comment: None,
                }
            )
            .unwrap(),
            0
        );
        assert!(matches!(
            db.update_review(a.id, &ReviewPatch::default()),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_repeated_review_listing_is_stable() {
        let db = Database::open_in_memory().unwrap();
        let draft_id = draft(&db);
        let created: Vec<Review> = (0..5)
            .map(|_| db.create_review(Uuid::new_v4(), draft_id).unwrap())
            .collect();

        let filter = ReviewFilter {
            draft_id: Some(draft_id),
            page: Page::new(Some(1), Some(2)),
            ..Default::default()
        };
        let first = db.list_reviews(&filter).unwrap();
        let second = db.list_reviews(&filter).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.count, 5);

        // Newest first; the page skips the latest one.
        let ids: Vec<Uuid> = first.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![created[3].id, created[2].id]);

        let exhaustive = db
            .list_reviews(&ReviewFilter {
                draft_id: Some(draft_id),
                page: Page::new(None, Some(100)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(exhaustive.count, exhaustive.items.len() as i64);
    }

    #[test]
    fn test_delete_by_reviewer() {
        let db = Database::open_in_memory().unwrap();
        let d1 = draft(&db);
        let d2 = draft(&db);
        let reviewer = Uuid::new_v4();
        db.create_review(reviewer, d1).unwrap();
        let kept = db.create_review(reviewer, d2).unwrap();

        assert_eq!(db.delete_reviews_by_reviewer(reviewer, Some(d1)).unwrap(), 1);
        assert!(db.get_review(kept.id).is_ok());
        assert_eq!(db.delete_reviews_by_reviewer(reviewer, None).unwrap(), 1);
        assert!(!db.delete_review(kept.id).unwrap());
    }
}
