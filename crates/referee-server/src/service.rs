//! Workflow service: field defaulting and validation in front of the store,
//! with store errors translated into the HTTP error taxonomy.

use std::sync::{Arc, Mutex};

use referee_shared::{CheckType, DraftStatus, DraftTransition, FileKind, Step};
use referee_store::{
    CheckFilter, CoAuthor, Database, DecisionOutcome, Draft, DraftFile, DraftFilter, DraftPatch,
    EditorCheck, EditorDecision, Listing, NewDraft, Page, Review, ReviewFilter, ReviewPatch,
    StoreError,
};
use uuid::Uuid;

use crate::error::ServerError;

/// Submission database shared by the service and the local directory.
pub type SharedDb = Arc<Mutex<Database>>;

type Result<T> = std::result::Result<T, ServerError>;

#[derive(Clone)]
pub struct WorkflowService {
    db: SharedDb,
}

impl WorkflowService {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let db = self
            .db
            .lock()
            .map_err(|_| ServerError::Internal("database lock poisoned".into()))?;
        Ok(f(&db)?)
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    /// Author submission.  `status` keeps the caller's value (NEW by
    /// default); `step` and `editorStatus` are always reset for the editor.
    pub fn create_draft(&self, mut new: NewDraft) -> Result<Draft> {
        if new.title.trim().is_empty() {
            return Err(ServerError::BadRequest("title must not be blank".into()));
        }
        author_status(new.status)?;
        new.step = Some(Step::Editor);
        new.editor_status = Some(DraftStatus::New.as_str().to_string());

        let draft = self.with_db(|db| db.create_draft(&new))?;
        tracing::info!(
            draft_id = %draft.id,
            group_id = %draft.group_id,
            author_id = %draft.author_id,
            "draft submitted"
        );
        Ok(draft)
    }

    pub fn get_draft(&self, id: Uuid) -> Result<Draft> {
        self.with_db(|db| db.get_draft(id))
    }

    /// The draft, provided it belongs to `journal_id` (or to no journal yet).
    pub fn get_journal_draft(&self, journal_id: Uuid, id: Uuid) -> Result<Draft> {
        let draft = self.get_draft(id)?;
        match draft.journal_id {
            Some(j) if j != journal_id => Err(ServerError::NotFound(format!(
                "draft {id} in journal {journal_id}"
            ))),
            _ => Ok(draft),
        }
    }

    /// The draft, provided `author_id` wrote it.
    pub fn get_author_draft(&self, author_id: Uuid, id: Uuid) -> Result<Draft> {
        let draft = self.get_draft(id)?;
        if draft.author_id != author_id {
            return Err(ServerError::NotFound(format!("draft {id} of user {author_id}")));
        }
        Ok(draft)
    }

    /// Current revision of a manuscript family.
    pub fn current_revision(&self, group_id: Uuid) -> Result<Draft> {
        let listing = self.list_drafts(&DraftFilter {
            group_id: Some(group_id),
            page: Page::new(None, Some(1)),
            ..Default::default()
        })?;
        listing
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ServerError::NotFound(format!("manuscript {group_id}")))
    }

    pub fn list_drafts(&self, filter: &DraftFilter) -> Result<Listing<Draft>> {
        self.with_db(|db| db.list_drafts(filter))
    }

    pub fn update_draft(&self, id: Uuid, patch: &DraftPatch) -> Result<usize> {
        if patch.is_empty() {
            return Err(ServerError::InvalidArgument("nothing to update".into()));
        }
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServerError::BadRequest("title must not be blank".into()));
        }

        let rows = self.with_db(|db| db.update_draft(id, patch))?;
        if rows == 0 {
            return Err(ServerError::no_rows("current draft revision"));
        }
        Ok(rows)
    }

    /// Author-side update: the draft must be theirs and any status must be
    /// one an author may set.
    pub fn update_author_draft(
        &self,
        author_id: Uuid,
        id: Uuid,
        patch: &DraftPatch,
    ) -> Result<usize> {
        self.get_author_draft(author_id, id)?;
        if let Some(status) = patch.status {
            author_status(status)?;
        }
        self.update_draft(id, patch)
    }

    pub fn delete_draft(&self, id: Uuid) -> Result<()> {
        if !self.with_db(|db| db.delete_draft(id))? {
            return Err(ServerError::no_rows("draft"));
        }
        tracing::info!(draft_id = %id, "draft deleted");
        Ok(())
    }

    pub fn apply_transition(&self, id: Uuid, transition: DraftTransition) -> Result<()> {
        if self.with_db(|db| db.apply_transition(id, transition))? == 0 {
            return Err(ServerError::no_rows("current draft revision"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editor checks
    // ------------------------------------------------------------------

    pub fn apply_editor_decision(&self, decision: &EditorDecision) -> Result<DecisionOutcome> {
        self.with_db(|db| db.apply_editor_decision(decision))
    }

    pub fn find_editor_check(
        &self,
        checker_id: Uuid,
        draft_id: Uuid,
        check_type: CheckType,
    ) -> Result<Option<EditorCheck>> {
        self.with_db(|db| db.find_editor_check(checker_id, draft_id, check_type))
    }

    pub fn get_editor_check(&self, id: Uuid) -> Result<EditorCheck> {
        self.with_db(|db| db.get_editor_check(id))
    }

    pub fn list_editor_checks(&self, filter: &CheckFilter) -> Result<Listing<EditorCheck>> {
        self.with_db(|db| db.list_editor_checks(filter))
    }

    pub fn delete_editor_check(&self, id: Uuid) -> Result<()> {
        if !self.with_db(|db| db.delete_editor_check(id))? {
            return Err(ServerError::no_rows("editor check"));
        }
        Ok(())
    }

    pub fn delete_editor_checks_by_checker(
        &self,
        checker_id: Uuid,
        draft_id: Option<Uuid>,
    ) -> Result<usize> {
        let rows = self.with_db(|db| db.delete_editor_checks_by_checker(checker_id, draft_id))?;
        if rows == 0 {
            return Err(ServerError::no_rows("editor check"));
        }
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    pub fn create_review(&self, reviewer_id: Uuid, draft_id: Uuid) -> Result<Review> {
        self.with_db(|db| db.create_review(reviewer_id, draft_id))
    }

    pub fn find_review(&self, reviewer_id: Uuid, draft_id: Uuid) -> Result<Option<Review>> {
        let listing = self.list_reviews(&ReviewFilter {
            reviewer_id: Some(reviewer_id),
            draft_id: Some(draft_id),
            page: Page::new(None, Some(1)),
            ..Default::default()
        })?;
        Ok(listing.items.into_iter().next())
    }

    pub fn get_review(&self, id: Uuid) -> Result<Review> {
        self.with_db(|db| db.get_review(id))
    }

    pub fn list_reviews(&self, filter: &ReviewFilter) -> Result<Listing<Review>> {
        self.with_db(|db| db.list_reviews(filter))
    }

    pub fn update_review(&self, id: Uuid, patch: &ReviewPatch) -> Result<usize> {
        if patch.status.is_none() && patch.comment.is_none() {
            return Err(ServerError::InvalidArgument("nothing to update".into()));
        }
        let rows = self.with_db(|db| db.update_review(id, patch))?;
        if rows == 0 {
            return Err(ServerError::no_rows("review"));
        }
        Ok(rows)
    }

    pub fn delete_reviews_by_reviewer(
        &self,
        reviewer_id: Uuid,
        draft_id: Option<Uuid>,
    ) -> Result<usize> {
        let rows = self.with_db(|db| db.delete_reviews_by_reviewer(reviewer_id, draft_id))?;
        if rows == 0 {
            return Err(ServerError::no_rows("review"));
        }
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Files and co-authors
    // ------------------------------------------------------------------

    pub fn add_file(&self, draft_id: Uuid, url: &str, kind: FileKind) -> Result<DraftFile> {
        if url.trim().is_empty() {
            return Err(ServerError::BadRequest("file url must not be blank".into()));
        }
        self.with_db(|db| db.add_file(draft_id, url.trim(), kind))
    }

    pub fn list_files(&self, draft_id: Uuid, kind: Option<FileKind>) -> Result<Vec<DraftFile>> {
        self.with_db(|db| db.list_files(draft_id, kind))
    }

    pub fn delete_files(&self, draft_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Err(ServerError::BadRequest("ids must not be empty".into()));
        }
        let rows = self.with_db(|db| db.delete_files(draft_id, ids))?;
        if rows == 0 {
            return Err(ServerError::no_rows("file"));
        }
        Ok(rows)
    }

    pub fn add_co_author(&self, draft_id: Uuid, user_id: Uuid) -> Result<CoAuthor> {
        self.with_db(|db| db.add_co_author(draft_id, user_id))
    }

    pub fn list_co_authors(&self, draft_id: Uuid) -> Result<Vec<CoAuthor>> {
        self.with_db(|db| db.list_co_authors(draft_id))
    }

    pub fn delete_co_authors(&self, draft_id: Uuid, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Err(ServerError::BadRequest("ids must not be empty".into()));
        }
        let rows = self.with_db(|db| db.delete_co_authors(draft_id, ids))?;
        if rows == 0 {
            return Err(ServerError::no_rows("co-author"));
        }
        Ok(rows)
    }
}

/// Authors only start or park a draft; every later status comes from an
/// editor decision or an administrator.
fn author_status(status: DraftStatus) -> Result<()> {
    match status {
        DraftStatus::New | DraftStatus::Draft => Ok(()),
        other => Err(ServerError::BadRequest(format!(
            "status {other} cannot be set by an author"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> WorkflowService {
        let db = Database::open_in_memory().unwrap();
        WorkflowService::new(Arc::new(Mutex::new(db)))
    }

    fn submission(title: &str) -> NewDraft {
        NewDraft {
            journal_id: Some(Uuid::new_v4()),
            author_id: Uuid::new_v4(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_forces_editor_step() {
        let svc = service();
        let draft = svc
            .create_draft(NewDraft {
                step: Some(Step::Author),
                editor_status: Some("APPROVED".into()),
                ..submission("Fresh")
            })
            .unwrap();

        assert_eq!(draft.status, DraftStatus::New);
        assert_eq!(draft.step, Some(Step::Editor));
        assert_eq!(draft.editor_status.as_deref(), Some("NEW"));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.create_draft(submission("   ")),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_author_cannot_skip_the_workflow() {
        let svc = service();
        for status in [
            DraftStatus::Pending,
            DraftStatus::Denied,
            DraftStatus::Confirmed,
            DraftStatus::Published,
            DraftStatus::BackForCorrection,
        ] {
            assert!(
                matches!(
                    svc.create_draft(NewDraft {
                        status,
                        ..submission("Shortcut")
                    }),
                    Err(ServerError::BadRequest(_))
                ),
                "create with {status}"
            );
        }

        let parked = svc
            .create_draft(NewDraft {
                status: DraftStatus::Draft,
                ..submission("Parked")
            })
            .unwrap();
        assert_eq!(parked.status, DraftStatus::Draft);

        let publish = DraftPatch {
            status: Some(DraftStatus::Published),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_author_draft(parked.author_id, parked.id, &publish),
            Err(ServerError::BadRequest(_))
        ));
        assert_eq!(svc.get_draft(parked.id).unwrap().status, DraftStatus::Draft);

        let submit = DraftPatch {
            status: Some(DraftStatus::New),
            ..Default::default()
        };
        assert_eq!(
            svc.update_author_draft(parked.author_id, parked.id, &submit)
                .unwrap(),
            1
        );
        assert!(matches!(
            svc.update_author_draft(Uuid::new_v4(), parked.id, &submit),
            Err(ServerError::NotFound(_))
        ));
    }

    #[test]
    fn test_zero_rows_is_invalid_argument() {
        let svc = service();
        let patch = DraftPatch {
            title: Some("x".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_draft(Uuid::new_v4(), &patch),
            Err(ServerError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.update_draft(Uuid::new_v4(), &DraftPatch::default()),
            Err(ServerError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.get_draft(Uuid::new_v4()),
            Err(ServerError::NotFound(_))
        ));
    }

    #[test]
    fn test_second_delete_fails() {
        let svc = service();
        let draft = svc.create_draft(submission("Doomed")).unwrap();
        svc.delete_draft(draft.id).unwrap();

        assert!(matches!(
            svc.get_draft(draft.id),
            Err(ServerError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_draft(draft.id),
            Err(ServerError::InvalidArgument(_))
        ));
        let listing = svc.list_drafts(&DraftFilter::default()).unwrap();
        assert_eq!(listing.count, 0);
    }

    #[test]
    fn test_journal_scope() {
        let svc = service();
        let draft = svc.create_draft(submission("Scoped")).unwrap();
        let journal = draft.journal_id.unwrap();

        assert!(svc.get_journal_draft(journal, draft.id).is_ok());
        assert!(matches!(
            svc.get_journal_draft(Uuid::new_v4(), draft.id),
            Err(ServerError::NotFound(_))
        ));
        assert!(matches!(
            svc.get_author_draft(Uuid::new_v4(), draft.id),
            Err(ServerError::NotFound(_))
        ));
    }

    #[test]
    fn test_current_revision() {
        let svc = service();
        let first = svc.create_draft(submission("v1")).unwrap();
        let second = svc
            .create_draft(NewDraft {
                group_id: Some(first.group_id),
                author_id: first.author_id,
                ..submission("v2")
            })
            .unwrap();

        assert_eq!(svc.current_revision(first.group_id).unwrap().id, second.id);
        assert!(matches!(
            svc.current_revision(Uuid::new_v4()),
            Err(ServerError::NotFound(_))
        ));
    }
}
