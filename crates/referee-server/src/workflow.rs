//! Multi-step procedures that move a draft between actors.
//!
//! Every procedure on an existing draft runs under that draft's lock, so two
//! decisions on the same draft never interleave.  The editor decision itself
//! is one store transaction.  Assigning a reviewer spans the user directory
//! and the store, so each of its steps is written to be safe to repeat.

use std::sync::Arc;

use referee_shared::{CheckStatus, CheckType, DraftTransition, ReviewStatus, Role, Step};
use referee_store::{
    DecisionOutcome, Draft, DraftPatch, EditorCheckPatch, EditorDecision, FileCommentInput,
    NewDraft, NewEditorCheck, Review, ReviewPatch, User,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ServerError;
use crate::locks::DraftLocks;
use crate::peers::{Notifier, PeerError, UserDirectory};
use crate::service::WorkflowService;

type Result<T> = std::result::Result<T, ServerError>;

/// An editor's decision as submitted on the create path.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub checker_id: Uuid,
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub comment: Option<String>,
    pub comments: Vec<FileCommentInput>,
}

/// Outcome of assigning a reviewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub review: Review,
    pub draft: Draft,
    pub reviewer: User,
    /// The reviewer account did not exist and was created.
    pub provisioned: bool,
    /// The review row was created by this call rather than reused.
    pub created: bool,
    /// A reused review had already been decided and was put back to PENDING.
    pub reopened: bool,
    pub notified: bool,
}

pub struct Workflow {
    service: WorkflowService,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    locks: DraftLocks,
    reviewer_password: String,
}

impl Workflow {
    pub fn new(
        service: WorkflowService,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        reviewer_password: impl Into<String>,
    ) -> Self {
        Self {
            service,
            directory,
            notifier,
            locks: DraftLocks::new(),
            reviewer_password: reviewer_password.into(),
        }
    }

    pub fn service(&self) -> &WorkflowService {
        &self.service
    }

    pub fn locks(&self) -> &DraftLocks {
        &self.locks
    }

    /// Submit a draft.  With a `group_id` the draft becomes the new current
    /// revision of that manuscript, which must belong to the same author.
    pub async fn submit_draft(&self, new: NewDraft) -> Result<Draft> {
        let Some(group_id) = new.group_id else {
            return self.service.create_draft(new);
        };

        let _guard = self.locks.acquire(group_id).await;
        let current = self.service.current_revision(group_id)?;
        if current.author_id != new.author_id {
            return Err(ServerError::NotFound(format!("manuscript {group_id}")));
        }
        self.service.create_draft(new)
    }

    /// Record an editor decision and move the draft.
    ///
    /// A checker who already holds a check of the same type on the draft has
    /// that check updated, so re-submitting is harmless.
    pub async fn create_decision(
        &self,
        journal_id: Uuid,
        draft_id: Uuid,
        req: DecisionRequest,
    ) -> Result<DecisionOutcome> {
        let _guard = self.locks.acquire(draft_id).await;
        self.service.get_journal_draft(journal_id, draft_id)?;

        let decision = match self
            .service
            .find_editor_check(req.checker_id, draft_id, req.check_type)?
        {
            Some(existing) => {
                tracing::debug!(check_id = %existing.id, "checker already decided, updating");
                EditorDecision::Update {
                    id: existing.id,
                    patch: EditorCheckPatch {
                        status: Some(req.status),
                        comment: req.comment,
                        comments: req.comments,
                    },
                }
            }
            None => EditorDecision::Create(NewEditorCheck {
                checker_id: req.checker_id,
                draft_id,
                check_type: req.check_type,
                status: req.status,
                comment: req.comment,
                comments: req.comments,
            }),
        };

        self.service.apply_editor_decision(&decision)
    }

    /// Revise an existing editor check.  Without a status in the patch the
    /// stored status drives the transition.
    pub async fn update_decision(
        &self,
        journal_id: Uuid,
        draft_id: Uuid,
        check_id: Uuid,
        patch: EditorCheckPatch,
    ) -> Result<DecisionOutcome> {
        let _guard = self.locks.acquire(draft_id).await;
        self.service.get_journal_draft(journal_id, draft_id)?;

        let check = self.service.get_editor_check(check_id)?;
        if check.draft_id != draft_id {
            return Err(ServerError::NotFound(format!(
                "check {check_id} on draft {draft_id}"
            )));
        }

        self.service.apply_editor_decision(&EditorDecision::Update {
            id: check_id,
            patch,
        })
    }

    /// Invite a reviewer by email, provisioning the account when needed.
    pub async fn assign_reviewer(
        &self,
        journal_id: Uuid,
        draft_id: Uuid,
        email: &str,
    ) -> Result<Assignment> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ServerError::BadRequest(format!("invalid email: {email:?}")));
        }

        let _guard = self.locks.acquire(draft_id).await;
        let draft = self.service.get_journal_draft(journal_id, draft_id)?;
        let current = self.service.current_revision(draft.group_id)?;
        if current.id != draft_id {
            return Err(ServerError::InvalidArgument(format!(
                "draft {draft_id} is superseded by revision {}",
                current.id
            )));
        }

        let (reviewer, provisioned) = match self.directory.find_by_email(email)? {
            Some(user) => (user, false),
            None => {
                let user = self.directory.create_user(email, &self.reviewer_password)?;
                tracing::info!(user_id = %user.id, "reviewer account provisioned");
                (user, true)
            }
        };

        match self
            .directory
            .grant_role(reviewer.id, journal_id, Role::Reviewer)
        {
            Ok(_) => {}
            Err(PeerError::DuplicateRole) => {
                tracing::warn!(user_id = %reviewer.id, %journal_id, "reviewer role already granted");
            }
            Err(e) => return Err(e.into()),
        }

        let (review, created, reopened) = match self.service.find_review(reviewer.id, draft_id)? {
            Some(review) if review.status != ReviewStatus::Pending => {
                self.service.update_review(
                    review.id,
                    &ReviewPatch {
                        status: Some(ReviewStatus::Pending),
                        comment: None,
                    },
                )?;
                tracing::info!(
                    review_id = %review.id,
                    previous = %review.status,
                    "decided review reopened"
                );
                (self.service.get_review(review.id)?, false, true)
            }
            Some(review) => (review, false, false),
            None => (self.service.create_review(reviewer.id, draft_id)?, true, false),
        };

        self.service.update_draft(
            draft_id,
            &DraftPatch {
                step: Some(Step::Reviewer),
                reviewer_status: Some(ReviewStatus::Pending.as_str().to_string()),
                editor_status: Some(CheckStatus::Pending.as_str().to_string()),
                ..Default::default()
            },
        )?;
        let draft = self.service.get_draft(draft_id)?;

        let notified = match self.notifier.reviewer_assigned(&reviewer, &draft) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %reviewer.id, "reviewer notification failed");
                false
            }
        };

        tracing::info!(
            review_id = %review.id,
            %draft_id,
            provisioned,
            created,
            reopened,
            "reviewer assigned"
        );

        Ok(Assignment {
            review,
            draft,
            reviewer,
            provisioned,
            created,
            reopened,
            notified,
        })
    }

    /// Withdraw a reviewer from a draft.
    pub async fn remove_reviewer(
        &self,
        journal_id: Uuid,
        draft_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<usize> {
        let _guard = self.locks.acquire(draft_id).await;
        self.service.get_journal_draft(journal_id, draft_id)?;
        self.service
            .delete_reviews_by_reviewer(reviewer_id, Some(draft_id))
    }

    /// A reviewer records their decision.  Reviews are advisory: the draft
    /// only moves if [`DraftTransition::from_reviewer_decision`] says so.
    pub async fn submit_review(
        &self,
        reviewer_id: Uuid,
        review_id: Uuid,
        patch: ReviewPatch,
    ) -> Result<Review> {
        let review = self.service.get_review(review_id)?;
        if review.reviewer_id != reviewer_id {
            return Err(ServerError::NotFound(format!(
                "review {review_id} of user {reviewer_id}"
            )));
        }

        let _guard = self.locks.acquire(review.draft_id).await;
        self.service.update_review(review_id, &patch)?;

        if let Some(status) = patch.status {
            if let Some(transition) = DraftTransition::from_reviewer_decision(status) {
                self.service.apply_transition(review.draft_id, transition)?;
            }
        }

        self.service.get_review(review_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use referee_shared::{DraftStatus, FileKind};
    use referee_store::{Database, ReviewFilter, RoleGrant};

    use crate::peers::{LocalDirectory, LogNotifier};
    use crate::service::SharedDb;

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn reviewer_assigned(&self, _: &User, _: &Draft) -> std::result::Result<(), PeerError> {
            Err(PeerError::Unavailable("smtp down".into()))
        }
    }

    struct Fixture {
        db: SharedDb,
        workflow: Workflow,
    }

    fn fixture_with(notifier: Arc<dyn Notifier>) -> Fixture {
        let db: SharedDb = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let workflow = Workflow::new(
            WorkflowService::new(db.clone()),
            Arc::new(LocalDirectory::new(db.clone())),
            notifier,
            "default-pw",
        );
        Fixture { db, workflow }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(LogNotifier))
    }

    async fn submit(workflow: &Workflow, journal: Uuid) -> Draft {
        workflow
            .submit_draft(NewDraft {
                journal_id: Some(journal),
                author_id: Uuid::new_v4(),
                title: "A Study of Things".into(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn decision(checker: Uuid, status: CheckStatus) -> DecisionRequest {
        DecisionRequest {
            checker_id: checker,
            check_type: CheckType::Editor,
            status,
            comment: None,
            comments: Vec::new(),
        }
    }

    fn roles(f: &Fixture, user: Uuid) -> Vec<RoleGrant> {
        f.db.lock().unwrap().list_roles(user).unwrap()
    }

    #[tokio::test]
    async fn test_author_submission_goes_to_editor() {
        let f = fixture();
        let draft = submit(&f.workflow, Uuid::new_v4()).await;
        assert_eq!(draft.status, DraftStatus::New);
        assert_eq!(draft.step, Some(Step::Editor));
    }

    #[tokio::test]
    async fn test_editor_decision_moves_draft() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;

        let outcome = f
            .workflow
            .create_decision(
                journal,
                draft.id,
                decision(Uuid::new_v4(), CheckStatus::ApprovedWithCorrection),
            )
            .await
            .unwrap();
        assert_eq!(outcome.transition.status, DraftStatus::BackForCorrection);

        let after = f.workflow.service().get_draft(draft.id).unwrap();
        assert_eq!(after.status, DraftStatus::BackForCorrection);
        assert_eq!(after.step, Some(Step::Author));
    }

    #[tokio::test]
    async fn test_resubmitted_decision_updates_the_same_check() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;
        let checker = Uuid::new_v4();

        let first = f
            .workflow
            .create_decision(journal, draft.id, decision(checker, CheckStatus::Pending))
            .await
            .unwrap();
        let second = f
            .workflow
            .create_decision(journal, draft.id, decision(checker, CheckStatus::Rejected))
            .await
            .unwrap();

        assert_eq!(first.check.id, second.check.id);
        assert_eq!(second.check.status, CheckStatus::Rejected);
        assert_eq!(second.draft.status, DraftStatus::Denied);
        assert_eq!(first.draft.step, None);
    }

    #[tokio::test]
    async fn test_update_without_status_uses_stored_status() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;
        let created = f
            .workflow
            .create_decision(journal, draft.id, decision(Uuid::new_v4(), CheckStatus::Approved))
            .await
            .unwrap();

        let updated = f
            .workflow
            .update_decision(
                journal,
                draft.id,
                created.check.id,
                EditorCheckPatch {
                    status: None,
                    comment: Some("minor typos".into()),
                    comments: vec![FileCommentInput {
                        id: None,
                        kind: FileKind::Manuscript,
                        file_id: None,
                        comment: "p. 3".into(),
                    }],
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.draft.status, DraftStatus::Confirmed);
        assert_eq!(updated.draft.editor_manuscript_comment.as_deref(), Some("p. 3"));
        assert!(updated.comments.is_complete());
    }

    #[tokio::test]
    async fn test_decision_under_wrong_journal_is_not_found() {
        let f = fixture();
        let draft = submit(&f.workflow, Uuid::new_v4()).await;
        let err = f
            .workflow
            .create_decision(
                Uuid::new_v4(),
                draft.id,
                decision(Uuid::new_v4(), CheckStatus::Approved),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_assign_unknown_reviewer_provisions_account() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;

        let assignment = f
            .workflow
            .assign_reviewer(journal, draft.id, "new.reviewer@example.org")
            .await
            .unwrap();
        assert!(assignment.provisioned);
        assert!(assignment.created);
        assert!(assignment.notified);
        assert_eq!(assignment.review.status, ReviewStatus::Pending);
        assert_eq!(assignment.draft.step, Some(Step::Reviewer));
        assert_eq!(assignment.draft.reviewer_status.as_deref(), Some("PENDING"));
        assert_eq!(assignment.draft.editor_status.as_deref(), Some("PENDING"));

        let grants = roles(&f, assignment.reviewer.id);
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].role, Role::Reviewer);
        assert_eq!(grants[0].journal_id, journal);
    }

    #[tokio::test]
    async fn test_assign_reviewer_is_retry_safe() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;

        let first = f
            .workflow
            .assign_reviewer(journal, draft.id, "r@example.org")
            .await
            .unwrap();
        let again = f
            .workflow
            .assign_reviewer(journal, draft.id, "R@example.org")
            .await
            .unwrap();

        assert!(!again.provisioned);
        assert!(!again.created);
        assert!(!again.reopened);
        assert_eq!(again.review.id, first.review.id);
        assert_eq!(roles(&f, first.reviewer.id).len(), 1);
    }

    #[tokio::test]
    async fn test_reinvite_after_decision_reopens_review() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;

        let first = f
            .workflow
            .assign_reviewer(journal, draft.id, "r@example.org")
            .await
            .unwrap();
        f.workflow
            .submit_review(
                first.reviewer.id,
                first.review.id,
                ReviewPatch {
                    status: Some(ReviewStatus::Rejected),
                    comment: Some("needs more data".into()),
                },
            )
            .await
            .unwrap();

        let again = f
            .workflow
            .assign_reviewer(journal, draft.id, "r@example.org")
            .await
            .unwrap();
        assert!(!again.created);
        assert!(again.reopened);
        assert_eq!(again.review.id, first.review.id);
        assert_eq!(again.review.status, ReviewStatus::Pending);
        assert_eq!(again.draft.reviewer_status.as_deref(), Some("PENDING"));

        let stored = f.workflow.service().get_review(first.review.id).unwrap();
        assert_eq!(stored.status, ReviewStatus::Pending);
    }

    #[tokio::test]
    async fn test_assign_on_superseded_revision_writes_nothing() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let v1 = submit(&f.workflow, journal).await;
        let v2 = f
            .workflow
            .submit_draft(NewDraft {
                journal_id: Some(journal),
                author_id: v1.author_id,
                group_id: Some(v1.group_id),
                title: "A Study of Things, revised".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = f
            .workflow
            .assign_reviewer(journal, v1.id, "late@example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidArgument(_)));

        let reviews = f
            .workflow
            .service()
            .list_reviews(&ReviewFilter {
                draft_id: Some(v1.id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(reviews.count, 0);
        assert!(f
            .db
            .lock()
            .unwrap()
            .find_user_by_email("late@example.org")
            .unwrap()
            .is_none());

        let assignment = f
            .workflow
            .assign_reviewer(journal, v2.id, "late@example.org")
            .await
            .unwrap();
        assert_eq!(assignment.draft.id, v2.id);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_assignment() {
        let f = fixture_with(Arc::new(FailingNotifier));
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;

        let assignment = f
            .workflow
            .assign_reviewer(journal, draft.id, "r@example.org")
            .await
            .unwrap();
        assert!(!assignment.notified);
        assert_eq!(assignment.draft.step, Some(Step::Reviewer));
    }

    #[tokio::test]
    async fn test_assign_rejects_bad_email() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;
        assert!(matches!(
            f.workflow.assign_reviewer(journal, draft.id, "nobody").await,
            Err(ServerError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_reviewer_decision_leaves_draft_alone() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;
        let assignment = f
            .workflow
            .assign_reviewer(journal, draft.id, "r@example.org")
            .await
            .unwrap();
        let before = f.workflow.service().get_draft(draft.id).unwrap();

        let review = f
            .workflow
            .submit_review(
                assignment.reviewer.id,
                assignment.review.id,
                ReviewPatch {
                    status: Some(ReviewStatus::Rejected),
                    comment: Some("not novel".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(review.status, ReviewStatus::Rejected);

        let after = f.workflow.service().get_draft(draft.id).unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.step, before.step);
    }

    #[tokio::test]
    async fn test_review_of_someone_else_is_not_found() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;
        let assignment = f
            .workflow
            .assign_reviewer(journal, draft.id, "r@example.org")
            .await
            .unwrap();

        let err = f
            .workflow
            .submit_review(
                Uuid::new_v4(),
                assignment.review.id,
                ReviewPatch {
                    status: Some(ReviewStatus::Approved),
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_revision_requires_same_author() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;

        let revision = f
            .workflow
            .submit_draft(NewDraft {
                group_id: Some(draft.group_id),
                journal_id: Some(journal),
                author_id: draft.author_id,
                title: "Revised".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(revision.group_id, draft.group_id);

        let err = f
            .workflow
            .submit_draft(NewDraft {
                group_id: Some(draft.group_id),
                author_id: Uuid::new_v4(),
                title: "Hijack".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_decisions_are_serialized() {
        let f = fixture();
        let journal = Uuid::new_v4();
        let draft = submit(&f.workflow, journal).await;
        let workflow = Arc::new(f.workflow);

        let mut handles = Vec::new();
        for status in [CheckStatus::Approved, CheckStatus::Rejected] {
            let wf = workflow.clone();
            handles.push(tokio::spawn(async move {
                wf.create_decision(journal, draft.id, decision(Uuid::new_v4(), status))
                    .await
                    .unwrap()
            }));
        }
        let mut outcomes = Vec::new();
        for h in handles {
            outcomes.push(h.await.unwrap());
        }

        // The stored draft is exactly what one of the decisions left behind.
        let after = workflow.service().get_draft(draft.id).unwrap();
        let last = outcomes.iter().find(|o| o.draft == after);
        assert!(last.is_some());
        assert_eq!(after.editor_id, last.map(|o| o.check.checker_id));
    }
}
