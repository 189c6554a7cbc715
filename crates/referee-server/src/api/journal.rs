//! Journal-scoped routes: the editor's view of drafts, editor decisions and
//! reviewer assignment.  Every route checks that the draft belongs to the
//! journal in the path.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use referee_shared::{CheckStatus, CheckType, DraftStatus, DraftTransition, ReviewStatus};
use referee_store::{
    BatchResult, CheckFilter, DecisionOutcome, Draft, DraftFilter, EditorCheck, EditorCheckPatch,
    FileCommentInput, Page, Review, ReviewFilter,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_id, ApiJson, ApiQuery, AppState, ListResponse};
use crate::error::ServerError;
use crate::workflow::{Assignment, DecisionRequest};

type Result<T> = std::result::Result<T, ServerError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuery {
    pub author_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub status: Option<DraftStatus>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckBody {
    pub checker_id: Uuid,
    #[serde(rename = "type", default)]
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub comment: Option<String>,
    #[serde(default)]
    pub comments: Vec<FileCommentInput>,
}

#[derive(Deserialize)]
pub struct UpdateCheckBody {
    pub id: Uuid,
    pub status: Option<CheckStatus>,
    pub comment: Option<String>,
    #[serde(default)]
    pub comments: Vec<FileCommentInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuery {
    pub checker_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub check_type: Option<CheckType>,
    pub status: Option<CheckStatus>,
    pub search: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct AssignReviewerBody {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub reviewer_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
    pub search: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// The persisted check, the per-comment outcome and the draft it moved.
#[derive(Serialize)]
pub struct DecisionResponse {
    pub check: EditorCheck,
    pub comments: BatchResult,
    pub transition: DraftTransition,
    pub draft: Draft,
}

impl From<DecisionOutcome> for DecisionResponse {
    fn from(outcome: DecisionOutcome) -> Self {
        Self {
            check: outcome.check,
            comments: outcome.comments,
            transition: outcome.transition,
            draft: outcome.draft,
        }
    }
}

fn journal_draft(state: &AppState, journal_id: &str, draft_id: &str) -> Result<(Uuid, Uuid)> {
    let journal_id = parse_id(journal_id, "journal id")?;
    let draft_id = parse_id(draft_id, "draft id")?;
    state.service().get_journal_draft(journal_id, draft_id)?;
    Ok((journal_id, draft_id))
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

pub async fn list_drafts(
    State(state): State<AppState>,
    Path(journal_id): Path<String>,
    ApiQuery(q): ApiQuery<DraftQuery>,
) -> Result<Json<ListResponse<Draft>>> {
    let journal_id = parse_id(&journal_id, "journal id")?;

    let listing = state.service().list_drafts(&DraftFilter {
        journal_id: Some(journal_id),
        author_id: q.author_id,
        group_id: q.group_id,
        status: q.status,
        search: q.search,
        since: q.since,
        until: q.until,
        page: Page::new(q.offset, q.limit),
    })?;

    Ok(Json(listing.into()))
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path((journal_id, draft_id)): Path<(String, String)>,
) -> Result<Json<Draft>> {
    let journal_id = parse_id(&journal_id, "journal id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;
    Ok(Json(state.service().get_journal_draft(journal_id, draft_id)?))
}

// ---------------------------------------------------------------------------
// Editor checks
// ---------------------------------------------------------------------------

pub async fn create_check(
    State(state): State<AppState>,
    Path((journal_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<CreateCheckBody>,
) -> Result<impl IntoResponse> {
    let journal_id = parse_id(&journal_id, "journal id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;

    let outcome = state
        .workflow
        .create_decision(
            journal_id,
            draft_id,
            DecisionRequest {
                checker_id: body.checker_id,
                check_type: body.check_type,
                status: body.status,
                comment: body.comment,
                comments: body.comments,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DecisionResponse::from(outcome))))
}

pub async fn update_check(
    State(state): State<AppState>,
    Path((journal_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<UpdateCheckBody>,
) -> Result<Json<DecisionResponse>> {
    let journal_id = parse_id(&journal_id, "journal id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;

    if body.status.is_none() && body.comment.is_none() && body.comments.is_empty() {
        return Err(ServerError::InvalidArgument("nothing to update".into()));
    }

    let outcome = state
        .workflow
        .update_decision(
            journal_id,
            draft_id,
            body.id,
            EditorCheckPatch {
                status: body.status,
                comment: body.comment,
                comments: body.comments,
            },
        )
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn list_checks(
    State(state): State<AppState>,
    Path((journal_id, draft_id)): Path<(String, String)>,
    ApiQuery(q): ApiQuery<CheckQuery>,
) -> Result<Json<ListResponse<EditorCheck>>> {
    let (_, draft_id) = journal_draft(&state, &journal_id, &draft_id)?;

    let listing = state.service().list_editor_checks(&CheckFilter {
        draft_id: Some(draft_id),
        checker_id: q.checker_id,
        check_type: q.check_type,
        status: q.status,
        search: q.search,
        page: Page::new(q.offset, q.limit),
    })?;

    Ok(Json(listing.into()))
}

/// The check, provided it was recorded on the draft in the path.
fn draft_check(state: &AppState, draft_id: Uuid, check_id: &str) -> Result<EditorCheck> {
    let check_id = parse_id(check_id, "check id")?;
    let check = state.service().get_editor_check(check_id)?;
    if check.draft_id != draft_id {
        return Err(ServerError::NotFound(format!(
            "check {check_id} on draft {draft_id}"
        )));
    }
    Ok(check)
}

pub async fn get_check(
    State(state): State<AppState>,
    Path((journal_id, draft_id, check_id)): Path<(String, String, String)>,
) -> Result<Json<EditorCheck>> {
    let (_, draft_id) = journal_draft(&state, &journal_id, &draft_id)?;
    Ok(Json(draft_check(&state, draft_id, &check_id)?))
}

pub async fn delete_check(
    State(state): State<AppState>,
    Path((journal_id, draft_id, check_id)): Path<(String, String, String)>,
) -> Result<StatusCode> {
    let (_, draft_id) = journal_draft(&state, &journal_id, &draft_id)?;
    let check = draft_check(&state, draft_id, &check_id)?;
    state.service().delete_editor_check(check.id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Reviewers
// ---------------------------------------------------------------------------

pub async fn assign_reviewer(
    State(state): State<AppState>,
    Path((journal_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<AssignReviewerBody>,
) -> Result<(StatusCode, Json<Assignment>)> {
    let journal_id = parse_id(&journal_id, "journal id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;

    let assignment = state
        .workflow
        .assign_reviewer(journal_id, draft_id, &body.email)
        .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn remove_reviewer(
    State(state): State<AppState>,
    Path((journal_id, draft_id, reviewer_id)): Path<(String, String, String)>,
) -> Result<StatusCode> {
    let journal_id = parse_id(&journal_id, "journal id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;
    let reviewer_id = parse_id(&reviewer_id, "reviewer id")?;

    state
        .workflow
        .remove_reviewer(journal_id, draft_id, reviewer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path((journal_id, draft_id)): Path<(String, String)>,
    ApiQuery(q): ApiQuery<ReviewQuery>,
) -> Result<Json<ListResponse<Review>>> {
    let (_, draft_id) = journal_draft(&state, &journal_id, &draft_id)?;

    let listing = state.service().list_reviews(&ReviewFilter {
        draft_id: Some(draft_id),
        reviewer_id: q.reviewer_id,
        status: q.status,
        search: q.search,
        page: Page::new(q.offset, q.limit),
    })?;

    Ok(Json(listing.into()))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path((journal_id, draft_id, review_id)): Path<(String, String, String)>,
) -> Result<Json<Review>> {
    let (_, draft_id) = journal_draft(&state, &journal_id, &draft_id)?;
    let review_id = parse_id(&review_id, "review id")?;

    let review = state.service().get_review(review_id)?;
    if review.draft_id != draft_id {
        return Err(ServerError::NotFound(format!(
            "review {review_id} on draft {draft_id}"
        )));
    }
    Ok(Json(review))
}
