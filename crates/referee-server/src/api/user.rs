//! Author routes: drafts, their files and co-authors, and the reviews a user
//! has been assigned.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use referee_shared::{DraftStatus, FileKind, ReviewStatus};
use referee_store::{
    CoAuthor, Draft, DraftFile, DraftFilter, DraftPatch, NewDraft, Page, Review, ReviewFilter,
    ReviewPatch,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{parse_id, ApiJson, ApiQuery, AppState, ListResponse, RowsAffected};
use crate::error::ServerError;

type Result<T> = std::result::Result<T, ServerError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftBody {
    pub journal_id: Option<Uuid>,
    /// Set to submit a new revision of an existing manuscript.
    pub group_id: Option<Uuid>,
    #[serde(rename = "type", default)]
    pub draft_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manuscript: String,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub supplemental: String,
    pub status: Option<DraftStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraftBody {
    pub id: Uuid,
    pub journal_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub draft_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub manuscript: Option<String>,
    pub cover_letter: Option<String>,
    pub supplemental: Option<String>,
    pub status: Option<DraftStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuery {
    pub journal_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub status: Option<DraftStatus>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct AddFileBody {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

#[derive(Deserialize)]
pub struct FileQuery {
    #[serde(rename = "type")]
    pub kind: Option<FileKind>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCoAuthorBody {
    pub user_id: Uuid,
}

/// Identifiers to delete, scoped to the draft in the path.
#[derive(Deserialize)]
pub struct IdsBody {
    pub ids: Vec<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub draft_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
    pub search: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SubmitReviewBody {
    pub id: Uuid,
    pub status: Option<ReviewStatus>,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

pub async fn create_draft(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<CreateDraftBody>,
) -> Result<impl IntoResponse> {
    let author_id = parse_id(&user_id, "user id")?;

    let draft = state
        .workflow
        .submit_draft(NewDraft {
            journal_id: body.journal_id,
            author_id,
            group_id: body.group_id,
            draft_type: body.draft_type,
            title: body.title,
            description: body.description,
            manuscript: body.manuscript,
            cover_letter: body.cover_letter,
            supplemental: body.supplemental,
            status: body.status.unwrap_or_default(),
            ..Default::default()
        })
        .await?;

    Ok((StatusCode::CREATED, Json(draft)))
}

pub async fn update_draft(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<UpdateDraftBody>,
) -> Result<Json<RowsAffected>> {
    let author_id = parse_id(&user_id, "user id")?;

    let rows_affected = state.service().update_author_draft(
        author_id,
        body.id,
        &DraftPatch {
            journal_id: body.journal_id,
            draft_type: body.draft_type,
            title: body.title,
            description: body.description,
            manuscript: body.manuscript,
            cover_letter: body.cover_letter,
            supplemental: body.supplemental,
            status: body.status,
            ..Default::default()
        },
    )?;

    Ok(Json(RowsAffected { rows_affected }))
}

pub async fn list_drafts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(q): ApiQuery<DraftQuery>,
) -> Result<Json<ListResponse<Draft>>> {
    let author_id = parse_id(&user_id, "user id")?;

    let listing = state.service().list_drafts(&DraftFilter {
        journal_id: q.journal_id,
        author_id: Some(author_id),
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
    Path((user_id, draft_id)): Path<(String, String)>,
) -> Result<Json<Draft>> {
    let author_id = parse_id(&user_id, "user id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;
    Ok(Json(state.service().get_author_draft(author_id, draft_id)?))
}

pub async fn delete_draft(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let author_id = parse_id(&user_id, "user id")?;
    let draft_id = parse_id(&draft_id, "draft id")?;

    let service = state.service();
    service.get_author_draft(author_id, draft_id)?;
    service.delete_draft(draft_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Resolve the `(user, draft)` path pair to a draft the user wrote.
fn owned_draft(state: &AppState, user_id: &str, draft_id: &str) -> Result<Uuid> {
    let author_id = parse_id(user_id, "user id")?;
    let draft_id = parse_id(draft_id, "draft id")?;
    state.service().get_author_draft(author_id, draft_id)?;
    Ok(draft_id)
}

pub async fn add_file(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<AddFileBody>,
) -> Result<impl IntoResponse> {
    let draft_id = owned_draft(&state, &user_id, &draft_id)?;
    let file = state.service().add_file(draft_id, &body.url, body.kind)?;
    Ok((StatusCode::CREATED, Json(file)))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
    ApiQuery(q): ApiQuery<FileQuery>,
) -> Result<Json<ListResponse<DraftFile>>> {
    let draft_id = owned_draft(&state, &user_id, &draft_id)?;
    Ok(Json(state.service().list_files(draft_id, q.kind)?.into()))
}

pub async fn delete_files(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<IdsBody>,
) -> Result<StatusCode> {
    let draft_id = owned_draft(&state, &user_id, &draft_id)?;
    state.service().delete_files(draft_id, &body.ids)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Co-authors
// ---------------------------------------------------------------------------

pub async fn add_co_author(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<AddCoAuthorBody>,
) -> Result<impl IntoResponse> {
    let draft_id = owned_draft(&state, &user_id, &draft_id)?;
    let co_author = state.service().add_co_author(draft_id, body.user_id)?;
    Ok((StatusCode::CREATED, Json(co_author)))
}

pub async fn list_co_authors(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
) -> Result<Json<ListResponse<CoAuthor>>> {
    let draft_id = owned_draft(&state, &user_id, &draft_id)?;
    Ok(Json(state.service().list_co_authors(draft_id)?.into()))
}

pub async fn delete_co_authors(
    State(state): State<AppState>,
    Path((user_id, draft_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<IdsBody>,
) -> Result<StatusCode> {
    let draft_id = owned_draft(&state, &user_id, &draft_id)?;
    state.service().delete_co_authors(draft_id, &body.ids)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(q): ApiQuery<ReviewQuery>,
) -> Result<Json<ListResponse<Review>>> {
    let reviewer_id = parse_id(&user_id, "user id")?;

    let listing = state.service().list_reviews(&ReviewFilter {
        draft_id: q.draft_id,
        reviewer_id: Some(reviewer_id),
        status: q.status,
        search: q.search,
        page: Page::new(q.offset, q.limit),
    })?;

    Ok(Json(listing.into()))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<SubmitReviewBody>,
) -> Result<Json<Review>> {
    let reviewer_id = parse_id(&user_id, "user id")?;

    let review = state
        .workflow
        .submit_review(
            reviewer_id,
            body.id,
            ReviewPatch {
                status: body.status,
                comment: body.comment,
            },
        )
        .await?;

    Ok(Json(review))
}
