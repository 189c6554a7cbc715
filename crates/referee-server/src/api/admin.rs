//! Administrative routes.  These bypass author and journal scoping.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use referee_shared::{DraftStatus, Step};
use referee_store::{Draft, DraftFilter, DraftPatch, Page};
use serde::Deserialize;
use uuid::Uuid;

use super::{parse_id, ApiJson, ApiQuery, AppState, ListResponse, RowsAffected};
use crate::error::ServerError;

type Result<T> = std::result::Result<T, ServerError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuery {
    pub journal_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub status: Option<DraftStatus>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Every writable draft column.
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
    pub step: Option<Step>,
    pub editor_status: Option<String>,
    pub reviewer_status: Option<String>,
    pub editor_id: Option<Uuid>,
    pub editor_comment: Option<String>,
    pub editor_manuscript_comment: Option<String>,
    pub editor_cover_letter_comment: Option<String>,
    pub editor_supplemental_comment: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    pub draft_id: Option<Uuid>,
}

pub async fn list_drafts(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<DraftQuery>,
) -> Result<Json<ListResponse<Draft>>> {
    let listing = state.service().list_drafts(&DraftFilter {
        journal_id: q.journal_id,
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

pub async fn update_draft(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateDraftBody>,
) -> Result<Json<RowsAffected>> {
    let rows_affected = state.service().update_draft(
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
            step: body.step,
            editor_status: body.editor_status,
            reviewer_status: body.reviewer_status,
            editor_id: body.editor_id,
            editor_comment: body.editor_comment,
            editor_manuscript_comment: body.editor_manuscript_comment,
            editor_cover_letter_comment: body.editor_cover_letter_comment,
            editor_supplemental_comment: body.editor_supplemental_comment,
        },
    )?;

    Ok(Json(RowsAffected { rows_affected }))
}

pub async fn delete_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
) -> Result<StatusCode> {
    let draft_id = parse_id(&draft_id, "draft id")?;
    state.service().delete_draft(draft_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove every check by a checker, optionally only on one draft.
pub async fn delete_checks_by_checker(
    State(state): State<AppState>,
    Path(checker_id): Path<String>,
    ApiQuery(q): ApiQuery<ScopeQuery>,
) -> Result<StatusCode> {
    let checker_id = parse_id(&checker_id, "checker id")?;
    let removed = state
        .service()
        .delete_editor_checks_by_checker(checker_id, q.draft_id)?;
    tracing::info!(%checker_id, removed, "editor checks removed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_reviews_by_reviewer(
    State(state): State<AppState>,
    Path(reviewer_id): Path<String>,
    ApiQuery(q): ApiQuery<ScopeQuery>,
) -> Result<StatusCode> {
    let reviewer_id = parse_id(&reviewer_id, "reviewer id")?;
    let removed = state
        .service()
        .delete_reviews_by_reviewer(reviewer_id, q.draft_id)?;
    tracing::info!(%reviewer_id, removed, "reviews removed");
    Ok(StatusCode::NO_CONTENT)
}
