use axum::extract::State;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    extract::{Json, Path},
    models::{
        Comment, ReportRequest, ReportResponse, UpdateCommentRequest, VotableType, VoteRequest,
        VoteResponse, VoteValue,
    },
    services::{comment_service, community_service, vote_service},
};

async fn require_comment(state: &AppState, comment_id: i64) -> Result<Comment> {
    comment_service::get_comment_by_id_raw(&state.db, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("التعليق غير موجود".to_string()))
}

pub async fn update_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let comment = require_comment(&state, comment_id).await?;

    if comment.user_id != auth_user.user_id {
        return Err(AppError::Authorization(
            "لا يمكنك تعديل تعليق غيرك".to_string(),
        ));
    }

    let updated = comment_service::update_comment(&state.db, comment_id, &payload.body).await?;

    Ok(Json(json!({
        "success": true,
        "body": updated.body
    })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>> {
    let comment = require_comment(&state, comment_id).await?;

    let can_delete = comment.user_id == auth_user.user_id
        || comment_service::can_user_moderate_comment(&state.db, auth_user.user_id, comment_id)
            .await?;

    if !can_delete {
        return Err(AppError::Authorization(
            "لا يمكنك حذف هذا التعليق".to_string(),
        ));
    }

    comment_service::delete_comment(&state.db, comment_id).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<i64>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let value = VoteValue::try_from(payload.value)?;

    let score = vote_service::apply_vote(
        &state.db,
        auth_user.user_id,
        VotableType::Comment,
        comment_id,
        value,
    )
    .await?;

    Ok(Json(VoteResponse { score }))
}

pub async fn report_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<i64>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ReportResponse>> {
    payload.validate()?;

    let response = community_service::submit_report(
        &state.db,
        auth_user.user_id,
        VotableType::Comment,
        comment_id,
        &payload.reason,
    )
    .await?;

    Ok(Json(response))
}
