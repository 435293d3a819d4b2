use axum::{extract::State, http::StatusCode};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::{AppError, Result},
    extract::{Json, Path, Query},
    models::{
        Comment, CreateCommentRequest, FeedResponse, PageQuery, Post, PostPageResponse,
        ReportRequest, ReportResponse, ShareResponse, UpdatePostRequest, UserVotes, VotableType,
        VoteRequest, VoteResponse, VoteValue,
    },
    services::{comment_service, community_service, post_service, vote_service},
};

async fn require_post(state: &AppState, post_id: i64) -> Result<Post> {
    post_service::get_post_by_id_raw(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))
}

pub async fn get_feed(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<FeedResponse>> {
    let feed = post_service::get_home_feed(&state.db, auth_user.user_id(), params.page()).await?;

    Ok(Json(feed))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    auth_user: OptionalAuthUser,
) -> Result<Json<PostPageResponse>> {
    let post = post_service::get_post_detail(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))?;

    let comments = comment_service::get_comment_tree(&state.db, post_id).await?;

    let (user_votes, is_bookmarked) = match auth_user.user_id() {
        Some(user_id) => (
            post_service::get_user_votes(&state.db, user_id, post_id).await?,
            post_service::is_bookmarked(&state.db, user_id, post_id).await?,
        ),
        None => (UserVotes::default(), false),
    };

    Ok(Json(PostPageResponse {
        post,
        comments,
        user_votes,
        is_bookmarked,
    }))
}

pub async fn update_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    payload.validate()?;

    let post = require_post(&state, post_id).await?;

    if post.user_id != auth_user.user_id {
        return Err(AppError::Authorization(
            "لا يمكنك تعديل منشور غيرك".to_string(),
        ));
    }

    let post = post_service::update_post(&state.db, post_id, &payload).await?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>> {
    let post = require_post(&state, post_id).await?;

    // Authors and admins of the post's community may delete
    let can_delete = post.user_id == auth_user.user_id
        || community_service::get_admin_role(&state.db, auth_user.user_id, post.community_id)
            .await?
            .is_some();

    if !can_delete {
        return Err(AppError::Authorization(
            "لا يمكنك حذف هذا المنشور".to_string(),
        ));
    }

    post_service::delete_post(&state.db, post_id).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn vote_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let value = VoteValue::try_from(payload.value)?;

    let score = vote_service::apply_vote(
        &state.db,
        auth_user.user_id,
        VotableType::Post,
        post_id,
        value,
    )
    .await?;

    Ok(Json(VoteResponse { score }))
}

pub async fn bookmark_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>> {
    let bookmarked = post_service::toggle_bookmark(&state.db, auth_user.user_id, post_id).await?;

    Ok(Json(json!({ "bookmarked": bookmarked })))
}

pub async fn report_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ReportResponse>> {
    payload.validate()?;

    let response = community_service::submit_report(
        &state.db,
        auth_user.user_id,
        VotableType::Post,
        post_id,
        &payload.reason,
    )
    .await?;

    Ok(Json(response))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    payload.validate()?;

    let comment = comment_service::create_comment(
        &state.db,
        auth_user.user_id,
        &auth_user.username,
        post_id,
        &payload.body,
        payload.parent_comment_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn share_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<ShareResponse>> {
    let post = require_post(&state, post_id).await?;

    Ok(Json(ShareResponse {
        url: format!("{}/p/{}", state.config.base_url, post.id),
        title: post.title,
    }))
}
