use axum::extract::State;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    extract::{Json, Path},
    models::{AccountResponse, PostListItem, ProfileResponse, UpdateProfileRequest},
    services::{post_service, user_service},
};

pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<AccountResponse>> {
    let user = user_service::get_user_by_id(&state.db, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("المستخدم غير موجود".to_string()))?;

    Ok(Json(user.into()))
}

pub async fn update_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>> {
    payload.validate()?;

    let user = user_service::update_profile(&state.db, auth_user.user_id, &payload).await?;

    Ok(Json(user.into()))
}

pub async fn get_bookmarks(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<PostListItem>>> {
    let posts = post_service::get_bookmarks(&state.db, auth_user.user_id).await?;

    Ok(Json(posts))
}

pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let profile = user_service::get_profile(&state.db, &username).await?;

    Ok(Json(profile))
}
