use axum::{extract::State, http::StatusCode};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::{AppError, Result},
    extract::{Json, Path, Query},
    models::{
        AddAdminRequest, Community, CommunityAdmin, CommunityPostsQuery, CommunityResponse,
        CommunityRole, CommunitySettingsResponse, CommunitySummary, CreateCommunityRequest,
        CreatePostRequest, Post, PostPage, PostSort, UpdateCommunityRequest, clamp_page,
    },
    services::{community_service, post_service},
};

async fn require_creator(state: &AppState, user_id: i64, community_id: i64) -> Result<()> {
    match community_service::require_admin(&state.db, user_id, community_id).await? {
        CommunityRole::Creator => Ok(()),
        CommunityRole::Admin => Err(AppError::Authorization(
            "فقط منشئ المجتمع يمكنه إدارة المشرفين".to_string(),
        )),
    }
}

pub async fn get_communities(State(state): State<AppState>) -> Result<Json<Vec<CommunitySummary>>> {
    let communities = community_service::list_communities(&state.db).await?;

    Ok(Json(communities))
}

pub async fn get_community(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
    auth_user: OptionalAuthUser,
) -> Result<Json<CommunityResponse>> {
    let community = community_service::require_community(&state.db, community_id).await?;
    let follower_count = community_service::follower_count(&state.db, community_id).await?;
    let admins = community_service::get_admins(&state.db, community_id).await?;

    let (is_following, admin_role) = match auth_user.user_id() {
        Some(user_id) => (
            community_service::is_following(&state.db, user_id, community_id).await?,
            community_service::get_admin_role(&state.db, user_id, community_id).await?,
        ),
        None => (false, None),
    };

    Ok(Json(CommunityResponse {
        community,
        follower_count,
        is_following,
        admin_role,
        admins,
    }))
}

pub async fn get_community_posts(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
    Query(params): Query<CommunityPostsQuery>,
) -> Result<Json<PostPage>> {
    community_service::require_community(&state.db, community_id).await?;

    let sort = PostSort::from_param(params.sort.as_deref());
    let page = post_service::get_community_posts(&state.db, community_id, sort, clamp_page(params.page))
        .await?;

    Ok(Json(page))
}

pub async fn create_community(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCommunityRequest>,
) -> Result<(StatusCode, Json<Community>)> {
    payload.validate()?;

    let community = community_service::create_community(&state.db, auth_user.user_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(community)))
}

pub async fn update_community(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(community_id): Path<i64>,
    Json(payload): Json<UpdateCommunityRequest>,
) -> Result<Json<Community>> {
    payload.validate()?;

    let community = community_service::require_community(&state.db, community_id).await?;
    community_service::require_admin(&state.db, auth_user.user_id, community_id).await?;

    let updated = community_service::update_community(&state.db, &community, &payload).await?;

    Ok(Json(updated))
}

pub async fn get_community_settings(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(community_id): Path<i64>,
) -> Result<Json<CommunitySettingsResponse>> {
    let community = community_service::require_community(&state.db, community_id).await?;
    let admin_role = community_service::require_admin(&state.db, auth_user.user_id, community_id).await?;

    let admins = community_service::get_admins(&state.db, community_id).await?;
    let reports = community_service::get_pending_reports(&state.db, community_id).await?;

    Ok(Json(CommunitySettingsResponse {
        community,
        admin_role,
        admins,
        reports,
    }))
}

pub async fn follow_community(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(community_id): Path<i64>,
) -> Result<Json<Value>> {
    let following = community_service::toggle_follow(&state.db, auth_user.user_id, community_id).await?;

    Ok(Json(json!({ "following": following })))
}

pub async fn add_admin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(community_id): Path<i64>,
    Json(payload): Json<AddAdminRequest>,
) -> Result<(StatusCode, Json<CommunityAdmin>)> {
    community_service::require_community(&state.db, community_id).await?;
    require_creator(&state, auth_user.user_id, community_id).await?;

    let admin = community_service::add_admin(&state.db, community_id, &payload.username).await?;

    Ok((StatusCode::CREATED, Json(admin)))
}

pub async fn remove_admin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((community_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<Value>> {
    community_service::require_community(&state.db, community_id).await?;
    require_creator(&state, auth_user.user_id, community_id).await?;

    community_service::remove_admin(&state.db, community_id, auth_user.user_id, user_id).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn admin_delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((community_id, post_id)): Path<(i64, i64)>,
) -> Result<Json<Value>> {
    community_service::require_admin(&state.db, auth_user.user_id, community_id).await?;

    let post = post_service::get_post_by_id_raw(&state.db, post_id)
        .await?
        .filter(|post| post.community_id == community_id)
        .ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))?;

    post_service::delete_post(&state.db, post.id).await?;

    tracing::info!(community_id, post_id, admin_id = auth_user.user_id, "post removed by admin");

    Ok(Json(json!({ "success": true })))
}

pub async fn resolve_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((community_id, report_id)): Path<(i64, i64)>,
) -> Result<Json<Value>> {
    community_service::require_admin(&state.db, auth_user.user_id, community_id).await?;

    community_service::resolve_report(&state.db, community_id, report_id, auth_user.user_id).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(community_id): Path<i64>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    payload.validate()?;

    let post = post_service::create_post(&state.db, auth_user.user_id, community_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(post)))
}
