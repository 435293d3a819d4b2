use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, Result},
    models::{ProfileResponse, UpdateProfileRequest, User, clip_text},
    services::{comment_service, community_service, post_service},
};

const BIO_MAX_CHARS: usize = 500;
const PROFILE_COMMENTS_LIMIT: i64 = 20;

pub async fn get_user_by_id(db: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn get_user_by_username(db: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn get_user_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = ? COLLATE NOCASE ORDER BY id LIMIT 1",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(user)
}

pub async fn create_user(
    db: &SqlitePool,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, email_verified, password_hash, created_at)
        VALUES (?, ?, 0, ?, ?)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("اسم المستخدم مستخدم بالفعل".to_string())
        }
        other => AppError::Database(other),
    })?;

    tracing::info!(user_id = user.id, "user registered");

    Ok(user)
}

pub async fn update_profile(
    db: &SqlitePool,
    user_id: i64,
    request: &UpdateProfileRequest,
) -> Result<User> {
    // An absent avatar_url keeps the current avatar; a blank one clears it
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET bio = ?, avatar_url = CASE WHEN ? THEN ? ELSE avatar_url END
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(clip_text(request.bio.as_deref(), BIO_MAX_CHARS))
    .bind(request.avatar_url.is_some())
    .bind(clip_text(request.avatar_url.as_deref(), 2048))
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("المستخدم غير موجود".to_string()))
}

/// Public profile: posts, latest comments, followed communities and karma.
pub async fn get_profile(db: &SqlitePool, username: &str) -> Result<ProfileResponse> {
    let user = get_user_by_username(db, username)
        .await?
        .ok_or_else(|| AppError::NotFound("المستخدم غير موجود".to_string()))?;

    let posts = post_service::get_user_posts(db, user.id).await?;
    let comments = comment_service::get_user_comments(db, user.id, PROFILE_COMMENTS_LIMIT).await?;
    let followed_communities = community_service::get_followed_communities(db, user.id).await?;
    let (post_karma, comment_karma) = post_service::get_karma(db, user.id).await?;

    Ok(ProfileResponse {
        user: user.into(),
        posts,
        comments,
        followed_communities,
        post_karma,
        comment_karma,
    })
}
