use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, hash_password, is_password_strong, verify_password},
    error::{AppError, Result},
    extract::{Json, Path},
    models::{
        AccountResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        ResetPasswordRequest, VerifyCodeRequest,
    },
    services::{password_reset_service, rate_limit_service, session_service, user_service},
};

const FORGOT_PASSWORD_MESSAGE: &str = "إذا كان هذا البريد مسجلاً، سيتم إرسال رمز التحقق";

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AccountResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let username = payload.username.trim().to_string();

    rate_limit_service::enforce(
        &state.db,
        &format!("register:{username}"),
        state.config.auth_rate_limit,
        state.config.auth_rate_window_seconds,
    )
    .await?;

    payload.validate()?;

    if !is_password_strong(&payload.password) {
        return Err(AppError::Validation(
            "كلمة المرور يجب أن تكون 8 أحرف على الأقل وتحتوي على حروف وأرقام".to_string(),
        ));
    }

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;
    let user = user_service::create_user(&state.db, &username, email, &password_hash).await?;

    let token = session_service::start_session(
        &state.db,
        &user,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let username = payload.username.trim();

    rate_limit_service::enforce(
        &state.db,
        &format!("login:{username}"),
        state.config.auth_rate_limit,
        state.config.auth_rate_window_seconds,
    )
    .await?;

    // Same answer for unknown users and wrong passwords
    let invalid = || AppError::Authentication("اسم المستخدم أو كلمة المرور غير صحيحة".to_string());

    let user = user_service::get_user_by_username(&state.db, username)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "login rejected");
        return Err(invalid());
    }

    let purged = session_service::purge_expired(&state.db, Utc::now()).await?;
    if purged > 0 {
        tracing::debug!(purged, "expired sessions removed");
    }

    let token = session_service::start_session(
        &state.db,
        &user,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )
    .await?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> Result<Json<Value>> {
    session_service::end_session(&state.db, &auth_user.jti).await?;

    Ok(Json(json!({ "message": "تم تسجيل الخروج" })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();

    rate_limit_service::enforce(
        &state.db,
        &format!("forgot:{email}"),
        state.config.reset_rate_limit,
        state.config.reset_rate_window_seconds,
    )
    .await?;

    password_reset_service::request_reset(&state.db, &email).await?;

    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

pub async fn reset_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>> {
    let verified = password_reset_service::reset_status(&state.db, &token).await?;

    Ok(Json(json!({ "verified": verified })))
}

pub async fn verify_reset_code(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<Value>> {
    rate_limit_service::enforce(
        &state.db,
        &format!("reset-verify:{token}"),
        state.config.reset_rate_limit,
        state.config.reset_rate_window_seconds,
    )
    .await?;

    password_reset_service::verify_code(&state.db, &token, payload.code.as_deref()).await?;

    Ok(Json(json!({ "verified": true })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    rate_limit_service::enforce(
        &state.db,
        &format!("reset:{token}"),
        state.config.reset_rate_limit,
        state.config.reset_rate_window_seconds,
    )
    .await?;

    password_reset_service::reset_password(
        &state.db,
        &token,
        &payload.password,
        &payload.password_confirm,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok(Json(json!({ "message": "تم تغيير كلمة المرور بنجاح. سجل دخولك الآن" })))
}
