use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;
pub const MAX_RESET_ATTEMPTS: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordReset {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub token: String,
    #[serde(skip_serializing)]
    pub code: String,
    pub verified: bool,
    pub attempts: i64,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Token and code handed to the delivery channel after a reset is issued.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub user_id: i64,
    pub token: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "البريد الإلكتروني مطلوب"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}
