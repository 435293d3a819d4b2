use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, is_password_strong},
    error::{AppError, Result},
    models::{IssuedReset, MAX_RESET_ATTEMPTS, PasswordReset, RESET_TOKEN_TTL_MINUTES},
    services::user_service,
};

fn generate_token_and_code() -> (String, String) {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);

    let token = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let code = rng.random_range(100000..999999).to_string();

    (token, code)
}

/// Issues a reset for the account registered under `email`.
///
/// Returns `None` for unknown addresses so callers can answer identically
/// either way. Earlier unused resets for the account stop working. The code
/// is written to the log in place of sending mail.
pub async fn request_reset(db: &SqlitePool, email: &str) -> Result<Option<IssuedReset>> {
    let Some(user) = user_service::get_user_by_email(db, email.trim()).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(None);
    };

    let (token, code) = generate_token_and_code();
    let now = Utc::now();
    let expires_at = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    let mut tx = db.begin().await?;

    sqlx::query("UPDATE password_resets SET used = 1 WHERE user_id = ? AND used = 0")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO password_resets (user_id, token, code, verified, attempts, expires_at, used, created_at)
        VALUES (?, ?, ?, 0, 0, ?, 0, ?)
        "#,
    )
    .bind(user.id)
    .bind(&token)
    .bind(&code)
    .bind(expires_at)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = user.id,
        token = %token,
        code = %code,
        "password reset code issued"
    );

    Ok(Some(IssuedReset {
        user_id: user.id,
        token,
        code,
        expires_at,
    }))
}

/// Unused reset for `token`; `NotFound` if missing or used, `Expired` past its deadline.
async fn find_active_reset(db: &SqlitePool, token: &str) -> Result<PasswordReset> {
    let reset = sqlx::query_as::<_, PasswordReset>(
        "SELECT * FROM password_resets WHERE token = ? AND used = 0",
    )
    .bind(token)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("رابط إعادة تعيين كلمة المرور غير صالح".to_string()))?;

    if reset.is_expired(Utc::now()) {
        return Err(AppError::Expired);
    }

    Ok(reset)
}

async fn mark_used(db: &SqlitePool, reset_id: i64) -> Result<()> {
    sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ?")
        .bind(reset_id)
        .execute(db)
        .await?;

    Ok(())
}

/// Whether the reset behind `token` has had its code verified.
pub async fn reset_status(db: &SqlitePool, token: &str) -> Result<bool> {
    Ok(find_active_reset(db, token).await?.verified)
}

/// Checks a code against the reset. Every call counts as an attempt; once
/// the ceiling is reached the reset is burned, even for the right code.
pub async fn verify_code(db: &SqlitePool, token: &str, code: Option<&str>) -> Result<()> {
    let reset = find_active_reset(db, token).await?;

    if reset.attempts >= MAX_RESET_ATTEMPTS {
        mark_used(db, reset.id).await?;
        tracing::warn!(reset_id = reset.id, "password reset attempts exhausted");
        return Err(AppError::AttemptsExceeded);
    }

    // Guarded so concurrent guesses cannot push past the ceiling
    let counted = sqlx::query(
        "UPDATE password_resets SET attempts = attempts + 1 WHERE id = ? AND used = 0 AND attempts < ?",
    )
    .bind(reset.id)
    .bind(MAX_RESET_ATTEMPTS)
    .execute(db)
    .await?
    .rows_affected();

    if counted == 0 {
        mark_used(db, reset.id).await?;
        return Err(AppError::AttemptsExceeded);
    }

    if code.map(str::trim) != Some(reset.code.as_str()) {
        tracing::debug!(reset_id = reset.id, attempts = reset.attempts + 1, "wrong reset code");
        return Err(AppError::InvalidCode);
    }

    sqlx::query("UPDATE password_resets SET verified = 1 WHERE id = ?")
        .bind(reset.id)
        .execute(db)
        .await?;

    Ok(())
}

/// Sets a new password through a verified reset and signs the user out everywhere.
pub async fn reset_password(
    db: &SqlitePool,
    token: &str,
    password: &str,
    password_confirm: &str,
    bcrypt_cost: u32,
) -> Result<()> {
    let reset = find_active_reset(db, token).await?;

    if !reset.verified {
        return Err(AppError::NotVerified);
    }

    if !is_password_strong(password) {
        return Err(AppError::Validation(
            "كلمة المرور يجب أن تكون 8 أحرف على الأقل وتحتوي على حروف وأرقام".to_string(),
        ));
    }

    if password != password_confirm {
        return Err(AppError::Validation("كلمتا المرور غير متطابقتين".to_string()));
    }

    let password_hash = hash_password(password, bcrypt_cost)?;

    let mut tx = db.begin().await?;

    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(reset.user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ?")
        .bind(reset.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(reset.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = reset.user_id, "password reset completed");

    Ok(())
}
