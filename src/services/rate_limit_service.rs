use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// Fixed-window counter. Returns `false` once `key` has used `limit`
/// attempts inside the current window.
pub async fn check_rate_limit(
    db: &SqlitePool,
    key: &str,
    limit: u32,
    window_seconds: i64,
) -> Result<bool> {
    let now = Utc::now();
    let mut tx = db.begin().await?;

    // Expired windows restart at zero. Sweep all keys, not only this one
    let swept = sqlx::query("DELETE FROM rate_limits WHERE window_expires_at <= ?")
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if swept > 0 {
        tracing::debug!(swept, "expired rate limit windows removed");
    }

    let current: Option<(i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT count, window_expires_at FROM rate_limits WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

    let allowed = match current {
        Some((count, _)) if count >= i64::from(limit) => false,
        Some(_) => {
            sqlx::query("UPDATE rate_limits SET count = count + 1 WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
            true
        }
        None => {
            sqlx::query("INSERT INTO rate_limits (key, count, window_expires_at) VALUES (?, 1, ?)")
                .bind(key)
                .bind(now + Duration::seconds(window_seconds))
                .execute(&mut *tx)
                .await?;
            true
        }
    };

    tx.commit().await?;

    if !allowed {
        tracing::warn!(key, "rate limit exceeded");
    }

    Ok(allowed)
}

/// Like [`check_rate_limit`] but fails with [`AppError::RateLimit`].
pub async fn enforce(db: &SqlitePool, key: &str, limit: u32, window_seconds: i64) -> Result<()> {
    if check_rate_limit(db, key, limit, window_seconds).await? {
        Ok(())
    } else {
        Err(AppError::RateLimit)
    }
}
