use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::{
    auth::Claims,
    error::Result,
    models::{Session, User},
};

/// Issues a signed token for `user` and records its session row.
pub async fn start_session(
    db: &SqlitePool,
    user: &User,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<String> {
    let (token, claims) = Claims::new(user.id, user.username.clone(), jwt_secret, ttl_hours)?;
    let now = Utc::now();

    sqlx::query("INSERT INTO sessions (jti, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&claims.jti)
        .bind(user.id)
        .bind(now + Duration::hours(ttl_hours))
        .bind(now)
        .execute(db)
        .await?;

    tracing::debug!(user_id = user.id, "session started");

    Ok(token)
}

pub async fn find_live_session(db: &SqlitePool, jti: &str) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE jti = ?")
        .bind(jti)
        .fetch_optional(db)
        .await?;

    Ok(session.filter(|s| s.expires_at > Utc::now()))
}

pub async fn end_session(db: &SqlitePool, jti: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE jti = ?")
        .bind(jti)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn purge_expired(db: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{insert_user, test_pool};

    #[tokio::test]
    async fn started_session_is_live_until_ended() {
        let db = test_pool().await;
        let user = insert_user(&db, "فارس").await;

        let token = start_session(&db, &user, "secret", 1).await.unwrap();
        let claims = Claims::verify(&token, "secret").unwrap();

        let session = find_live_session(&db, &claims.jti).await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);

        end_session(&db, &claims.jti).await.unwrap();
        assert!(find_live_session(&db, &claims.jti).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_not_live_and_get_purged() {
        let db = test_pool().await;
        let user = insert_user(&db, "فارس").await;

        let token = start_session(&db, &user, "secret", 1).await.unwrap();
        let claims = Claims::verify(&token, "secret").unwrap();

        sqlx::query("UPDATE sessions SET expires_at = ? WHERE jti = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .bind(&claims.jti)
            .execute(&db)
            .await
            .unwrap();

        assert!(find_live_session(&db, &claims.jti).await.unwrap().is_none());
        assert_eq!(purge_expired(&db, Utc::now()).await.unwrap(), 1);
    }
}
