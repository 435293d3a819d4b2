use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::Result,
    models::{Notification, NotificationType},
};

const NOTIFICATION_PAGE_SIZE: i64 = 50;

/// Inserts a notification on the caller's connection so it commits with the
/// event that triggered it.
pub async fn create_notification(
    conn: &mut SqliteConnection,
    user_id: i64,
    notification_type: NotificationType,
    message: &str,
    link: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, type, message, link, is_read, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(user_id)
    .bind(notification_type)
    .bind(message)
    .bind(link)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Latest notifications for `user_id`; everything unread is marked read.
pub async fn get_and_mark_read(db: &SqlitePool, user_id: i64) -> Result<Vec<Notification>> {
    let mut tx = db.begin().await?;

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(NOTIFICATION_PAGE_SIZE)
    .fetch_all(&mut *tx)
    .await?;

    sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(notifications)
}

pub async fn unread_count(db: &SqlitePool, user_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{insert_user, test_pool};

    #[tokio::test]
    async fn listing_marks_notifications_read() {
        let db = test_pool().await;
        let user = insert_user(&db, "فارس").await;

        let mut conn = db.acquire().await.unwrap();
        create_notification(&mut conn, user.id, NotificationType::Comment, "أول", Some("/p/1"))
            .await
            .unwrap();
        create_notification(&mut conn, user.id, NotificationType::Reply, "ثاني", None)
            .await
            .unwrap();
        drop(conn);

        assert_eq!(unread_count(&db, user.id).await.unwrap(), 2);

        let listed = get_and_mark_read(&db, user.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].message, "ثاني");
        assert!(!listed[0].is_read);

        assert_eq!(unread_count(&db, user.id).await.unwrap(), 0);
    }
}
