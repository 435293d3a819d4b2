use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, Result},
    models::{VotableType, VoteValue},
};

/// Records `value` from `user_id` on a post or comment and returns the new score.
///
/// Voting the same value twice removes the vote; voting the opposite value
/// flips it. The ledger row and the target's `score` change in one
/// transaction, so `score` always equals the sum of surviving vote values.
pub async fn apply_vote(
    db: &SqlitePool,
    user_id: i64,
    votable_type: VotableType,
    votable_id: i64,
    value: VoteValue,
) -> Result<i64> {
    let value = value.as_i64();
    let mut tx = db.begin().await?;

    // Write first so the transaction holds the write lock for the whole read-modify-write
    let inserted = sqlx::query(
        r#"
        INSERT INTO votes (user_id, votable_type, votable_id, value, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (user_id, votable_type, votable_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(votable_type)
    .bind(votable_id)
    .bind(value)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let delta = if inserted == 1 {
        value
    } else {
        let (vote_id, existing): (i64, i64) = sqlx::query_as(
            "SELECT id, value FROM votes WHERE user_id = ? AND votable_type = ? AND votable_id = ?",
        )
        .bind(user_id)
        .bind(votable_type)
        .bind(votable_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing == value {
            sqlx::query("DELETE FROM votes WHERE id = ?")
                .bind(vote_id)
                .execute(&mut *tx)
                .await?;
            -value
        } else {
            sqlx::query("UPDATE votes SET value = ? WHERE id = ?")
                .bind(value)
                .bind(vote_id)
                .execute(&mut *tx)
                .await?;
            2 * value
        }
    };

    let score: Option<i64> = sqlx::query_scalar(&format!(
        "UPDATE {} SET score = score + ? WHERE id = ? RETURNING score",
        votable_type.table()
    ))
    .bind(delta)
    .bind(votable_id)
    .fetch_optional(&mut *tx)
    .await?;

    // Dropping the transaction rolls back the vote row as well
    let Some(score) = score else {
        return Err(AppError::NotFound(match votable_type {
            VotableType::Post => "المنشور غير موجود".to_string(),
            VotableType::Comment => "التعليق غير موجود".to_string(),
        }));
    };

    tx.commit().await?;

    tracing::debug!(
        user_id,
        votable_type = votable_type.as_str(),
        votable_id,
        delta,
        score,
        "vote applied"
    );

    Ok(score)
}

/// Sum of surviving vote values for a target.
pub async fn ledger_sum(db: &SqlitePool, votable_type: VotableType, votable_id: i64) -> Result<i64> {
    let sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(value), 0) FROM votes WHERE votable_type = ? AND votable_id = ?",
    )
    .bind(votable_type)
    .bind(votable_id)
    .fetch_one(db)
    .await?;

    Ok(sum)
}

/// The viewer's vote on a single target, if any.
pub async fn get_user_vote(
    db: &SqlitePool,
    user_id: i64,
    votable_type: VotableType,
    votable_id: i64,
) -> Result<Option<i64>> {
    let value = sqlx::query_scalar(
        "SELECT value FROM votes WHERE user_id = ? AND votable_type = ? AND votable_id = ?",
    )
    .bind(user_id)
    .bind(votable_type)
    .bind(votable_id)
    .fetch_optional(db)
    .await?;

    Ok(value)
}

/// The viewer's votes on every comment of a post, as `(comment_id, value)`.
pub async fn get_user_comment_votes(
    db: &SqlitePool,
    user_id: i64,
    post_id: i64,
) -> Result<Vec<(i64, i64)>> {
    let votes = sqlx::query_as(
        r#"
        SELECT v.votable_id, v.value
        FROM votes v
        JOIN comments c ON c.id = v.votable_id
        WHERE v.user_id = ? AND v.votable_type = 'comment' AND c.post_id = ?
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_all(db)
    .await?;

    Ok(votes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::services::test_support::{
        insert_comment, insert_community, insert_post, insert_user, test_pool,
    };

    async fn post_score(db: &SqlitePool, post_id: i64) -> i64 {
        sqlx::query_scalar("SELECT score FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn voting_twice_toggles_the_vote_off() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let voter = insert_user(&db, "مصوت").await;
        let community = insert_community(&db, "عام", &author).await;
        let post = insert_post(&db, &author, &community, "عنوان").await;

        let score = apply_vote(&db, voter.id, VotableType::Post, post.id, VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(score, 1);

        let score = apply_vote(&db, voter.id, VotableType::Post, post.id, VoteValue::Up)
            .await
            .unwrap();
        assert_eq!(score, 0);
        assert_eq!(
            get_user_vote(&db, voter.id, VotableType::Post, post.id).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn opposite_vote_flips_by_two() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let voter = insert_user(&db, "مصوت").await;
        let community = insert_community(&db, "عام", &author).await;
        let post = insert_post(&db, &author, &community, "عنوان").await;

        apply_vote(&db, voter.id, VotableType::Post, post.id, VoteValue::Up)
            .await
            .unwrap();
        let score = apply_vote(&db, voter.id, VotableType::Post, post.id, VoteValue::Down)
            .await
            .unwrap();

        assert_eq!(score, -1);
        assert_eq!(
            get_user_vote(&db, voter.id, VotableType::Post, post.id).await.unwrap(),
            Some(-1)
        );
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn score_matches_ledger_sum_across_voters() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let community = insert_community(&db, "عام", &author).await;
        let post = insert_post(&db, &author, &community, "عنوان").await;

        let a = insert_user(&db, "أحمد").await;
        let b = insert_user(&db, "بلال").await;
        let c = insert_user(&db, "جابر").await;

        apply_vote(&db, a.id, VotableType::Post, post.id, VoteValue::Up).await.unwrap();
        apply_vote(&db, b.id, VotableType::Post, post.id, VoteValue::Up).await.unwrap();
        let score = apply_vote(&db, c.id, VotableType::Post, post.id, VoteValue::Down)
            .await
            .unwrap();

        assert_eq!(score, 1);
        assert_eq!(post_score(&db, post.id).await, 1);
        assert_eq!(ledger_sum(&db, VotableType::Post, post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_target_is_not_found_and_leaves_no_vote() {
        let db = test_pool().await;
        let voter = insert_user(&db, "مصوت").await;

        let result = apply_vote(&db, voter.id, VotableType::Post, 9999, VoteValue::Up).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn comment_votes_adjust_comment_score_only() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let voter = insert_user(&db, "مصوت").await;
        let community = insert_community(&db, "عام", &author).await;
        let post = insert_post(&db, &author, &community, "عنوان").await;
        let comment = insert_comment(&db, &author, &post, None, "تعليق").await;

        let score = apply_vote(&db, voter.id, VotableType::Comment, comment.id, VoteValue::Down)
            .await
            .unwrap();

        assert_eq!(score, -1);
        assert_eq!(post_score(&db, post.id).await, 0);
        assert_eq!(
            get_user_comment_votes(&db, voter.id, post.id).await.unwrap(),
            vec![(comment.id, -1)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_from_one_user_keep_one_row() {
        // Separate connections need a shared file, not a private in-memory db
        let path = std::env::temp_dir().join(format!("rayat-votes-{}.db", uuid::Uuid::new_v4()));
        let db = database::create_pool(&format!("sqlite://{}", path.display()))
            .await
            .unwrap();
        database::run_migrations(&db).await.unwrap();

        let author = insert_user(&db, "كاتب").await;
        let voter = insert_user(&db, "مصوت").await;
        let community = insert_community(&db, "عام", &author).await;
        let post = insert_post(&db, &author, &community, "عنوان").await;

        let (pool, voter_id, post_id) = (&db, voter.id, post.id);
        let vote = move |value| apply_vote(pool, voter_id, VotableType::Post, post_id, value);
        for _ in 0..5 {
            tokio::try_join!(
                vote(VoteValue::Up),
                vote(VoteValue::Up),
                vote(VoteValue::Down),
                vote(VoteValue::Up),
                vote(VoteValue::Down),
                vote(VoteValue::Down),
                vote(VoteValue::Up),
            )
            .unwrap();

            let rows: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM votes WHERE user_id = ? AND votable_id = ?",
            )
            .bind(voter.id)
            .bind(post.id)
            .fetch_one(&db)
            .await
            .unwrap();
            assert!(rows <= 1, "{rows} vote rows for one user");
            assert_eq!(
                post_score(&db, post.id).await,
                ledger_sum(&db, VotableType::Post, post.id).await.unwrap()
            );
        }

        // The ledger itself refuses a second row for the same voter and target
        if get_user_vote(&db, voter.id, VotableType::Post, post.id).await.unwrap().is_none() {
            apply_vote(&db, voter.id, VotableType::Post, post.id, VoteValue::Up).await.unwrap();
        }
        let duplicate = sqlx::query(
            "INSERT INTO votes (user_id, votable_type, votable_id, value, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(voter.id)
        .bind(VotableType::Post)
        .bind(post.id)
        .bind(Utc::now())
        .execute(&db)
        .await;
        assert!(matches!(
            duplicate,
            Err(sqlx::Error::Database(ref e)) if e.is_unique_violation()
        ));

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
