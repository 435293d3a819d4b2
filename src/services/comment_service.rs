use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, Result},
    models::{
        Comment, CommentNode, CommentView, MAX_COMMENT_DEPTH, MAX_COMMENT_LENGTH, NotificationType,
        ProfileComment,
    },
    services::notification_service,
};

/// Arranges a flat comment list into a forest.
///
/// Input is expected oldest first. Siblings and roots keep input order. A
/// comment whose parent is not in the list becomes a root, and comments
/// caught in a parent cycle are appended as roots so nothing is dropped.
pub fn build_comment_tree(comments: Vec<CommentView>) -> Vec<CommentNode> {
    let index: HashMap<i64, usize> = comments
        .iter()
        .enumerate()
        .map(|(position, comment)| (comment.id, position))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();

    for (position, comment) in comments.iter().enumerate() {
        match comment.parent_comment_id.and_then(|id| index.get(&id)) {
            Some(&parent) if parent != position => children[parent].push(position),
            _ => roots.push(position),
        }
    }

    let mut slots: Vec<Option<CommentView>> = comments.into_iter().map(Some).collect();
    let mut forest: Vec<CommentNode> = roots
        .into_iter()
        .filter_map(|root| assemble(root, &children, &mut slots))
        .collect();

    // Anything still unclaimed sits on a cycle
    for position in 0..slots.len() {
        if let Some(node) = assemble(position, &children, &mut slots) {
            forest.push(node);
        }
    }

    forest
}

/// Builds the subtree under `root` with an explicit stack, so reply chains of
/// any length cannot exhaust the thread's stack.
fn assemble(
    root: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<CommentView>],
) -> Option<CommentNode> {
    let comment = slots[root].take()?;
    // (position, next child to visit, node under construction)
    let mut stack = vec![(root, 0usize, CommentNode::leaf(comment))];

    while let Some((position, next, _)) = stack.last_mut() {
        if let Some(&child) = children[*position].get(*next) {
            *next += 1;
            if let Some(comment) = slots[child].take() {
                stack.push((child, 0, CommentNode::leaf(comment)));
            }
            continue;
        }

        let (_, _, node) = stack.pop()?;
        match stack.last_mut() {
            Some((_, _, parent)) => parent.children.push(node),
            None => return Some(node),
        }
    }

    None
}

pub async fn get_comment_by_id_raw(db: &SqlitePool, comment_id: i64) -> Result<Option<Comment>> {
    let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
        .bind(comment_id)
        .fetch_optional(db)
        .await?;

    Ok(comment)
}

/// All comments of a post with their authors, oldest first.
pub async fn get_post_comments(db: &SqlitePool, post_id: i64) -> Result<Vec<CommentView>> {
    let comments = sqlx::query_as::<_, CommentView>(
        r#"
        SELECT c.id, c.post_id, c.user_id, c.parent_comment_id, c.body, c.score,
               c.edited_at, c.created_at, u.username, u.avatar_url AS user_avatar
        FROM comments c
        JOIN users u ON c.user_id = u.id
        WHERE c.post_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(db)
    .await?;

    Ok(comments)
}

pub async fn get_comment_tree(db: &SqlitePool, post_id: i64) -> Result<Vec<CommentNode>> {
    Ok(build_comment_tree(get_post_comments(db, post_id).await?))
}

/// Trims a comment body and checks it is non-empty and within bounds.
pub fn normalize_body(body: &str) -> Result<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Validation(
            "التعليق لا يمكن أن يكون فارغاً".to_string(),
        ));
    }
    if body.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation("التعليق طويل جداً".to_string()));
    }

    Ok(body.to_string())
}

// Nesting level of a comment (1 for top level), counted up to the depth cap
const PARENT_DEPTH: &str = r#"
    WITH RECURSIVE ancestors(id, parent_comment_id, depth) AS (
        SELECT id, parent_comment_id, 1 FROM comments WHERE id = ?
        UNION ALL
        SELECT c.id, c.parent_comment_id, a.depth + 1
        FROM comments c JOIN ancestors a ON c.id = a.parent_comment_id
        WHERE a.depth <= ?
    )
    SELECT MAX(depth) FROM ancestors
"#;

/// Adds a comment and notifies the post author and the parent comment's
/// author, skipping the commenter and never notifying anyone twice. Replies
/// nested deeper than [`MAX_COMMENT_DEPTH`] are refused.
pub async fn create_comment(
    db: &SqlitePool,
    author_id: i64,
    author_name: &str,
    post_id: i64,
    body: &str,
    parent_comment_id: Option<i64>,
) -> Result<Comment> {
    let body = normalize_body(body)?;
    let mut tx = db.begin().await?;

    let post: Option<(i64, String)> = sqlx::query_as("SELECT user_id, title FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
    let (post_author_id, post_title) =
        post.ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))?;

    let parent_author_id = match parent_comment_id {
        Some(parent_id) => {
            let parent: Option<(i64, i64)> =
                sqlx::query_as("SELECT user_id, post_id FROM comments WHERE id = ?")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let parent_author_id = match parent {
                Some((user_id, parent_post_id)) if parent_post_id == post_id => user_id,
                _ => {
                    return Err(AppError::BadRequest(
                        "التعليق الذي ترد عليه غير موجود".to_string(),
                    ));
                }
            };

            let parent_depth: Option<i64> = sqlx::query_scalar(PARENT_DEPTH)
                .bind(parent_id)
                .bind(MAX_COMMENT_DEPTH)
                .fetch_one(&mut *tx)
                .await?;
            if parent_depth.unwrap_or(1) >= MAX_COMMENT_DEPTH {
                return Err(AppError::BadRequest(
                    "لا يمكن الرد بعمق أكبر في هذا النقاش".to_string(),
                ));
            }

            Some(parent_author_id)
        }
        None => None,
    };

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (post_id, user_id, parent_comment_id, body, score, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(post_id)
    .bind(author_id)
    .bind(parent_comment_id)
    .bind(&body)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    let link = format!("/p/{}#comment-{}", post_id, comment.id);

    if post_author_id != author_id {
        let title: String = post_title.chars().take(50).collect();
        notification_service::create_notification(
            &mut *tx,
            post_author_id,
            NotificationType::Comment,
            &format!("{} علق على منشورك \"{}\"", author_name, title),
            Some(&link),
        )
        .await?;
    }

    if let Some(parent_author_id) = parent_author_id {
        if parent_author_id != author_id && parent_author_id != post_author_id {
            notification_service::create_notification(
                &mut *tx,
                parent_author_id,
                NotificationType::Reply,
                &format!("{} رد على تعليقك", author_name),
                Some(&link),
            )
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(comment_id = comment.id, post_id, author_id, "comment created");

    Ok(comment)
}

pub async fn update_comment(db: &SqlitePool, comment_id: i64, body: &str) -> Result<Comment> {
    let body = normalize_body(body)?;

    sqlx::query_as::<_, Comment>(
        "UPDATE comments SET body = ?, edited_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&body)
    .bind(Utc::now())
    .bind(comment_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("التعليق غير موجود".to_string()))
}

/// Deletes a comment with its whole reply subtree, their votes and reports.
pub async fn delete_comment(db: &SqlitePool, comment_id: i64) -> Result<()> {
    let mut tx = db.begin().await?;
    delete_comment_subtree(&mut *tx, comment_id).await?;
    tx.commit().await?;

    tracing::info!(comment_id, "comment deleted");

    Ok(())
}

const SUBTREE_CTE: &str = r#"
    WITH RECURSIVE subtree(id) AS (
        SELECT id FROM comments WHERE id = ?
        UNION
        SELECT c.id FROM comments c JOIN subtree s ON c.parent_comment_id = s.id
    )
"#;

async fn delete_comment_subtree(conn: &mut SqliteConnection, comment_id: i64) -> Result<()> {
    sqlx::query(&format!(
        "{SUBTREE_CTE} DELETE FROM votes WHERE votable_type = 'comment' AND votable_id IN (SELECT id FROM subtree)"
    ))
    .bind(comment_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "{SUBTREE_CTE} DELETE FROM reports WHERE reportable_type = 'comment' AND reportable_id IN (SELECT id FROM subtree)"
    ))
    .bind(comment_id)
    .execute(&mut *conn)
    .await?;

    // Replies go with their parent through the foreign key
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Whether `user_id` administers the community the comment was posted in.
pub async fn can_user_moderate_comment(db: &SqlitePool, user_id: i64, comment_id: i64) -> Result<bool> {
    let role: Option<String> = sqlx::query_scalar(
        r#"
        SELECT ca.role
        FROM comments c
        JOIN posts p ON c.post_id = p.id
        JOIN community_admins ca ON ca.community_id = p.community_id
        WHERE c.id = ? AND ca.user_id = ?
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(role.is_some())
}

pub async fn get_user_comments(db: &SqlitePool, user_id: i64, limit: i64) -> Result<Vec<ProfileComment>> {
    let comments = sqlx::query_as::<_, ProfileComment>(
        r#"
        SELECT c.id, c.post_id, c.parent_comment_id, c.body, c.score, c.created_at,
               p.title AS post_title
        FROM comments c
        JOIN posts p ON c.post_id = p.id
        WHERE c.user_id = ?
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(comments)
}
