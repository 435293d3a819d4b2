use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, Result},
    models::{
        CreatePostRequest, FeedResponse, POSTS_PER_PAGE, Post, PostDetail, PostListItem, PostPage,
        PostSort, PostType, UpdatePostRequest, UserVotes, VotableType, page_offset, total_pages,
    },
    services::{community_service, vote_service},
};

/// Post columns joined with author, community and comment count.
pub(crate) const POST_LIST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.community_id, p.title, p.body, p.post_type, p.link_url,
           p.media_type, p.media_url, p.score, p.edited_at, p.created_at,
           u.username, c.name AS community_name,
           (SELECT COUNT(*) FROM comments WHERE post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON p.user_id = u.id
    JOIN communities c ON p.community_id = c.id
"#;

pub async fn get_post_by_id_raw(db: &SqlitePool, post_id: i64) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(db)
        .await?;

    Ok(post)
}

pub async fn get_post_detail(db: &SqlitePool, post_id: i64) -> Result<Option<PostDetail>> {
    let post = sqlx::query_as::<_, PostDetail>(
        r#"
        SELECT p.id, p.user_id, p.community_id, p.title, p.body, p.post_type, p.link_url,
               p.media_type, p.media_url, p.score, p.edited_at, p.created_at,
               u.username, u.avatar_url AS user_avatar, c.name AS community_name
        FROM posts p
        JOIN users u ON p.user_id = u.id
        JOIN communities c ON p.community_id = c.id
        WHERE p.id = ?
        "#,
    )
    .bind(post_id)
    .fetch_optional(db)
    .await?;

    Ok(post)
}

fn normalize_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("العنوان مطلوب".to_string()));
    }

    Ok(title.to_string())
}

fn normalize_body(body: Option<&str>) -> Option<String> {
    body.filter(|b| !b.trim().is_empty()).map(str::to_string)
}

pub async fn create_post(
    db: &SqlitePool,
    author_id: i64,
    community_id: i64,
    request: &CreatePostRequest,
) -> Result<Post> {
    let title = normalize_title(&request.title)?;
    let link_url = match request.post_type {
        PostType::Link => Some(
            request
                .link_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .ok_or_else(|| AppError::Validation("الرابط مطلوب".to_string()))?
                .to_string(),
        ),
        PostType::Text => None,
    };

    if community_service::get_community_by_id(db, community_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("المجتمع غير موجود".to_string()));
    }

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (user_id, community_id, title, body, post_type, link_url, score, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(author_id)
    .bind(community_id)
    .bind(&title)
    .bind(normalize_body(request.body.as_deref()))
    .bind(request.post_type)
    .bind(link_url)
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    tracing::info!(post_id = post.id, community_id, author_id, "post created");

    Ok(post)
}

pub async fn update_post(db: &SqlitePool, post_id: i64, request: &UpdatePostRequest) -> Result<Post> {
    let title = normalize_title(&request.title)?;

    sqlx::query_as::<_, Post>(
        "UPDATE posts SET title = ?, body = ?, edited_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&title)
    .bind(normalize_body(request.body.as_deref()))
    .bind(Utc::now())
    .bind(post_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))
}

/// Deletes a post with its comments, every vote on either, reports on
/// either, and bookmarks.
pub async fn delete_post(db: &SqlitePool, post_id: i64) -> Result<()> {
    let mut tx = db.begin().await?;
    delete_post_cascade(&mut *tx, post_id).await?;
    tx.commit().await?;

    tracing::info!(post_id, "post deleted");

    Ok(())
}

async fn delete_post_cascade(conn: &mut SqliteConnection, post_id: i64) -> Result<()> {
    const COMMENT_IDS: &str = "SELECT id FROM comments WHERE post_id = ?";

    let statements = [
        format!("DELETE FROM votes WHERE votable_type = 'comment' AND votable_id IN ({COMMENT_IDS})"),
        format!("DELETE FROM reports WHERE reportable_type = 'comment' AND reportable_id IN ({COMMENT_IDS})"),
        "DELETE FROM votes WHERE votable_type = 'post' AND votable_id = ?".to_string(),
        "DELETE FROM reports WHERE reportable_type = 'post' AND reportable_id = ?".to_string(),
        "DELETE FROM bookmarks WHERE post_id = ?".to_string(),
        "DELETE FROM comments WHERE post_id = ?".to_string(),
        "DELETE FROM posts WHERE id = ?".to_string(),
    ];

    for statement in &statements {
        sqlx::query(statement)
            .bind(post_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Newest posts from followed communities for a signed-in viewer who
/// follows any, otherwise from everywhere with community suggestions.
pub async fn get_home_feed(db: &SqlitePool, viewer_id: Option<i64>, page: i64) -> Result<FeedResponse> {
    let offset = page_offset(page, POSTS_PER_PAGE);

    let follows: i64 = match viewer_id {
        Some(user_id) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM community_follows WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(db)
                .await?
        }
        None => 0,
    };

    let (posts, total, suggested_communities) = match viewer_id {
        Some(user_id) if follows > 0 => {
            let filter = "WHERE p.community_id IN (SELECT community_id FROM community_follows WHERE user_id = ?)";

            let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts p {filter}"))
                .bind(user_id)
                .fetch_one(db)
                .await?;

            let posts = sqlx::query_as::<_, PostListItem>(&format!(
                "{POST_LIST_SELECT} {filter} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
            ))
            .bind(user_id)
            .bind(POSTS_PER_PAGE)
            .bind(offset)
            .fetch_all(db)
            .await?;

            (posts, total, Vec::new())
        }
        _ => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
                .fetch_one(db)
                .await?;

            let posts = sqlx::query_as::<_, PostListItem>(&format!(
                "{POST_LIST_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
            ))
            .bind(POSTS_PER_PAGE)
            .bind(offset)
            .fetch_all(db)
            .await?;

            (posts, total, community_service::list_communities(db).await?)
        }
    };

    Ok(FeedResponse {
        posts,
        page,
        total_pages: total_pages(total, POSTS_PER_PAGE),
        suggested_communities,
    })
}

pub async fn get_community_posts(
    db: &SqlitePool,
    community_id: i64,
    sort: PostSort,
    page: i64,
) -> Result<PostPage> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE community_id = ?")
        .bind(community_id)
        .fetch_one(db)
        .await?;

    let posts = sqlx::query_as::<_, PostListItem>(&format!(
        "{POST_LIST_SELECT} WHERE p.community_id = ? ORDER BY {} LIMIT ? OFFSET ?",
        sort.order_clause()
    ))
    .bind(community_id)
    .bind(POSTS_PER_PAGE)
    .bind(page_offset(page, POSTS_PER_PAGE))
    .fetch_all(db)
    .await?;

    Ok(PostPage {
        posts,
        page,
        total_pages: total_pages(total, POSTS_PER_PAGE),
    })
}

/// Latest posts across the site or within one community, for syndication.
pub async fn get_latest_posts(
    db: &SqlitePool,
    community_id: Option<i64>,
    limit: i64,
) -> Result<Vec<PostListItem>> {
    let posts = match community_id {
        Some(community_id) => {
            sqlx::query_as::<_, PostListItem>(&format!(
                "{POST_LIST_SELECT} WHERE p.community_id = ? ORDER BY p.created_at DESC, p.id DESC LIMIT ?"
            ))
            .bind(community_id)
            .bind(limit)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, PostListItem>(&format!(
                "{POST_LIST_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT ?"
            ))
            .bind(limit)
            .fetch_all(db)
            .await?
        }
    };

    Ok(posts)
}

pub async fn get_user_posts(db: &SqlitePool, user_id: i64) -> Result<Vec<PostListItem>> {
    let posts = sqlx::query_as::<_, PostListItem>(&format!(
        "{POST_LIST_SELECT} WHERE p.user_id = ? ORDER BY p.created_at DESC, p.id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(posts)
}

/// Adds or removes a bookmark and reports whether the post is now bookmarked.
pub async fn toggle_bookmark(db: &SqlitePool, user_id: i64, post_id: i64) -> Result<bool> {
    if get_post_by_id_raw(db, post_id).await?.is_none() {
        return Err(AppError::NotFound("المنشور غير موجود".to_string()));
    }

    let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = ? AND post_id = ?")
        .bind(user_id)
        .bind(post_id)
        .execute(db)
        .await?
        .rows_affected();

    if removed > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT INTO bookmarks (user_id, post_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(post_id)
        .bind(Utc::now())
        .execute(db)
        .await?;

    Ok(true)
}

pub async fn is_bookmarked(db: &SqlitePool, user_id: i64, post_id: i64) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM bookmarks WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(db)
            .await?;

    Ok(found.is_some())
}

pub async fn get_bookmarks(db: &SqlitePool, user_id: i64) -> Result<Vec<PostListItem>> {
    let posts = sqlx::query_as::<_, PostListItem>(&format!(
        "{POST_LIST_SELECT} JOIN bookmarks b ON b.post_id = p.id
         WHERE b.user_id = ? ORDER BY b.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(posts)
}

/// The viewer's votes on a post and on each of its comments.
pub async fn get_user_votes(db: &SqlitePool, user_id: i64, post_id: i64) -> Result<UserVotes> {
    let post = vote_service::get_user_vote(db, user_id, VotableType::Post, post_id).await?;
    let comments = vote_service::get_user_comment_votes(db, user_id, post_id)
        .await?
        .into_iter()
        .collect();

    Ok(UserVotes { post, comments })
}

/// Sum of scores over a user's posts and over their comments.
pub async fn get_karma(db: &SqlitePool, user_id: i64) -> Result<(i64, i64)> {
    let post_karma: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(score), 0) FROM posts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    let comment_karma: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(score), 0) FROM comments WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    Ok((post_karma, comment_karma))
}
