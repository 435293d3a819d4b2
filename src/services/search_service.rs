use sqlx::SqlitePool;

use crate::{
    error::Result,
    models::{POSTS_PER_PAGE, PostListItem, SearchResponse, page_offset, total_pages},
    services::post_service::POST_LIST_SELECT,
};

/// Full-text search over post titles and bodies, best match first.
///
/// Input the FTS engine cannot parse (stray quotes, bare operators) falls
/// back to a substring match ordered by recency.
pub async fn search_posts(db: &SqlitePool, query: &str, page: i64) -> Result<SearchResponse> {
    let q = query.trim();
    if q.is_empty() {
        return Ok(SearchResponse {
            q: String::new(),
            posts: Vec::new(),
            page,
            total_pages: 0,
        });
    }

    let offset = page_offset(page, POSTS_PER_PAGE);

    let (posts, total) = match match_fts(db, q, offset).await {
        Ok(found) => found,
        Err(sqlx::Error::Database(e)) => {
            tracing::debug!(error = %e, "fts query rejected, falling back to LIKE");
            match_like(db, q, offset).await?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(SearchResponse {
        q: q.to_string(),
        posts,
        page,
        total_pages: total_pages(total, POSTS_PER_PAGE),
    })
}

async fn match_fts(
    db: &SqlitePool,
    q: &str,
    offset: i64,
) -> std::result::Result<(Vec<PostListItem>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts_fts WHERE posts_fts MATCH ?")
        .bind(q)
        .fetch_one(db)
        .await?;

    let posts = sqlx::query_as::<_, PostListItem>(&format!(
        "{POST_LIST_SELECT} JOIN posts_fts fts ON fts.rowid = p.id
         WHERE posts_fts MATCH ?
         ORDER BY fts.rank
         LIMIT ? OFFSET ?"
    ))
    .bind(q)
    .bind(POSTS_PER_PAGE)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok((posts, total))
}

async fn match_like(db: &SqlitePool, q: &str, offset: i64) -> Result<(Vec<PostListItem>, i64)> {
    let pattern = format!("%{}%", q);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE title LIKE ? OR body LIKE ?")
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(db)
        .await?;

    let posts = sqlx::query_as::<_, PostListItem>(&format!(
        "{POST_LIST_SELECT} WHERE p.title LIKE ? OR p.body LIKE ?
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ? OFFSET ?"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(POSTS_PER_PAGE)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok((posts, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{insert_community, insert_post, insert_user, test_pool};

    #[tokio::test]
    async fn finds_posts_by_title_words() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let community = insert_community(&db, "عام", &author).await;
        let hit = insert_post(&db, &author, &community, "تاريخ الأندلس").await;
        insert_post(&db, &author, &community, "علوم الفلك").await;

        let result = search_posts(&db, "الأندلس", 1).await.unwrap();
        assert_eq!(result.posts.len(), 1);
        assert_eq!(result.posts[0].id, hit.id);
        assert_eq!(result.total_pages, 1);
    }

    #[tokio::test]
    async fn edited_titles_are_reindexed() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let community = insert_community(&db, "عام", &author).await;
        let post = insert_post(&db, &author, &community, "قديم").await;

        sqlx::query("UPDATE posts SET title = 'حديث', body = NULL WHERE id = ?")
            .bind(post.id)
            .execute(&db)
            .await
            .unwrap();

        assert!(search_posts(&db, "قديم", 1).await.unwrap().posts.is_empty());
        assert_eq!(search_posts(&db, "حديث", 1).await.unwrap().posts.len(), 1);
    }

    #[tokio::test]
    async fn malformed_fts_syntax_falls_back_to_substring() {
        let db = test_pool().await;
        let author = insert_user(&db, "كاتب").await;
        let community = insert_community(&db, "عام", &author).await;
        let hit = insert_post(&db, &author, &community, "سؤال \"مهم").await;

        let result = search_posts(&db, "\"مهم", 1).await.unwrap();
        assert_eq!(result.posts.len(), 1);
        assert_eq!(result.posts[0].id, hit.id);
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let db = test_pool().await;

        let result = search_posts(&db, "   ", 1).await.unwrap();
        assert!(result.posts.is_empty());
        assert_eq!(result.total_pages, 0);
    }
}
