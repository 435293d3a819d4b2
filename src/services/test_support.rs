use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::{
    database,
    models::{Comment, Community, Post, User},
};

pub async fn test_pool() -> SqlitePool {
    database::create_memory_pool()
        .await
        .expect("in-memory database")
}

pub async fn insert_user(db: &SqlitePool, username: &str) -> User {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, created_at)
         VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(username)
    .bind(format!("{username}@example.com"))
    .bind("$2b$04$invalidhashinvalidhashinvalidhashinvalidhashinvalidha")
    .bind(Utc::now())
    .fetch_one(db)
    .await
    .expect("insert user")
}

pub async fn insert_community(db: &SqlitePool, name: &str, creator: &User) -> Community {
    let community = sqlx::query_as::<_, Community>(
        "INSERT INTO communities (name, created_by, created_at) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(name)
    .bind(creator.id)
    .bind(Utc::now())
    .fetch_one(db)
    .await
    .expect("insert community");

    sqlx::query(
        "INSERT INTO community_admins (community_id, user_id, role, created_at)
         VALUES (?, ?, 'creator', ?)",
    )
    .bind(community.id)
    .bind(creator.id)
    .bind(Utc::now())
    .execute(db)
    .await
    .expect("insert creator");

    community
}

pub async fn insert_post(db: &SqlitePool, author: &User, community: &Community, title: &str) -> Post {
    sqlx::query_as::<_, Post>(
        "INSERT INTO posts (user_id, community_id, title, body, created_at)
         VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(author.id)
    .bind(community.id)
    .bind(title)
    .bind(format!("{title} نص"))
    .bind(Utc::now())
    .fetch_one(db)
    .await
    .expect("insert post")
}

pub async fn insert_comment(
    db: &SqlitePool,
    author: &User,
    post: &Post,
    parent: Option<i64>,
    body: &str,
) -> Comment {
    insert_comment_at(db, author, post, parent, body, Utc::now()).await
}

pub async fn insert_comment_at(
    db: &SqlitePool,
    author: &User,
    post: &Post,
    parent: Option<i64>,
    body: &str,
    created_at: DateTime<Utc>,
) -> Comment {
    sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (post_id, user_id, parent_comment_id, body, created_at)
         VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(post.id)
    .bind(author.id)
    .bind(parent)
    .bind(body)
    .bind(created_at)
    .fetch_one(db)
    .await
    .expect("insert comment")
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}
