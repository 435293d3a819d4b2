use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{CommentNode, CommunitySummary};

pub const POSTS_PER_PAGE: i64 = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Link,
}

impl FromStr for PostType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "Text" => Ok(PostType::Text),
            "link" | "Link" => Ok(PostType::Link),
            _ => Err(format!("Unknown PostType: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub community_id: i64,
    pub title: String,
    pub body: Option<String>,
    pub post_type: PostType,
    pub link_url: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub score: i64,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Post row joined with author and community, as shown in feeds
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostListItem {
    pub id: i64,
    pub user_id: i64,
    pub community_id: i64,
    pub title: String,
    pub body: Option<String>,
    pub post_type: PostType,
    pub link_url: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub score: i64,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub community_name: String,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostDetail {
    pub id: i64,
    pub user_id: i64,
    pub community_id: i64,
    pub title: String,
    pub body: Option<String>,
    pub post_type: PostType,
    pub link_url: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub score: i64,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub user_avatar: Option<String>,
    pub community_name: String,
}

// Create post request
#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(max = 300, message = "العنوان طويل جداً (الحد الأقصى 300 حرف)"))]
    pub title: String,
    #[validate(length(max = 40000, message = "المحتوى طويل جداً (الحد الأقصى 40000 حرف)"))]
    pub body: Option<String>,
    #[serde(default)]
    pub post_type: PostType,
    #[validate(url(message = "الرابط غير صالح"))]
    pub link_url: Option<String>,
}

// Update post request
#[derive(Debug, Validate, Deserialize)]
pub struct UpdatePostRequest {
    #[validate(length(max = 300, message = "العنوان طويل جداً"))]
    pub title: String,
    #[validate(length(max = 40000, message = "المحتوى طويل جداً"))]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostPageResponse {
    pub post: PostDetail,
    pub comments: Vec<CommentNode>,
    pub user_votes: UserVotes,
    pub is_bookmarked: bool,
}

/// The viewer's votes on a post page, keyed by target id.
#[derive(Debug, Default, Serialize)]
pub struct UserVotes {
    pub post: Option<i64>,
    pub comments: std::collections::HashMap<i64, i64>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<PostListItem>,
    pub page: i64,
    pub total_pages: i64,
    pub suggested_communities: Vec<CommunitySummary>,
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub posts: Vec<PostListItem>,
    pub page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub q: String,
    pub posts: Vec<PostListItem>,
    pub page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub url: String,
    pub title: String,
}

// Sorting options for community listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    New,
    Top,
    Hot,
    Controversial,
}

impl PostSort {
    /// Unknown values fall back to newest first.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("top") => PostSort::Top,
            Some("hot") => PostSort::Hot,
            Some("controversial") => PostSort::Controversial,
            _ => PostSort::New,
        }
    }

    pub fn order_clause(self) -> &'static str {
        match self {
            PostSort::New => "p.created_at DESC, p.id DESC",
            PostSort::Top => "p.score DESC, p.id DESC",
            PostSort::Hot => {
                "(p.score / MAX(1.0, (julianday('now') - julianday(p.created_at)) * 24.0)) DESC, p.id DESC"
            }
            PostSort::Controversial => "ABS(p.score) ASC, comment_count DESC, p.id DESC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommunityPostsQuery {
    pub sort: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        clamp_page(self.page)
    }
}

pub fn total_pages(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

/// Page numbers start at 1; anything lower is treated as the first page.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Row offset of a 1-based page. Saturates so absurd page numbers just
/// land past the last row.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(per_page)
}
