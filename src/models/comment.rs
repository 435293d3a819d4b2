use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const MAX_COMMENT_LENGTH: usize = 10000;
/// Deepest reply level accepted; top-level comments are level 1.
pub const MAX_COMMENT_DEPTH: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub body: String,
    pub score: i64,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Comment joined with its author, as rendered under a post
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub body: String,
    pub score: i64,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub user_avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: CommentView,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: CommentView) -> Self {
        Self {
            comment,
            children: Vec::new(),
        }
    }
}

// Unlinks descendants one level at a time so dropping a deep chain does not recurse
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

// Comment listed on a profile page
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileComment {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub body: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub post_title: String,
}

// Create comment request
#[derive(Debug, Validate, Deserialize)]
pub struct CreateCommentRequest {
    #[validate(length(max = 10000, message = "التعليق طويل جداً"))]
    pub body: String,
    pub parent_comment_id: Option<i64>,
}

// Update comment request
#[derive(Debug, Validate, Deserialize)]
pub struct UpdateCommentRequest {
    #[validate(length(max = 10000, message = "التعليق طويل جداً"))]
    pub body: String,
}
