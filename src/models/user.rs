use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

use crate::models::{CommunitySummary, PostListItem, ProfileComment};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub jti: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}_]+$").expect("valid username pattern")
});

const BLOCKED_USERNAME_WORDS: &[&str] = &[
    "كلب", "حمار", "غبي", "أحمق", "منيك", "زنا", "عاهرة", "شرموطة", "قحبة", "لعنة", "ابن_الكلب",
    "خنزير", "وسخ", "نيك", "طيز", "زب", "كس", "متناك", "خول", "ديوث", "فاجر", "فاسق", "عرص",
    "معرص", "منيوك", "مومس", "ساقطة", "لوطي", "زاني", "سافل", "وقح", "نجس",
];

/// Usernames are Arabic letters and underscores only, with no blocked words.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() > 30 {
        return Err(ValidationError::new("username_length")
            .with_message("اسم المستخدم طويل جداً (الحد الأقصى 30 حرف)".into()));
    }

    if !USERNAME_PATTERN.is_match(username) {
        return Err(ValidationError::new("username_charset").with_message(
            "اسم المستخدم يجب أن يحتوي على حروف عربية وشرطة سفلية فقط (بدون مسافات أو أرقام أو رموز)"
                .into(),
        ));
    }

    let compact = username.replace('_', "");
    if BLOCKED_USERNAME_WORDS
        .iter()
        .any(|word| compact.contains(word) || username.contains(word))
    {
        return Err(ValidationError::new("username_blocked")
            .with_message("اسم المستخدم يحتوي على كلمات غير مسموح بها".into()));
    }

    Ok(())
}

#[derive(Debug, Validate, Deserialize)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    pub password: String,
    #[validate(email(message = "البريد الإلكتروني غير صالح"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    #[validate(length(max = 2048, message = "رابط الصورة طويل جداً"))]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

// Own account view, includes private fields
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            email_verified: user.email_verified,
            avatar_url: user.avatar_url,
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub posts: Vec<PostListItem>,
    pub comments: Vec<ProfileComment>,
    pub followed_communities: Vec<CommunitySummary>,
    pub post_karma: i64,
    pub comment_karma: i64,
}
