use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

use crate::models::Report;

pub const DEFAULT_COMMUNITY_ICON: &str = "🕌";
pub const DEFAULT_ACCENT_COLOR: &str = "#e94560";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommunityRole {
    Creator,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub icon: String,
    pub accent_color: String,
    pub banner_url: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunitySummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    pub accent_color: String,
    pub follower_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommunityAdmin {
    pub community_id: i64,
    pub user_id: i64,
    pub username: String,
    pub role: CommunityRole,
    pub created_at: DateTime<Utc>,
}

static COMMUNITY_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\s\d]+$")
        .expect("valid community name pattern")
});

fn validate_community_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new("community_name_required")
            .with_message("اسم المجتمع مطلوب".into()));
    }

    if name.chars().count() > 50 {
        return Err(ValidationError::new("community_name_length")
            .with_message("اسم المجتمع طويل جداً (الحد الأقصى 50 حرف)".into()));
    }

    if !COMMUNITY_NAME_PATTERN.is_match(name) {
        return Err(ValidationError::new("community_name_charset")
            .with_message("اسم المجتمع يجب أن يكون بالعربية".into()));
    }

    Ok(())
}

// Create community request
#[derive(Debug, Validate, Deserialize)]
pub struct CreateCommunityRequest {
    #[validate(custom(function = "validate_community_name"))]
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub accent_color: Option<String>,
    pub rules: Option<String>,
    #[validate(length(max = 2048, message = "رابط الصورة طويل جداً"))]
    pub banner_url: Option<String>,
}

// Update community settings request
#[derive(Debug, Validate, Deserialize)]
pub struct UpdateCommunityRequest {
    pub description: Option<String>,
    pub icon: Option<String>,
    pub accent_color: Option<String>,
    pub rules: Option<String>,
    #[validate(length(max = 2048, message = "رابط الصورة طويل جداً"))]
    pub banner_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddAdminRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
    #[serde(flatten)]
    pub community: Community,
    pub follower_count: i64,
    pub is_following: bool,
    pub admin_role: Option<CommunityRole>,
    pub admins: Vec<CommunityAdmin>,
}

#[derive(Debug, Serialize)]
pub struct CommunitySettingsResponse {
    pub community: Community,
    pub admin_role: CommunityRole,
    pub admins: Vec<CommunityAdmin>,
    pub reports: Vec<Report>,
}

/// Trims optional text and caps it at `max` characters; blank input becomes `None`.
pub fn clip_text(value: Option<&str>, max: usize) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(max).collect())
}
