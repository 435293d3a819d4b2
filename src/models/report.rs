use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::VotableType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub reporter_name: String,
    pub reportable_type: VotableType,
    pub reportable_id: i64,
    pub reason: String,
    pub status: ReportStatus,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct ReportRequest {
    #[validate(length(max = 500, message = "سبب البلاغ مطلوب (حتى 500 حرف)"))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub reported: bool,
    pub message: String,
}
