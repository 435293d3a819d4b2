use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, Result},
    models::{
        Community, CommunityAdmin, CommunityRole, CommunitySummary, CreateCommunityRequest,
        DEFAULT_ACCENT_COLOR, DEFAULT_COMMUNITY_ICON, Report, ReportResponse, UpdateCommunityRequest,
        VotableType, clip_text,
    },
    services::{comment_service, post_service, user_service},
};

const DESCRIPTION_MAX_CHARS: usize = 500;
const RULES_MAX_CHARS: usize = 2000;
const PENDING_REPORTS_LIMIT: i64 = 20;

const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.name, c.description, c.icon, c.accent_color,
           (SELECT COUNT(*) FROM community_follows f WHERE f.community_id = c.id) AS follower_count
    FROM communities c
"#;

pub async fn get_community_by_id(db: &SqlitePool, id: i64) -> Result<Option<Community>> {
    let community = sqlx::query_as::<_, Community>("SELECT * FROM communities WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(community)
}

pub async fn require_community(db: &SqlitePool, id: i64) -> Result<Community> {
    get_community_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("المجتمع غير موجود".to_string()))
}

/// Creates a community; the creator becomes its `creator` admin and first follower.
pub async fn create_community(
    db: &SqlitePool,
    creator_id: i64,
    request: &CreateCommunityRequest,
) -> Result<Community> {
    let name = request.name.trim();

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM communities WHERE name = ?")
        .bind(name)
        .fetch_optional(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("يوجد مجتمع بهذا الاسم بالفعل".to_string()));
    }

    let now = Utc::now();
    let mut tx = db.begin().await?;

    let community = sqlx::query_as::<_, Community>(
        r#"
        INSERT INTO communities (name, description, rules, icon, accent_color, banner_url, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(clip_text(request.description.as_deref(), DESCRIPTION_MAX_CHARS))
    .bind(clip_text(request.rules.as_deref(), RULES_MAX_CHARS))
    .bind(clip_text(request.icon.as_deref(), 16).unwrap_or_else(|| DEFAULT_COMMUNITY_ICON.to_string()))
    .bind(
        clip_text(request.accent_color.as_deref(), 32)
            .unwrap_or_else(|| DEFAULT_ACCENT_COLOR.to_string()),
    )
    .bind(clip_text(request.banner_url.as_deref(), 2048))
    .bind(creator_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("يوجد مجتمع بهذا الاسم بالفعل".to_string())
        }
        other => AppError::Database(other),
    })?;

    sqlx::query(
        "INSERT INTO community_admins (community_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(community.id)
    .bind(creator_id)
    .bind(CommunityRole::Creator)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO community_follows (user_id, community_id, created_at) VALUES (?, ?, ?)")
        .bind(creator_id)
        .bind(community.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(community_id = community.id, creator_id, "community created");

    Ok(community)
}

/// Every community with its follower count, most followed first.
pub async fn list_communities(db: &SqlitePool) -> Result<Vec<CommunitySummary>> {
    let communities = sqlx::query_as::<_, CommunitySummary>(&format!(
        "{SUMMARY_SELECT} ORDER BY follower_count DESC, c.id ASC"
    ))
    .fetch_all(db)
    .await?;

    Ok(communities)
}

pub async fn get_followed_communities(db: &SqlitePool, user_id: i64) -> Result<Vec<CommunitySummary>> {
    let communities = sqlx::query_as::<_, CommunitySummary>(&format!(
        "{SUMMARY_SELECT} JOIN community_follows mine ON mine.community_id = c.id AND mine.user_id = ?
         ORDER BY follower_count DESC, c.id ASC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(communities)
}

pub async fn follower_count(db: &SqlitePool, community_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM community_follows WHERE community_id = ?")
        .bind(community_id)
        .fetch_one(db)
        .await?;

    Ok(count)
}

pub async fn is_following(db: &SqlitePool, user_id: i64, community_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM community_follows WHERE user_id = ? AND community_id = ?",
    )
    .bind(user_id)
    .bind(community_id)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}

/// Follows or unfollows and reports whether the user now follows.
pub async fn toggle_follow(db: &SqlitePool, user_id: i64, community_id: i64) -> Result<bool> {
    require_community(db, community_id).await?;

    let removed = sqlx::query("DELETE FROM community_follows WHERE user_id = ? AND community_id = ?")
        .bind(user_id)
        .bind(community_id)
        .execute(db)
        .await?
        .rows_affected();

    if removed > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT INTO community_follows (user_id, community_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(community_id)
        .bind(Utc::now())
        .execute(db)
        .await?;

    Ok(true)
}

pub async fn get_admin_role(
    db: &SqlitePool,
    user_id: i64,
    community_id: i64,
) -> Result<Option<CommunityRole>> {
    let role = sqlx::query_scalar(
        "SELECT role FROM community_admins WHERE user_id = ? AND community_id = ?",
    )
    .bind(user_id)
    .bind(community_id)
    .fetch_optional(db)
    .await?;

    Ok(role)
}

/// Fails with `Authorization` unless the user administers the community.
pub async fn require_admin(db: &SqlitePool, user_id: i64, community_id: i64) -> Result<CommunityRole> {
    get_admin_role(db, user_id, community_id)
        .await?
        .ok_or_else(|| AppError::Authorization("ليس لديك صلاحية الوصول".to_string()))
}

pub async fn get_admins(db: &SqlitePool, community_id: i64) -> Result<Vec<CommunityAdmin>> {
    let admins = sqlx::query_as::<_, CommunityAdmin>(
        r#"
        SELECT ca.community_id, ca.user_id, u.username, ca.role, ca.created_at
        FROM community_admins ca
        JOIN users u ON ca.user_id = u.id
        WHERE ca.community_id = ?
        ORDER BY ca.created_at ASC
        "#,
    )
    .bind(community_id)
    .fetch_all(db)
    .await?;

    Ok(admins)
}

/// Blank icon or colour keeps the current value; description and rules are replaced.
pub async fn update_community(
    db: &SqlitePool,
    community: &Community,
    request: &UpdateCommunityRequest,
) -> Result<Community> {
    let icon = clip_text(request.icon.as_deref(), 16).unwrap_or_else(|| community.icon.clone());
    let accent_color = clip_text(request.accent_color.as_deref(), 32)
        .unwrap_or_else(|| community.accent_color.clone());
    let banner_url = clip_text(request.banner_url.as_deref(), 2048).or_else(|| community.banner_url.clone());

    let updated = sqlx::query_as::<_, Community>(
        r#"
        UPDATE communities
        SET description = ?, icon = ?, accent_color = ?, banner_url = ?, rules = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(clip_text(request.description.as_deref(), DESCRIPTION_MAX_CHARS))
    .bind(icon)
    .bind(accent_color)
    .bind(banner_url)
    .bind(clip_text(request.rules.as_deref(), RULES_MAX_CHARS))
    .bind(community.id)
    .fetch_one(db)
    .await?;

    Ok(updated)
}

pub async fn add_admin(db: &SqlitePool, community_id: i64, username: &str) -> Result<CommunityAdmin> {
    let user = user_service::get_user_by_username(db, username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("المستخدم غير موجود".to_string()))?;

    if get_admin_role(db, user.id, community_id).await?.is_some() {
        return Err(AppError::Conflict("المستخدم مشرف بالفعل".to_string()));
    }

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO community_admins (community_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(community_id)
    .bind(user.id)
    .bind(CommunityRole::Admin)
    .bind(now)
    .execute(db)
    .await?;

    tracing::info!(community_id, user_id = user.id, "community admin added");

    Ok(CommunityAdmin {
        community_id,
        user_id: user.id,
        username: user.username,
        role: CommunityRole::Admin,
        created_at: now,
    })
}

/// Removes an admin. The acting creator cannot remove themselves.
pub async fn remove_admin(db: &SqlitePool, community_id: i64, actor_id: i64, user_id: i64) -> Result<()> {
    if actor_id == user_id {
        return Ok(());
    }

    sqlx::query("DELETE FROM community_admins WHERE community_id = ? AND user_id = ?")
        .bind(community_id)
        .bind(user_id)
        .execute(db)
        .await?;

    tracing::info!(community_id, user_id, "community admin removed");

    Ok(())
}

/// Files a report against a post or comment. Reporting the same target
/// twice is accepted without creating a second report.
pub async fn submit_report(
    db: &SqlitePool,
    reporter_id: i64,
    reportable_type: VotableType,
    reportable_id: i64,
    reason: &str,
) -> Result<ReportResponse> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("سبب البلاغ مطلوب (حتى 500 حرف)".to_string()));
    }

    let exists = match reportable_type {
        VotableType::Post => post_service::get_post_by_id_raw(db, reportable_id).await?.is_some(),
        VotableType::Comment => comment_service::get_comment_by_id_raw(db, reportable_id)
            .await?
            .is_some(),
    };
    if !exists {
        return Err(AppError::NotFound(match reportable_type {
            VotableType::Post => "المنشور غير موجود".to_string(),
            VotableType::Comment => "التعليق غير موجود".to_string(),
        }));
    }

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM reports WHERE reporter_id = ? AND reportable_type = ? AND reportable_id = ?",
    )
    .bind(reporter_id)
    .bind(reportable_type)
    .bind(reportable_id)
    .fetch_optional(db)
    .await?;

    if existing.is_some() {
        return Ok(ReportResponse {
            reported: true,
            message: "تم الإبلاغ مسبقاً".to_string(),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO reports (reporter_id, reportable_type, reportable_id, reason, status, created_at)
        VALUES (?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(reporter_id)
    .bind(reportable_type)
    .bind(reportable_id)
    .bind(reason)
    .bind(Utc::now())
    .execute(db)
    .await?;

    tracing::info!(
        reporter_id,
        reportable_type = reportable_type.as_str(),
        reportable_id,
        "content reported"
    );

    Ok(ReportResponse {
        reported: true,
        message: "تم إرسال البلاغ".to_string(),
    })
}

const COMMUNITY_REPORT_FILTER: &str = r#"
    (r.reportable_type = 'post' AND r.reportable_id IN (SELECT id FROM posts WHERE community_id = ?))
    OR (r.reportable_type = 'comment' AND r.reportable_id IN (
        SELECT cm.id FROM comments cm JOIN posts p ON cm.post_id = p.id WHERE p.community_id = ?))
"#;

/// Pending reports against content of one community, newest first.
pub async fn get_pending_reports(db: &SqlitePool, community_id: i64) -> Result<Vec<Report>> {
    let reports = sqlx::query_as::<_, Report>(&format!(
        r#"
        SELECT r.id, r.reporter_id, u.username AS reporter_name, r.reportable_type,
               r.reportable_id, r.reason, r.status, r.resolved_by, r.resolved_at, r.created_at
        FROM reports r
        JOIN users u ON r.reporter_id = u.id
        WHERE r.status = 'pending' AND ({COMMUNITY_REPORT_FILTER})
        ORDER BY r.created_at DESC
        LIMIT ?
        "#
    ))
    .bind(community_id)
    .bind(community_id)
    .bind(PENDING_REPORTS_LIMIT)
    .fetch_all(db)
    .await?;

    Ok(reports)
}

/// Marks a report resolved. Only reports on this community's content qualify.
pub async fn resolve_report(
    db: &SqlitePool,
    community_id: i64,
    report_id: i64,
    resolver_id: i64,
) -> Result<()> {
    let updated = sqlx::query(&format!(
        r#"
        UPDATE reports
        SET status = 'resolved', resolved_by = ?, resolved_at = ?
        WHERE id IN (SELECT r.id FROM reports r WHERE r.id = ? AND ({COMMUNITY_REPORT_FILTER}))
        "#
    ))
    .bind(resolver_id)
    .bind(Utc::now())
    .bind(report_id)
    .bind(community_id)
    .bind(community_id)
    .execute(db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("البلاغ غير موجود".to_string()));
    }

    tracing::info!(community_id, report_id, resolver_id, "report resolved");

    Ok(())
}
