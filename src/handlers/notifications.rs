use axum::extract::State;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::Result,
    extract::Json,
    models::{Notification, NotificationCount},
    services::notification_service,
};

/// Latest notifications; fetching them marks everything read.
pub async fn get_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Notification>>> {
    let notifications = notification_service::get_and_mark_read(&state.db, auth_user.user_id).await?;

    Ok(Json(notifications))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
) -> Result<Json<NotificationCount>> {
    let count = match auth_user.user_id() {
        Some(user_id) => notification_service::unread_count(&state.db, user_id).await?,
        None => 0,
    };

    Ok(Json(NotificationCount { count }))
}
