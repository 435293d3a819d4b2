use axum::{extract::State, http::header, response::IntoResponse};

use crate::{AppState, error::Result, extract::Path, services::feed_service};

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

pub async fn site_feed(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let xml = feed_service::site_feed(&state.db, &state.config).await?;

    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml))
}

pub async fn community_feed(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let xml = feed_service::community_feed(&state.db, &state.config, community_id).await?;

    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml))
}
