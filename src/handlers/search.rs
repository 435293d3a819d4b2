use axum::extract::State;

use crate::{
    AppState,
    error::Result,
    extract::{Json, Query},
    models::{SearchQuery, SearchResponse, clamp_page},
    services::search_service,
};

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let query = params.q.as_deref().unwrap_or_default();
    let results = search_service::search_posts(&state.db, query, clamp_page(params.page)).await?;

    Ok(Json(results))
}
