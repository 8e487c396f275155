use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use portkey_core::access::require_identity;
use portkey_core::UrlId;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::extract::Requester;
use crate::model::{
    AnalyticsQuery, AnalyticsResponse, CreateUrlRequest, CreateUrlResponse, DeleteUrlResponse,
    ListUrlsResponse, UrlSummary,
};
use crate::state::AppState;

pub async fn create_url_handler(
    State(state): State<AppState>,
    requester: Requester,
    payload: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateUrlResponse>)> {
    require_identity(requester.identity())?;
    let Json(request) = payload.map_err(|e| {
        debug!(error = %e, "rejected create payload");
        AppError::BadRequest("Invalid JSON")
    })?;

    let original_url = request.original_url.unwrap_or_default();
    let url = state
        .shortener()
        .create(requester.identity(), &original_url)
        .await?;

    let short_url = state.short_url(&url.code);
    Ok((
        StatusCode::CREATED,
        Json(CreateUrlResponse::new(url, short_url)),
    ))
}

pub async fn list_urls_handler(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Json<ListUrlsResponse>> {
    let urls = state.shortener().list_by_owner(requester.identity()).await?;
    let totals = state
        .analytics()
        .click_totals(requester.identity(), &urls)
        .await?;

    let urls: Vec<UrlSummary> = urls
        .into_iter()
        .map(|url| UrlSummary {
            short_url: state.short_url(&url.code),
            clicks: totals.get(&url.id).copied().unwrap_or(0),
            id: url.id,
            code: url.code,
            original_url: url.original_url,
            created_at: url.created_at,
        })
        .collect();

    Ok(Json(ListUrlsResponse {
        count: urls.len(),
        urls,
    }))
}

pub async fn analytics_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    requester: Requester,
    query: std::result::Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Json<AnalyticsResponse>> {
    require_identity(requester.identity())?;
    let id = parse_id(&id)?;
    let Query(query) = query.map_err(|_| AppError::BadRequest("Invalid query parameters"))?;

    let analytics = state
        .analytics()
        .get_analytics(id, requester.identity(), query.into())
        .await?;

    let url = analytics.url;
    Ok(Json(AnalyticsResponse {
        short_url: state.short_url(&url.code),
        id: url.id,
        code: url.code,
        original_url: url.original_url,
        created_at: url.created_at,
        total_clicks: analytics.total_clicks,
        clicks: analytics.clicks.into_iter().map(Into::into).collect(),
    }))
}

pub async fn delete_url_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    requester: Requester,
) -> Result<Json<DeleteUrlResponse>> {
    require_identity(requester.identity())?;
    let id = parse_id(&id)?;
    let url = state
        .shortener()
        .soft_delete(id, requester.identity())
        .await?;

    Ok(Json(DeleteUrlResponse {
        message: format!("URL {} deleted successfully", url.code),
    }))
}

/// Ids that are not integers cannot exist.
fn parse_id(raw: &str) -> Result<UrlId> {
    raw.parse::<i64>()
        .map(UrlId::new)
        .map_err(|_| AppError::NotFound("URL not found"))
}
