use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{ApiError, ErrorBody};
use super::AppState;
use crate::config::parse_bool;
use crate::storage::{Feed, FeedQuery};
use crate::util::validate_url;

/// A feed as listed by `GET /api/v1/feeds`. The enabled flag is implied by
/// the query and not echoed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedBody {
    pub url: String,
    pub provider: String,
    pub category: String,
}

impl From<Feed> for FeedBody {
    fn from(feed: Feed) -> Self {
        Self {
            url: feed.url,
            provider: feed.provider,
            category: feed.category,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedsParams {
    pub provider: Option<String>,
    pub category: Option<String>,
    pub enabled: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddFeedRequest {
    pub url: Option<String>,
    pub provider: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetFeedStateRequest {
    pub enabled: Option<bool>,
}

/// Extract a required, non-blank string field.
fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::BadRequest(format!("{} is required", name))),
    }
}

/// Path segment that precedes the embedded feed URL.
const FEEDS_PATH: &str = "/feeds/";

/// Rebuild the feed URL embedded in the request path.
///
/// The raw path is preferred so percent-escapes that belong to the feed URL
/// survive; the decoded capture covers clients that encoded the whole URL.
/// The router strips the query string from the path, so a feed URL that
/// itself has a query arrives split in two.
fn embedded_url(uri: &Uri, decoded: &str) -> String {
    let path = uri.path();
    let raw = path
        .find(FEEDS_PATH)
        .map_or(path, |start| &path[start + FEEDS_PATH.len()..])
        .trim_start_matches('/');
    let url = if validate_url(raw).is_ok() {
        raw
    } else {
        decoded.trim_start_matches('/')
    };

    match uri.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url, query),
        _ => url.to_string(),
    }
}

pub async fn get_feeds(
    State(state): State<AppState>,
    params: Result<Query<FeedsParams>, QueryRejection>,
) -> Result<Json<Vec<FeedBody>>, ApiError> {
    let Query(params) = params.map_err(|e| {
        ApiError::BadRequest(format!("error parsing query parameters: {}", e.body_text()))
    })?;

    let enabled = match params.enabled.as_deref() {
        None => true,
        Some(raw) => parse_bool(raw.trim()).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "error parsing query parameters: enabled must be a boolean, got '{}'",
                raw
            ))
        })?,
    };

    let query = FeedQuery {
        provider: params.provider.unwrap_or_default(),
        category: params.category.unwrap_or_default(),
        enabled,
    };

    let feeds = state.repo.get_feeds(&query).await?;
    Ok(Json(feeds.into_iter().map(FeedBody::from).collect()))
}

pub async fn add_feed(
    State(state): State<AppState>,
    body: Result<Json<AddFeedRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = body
        .map_err(|e| ApiError::BadRequest(format!("error parsing body: {}", e.body_text())))?;

    let url = required(body.url, "url")?;
    let provider = required(body.provider, "provider")?;
    let category = required(body.category, "category")?;

    if let Err(e) = validate_url(&url) {
        tracing::debug!(url = %url, error = %e, "Rejected feed url");
        return Err(ApiError::BadRequest("url provided is not valid".to_string()));
    }

    let feed = Feed {
        url,
        provider,
        category,
        enabled: true,
    };
    state.repo.add_feed(&feed).await?;

    tracing::info!(url = %feed.url, provider = %feed.provider, category = %feed.category, "Feed added");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_feed_state(
    State(state): State<AppState>,
    Path(path): Path<String>,
    uri: Uri,
    body: Result<Json<SetFeedStateRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let url = embedded_url(&uri, &path);
    if validate_url(&url).is_err() {
        return Err(ApiError::BadRequest("url provided is not valid".to_string()));
    }

    let Json(body) = body
        .map_err(|e| ApiError::BadRequest(format!("error parsing body: {}", e.body_text())))?;
    let enabled = body
        .enabled
        .ok_or_else(|| ApiError::BadRequest("enabled is required".to_string()))?;

    state.repo.set_feed_state(&url, enabled).await?;

    tracing::info!(url = %url, enabled, "Feed state updated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_feed(
    State(state): State<AppState>,
    Path(path): Path<String>,
    uri: Uri,
) -> Result<StatusCode, ApiError> {
    let url = embedded_url(&uri, &path);
    // An invalid URL can never have been stored
    if validate_url(&url).is_err() {
        return Err(ApiError::NotFound("url provided is not valid".to_string()));
    }

    state.repo.delete_feed(&url).await?;

    tracing::info!(url = %url, "Feed deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "OK" }))),
        Err(e) => {
            tracing::error!(error = %e, "Storage health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "FAIL" })),
            )
        }
    }
}

pub async fn no_route() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            message: "no route found".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(raw: &str) -> Uri {
        raw.parse().unwrap()
    }

    #[test]
    fn test_embedded_url_strips_route_prefix() {
        assert_eq!(
            embedded_url(
                &uri("/feeds/http://feeds.example.com/a.xml"),
                "http://feeds.example.com/a.xml"
            ),
            "http://feeds.example.com/a.xml"
        );
    }

    #[test]
    fn test_embedded_url_with_unstripped_prefix() {
        assert_eq!(
            embedded_url(
                &uri("/api/v1/feeds/https://x.example/feeds/a%20b.xml"),
                "https://x.example/feeds/a b.xml"
            ),
            "https://x.example/feeds/a%20b.xml"
        );
    }

    #[test]
    fn test_embedded_url_keeps_percent_escapes() {
        assert_eq!(
            embedded_url(
                &uri("/feeds/https://x.example/a%20b/rss"),
                "https://x.example/a b/rss"
            ),
            "https://x.example/a%20b/rss"
        );
    }

    #[test]
    fn test_embedded_url_falls_back_to_decoded_capture() {
        assert_eq!(
            embedded_url(
                &uri("/feeds/https%3A%2F%2Fx.example%2Frss"),
                "https://x.example/rss"
            ),
            "https://x.example/rss"
        );
    }

    #[test]
    fn test_embedded_url_restores_query() {
        assert_eq!(
            embedded_url(
                &uri("/feeds/https://example.com/rss?format=xml&lang=en"),
                "https://example.com/rss"
            ),
            "https://example.com/rss?format=xml&lang=en"
        );
        assert_eq!(
            embedded_url(&uri("/feeds/https://example.com/rss?"), "https://example.com/rss"),
            "https://example.com/rss"
        );
    }

    #[test]
    fn test_embedded_url_invalid_stays_invalid() {
        let url = embedded_url(&uri("/feeds/not-a-url"), "not-a-url");
        assert_eq!(url, "not-a-url");
        assert!(validate_url(&url).is_err());
    }

    #[test]
    fn test_required_rejects_missing_and_blank() {
        assert!(required(None, "url").is_err());
        assert!(required(Some("   ".to_string()), "provider").is_err());
        assert_eq!(
            required(Some("BBC News".to_string()), "provider").unwrap(),
            "BBC News"
        );
    }
}
