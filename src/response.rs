use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::error;

use crate::config::{Config, ImageFormat};

// IMF-fixdate, e.g. "Fri, 22 Aug 2026 10:00:00 GMT".
static HTTP_DATE: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Precomputed cache headers attached to every successful response.
///
/// Both values are frozen at construction: `Expires` is the startup
/// instant plus the cache lifetime and does not advance over the process
/// lifetime, so long-running processes emit an increasingly stale wall
/// clock date while `max-age` stays authoritative.
#[derive(Clone)]
pub struct CacheHeaders {
    cache_control: HeaderValue,
    expires: HeaderValue,
}

impl CacheHeaders {
    pub fn new(cache_time: u64) -> Self {
        let cache_control = HeaderValue::from_str(&format!("public, max-age={}", cache_time))
            .expect("cache-control value is valid ASCII");
        let expires_at = OffsetDateTime::now_utc() + time::Duration::seconds(cache_time as i64);
        let expires = HeaderValue::from_str(
            &expires_at
                .format(HTTP_DATE)
                .expect("http date format is valid"),
        )
        .expect("http date is valid ASCII");
        Self {
            cache_control,
            expires,
        }
    }
}

/// Builds the success response: image bytes plus content type and the
/// frozen cache headers.
pub fn success(bytes: Vec<u8>, format: ImageFormat, headers: &CacheHeaders) -> Response {
    let mut map = HeaderMap::new();
    map.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    map.insert(header::CACHE_CONTROL, headers.cache_control.clone());
    map.insert(header::EXPIRES, headers.expires.clone());
    (map, Body::from(bytes)).into_response()
}

/// Builds the failure response: a plain 404, or the configured fallback
/// image. Neither carries cache headers, so failures are never cached
/// downstream.
pub async fn failure(config: &Config) -> Response {
    if config.return_404 {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    }
    match tokio::fs::read(&config.fallback_image).await {
        Ok(bytes) => {
            let content_type = content_type_for_path(&config.fallback_image);
            let mut map = HeaderMap::new();
            map.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            (map, Body::from(bytes)).into_response()
        }
        Err(e) => {
            error!("Fallback image {:?} unreadable: {}", config.fallback_image, e);
            (StatusCode::NOT_FOUND, "not found").into_response()
        }
    }
}

fn content_type_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
