use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

pub mod cache;
pub mod config;
pub mod key;
pub mod params;
pub mod response;
pub mod transform;

use crate::cache::{resolve_image, DiskCache, Resolved};
use crate::config::Config;
use crate::key::cache_key;
use crate::params::TransformOptions;
use crate::response::CacheHeaders;
use crate::transform::{Codec, ImageCodec, TransformError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("source image not found: {0:?}")]
    SourceNotFound(PathBuf),
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("transform timed out after {0:?}")]
    Timeout(Duration),
}

struct AppState {
    config: Config,
    codec: Arc<dyn Codec>,
    headers: CacheHeaders,
}

/// Serves one image request: resolve options, derive the cache key, and
/// serve the cached bytes, transforming on a miss.
async fn image_handler(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(path): axum::extract::Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let opts = TransformOptions::resolve(&query, &state.config);
    debug!("Image request: path={}, options={:?}", path, opts);

    let relative = match sanitize_path(&path) {
        Some(p) => p,
        None => {
            warn!("Rejected unsafe request path: {}", path);
            METRICS.errors.fetch_add(1, Ordering::Relaxed);
            return response::failure(&state.config).await;
        }
    };

    // The key is derived from the raw request path, not the sanitized one,
    // so equivalent spellings of a path share an entry only after slugging.
    let key = cache_key(&path, &opts);
    let cache = DiskCache::new(state.config.cache_dir.clone());
    let source = state.config.source_dir.join(relative);

    match resolve_image(
        &cache,
        state.codec.clone(),
        &source,
        &key,
        &opts,
        state.config.timeout,
    )
    .await
    {
        Ok(Resolved::Hit(bytes)) => {
            METRICS.cache_hits.fetch_add(1, Ordering::Relaxed);
            response::success(bytes, opts.format, &state.headers)
        }
        Ok(Resolved::Transformed(bytes)) => {
            METRICS.cache_misses.fetch_add(1, Ordering::Relaxed);
            METRICS.transforms.fetch_add(1, Ordering::Relaxed);
            response::success(bytes, opts.format, &state.headers)
        }
        Err(e) => {
            METRICS.errors.fetch_add(1, Ordering::Relaxed);
            match &e {
                Error::SourceNotFound(p) => warn!("Source image missing: {:?}", p),
                _ => error!("Request failed for key={}: {}", key, e),
            }
            response::failure(&state.config).await
        }
    }
}

/// Re-roots a request path under the source directory. Rejects any path
/// that could escape it (`..`, absolute components, drive prefixes).
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(clean)
}

/// Image routes with the production codec.
/// Usage: `Router::new().nest("/img", imgcache::router(config))`
pub fn router(config: Config) -> Router {
    router_with_codec(config, Arc::new(ImageCodec))
}

/// Image routes with a caller-supplied codec.
pub fn router_with_codec(config: Config, codec: Arc<dyn Codec>) -> Router {
    let headers = CacheHeaders::new(config.cache_time);
    let state = Arc::new(AppState {
        config,
        codec,
        headers,
    });
    Router::new()
        .route("/*path", get(image_handler))
        .with_state(state)
}

/// The full application: image routes nested under `/img`, plus health and
/// metrics endpoints and request tracing.
pub fn app(config: Config) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/img", router(config))
        .layer(TraceLayer::new_for_http())
}

pub struct Metrics {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub transforms: AtomicU64,
    pub errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            transforms: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    static ref METRICS: Metrics = Metrics::new();
}

async fn health_handler() -> impl IntoResponse {
    use serde_json::json;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "imgcache"
    }))
}

/// Prometheus-compatible plain text counters.
async fn metrics_handler() -> impl IntoResponse {
    let hits = METRICS.cache_hits.load(Ordering::Relaxed);
    let misses = METRICS.cache_misses.load(Ordering::Relaxed);
    let transforms = METRICS.transforms.load(Ordering::Relaxed);
    let errors = METRICS.errors.load(Ordering::Relaxed);

    let body = format!(
        "# HELP imgcache_cache_hits_total Total number of cache hits\n\
         # TYPE imgcache_cache_hits_total counter\n\
         imgcache_cache_hits_total {}\n\
         # HELP imgcache_cache_misses_total Total number of cache misses\n\
         # TYPE imgcache_cache_misses_total counter\n\
         imgcache_cache_misses_total {}\n\
         # HELP imgcache_transforms_total Total number of image transformations\n\
         # TYPE imgcache_transforms_total counter\n\
         imgcache_transforms_total {}\n\
         # HELP imgcache_errors_total Total number of errors\n\
         # TYPE imgcache_errors_total counter\n\
         imgcache_errors_total {}\n",
        hits, misses, transforms, errors
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        body,
    )
}
