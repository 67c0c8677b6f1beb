use std::net::SocketAddr;
use std::path::PathBuf;

use imgcache::config::Config;

/// Standalone server entry point.
///
/// Initializes tracing, validates configuration, and starts the HTTP
/// server. Designed for containerized deployment with environment-based
/// configuration.
///
/// # Configuration
/// Environment variables:
/// - `IMGCACHE_SOURCE_DIR`: directory of original images (default: "./images")
/// - `IMGCACHE_CACHE_DIR`: directory for transformed results (default: "./cache")
/// - `IMGCACHE_FALLBACK_IMAGE`: image served on failure (default: "./fallback.png")
/// - `IMGCACHE_RETURN_404`: respond 404 on failure instead of the fallback (default: true)
/// - `PORT`: HTTP listen port (default: 8080)
/// - `RUST_LOG`: logging verbosity (default: "imgcache=debug,tower_http=debug")
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgcache=debug,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting imgcache server");

    let cfg = Config {
        source_dir: env_path("IMGCACHE_SOURCE_DIR", "./images"),
        cache_dir: env_path("IMGCACHE_CACHE_DIR", "./cache"),
        fallback_image: env_path("IMGCACHE_FALLBACK_IMAGE", "./fallback.png"),
        return_404: env_bool("IMGCACHE_RETURN_404", true),
        ..Config::default()
    };
    // Fail fast: a misconfigured directory must stop the server before it binds.
    cfg.validate()?;

    let app = imgcache::app(cfg);

    // Cloud platforms inject PORT
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or(8080);

    // Bind to 0.0.0.0 for external access
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "True"),
        Err(_) => default,
    }
}
