use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tracing::{info, warn};

use crate::params::TransformOptions;
use crate::transform::{self, Codec};
use crate::Error;

/// Keyed blob store for transformed images. File existence is the hit
/// test; there is no separate index.
#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Flat directory of cache files, one per key.
#[derive(Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait::async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
        }
        let path = self.path_for(key);
        fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// How a request's bytes were obtained.
pub enum Resolved {
    Hit(Vec<u8>),
    Transformed(Vec<u8>),
}

/// Serves a key from the cache, filling it from the source image on a miss.
///
/// The fill path re-reads the cache file it just wrote rather than handing
/// back the in-memory bytes. Concurrent requests for the same key may each
/// run the transform and overwrite each other's file; the writes are
/// byte-identical, so last write wins and every reader sees a complete
/// entry.
pub async fn resolve_image(
    cache: &DiskCache,
    codec: Arc<dyn Codec>,
    source: &Path,
    key: &str,
    opts: &TransformOptions,
    deadline: Duration,
) -> Result<Resolved, Error> {
    match cache.get(key).await {
        Ok(Some(bytes)) => {
            info!("Cache hit for key={}", key);
            return Ok(Resolved::Hit(bytes));
        }
        Ok(None) => {
            info!("Cache miss for key={}", key);
        }
        // An unreadable entry degrades to a miss; the transform below
        // rewrites it.
        Err(e) => {
            warn!("Cache read failed for key={}, treating as miss: {}", key, e);
        }
    }

    let is_file = fs::metadata(source)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(Error::SourceNotFound(source.to_path_buf()));
    }

    transform::transform_and_store(
        codec,
        source.to_path_buf(),
        cache.clone(),
        key.to_string(),
        opts.clone(),
        deadline,
    )
    .await?;

    let bytes = fs::read(cache.path_for(key))
        .await
        .map_err(|e| Error::Transform(e.into()))?;
    Ok(Resolved::Transformed(bytes))
}
