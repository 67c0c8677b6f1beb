use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Output image formats the middleware can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Avif => "avif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Avif => "image/avif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::WebP),
            "avif" => Ok(ImageFormat::Avif),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

/// How source dimensions are mapped onto the requested dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the target box, cropping overflow around the center.
    Cover,
    /// Fit inside the target box, preserving aspect ratio.
    Contain,
    /// Stretch to the exact target box.
    Fill,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMode::Cover => f.write_str("cover"),
            FitMode::Contain => f.write_str("contain"),
            FitMode::Fill => f.write_str("fill"),
        }
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            _ => Err(format!("unknown fit mode: {}", s)),
        }
    }
}

/// Process-wide configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the original images.
    pub source_dir: PathBuf,
    /// Directory holding transformed results, one flat file per cache key.
    pub cache_dir: PathBuf,
    /// Client-facing cache lifetime in seconds (Cache-Control/Expires).
    pub cache_time: u64,
    /// Upper bound for the `width` query parameter, and its fallback value.
    pub max_width: u32,
    /// Upper bound for the `height` query parameter, and its fallback value.
    pub max_height: u32,
    /// Encoder quality used when the `quality` parameter is absent or invalid.
    pub default_quality: u8,
    /// Output format used when the `ext` parameter is absent or not allowed.
    pub default_format: ImageFormat,
    /// Formats a request may select via the `ext` parameter.
    pub allowed_formats: Vec<ImageFormat>,
    /// Fit mode used when the `resizeMode` parameter is absent or invalid.
    pub default_fit: FitMode,
    /// Deadline a request waits on a transform before giving up.
    pub timeout: Duration,
    /// Image served on failure when `return_404` is false.
    pub fallback_image: PathBuf,
    /// Respond 404 on failure instead of serving the fallback image.
    pub return_404: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./images"),
            cache_dir: PathBuf::from("./cache"),
            cache_time: 604_800, // one week
            max_width: 1920,
            max_height: 1080,
            default_quality: 80,
            default_format: ImageFormat::Jpeg,
            allowed_formats: vec![
                ImageFormat::Jpeg,
                ImageFormat::Png,
                ImageFormat::WebP,
                ImageFormat::Avif,
            ],
            default_fit: FitMode::Cover,
            timeout: Duration::from_millis(5_000),
            fallback_image: PathBuf::from("./fallback.png"),
            return_404: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0:?} does not exist or is not a directory")]
    NotADirectory(PathBuf),
    #[error("{0:?} is not writable: {1}")]
    NotWritable(PathBuf, std::io::Error),
    #[error("fallback image {0:?} does not exist")]
    FallbackMissing(PathBuf),
}

impl Config {
    /// Startup checks. Runs once before the server binds; any failure is
    /// fatal and the process must not start serving.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_writable_dir(&self.source_dir)?;
        require_writable_dir(&self.cache_dir)?;
        if !self.return_404 {
            let is_file = std::fs::metadata(&self.fallback_image)
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(ConfigError::FallbackMissing(self.fallback_image.clone()));
            }
        }
        Ok(())
    }
}

fn require_writable_dir(dir: &Path) -> Result<(), ConfigError> {
    let is_dir = std::fs::metadata(dir).map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(ConfigError::NotADirectory(dir.to_path_buf()));
    }
    // Probe with an actual write; permission bits alone miss read-only mounts.
    let probe = dir.join(".imgcache-write-check");
    std::fs::write(&probe, b"ok").map_err(|e| ConfigError::NotWritable(dir.to_path_buf(), e))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}
