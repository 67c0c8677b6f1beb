use std::collections::HashMap;

use crate::config::{Config, FitMode, ImageFormat};

/// Fully resolved transform options for one request. Every field is
/// concrete; downstream code never consults the raw query again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: ImageFormat,
    pub fit: FitMode,
}

impl TransformOptions {
    /// Resolves raw query parameters into concrete options.
    ///
    /// Resolution is permissive: a missing, malformed, or out-of-bounds
    /// value falls back to the configured default and is never an error.
    /// Two of the recognized parameters use wire names that differ from the
    /// option they set (`ext` selects the format, `resizeMode` the fit);
    /// unrecognized parameters are ignored.
    pub fn resolve(query: &HashMap<String, String>, config: &Config) -> Self {
        let width = query
            .get("width")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&w| w >= 1 && w < config.max_width)
            .unwrap_or(config.max_width);

        let height = query
            .get("height")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&h| h >= 1 && h < config.max_height)
            .unwrap_or(config.max_height);

        let quality = query
            .get("quality")
            .and_then(|v| v.parse::<u8>().ok())
            .filter(|&q| q >= 1 && q < 100)
            .unwrap_or(config.default_quality);

        let format = query
            .get("ext")
            .and_then(|v| v.parse::<ImageFormat>().ok())
            .filter(|f| config.allowed_formats.contains(f))
            .unwrap_or(config.default_format);

        let fit = query
            .get("resizeMode")
            .and_then(|v| v.parse::<FitMode>().ok())
            .unwrap_or(config.default_fit);

        Self {
            width,
            height,
            quality,
            format,
            fit,
        }
    }
}
