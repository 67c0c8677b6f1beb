use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::GenericImageView;
use image::ImageEncoder;
use image::{DynamicImage, ExtendedColorType};

use crate::cache::{Cache, DiskCache};
use crate::config::{FitMode, ImageFormat};
use crate::params::TransformOptions;
use crate::Error;

#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("failed to decode source image: {0}")]
    Decode(String),
    #[error("failed to encode {format} output: {message}")]
    Encode {
        format: ImageFormat,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("transform task aborted")]
    Aborted,
}

/// Decode-resize-encode pipeline. The seam exists so tests can substitute
/// counting or slow implementations.
pub trait Codec: Send + Sync {
    fn transform(&self, input: &[u8], opts: &TransformOptions) -> Result<Vec<u8>, TransformError>;
}

/// Production codec backed by the `image` crate.
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn transform(&self, input: &[u8], opts: &TransformOptions) -> Result<Vec<u8>, TransformError> {
        let img = decode_image(input)?;
        let resized = resize_image(img, opts.width, opts.height, opts.fit);
        encode_image(&resized, opts.format, opts.quality)
    }
}

/// Decodes raw image bytes, detecting the format from magic bytes rather
/// than trusting the file extension.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, TransformError> {
    let guessed = image::guess_format(bytes).map_err(|e| TransformError::Decode(e.to_string()))?;
    image::load_from_memory_with_format(bytes, guessed)
        .map_err(|e| TransformError::Decode(e.to_string()))
}

/// Resizes to the requested box according to the fit mode.
///
/// Target dimensions are clamped to the source dimensions first, so the
/// pipeline only ever shrinks. Lanczos3 gives the best quality for
/// downsampling.
pub fn resize_image(img: DynamicImage, width: u32, height: u32, fit: FitMode) -> DynamicImage {
    let (orig_w, orig_h) = img.dimensions();
    let target_w = width.min(orig_w).max(1);
    let target_h = height.min(orig_h).max(1);

    if target_w == orig_w && target_h == orig_h {
        return img;
    }

    let filter = image::imageops::FilterType::Lanczos3;
    match fit {
        FitMode::Cover => img.resize_to_fill(target_w, target_h, filter),
        FitMode::Contain => img.resize(target_w, target_h, filter),
        FitMode::Fill => img.resize_exact(target_w, target_h, filter),
    }
}

/// Encodes to the requested format.
///
/// JPEG and WebP drop alpha (RGB), AVIF and PNG keep it (RGBA). PNG is
/// lossless, so quality does not apply there.
pub fn encode_image(
    img: &DynamicImage,
    fmt: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, TransformError> {
    let mut out = Vec::new();

    match fmt {
        ImageFormat::Jpeg => {
            let q = quality.clamp(1, 100);
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let enc = JpegEncoder::new_with_quality(&mut out, q);
            enc.write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(|e| TransformError::Encode {
                    format: fmt,
                    message: e.to_string(),
                })?;
        }
        ImageFormat::Png => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            let enc = PngEncoder::new(&mut out);
            enc.write_image(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
                .map_err(|e| TransformError::Encode {
                    format: fmt,
                    message: e.to_string(),
                })?;
        }
        ImageFormat::WebP => {
            let q = quality.clamp(1, 100) as f32;
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let encoder = webp::Encoder::from_rgb(rgb.as_raw(), w, h);
            let encoded = encoder.encode(q);
            out.extend_from_slice(&encoded);
        }
        ImageFormat::Avif => {
            let q = quality.clamp(1, 100);
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            // Speed 4 balances encoding time and compression ratio
            let enc = AvifEncoder::new_with_speed_quality(&mut out, 4, q);
            enc.write_image(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
                .map_err(|e| TransformError::Encode {
                    format: fmt,
                    message: e.to_string(),
                })?;
        }
    }

    Ok(out)
}

/// Reads the source, transforms it, and writes the result into the cache,
/// waiting at most `deadline`.
///
/// The deadline bounds how long the caller waits, not the work itself: the
/// pipeline runs on a spawned task that keeps going after a timeout, so a
/// slow transform still lands in the cache for the next request. The codec
/// call is CPU-bound and runs under `spawn_blocking` to keep it off the
/// async workers.
pub async fn transform_and_store(
    codec: Arc<dyn Codec>,
    source: PathBuf,
    cache: DiskCache,
    key: String,
    opts: TransformOptions,
    deadline: Duration,
) -> Result<(), Error> {
    let task = tokio::spawn(async move {
        let input = tokio::fs::read(&source)
            .await
            .map_err(TransformError::from)?;
        let output =
            tokio::task::spawn_blocking(move || codec.transform(&input, &opts))
                .await
                .map_err(|_| TransformError::Aborted)??;
        cache
            .put(&key, &output)
            .await
            .map_err(TransformError::from)?;
        Ok::<(), TransformError>(())
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result.map_err(Error::Transform),
        Ok(Err(_)) => Err(Error::Transform(TransformError::Aborted)),
        Err(_) => Err(Error::Timeout(deadline)),
    }
}
