use std::str::FromStr;

use imgcache::config::{Config, ConfigError, FitMode, ImageFormat};
use tempfile::TempDir;

fn valid_config(source: &TempDir, cache: &TempDir) -> Config {
    Config {
        source_dir: source.path().to_path_buf(),
        cache_dir: cache.path().to_path_buf(),
        ..Config::default()
    }
}

#[test]
fn validate_accepts_writable_directories() {
    let source = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    valid_config(&source, &cache).validate().unwrap();
}

#[test]
fn validate_leaves_no_probe_files_behind() {
    let source = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    valid_config(&source, &cache).validate().unwrap();
    assert_eq!(std::fs::read_dir(source.path()).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 0);
}

#[test]
fn validate_rejects_missing_source_dir() {
    let source = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let config = Config {
        source_dir: source.path().join("does-not-exist"),
        ..valid_config(&source, &cache)
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory(_))
    ));
}

#[test]
fn validate_rejects_file_where_directory_expected() {
    let source = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let file = source.path().join("a-file");
    std::fs::write(&file, b"x").unwrap();
    let config = Config {
        cache_dir: file,
        ..valid_config(&source, &cache)
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory(_))
    ));
}

#[test]
fn validate_requires_fallback_image_when_it_would_be_served() {
    let source = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let fallback = source.path().join("fallback.png");

    let config = Config {
        return_404: false,
        fallback_image: fallback.clone(),
        ..valid_config(&source, &cache)
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::FallbackMissing(_))
    ));

    std::fs::write(&fallback, b"png bytes").unwrap();
    config.validate().unwrap();
}

#[test]
fn fallback_image_is_not_checked_when_404_is_configured() {
    let source = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let config = Config {
        return_404: true,
        fallback_image: source.path().join("missing.png"),
        ..valid_config(&source, &cache)
    };
    config.validate().unwrap();
}

#[test]
fn format_parses_case_insensitively_with_jpg_alias() {
    assert_eq!(ImageFormat::from_str("jpeg").unwrap(), ImageFormat::Jpeg);
    assert_eq!(ImageFormat::from_str("jpg").unwrap(), ImageFormat::Jpeg);
    assert_eq!(ImageFormat::from_str("WebP").unwrap(), ImageFormat::WebP);
    assert_eq!(ImageFormat::from_str("AVIF").unwrap(), ImageFormat::Avif);
    assert!(ImageFormat::from_str("bmp").is_err());
}

#[test]
fn format_display_and_content_type_agree() {
    assert_eq!(ImageFormat::Jpeg.to_string(), "jpeg");
    assert_eq!(ImageFormat::Jpeg.content_type(), "image/jpeg");
    assert_eq!(ImageFormat::WebP.to_string(), "webp");
    assert_eq!(ImageFormat::WebP.content_type(), "image/webp");
    assert_eq!(ImageFormat::Png.content_type(), "image/png");
    assert_eq!(ImageFormat::Avif.content_type(), "image/avif");
}

#[test]
fn fit_mode_parses_case_insensitively() {
    assert_eq!(FitMode::from_str("cover").unwrap(), FitMode::Cover);
    assert_eq!(FitMode::from_str("Contain").unwrap(), FitMode::Contain);
    assert_eq!(FitMode::from_str("FILL").unwrap(), FitMode::Fill);
    assert!(FitMode::from_str("crop").is_err());
}
