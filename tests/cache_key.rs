use imgcache::config::{FitMode, ImageFormat};
use imgcache::key::{cache_key, slugify};
use imgcache::params::TransformOptions;

fn opts() -> TransformOptions {
    TransformOptions {
        width: 200,
        height: 100,
        quality: 80,
        format: ImageFormat::WebP,
        fit: FitMode::Cover,
    }
}

#[test]
fn key_embeds_every_option_and_the_path() {
    let key = cache_key("photos/cat.jpg", &opts());
    assert_eq!(
        key,
        "width-200-height-100-quality-80-format-webp-fit-cover-photos-cat.webp"
    );
}

#[test]
fn key_extension_follows_output_format_not_source() {
    let mut o = opts();
    o.format = ImageFormat::Avif;
    let key = cache_key("photos/cat.jpg", &o);
    assert!(key.ends_with(".avif"));
    assert!(key.contains("-format-avif-"));
}

#[test]
fn source_extension_is_stripped() {
    // Same source name under a different extension addresses the same entry
    assert_eq!(
        cache_key("photos/cat.jpg", &opts()),
        cache_key("photos/cat.png", &opts())
    );
}

#[test]
fn any_option_change_addresses_a_new_entry() {
    let base = cache_key("cat.jpg", &opts());

    let mut o = opts();
    o.width = 201;
    assert_ne!(cache_key("cat.jpg", &o), base);

    let mut o = opts();
    o.quality = 81;
    assert_ne!(cache_key("cat.jpg", &o), base);

    let mut o = opts();
    o.fit = FitMode::Contain;
    assert_ne!(cache_key("cat.jpg", &o), base);
}

#[test]
fn case_and_separator_variants_collide() {
    // Known collision class: slugging folds case and separator runs
    assert_eq!(
        cache_key("Photos/Cat.jpg", &opts()),
        cache_key("photos/cat.jpg", &opts())
    );
    assert_eq!(
        cache_key("a_b.jpg", &opts()),
        cache_key("a-b.jpg", &opts())
    );
}

#[test]
fn key_is_filesystem_safe() {
    let key = cache_key("weird dir/näme (1)?.jpg", &opts());
    let name_part = key.rsplit_once('.').unwrap().0;
    assert!(name_part
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    assert!(!key.contains('/'));
}

#[test]
fn slugify_lowercases_and_collapses_runs() {
    assert_eq!(slugify("Hello World!"), "hello-world");
    assert_eq!(slugify("--a__b--"), "a-b");
    assert_eq!(slugify("a/b\\c"), "a-b-c");
    assert_eq!(slugify("FOO123"), "foo123");
}

#[test]
fn slugify_trims_and_handles_empty() {
    assert_eq!(slugify(""), "");
    assert_eq!(slugify("!!!"), "");
    assert_eq!(slugify("-leading-and-trailing-"), "leading-and-trailing");
}
