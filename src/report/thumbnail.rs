//! Inline thumbnails so the HTML report does not depend on the image folder.

use base64::Engine;
use image::ImageOutputFormat;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::harness::HarnessResult;
use crate::runner::RunResults;

/// Longest edge of an embedded thumbnail (pixels)
pub const THUMBNAIL_SIZE: u32 = 160;

/// Downscale the image at `path` and encode it as a PNG data URI
pub fn thumbnail_data_uri(path: &Path) -> HarnessResult<String> {
    let img = image::open(path)?;
    let thumb = img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);

    let mut png = Cursor::new(Vec::new());
    thumb.write_to(&mut png, ImageOutputFormat::Png)?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(png.into_inner());
    Ok(format!("data:image/png;base64,{}", encoded))
}

/// Data URIs keyed by image file path. Images that cannot be decoded are left
/// out and keep their file link in the report.
pub fn embed_thumbnails(results: &RunResults) -> HashMap<PathBuf, String> {
    let mut thumbnails = HashMap::new();
    for record in results.iter() {
        match thumbnail_data_uri(&record.file_path) {
            Ok(uri) => {
                thumbnails.insert(record.file_path.clone(), uri);
            }
            Err(e) => {
                tracing::warn!("cannot embed thumbnail for {}: {}", record.image_name, e);
            }
        }
    }
    thumbnails
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Attempt;
    use image::{Rgb, RgbImage};
    use std::time::Duration;

    #[test]
    fn test_thumbnail_is_png_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        RgbImage::from_pixel(640, 320, Rgb([200, 120, 40])).save(&path).unwrap();

        let uri = thumbnail_data_uri(&path).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));

        let encoded = uri.trim_start_matches("data:image/png;base64,");
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.width(), THUMBNAIL_SIZE);
        assert_eq!(thumb.height(), THUMBNAIL_SIZE / 2);
    }

    #[test]
    fn test_undecodable_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.jpg");
        RgbImage::new(8, 8).save(&good).unwrap();
        std::fs::write(&bad, b"not a jpeg").unwrap();

        let mut results = RunResults::new();
        results.record_success(
            Attempt::new("good.png", "png", 0, Duration::ZERO).with_path(&good),
            vec![],
        );
        results.record_success(
            Attempt::new("bad.jpg", "jpg", 0, Duration::ZERO).with_path(&bad),
            vec![],
        );

        let thumbnails = embed_thumbnails(&results);
        assert!(thumbnails.contains_key(&good));
        assert!(!thumbnails.contains_key(&bad));
    }

    #[test]
    fn test_same_file_name_in_subdirectories_keeps_both_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let top = dir.path().join("a.png");
        let nested = dir.path().join("sub").join("a.png");
        RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])).save(&top).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([0, 0, 255])).save(&nested).unwrap();

        let mut results = RunResults::new();
        results.record_success(Attempt::new("a.png", "png", 0, Duration::ZERO).with_path(&top), vec![]);
        results.record_success(
            Attempt::new("sub/a.png", "png", 0, Duration::ZERO).with_path(&nested),
            vec![],
        );

        let thumbnails = embed_thumbnails(&results);
        assert_eq!(thumbnails.len(), 2);
        assert_ne!(thumbnails[&top], thumbnails[&nested]);
    }
}
