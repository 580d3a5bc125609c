//! Discovery of the images a run uploads.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::harness::{HarnessError, HarnessResult};

/// Extensions accepted as test images (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// An image file queued for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    /// Name unique within a scan: the path below the scanned directory with
    /// `/` separators, which is the bare file name for top-level images
    pub name: String,
    /// Lower-cased extension without the dot
    pub extension: String,
    pub size_bytes: u64,
}

impl ImageFile {
    /// Describe a supported image at `path`, or `None` for other files
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let extension = path.extension()?.to_str()?.to_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }
        let size_bytes = std::fs::metadata(path).ok()?.len();
        Some(Self {
            path: path.to_path_buf(),
            name,
            extension,
            size_bytes,
        })
    }

    /// Bare file name sent in the multipart part
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// List the supported images in `dir`, sorted by file name
pub fn scan_images(dir: impl AsRef<Path>, recursive: bool) -> HarnessResult<Vec<ImageFile>> {
    let root = dir.as_ref();
    if !root.is_dir() {
        return Err(HarnessError::InvalidInput(root.to_path_buf()));
    }

    let walker = if recursive {
        WalkDir::new(root)
    } else {
        WalkDir::new(root).max_depth(1)
    };

    let mut images = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(mut image) = ImageFile::from_path(entry.path()) {
            if let Some(name) = relative_name(root, entry.path()) {
                image.name = name;
            }
            images.push(image);
        }
    }

    images.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(images)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.webp", "d.jpeg", "notes.txt", "gif.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let images = scan_images(dir.path(), false).unwrap();
        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.PNG", "c.webp", "d.jpeg"]);
        assert_eq!(images[1].extension, "png");
        assert_eq!(images[1].mime_type(), "image/png");
        assert_eq!(images[0].size_bytes, 1);
    }

    #[test]
    fn test_scan_non_recursive_skips_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("inner.jpg"), b"x").unwrap();
        fs::write(dir.path().join("top.jpg"), b"x").unwrap();

        assert_eq!(scan_images(dir.path(), false).unwrap().len(), 1);
        assert_eq!(scan_images(dir.path(), true).unwrap().len(), 2);
    }

    #[test]
    fn test_recursive_scan_names_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.png"), b"red").unwrap();
        fs::write(dir.path().join("sub").join("a.png"), b"blue").unwrap();

        let images = scan_images(dir.path(), true).unwrap();
        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a.png", "sub/a.png"]);
        assert_eq!(images[1].file_name(), "a.png");
        assert_eq!(images[1].path, dir.path().join("sub").join("a.png"));
    }

    #[test]
    fn test_scan_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_images(dir.path(), false).unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(scan_images(&missing, false), Err(HarnessError::InvalidInput(_))));
    }
}
