//! Filesystem adapter for loading images.

use std::path::{Path, PathBuf};

use docqa_core::domain::{ContainerFormat, Image, LoadError};
use docqa_core::pipeline::DECODED_BYTES_PER_PIXEL;
use docqa_core::ImageSource;
use image::ImageReader;
use tracing::{debug, warn};

use crate::metadata;

/// Supported image extensions.
const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];

/// Filesystem image source adapter.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all image files from the configured paths, sorted within
    /// each directory.
    #[must_use]
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if is_supported_image(path) {
                    files.push(path.clone());
                } else {
                    warn!(path = %path.display(), "unsupported file type");
                }
            } else if path.is_dir() {
                self.collect_from_dir(path, &mut files);
            } else {
                warn!(path = %path.display(), "path does not exist");
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory");
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<Image, LoadError>> + Send + '_> {
        let files = self.collect_files();
        debug!(count = files.len(), "found image files");

        Box::new(files.into_iter().map(|path| load_image(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }

    fn largest_image_bytes(&self) -> Option<u64> {
        self.collect_files()
            .iter()
            .filter_map(|path| image::image_dimensions(path).ok())
            .map(|(w, h)| u64::from(w) * u64::from(h) * DECODED_BYTES_PER_PIXEL)
            .max()
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| EXTENSIONS.contains(&e.as_str()))
}

/// Reads, sniffs and decodes one file, then extracts its metadata.
///
/// # Errors
///
/// Returns [`LoadError::Io`] when the file cannot be read,
/// [`LoadError::UnsupportedFormat`] when the content is not a known
/// container and [`LoadError::Decode`] when decoding fails.
pub fn load_image(path: &Path) -> Result<Image, LoadError> {
    let source_id = path.to_string_lossy().into_owned();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: source_id.clone(),
        source,
    })?;
    load_bytes(&source_id, &bytes)
}

/// Decodes an in-memory file.
///
/// # Errors
///
/// As [`load_image`], minus the I/O case.
pub fn load_bytes(source_id: &str, bytes: &[u8]) -> Result<Image, LoadError> {
    let unsupported = || LoadError::UnsupportedFormat {
        path: source_id.to_string(),
    };
    let format = image::guess_format(bytes).map_err(|_| unsupported())?;
    let container = ContainerFormat::from_image_format(format).ok_or_else(unsupported)?;

    let mut reader = ImageReader::new(std::io::Cursor::new(bytes));
    reader.set_format(format);
    let pixels = reader.decode().map_err(|e| LoadError::Decode {
        path: source_id.to_string(),
        reason: e.to_string(),
    })?;

    let metadata = metadata::extract(bytes, container, &pixels);
    debug!(
        source = source_id,
        format = %container,
        dpi = ?metadata.dpi,
        quality = ?metadata.jpeg_quality,
        "decoded image"
    );
    Ok(Image::new(source_id, pixels).with_metadata(metadata))
}
