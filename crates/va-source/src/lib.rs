//! Sources de frames pour vidascii : vidéo (ffmpeg) et images fixes.

pub mod image;
pub mod video;

use std::path::Path;

use anyhow::Result;
use va_core::error::CoreError;
use va_core::traits::Source;

/// Open `path` as an image or a video source depending on its extension.
///
/// # Errors
/// [`CoreError::FileNotFound`] for a missing path, decode failure, or
/// ffprobe/ffmpeg failure for videos.
pub fn open_source(path: &Path, target_fps: f64) -> Result<Box<dyn Source>> {
    if !path.is_file() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    if image::is_image_path(path) {
        Ok(Box::new(image::ImageSource::new(path)?))
    } else {
        Ok(Box::new(video::VideoSource::open(path.to_path_buf(), target_fps)?))
    }
}
