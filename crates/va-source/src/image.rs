use std::path::Path;

use anyhow::{Context, Result};
use va_core::frame::FrameBuffer;
use va_core::traits::Source;

/// Extensions traitées comme images fixes plutôt que vidéos.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// True if `path` has a still-image extension (case-insensitive).
///
/// # Example
/// ```
/// use va_source::image::is_image_path;
/// use std::path::Path;
/// assert!(is_image_path(Path::new("shot.PNG")));
/// assert!(!is_image_path(Path::new("clip.mp4")));
/// ```
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Charge une image en `FrameBuffer` RGB (3 canaux).
///
/// # Errors
/// Returns an error if the file is missing or cannot be decoded.
///
/// # Example
/// ```no_run
/// use va_source::image::load_image;
/// use std::path::Path;
/// let frame = load_image(Path::new("test.png")).unwrap();
/// assert_eq!(frame.channels, 3);
/// ```
pub fn load_image(path: &Path) -> Result<FrameBuffer> {
    let img = image::open(path).with_context(|| format!("Impossible de charger {}", path.display()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let frame = FrameBuffer::from_raw(width, height, 3, rgb.into_raw())
        .with_context(|| format!("Image invalide: {}", path.display()))?;
    log::debug!("Image chargée: {width}x{height} ({})", path.display());
    Ok(frame)
}

/// Source d'image statique : une seule frame.
pub struct ImageSource {
    frame: Option<FrameBuffer>,
    size: (u32, u32),
}

impl ImageSource {
    /// Load an image from disk and create a source.
    ///
    /// # Errors
    /// Returns an error if the image cannot be loaded.
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self::from_frame(load_image(path)?))
    }

    #[must_use]
    pub fn from_frame(frame: FrameBuffer) -> Self {
        let size = (frame.width, frame.height);
        Self {
            frame: Some(frame),
            size,
        }
    }
}

impl Source for ImageSource {
    fn next_frame(&mut self) -> Option<FrameBuffer> {
        self.frame.take()
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn estimated_frames(&self) -> Option<u64> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_is_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grad.png");
        let img = image::RgbaImage::from_fn(4, 2, |x, _| image::Rgba([x as u8 * 60, 10, 20, 255]));
        img.save(&path).unwrap();

        let frame = load_image(&path).unwrap();
        assert_eq!((frame.width, frame.height, frame.channels), (4, 2, 3));
        assert_eq!(&frame.data[..6], &[0, 10, 20, 60, 10, 20]);
    }

    #[test]
    fn missing_image_is_an_error() {
        assert!(load_image(Path::new("/nonexistent/x.png")).is_err());
    }

    #[test]
    fn image_source_yields_once() {
        let mut src = ImageSource::from_frame(FrameBuffer::filled(3, 3, 3, 1));
        assert_eq!(src.native_size(), (3, 3));
        assert!(src.next_frame().is_some());
        assert!(src.next_frame().is_none());
        assert_eq!(src.native_size(), (3, 3));
    }
}
