use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use va_core::error::CoreError;
use va_core::frame::FrameBuffer;

/// Ratio hauteur/largeur d'une cellule de terminal : un caractère est environ
/// deux fois plus haut que large.
pub const CELL_ASPECT: f64 = 0.5;

/// Character grid dimensions for a `src_w × src_h` frame.
///
/// `cols = width`, `rows = round(width / (src_w / src_h) * 0.5)` (half away
/// from zero), capped by `height` when it is non-zero, and never below 1.
///
/// # Errors
/// [`CoreError::InvalidDimensions`] when the source has a zero side, and
/// [`CoreError::InvalidParameter`] when `width` is 0.
///
/// # Example
/// ```
/// use va_ascii::resize::grid_dimensions;
/// assert_eq!(grid_dimensions(100, 50, 80, 0).unwrap(), (80, 20));
/// assert_eq!(grid_dimensions(200, 100, 10, 0).unwrap(), (10, 3));
/// assert_eq!(grid_dimensions(100, 100, 80, 24).unwrap(), (80, 24));
/// ```
pub fn grid_dimensions(src_w: u32, src_h: u32, width: u16, height: u16) -> Result<(u16, u16), CoreError> {
    if src_w == 0 || src_h == 0 {
        return Err(CoreError::InvalidDimensions {
            width: src_w,
            height: src_h,
        });
    }
    if width == 0 {
        return Err(CoreError::InvalidParameter {
            name: "width",
            value: 0.0,
            reason: "doit être > 0",
        });
    }

    let aspect = f64::from(src_w) / f64::from(src_h);
    let raw = (f64::from(width) / aspect * CELL_ASPECT).round();
    let mut rows = raw.clamp(1.0, f64::from(u16::MAX)) as u16;
    if height > 0 {
        rows = rows.min(height);
    }
    Ok((width, rows))
}

/// Resizer réutilisable wrappant fast_image_resize (bilinéaire).
///
/// Garde ses buffers entre deux frames : une instance par worker.
///
/// # Example
/// ```
/// use va_ascii::resize::Resizer;
/// use va_core::frame::FrameBuffer;
/// let mut r = Resizer::new();
/// let out = r.resize(&FrameBuffer::filled(100, 50, 3, 128), 80, 20).unwrap();
/// assert_eq!((out.width, out.height, out.channels), (80, 20, 3));
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Copie de la source : fast_image_resize veut un `&mut` sur l'image source.
    src_buf: Vec<u8>,
}

impl Resizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            src_buf: Vec::new(),
        }
    }

    /// Resample `src` to `width × height`, keeping its channel count.
    ///
    /// Same-size input is copied through unchanged.
    ///
    /// # Errors
    /// [`CoreError::InvalidInput`] for channel counts other than 1 or 3, and
    /// [`CoreError::Resize`] when the resampler rejects the buffers.
    pub fn resize(&mut self, src: &FrameBuffer, width: u32, height: u32) -> Result<FrameBuffer, CoreError> {
        if src.width == width && src.height == height {
            return Ok(src.clone());
        }

        let pixel_type = match src.channels {
            1 => PixelType::U8,
            3 => PixelType::U8x3,
            c => {
                return Err(CoreError::InvalidInput(format!(
                    "{c} canaux non supportés par le resizer"
                )));
            }
        };

        let mut dst = FrameBuffer::new(width, height, src.channels);

        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image = Image::from_slice_u8(src.width, src.height, &mut self.src_buf, pixel_type)
            .map_err(|e| CoreError::Resize(format!("source invalide: {e}")))?;
        let mut dst_image = Image::from_slice_u8(width, height, &mut dst.data, pixel_type)
            .map_err(|e| CoreError::Resize(format!("destination invalide: {e}")))?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .map_err(|e| CoreError::Resize(e.to_string()))?;

        Ok(dst)
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}
