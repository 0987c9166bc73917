use std::fmt;

use crate::error::CoreError;

/// Buffer de pixels d'une frame décodée.
///
/// Stocke les échantillons entrelacés row-major, `channels` bytes par pixel
/// (1 = niveaux de gris, 3 = RGB).
///
/// # Example
/// ```
/// use va_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10, 3);
/// assert_eq!(fb.data.len(), 300);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Samples, row-major, `channels` bytes per pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Samples per pixel: 1 or 3.
    pub channels: u8,
}

impl FrameBuffer {
    /// Crée un buffer noir aux dimensions données.
    #[must_use]
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * usize::from(channels)],
            width,
            height,
            channels,
        }
    }

    /// Crée un buffer uniforme (toutes les valeurs à `value`).
    ///
    /// # Example
    /// ```
    /// use va_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::filled(4, 2, 1, 128);
    /// assert!(fb.data.iter().all(|&v| v == 128));
    /// ```
    #[must_use]
    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Self {
        Self {
            data: vec![value; width as usize * height as usize * usize::from(channels)],
            width,
            height,
            channels,
        }
    }

    /// Wrap raw decoded samples, checking that the layout is consistent.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] for a zero-area frame and
    /// [`CoreError::InvalidInput`] for a bad channel count or buffer length.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, CoreError> {
        let frame = Self {
            data,
            width,
            height,
            channels,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check that the frame can be processed.
    ///
    /// # Errors
    /// Same conditions as [`FrameBuffer::from_raw`].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(CoreError::InvalidInput(format!(
                "{} canaux (attendu 1 ou 3)",
                self.channels
            )));
        }
        let expected = self.pixel_count() * usize::from(self.channels);
        if self.data.len() != expected {
            return Err(CoreError::InvalidInput(format!(
                "{} octets pour {}×{}×{} (attendu {expected})",
                self.data.len(),
                self.width,
                self.height,
                self.channels
            )));
        }
        Ok(())
    }

    /// Number of pixels (`width * height`).
    #[inline(always)]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Intensité d'un pixel (BT.601) ou échantillon brut si mono-canal.
    #[inline(always)]
    #[must_use]
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * usize::from(self.channels);
        if self.channels == 1 {
            self.data[idx]
        } else {
            bt601(self.data[idx], self.data[idx + 1], self.data[idx + 2])
        }
    }

    /// Single-channel intensity plane of this frame.
    ///
    /// RGB frames use the BT.601 weights `0.299 R + 0.587 G + 0.114 B`;
    /// mono frames are returned as a copy.
    ///
    /// # Example
    /// ```
    /// use va_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::filled(2, 2, 3, 200);
    /// let gray = fb.to_gray();
    /// assert_eq!(gray.channels, 1);
    /// assert_eq!(gray.data, vec![200; 4]);
    /// ```
    #[must_use]
    pub fn to_gray(&self) -> FrameBuffer {
        let data = if self.channels == 1 {
            self.data.clone()
        } else {
            self.data
                .chunks_exact(usize::from(self.channels))
                .map(|px| bt601(px[0], px[1], px[2]))
                .collect()
        };
        FrameBuffer {
            data,
            width: self.width,
            height: self.height,
            channels: 1,
        }
    }

    /// Replicate a single-channel plane into `channels` interleaved channels.
    #[must_use]
    pub fn expand_to(&self, channels: u8) -> FrameBuffer {
        if channels == self.channels || self.channels != 1 {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.data.len() * usize::from(channels));
        for &v in &self.data {
            data.extend(std::iter::repeat_n(v, usize::from(channels)));
        }
        FrameBuffer {
            data,
            width: self.width,
            height: self.height,
            channels,
        }
    }
}

/// Fixed-point BT.601 (coefficients × 2^14, sum = 16384).
#[inline(always)]
fn bt601(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868 + 8192) >> 14) as u8
}

/// Grille de sortie ASCII : une frame rendue, `height` lignes de `width` glyphes.
///
/// # Example
/// ```
/// use va_core::frame::AsciiGrid;
/// let mut grid = AsciiGrid::new(3, 2);
/// grid.set(0, 0, '@');
/// assert_eq!(grid.get(0, 0), '@');
/// assert_eq!(grid.to_string(), "@  \n   ");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsciiGrid {
    /// Flat array of glyphs, row-major.
    pub cells: Vec<char>,
    /// Width in characters.
    pub width: u16,
    /// Height in characters.
    pub height: u16,
}

impl AsciiGrid {
    /// Crée une grille remplie d'espaces.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            cells: vec![' '; usize::from(width) * usize::from(height)],
            width,
            height,
        }
    }

    /// Set the glyph at column `x`, row `y`.
    #[inline(always)]
    pub fn set(&mut self, x: u16, y: u16, ch: char) {
        self.cells[usize::from(y) * usize::from(self.width) + usize::from(x)] = ch;
    }

    /// Glyph at column `x`, row `y`.
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> char {
        self.cells[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[char]> {
        self.cells.chunks(usize::from(self.width).max(1))
    }

    /// Rows rendered as owned strings.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.rows().map(|row| row.iter().collect()).collect()
    }
}

impl fmt::Display for AsciiGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            for &ch in row {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}
