use va_core::charset::GlyphRamp;
use va_core::error::CoreError;
use va_core::frame::{AsciiGrid, FrameBuffer};

/// LUT intensité → glyphe, précalculée pour les 256 valeurs.
///
/// `index = i * (N - 1) / 255` (division entière). L'ordre de la rampe n'est
/// pas vérifié : une rampe inversée inverse le rendu.
///
/// # Example
/// ```
/// use va_ascii::quantize::GlyphQuantizer;
/// let q = GlyphQuantizer::new(" .:#@").unwrap();
/// assert_eq!(q.map(0), ' ');
/// assert_eq!(q.map(128), ':');
/// assert_eq!(q.map(255), '@');
/// ```
#[derive(Clone)]
pub struct GlyphQuantizer {
    lut: [char; 256],
}

impl GlyphQuantizer {
    /// Build a quantizer for an arbitrary ramp, lightest glyph first.
    ///
    /// # Errors
    /// [`CoreError::Config`] if the ramp has fewer than 2 glyphs.
    pub fn new(ramp: &str) -> Result<Self, CoreError> {
        let chars: Vec<char> = ramp.chars().collect();
        let len = chars.len();
        if len < 2 {
            return Err(CoreError::Config(format!(
                "rampe de glyphes trop courte ({len} caractère(s), minimum 2)"
            )));
        }
        let mut lut = [' '; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = chars[(i * (len - 1) / 255).min(len - 1)];
        }
        Ok(Self { lut })
    }

    /// Quantizer for one of the built-in ramps.
    ///
    /// # Errors
    /// Never fails for the built-in ramps; the signature mirrors [`GlyphQuantizer::new`].
    pub fn for_ramp(ramp: GlyphRamp) -> Result<Self, CoreError> {
        Self::new(ramp.as_ramp_str())
    }

    #[inline(always)]
    #[must_use]
    pub fn map(&self, intensity: u8) -> char {
        self.lut[intensity as usize]
    }

    /// Quantize a single-channel `cols × rows` plane into a grid.
    ///
    /// # Errors
    /// [`CoreError::InvalidInput`] if the plane is not mono or its size does
    /// not match the grid.
    pub fn quantize(&self, plane: &FrameBuffer) -> Result<AsciiGrid, CoreError> {
        if plane.channels != 1 {
            return Err(CoreError::InvalidInput(format!(
                "quantification sur {} canaux (attendu 1)",
                plane.channels
            )));
        }
        let (Ok(cols), Ok(rows)) = (u16::try_from(plane.width), u16::try_from(plane.height)) else {
            return Err(CoreError::InvalidDimensions {
                width: plane.width,
                height: plane.height,
            });
        };
        if plane.data.len() != usize::from(cols) * usize::from(rows) {
            return Err(CoreError::InvalidInput(format!(
                "plan de {} octets pour une grille {cols}×{rows}",
                plane.data.len()
            )));
        }

        let cells = plane.data.iter().map(|&v| self.map(v)).collect();
        Ok(AsciiGrid {
            cells,
            width: cols,
            height: rows,
        })
    }
}
