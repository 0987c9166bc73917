use ab_glyph::Font;
use rayon::prelude::*;
use va_core::frame::{AsciiGrid, FrameBuffer};

use crate::font::GlyphAtlas;

/// Taille de cellule des GIF (pixels).
pub const GIF_CELL: (u32, u32) = (6, 12);
/// Taille de cellule des MP4 (pixels).
pub const MP4_CELL: (u32, u32) = (8, 16);

/// Convertit une `AsciiGrid` en image RGB, blanc sur noir.
///
/// Avec un atlas, chaque caractère est dessiné avec sa police ; sans atlas
/// (ou pour un caractère absent de la police), un glyphe non-espace devient
/// un rectangle blanc plein.
///
/// # Example
/// ```
/// use va_core::frame::AsciiGrid;
/// use va_export::rasterizer::CellRasterizer;
/// let r = CellRasterizer::new(2, 3);
/// let mut grid = AsciiGrid::new(2, 1);
/// grid.set(1, 0, '#');
/// let fb = r.render(&grid);
/// assert_eq!((fb.width, fb.height, fb.channels), (4, 3, 3));
/// assert_eq!(fb.data[0], 0);
/// assert_eq!(fb.data[2 * 3], 255);
/// ```
#[derive(Clone, Debug)]
pub struct CellRasterizer {
    cell_width: u32,
    cell_height: u32,
    /// Arrondir le canvas à des dimensions paires (exigé par les codecs yuv420).
    pad_even: bool,
    atlas: Option<GlyphAtlas>,
}

impl CellRasterizer {
    #[must_use]
    pub fn new(cell_width: u32, cell_height: u32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
            pad_even: false,
            atlas: None,
        }
    }

    /// Same cell size, glyphs drawn with `font`.
    #[must_use]
    pub fn with_font<F: Font>(self, font: &F) -> Self {
        Self {
            atlas: Some(GlyphAtlas::new(font, self.cell_width, self.cell_height)),
            ..self
        }
    }

    /// Rasterizer for animated GIF output (6×12 cells), block cells.
    #[must_use]
    pub fn for_gif() -> Self {
        Self::new(GIF_CELL.0, GIF_CELL.1)
    }

    /// True when glyphs are drawn from a font rather than as blocks.
    #[must_use]
    pub fn has_font(&self) -> bool {
        self.atlas.is_some()
    }

    /// Rasterizer for MP4 output (8×16 cells, even canvas).
    #[must_use]
    pub fn for_mp4() -> Self {
        Self {
            pad_even: true,
            ..Self::new(MP4_CELL.0, MP4_CELL.1)
        }
    }

    /// Canvas size in pixels for a `grid_w × grid_h` grid.
    ///
    /// # Example
    /// ```
    /// use va_export::rasterizer::CellRasterizer;
    /// assert_eq!(CellRasterizer::for_gif().canvas_size(80, 20), (480, 240));
    /// assert_eq!(CellRasterizer::new(3, 5).canvas_size(3, 3), (9, 15));
    /// ```
    #[must_use]
    pub fn canvas_size(&self, grid_w: u16, grid_h: u16) -> (u32, u32) {
        let w = u32::from(grid_w) * self.cell_width;
        let h = u32::from(grid_h) * self.cell_height;
        if self.pad_even {
            (w + w % 2, h + h % 2)
        } else {
            (w, h)
        }
    }

    /// Render the grid on a black RGB canvas. Parallelized per grid row.
    #[must_use]
    pub fn render(&self, grid: &AsciiGrid) -> FrameBuffer {
        let (width, height) = self.canvas_size(grid.width, grid.height);
        let mut fb = FrameBuffer::new(width, height, 3);
        if grid.width == 0 || grid.height == 0 {
            return fb;
        }

        let stride = width as usize * 3;
        let band_size = stride * self.cell_height as usize;
        let cell_w = self.cell_width as usize;
        let cell_bytes = cell_w * 3;
        let atlas = self.atlas.as_ref();

        // Les bandes de padding éventuelles (au-delà de grid.height) restent noires.
        fb.data
            .par_chunks_mut(band_size)
            .zip(grid.cells.par_chunks(usize::from(grid.width)))
            .for_each(|(band, row)| {
                for (gx, &ch) in row.iter().enumerate() {
                    if ch == ' ' {
                        continue;
                    }
                    let x0 = gx * cell_bytes;
                    match atlas.and_then(|a| a.get(ch)) {
                        Some(coverage) => {
                            for (line, cov) in band.chunks_exact_mut(stride).zip(coverage.chunks_exact(cell_w)) {
                                for (px, &v) in line[x0..x0 + cell_bytes].chunks_exact_mut(3).zip(cov) {
                                    px.fill(v);
                                }
                            }
                        }
                        None => {
                            for line in band.chunks_exact_mut(stride) {
                                line[x0..x0 + cell_bytes].fill(255);
                            }
                        }
                    }
                }
            });

        fb
    }
}
