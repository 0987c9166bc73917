use std::io::Write;

use anyhow::{Context, Result};
use va_core::frame::AsciiGrid;

/// Largeur du séparateur entre deux frames.
pub const SEPARATOR_WIDTH: usize = 80;

/// Écrit les grilles successives dans un flux texte :
///
/// ```text
/// Frame 1:
/// <grille>
/// ================================================================================
///
/// ```
///
/// # Example
/// ```
/// use va_core::frame::AsciiGrid;
/// use va_export::text::TextWriter;
/// let mut w = TextWriter::new(Vec::new());
/// w.write_grid(&AsciiGrid::new(2, 1)).unwrap();
/// let out = String::from_utf8(w.finish().unwrap()).unwrap();
/// assert!(out.starts_with("Frame 1:\n  \n===="));
/// ```
pub struct TextWriter<W: Write> {
    out: W,
    frames: u64,
}

impl<W: Write> TextWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    /// Append one frame block, numbered from 1.
    ///
    /// # Errors
    /// I/O errors of the underlying writer.
    pub fn write_grid(&mut self, grid: &AsciiGrid) -> Result<()> {
        self.frames += 1;
        writeln!(self.out, "Frame {}:", self.frames)?;
        writeln!(self.out, "{grid}")?;
        writeln!(self.out, "{}\n", "=".repeat(SEPARATOR_WIDTH))
            .with_context(|| format!("écriture de la frame {}", self.frames))?;
        Ok(())
    }

    /// Number of frames written so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flush and hand back the writer.
    ///
    /// # Errors
    /// Flush errors of the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Bloc d'aperçu : la grille encadrée par deux lignes de `=`.
///
/// # Example
/// ```
/// use va_core::frame::AsciiGrid;
/// use va_export::text::preview_block;
/// let block = preview_block(&AsciiGrid::new(1, 1));
/// assert_eq!(block.lines().count(), 3);
/// ```
#[must_use]
pub fn preview_block(grid: &AsciiGrid) -> String {
    let rule = "=".repeat(SEPARATOR_WIDTH);
    format!("{rule}\n{grid}\n{rule}")
}
