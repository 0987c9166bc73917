//! Écriture des grilles converties : texte, GIF animé, MP4.

pub mod font;
pub mod gif;
pub mod muxer;
pub mod rasterizer;
pub mod text;

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use va_core::error::CoreError;
use va_core::frame::AsciiGrid;

use crate::gif::GifWriter;
use crate::muxer::Mp4Muxer;
use crate::rasterizer::CellRasterizer;
use crate::text::TextWriter;

/// Format de sortie d'une conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Txt,
    Gif,
    Mp4,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Txt, Self::Gif, Self::Mp4];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnsupportedFormat {
                format: s.to_string(),
            })
    }
}

/// Destination d'une suite de grilles.
///
/// Implémenté par : `TextWriter`, `GifSink`, `Mp4Sink`.
pub trait GridSink {
    /// Append one grid.
    ///
    /// # Errors
    /// I/O or encoder failure.
    fn write_grid(&mut self, grid: &AsciiGrid) -> Result<()>;

    /// Flush and close the output.
    ///
    /// # Errors
    /// I/O or encoder failure.
    fn finish(self: Box<Self>) -> Result<()>;
}

impl GridSink for TextWriter<BufWriter<File>> {
    fn write_grid(&mut self, grid: &AsciiGrid) -> Result<()> {
        TextWriter::write_grid(self, grid)
    }

    fn finish(self: Box<Self>) -> Result<()> {
        TextWriter::finish(*self)?;
        Ok(())
    }
}

/// GIF animé : glyphes de la police en cellules 6×12 (blocs sans police),
/// puis encodage.
pub struct GifSink {
    rasterizer: CellRasterizer,
    writer: GifWriter<BufWriter<File>>,
}

impl GridSink for GifSink {
    fn write_grid(&mut self, grid: &AsciiGrid) -> Result<()> {
        self.writer.write_frame(&self.rasterizer.render(grid))
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let this = *self;
        if this.writer.frames() == 0 {
            log::warn!("Aucune frame convertie, GIF vide");
        }
        this.writer.finish()
    }
}

/// MP4 : rasterisation 8×16, encodeur lancé à la première grille (la taille
/// du canvas en dépend).
pub struct Mp4Sink {
    path: PathBuf,
    fps: f64,
    rasterizer: CellRasterizer,
    muxer: Option<Mp4Muxer>,
}

impl GridSink for Mp4Sink {
    fn write_grid(&mut self, grid: &AsciiGrid) -> Result<()> {
        let canvas = self.rasterizer.render(grid);
        let muxer = match self.muxer.as_mut() {
            Some(m) => m,
            None => self
                .muxer
                .insert(Mp4Muxer::new(&self.path, canvas.width, canvas.height, self.fps)?),
        };
        muxer.write_frame(&canvas)
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let this = *self;
        match this.muxer {
            Some(m) => m.finish(),
            None => {
                log::warn!("Aucune frame convertie, {} non créé", this.path.display());
                Ok(())
            }
        }
    }
}

/// Open the writer for `format` at `path`.
///
/// GIF output draws glyphs with the font at `font_path`, or with the first
/// monospace system font found, and falls back to block cells when none is
/// available. MP4 output always uses block cells.
///
/// # Errors
/// Output file creation failure, or an explicit `font_path` that cannot be loaded.
///
/// # Example
/// ```
/// use va_core::frame::AsciiGrid;
/// use va_export::{open_sink, OutputFormat};
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("out.txt");
/// let mut sink = open_sink(OutputFormat::Txt, &path, 10.0, None).unwrap();
/// sink.write_grid(&AsciiGrid::new(4, 2)).unwrap();
/// sink.finish().unwrap();
/// assert!(std::fs::read_to_string(&path).unwrap().starts_with("Frame 1:"));
/// ```
pub fn open_sink(
    format: OutputFormat,
    path: &Path,
    fps: f64,
    font_path: Option<&Path>,
) -> Result<Box<dyn GridSink>> {
    log::info!("Sortie {format}: {}", path.display());
    if font_path.is_some() && format != OutputFormat::Gif {
        log::warn!("--font ignoré pour la sortie {format}");
    }
    let sink: Box<dyn GridSink> = match format {
        OutputFormat::Txt => {
            let file = File::create(path).with_context(|| format!("Impossible de créer {}", path.display()))?;
            Box::new(TextWriter::new(BufWriter::new(file)))
        }
        OutputFormat::Gif => {
            let rasterizer = match font::find_font(font_path)? {
                Some(f) => CellRasterizer::for_gif().with_font(&f),
                None => CellRasterizer::for_gif(),
            };
            Box::new(GifSink {
                rasterizer,
                writer: GifWriter::create(path, fps)?,
            })
        }
        OutputFormat::Mp4 => Box::new(Mp4Sink {
            path: path.to_path_buf(),
            fps,
            rasterizer: CellRasterizer::for_mp4(),
            muxer: None,
        }),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse() {
        assert_eq!("gif".parse::<OutputFormat>().unwrap(), OutputFormat::Gif);
        assert_eq!("MP4".parse::<OutputFormat>().unwrap(), OutputFormat::Mp4);
        assert!(matches!(
            "avi".parse::<OutputFormat>(),
            Err(CoreError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn gif_sink_writes_rasterized_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gif");
        let mut sink = open_sink(OutputFormat::Gif, &path, 5.0, None).unwrap();
        let mut grid = AsciiGrid::new(3, 2);
        grid.set(1, 1, '#');
        sink.write_grid(&grid).unwrap();
        sink.finish().unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (18, 24));
    }

    #[test]
    fn unreadable_font_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gif");
        let font = dir.path().join("missing.ttf");
        assert!(open_sink(OutputFormat::Gif, &path, 5.0, Some(&font)).is_err());
    }

    #[test]
    fn empty_mp4_sink_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let sink = open_sink(OutputFormat::Mp4, &path, 10.0, None).unwrap();
        sink.finish().unwrap();
        assert!(!path.exists());
    }
}
