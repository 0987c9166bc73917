use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use va_core::frame::FrameBuffer;

/// Vitesse de quantification NeuQuant (1 = lent/précis, 30 = rapide).
const GIF_SPEED: i32 = 10;

/// Délai par frame en millisecondes : `floor(1000 / fps)`.
///
/// # Example
/// ```
/// use va_export::gif::frame_delay_ms;
/// assert_eq!(frame_delay_ms(10.0), 100);
/// assert_eq!(frame_delay_ms(30.0), 33);
/// ```
#[must_use]
pub fn frame_delay_ms(fps: f64) -> u32 {
    if fps.is_finite() && fps > 0.0 {
        (1000.0 / fps).floor() as u32
    } else {
        0
    }
}

/// Conserve la première erreur d'E/S vue par l'encodeur.
///
/// L'encodeur n'écrit le trailer qu'au drop et ignore alors les erreurs ;
/// le flush final est fait ici, au drop, et son échec est aussi conservé.
struct ErrorLatch<W: Write> {
    inner: W,
    slot: Rc<Cell<Option<io::Error>>>,
}

impl<W: Write> ErrorLatch<W> {
    fn record(&self, e: &io::Error) {
        let first = self.slot.take();
        self.slot
            .set(Some(first.unwrap_or_else(|| io::Error::new(e.kind(), e.to_string()))));
    }
}

impl<W: Write> Write for ErrorLatch<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).inspect_err(|e| self.record(e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().inspect_err(|e| self.record(e))
    }
}

impl<W: Write> Drop for ErrorLatch<W> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.flush() {
            self.record(&e);
        }
    }
}

/// GIF animé en boucle infinie, une image par frame rasterisée.
pub struct GifWriter<W: Write> {
    encoder: GifEncoder<ErrorLatch<W>>,
    io_error: Rc<Cell<Option<io::Error>>>,
    delay: Delay,
    frames: u64,
}

impl GifWriter<BufWriter<File>> {
    /// Create `path` and prepare an infinitely looping GIF.
    ///
    /// # Errors
    /// File creation or GIF header errors.
    pub fn create(path: &Path, fps: f64) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Impossible de créer {}", path.display()))?;
        Self::new(BufWriter::new(file), fps)
    }
}

impl<W: Write> GifWriter<W> {
    /// # Errors
    /// GIF header errors.
    pub fn new(out: W, fps: f64) -> Result<Self> {
        let io_error = Rc::new(Cell::new(None));
        let latch = ErrorLatch {
            inner: out,
            slot: Rc::clone(&io_error),
        };
        let mut encoder = GifEncoder::new_with_speed(latch, GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .context("GIF: impossible de définir la boucle")?;
        Ok(Self {
            encoder,
            io_error,
            delay: Delay::from_numer_denom_ms(frame_delay_ms(fps), 1),
            frames: 0,
        })
    }

    /// Append one RGB canvas.
    ///
    /// # Errors
    /// Returns an error for non-RGB canvases or encoder failures.
    pub fn write_frame(&mut self, fb: &FrameBuffer) -> Result<()> {
        if fb.channels != 3 {
            anyhow::bail!("GIF: canvas à {} canaux (attendu 3)", fb.channels);
        }
        let rgba: Vec<u8> = fb
            .data
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect();
        let img = RgbaImage::from_raw(fb.width, fb.height, rgba)
            .context("GIF: dimensions du canvas incohérentes")?;
        self.encoder
            .encode_frame(Frame::from_parts(img, 0, 0, self.delay))
            .with_context(|| format!("GIF: encodage de la frame {}", self.frames + 1))?;
        self.frames += 1;
        Ok(())
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Write the trailer and flush.
    ///
    /// # Errors
    /// Any I/O error hit while writing, including the trailer and the final flush.
    pub fn finish(self) -> Result<()> {
        let Self {
            encoder,
            io_error,
            frames,
            ..
        } = self;
        // Le trailer est écrit au drop de l'encodeur, le flush au drop du latch.
        drop(encoder);
        if let Some(e) = io_error.take() {
            return Err(e).context("GIF: écriture incomplète");
        }
        log::debug!("GIF: {frames} frames écrites");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_handles_odd_rates() {
        assert_eq!(frame_delay_ms(24.0), 41);
        assert_eq!(frame_delay_ms(0.0), 0);
        assert_eq!(frame_delay_ms(f64::NAN), 0);
    }

    #[test]
    fn writes_a_decodable_animation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gif");
        {
            let mut w = GifWriter::create(&path, 10.0).unwrap();
            w.write_frame(&FrameBuffer::filled(6, 12, 3, 0)).unwrap();
            w.write_frame(&FrameBuffer::filled(6, 12, 3, 255)).unwrap();
            assert_eq!(w.frames(), 2);
            w.finish().unwrap();
        }

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (6, 12));
    }

    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disque plein"))
        }
    }

    struct WriteFails;

    impl Write for WriteFails {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "disque plein"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_final_flush_is_reported() {
        let mut w = GifWriter::new(FlushFails(Vec::new()), 10.0).unwrap();
        w.write_frame(&FrameBuffer::filled(6, 12, 3, 255)).unwrap();
        let err = w.finish().unwrap_err();
        assert!(format!("{err:#}").contains("disque plein"));
    }

    #[test]
    fn failed_write_is_reported() {
        let mut w = GifWriter::new(WriteFails, 10.0).unwrap();
        assert!(w.write_frame(&FrameBuffer::filled(6, 12, 3, 255)).is_err());
        assert!(w.finish().is_err());
    }

    #[test]
    fn rejects_mono_canvas() {
        let mut w = GifWriter::new(Vec::new(), 10.0).unwrap();
        assert!(w.write_frame(&FrameBuffer::new(2, 2, 1)).is_err());
    }
}
