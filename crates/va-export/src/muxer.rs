use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use va_core::frame::FrameBuffer;

/// Encode des frames RGB24 brutes dans un fichier MP4 via ffmpeg (stdin).
pub struct Mp4Muxer {
    ffmpeg_child: Child,
    width: u32,
    height: u32,
    frames: u64,
}

/// Arguments ffmpeg pour un flux `rgb24` de `width × height` à `fps`.
fn ffmpeg_args(output: &str, width: u32, height: u32, fps: f64) -> Vec<String> {
    let size = format!("{width}x{height}");
    let rate = format!("{fps}");
    [
        "-y",
        "-f",
        "rawvideo",
        "-vcodec",
        "rawvideo",
        "-s",
        size.as_str(),
        "-pix_fmt",
        "rgb24",
        "-r",
        rate.as_str(),
        "-i",
        "-",
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-hide_banner",
        "-loglevel",
        "error",
        output,
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

impl Mp4Muxer {
    /// Lance l'encodeur. `width` et `height` doivent être pairs (yuv420p).
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg n'est pas installé ou impossible à démarrer,
    /// ou si les dimensions sont impaires.
    pub fn new(output_path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        if width == 0 || height == 0 || !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            bail!("dimensions MP4 invalides: {width}x{height} (paires et non nulles requises)");
        }
        let path_str = output_path.to_str().context("Chemin invalide (non-UTF8)")?;

        let child = Command::new("ffmpeg")
            .args(ffmpeg_args(path_str, width, height, fps))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Échec de l'initialisation de l'encodeur vidéo ffmpeg. (Est-il dans PATH ?)")?;

        log::debug!("ffmpeg encodeur: {width}x{height} @ {fps} fps → {}", output_path.display());
        Ok(Self {
            ffmpeg_child: child,
            width,
            height,
            frames: 0,
        })
    }

    /// Ajoute une frame au flux.
    ///
    /// # Errors
    /// Retourne une erreur si la frame n'a pas la taille du flux ou si
    /// l'écriture dans le pipe échoue.
    pub fn write_frame(&mut self, fb: &FrameBuffer) -> Result<()> {
        if fb.width != self.width || fb.height != self.height || fb.channels != 3 {
            bail!(
                "frame {}x{}x{} pour un flux {}x{} RGB",
                fb.width,
                fb.height,
                fb.channels,
                self.width,
                self.height
            );
        }
        let stdin = self
            .ffmpeg_child
            .stdin
            .as_mut()
            .context("stdin ffmpeg déjà fermé")?;
        stdin
            .write_all(&fb.data)
            .with_context(|| format!("écriture de la frame {} vers ffmpeg", self.frames + 1))?;
        self.frames += 1;
        Ok(())
    }

    /// Ferme le flux et finalise l'exportation.
    ///
    /// # Errors
    /// Retourne une erreur si ffmpeg signale une erreur de terminaison.
    pub fn finish(mut self) -> Result<()> {
        drop(self.ffmpeg_child.stdin.take());

        let output = self.ffmpeg_child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg encoder error: {stderr}");
        }
        log::debug!("MP4: {} frames encodées", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_dimensions_are_rejected_before_spawn() {
        assert!(Mp4Muxer::new(Path::new("unused.mp4"), 81, 64, 10.0).is_err());
        assert!(Mp4Muxer::new(Path::new("unused.mp4"), 0, 64, 10.0).is_err());
    }

    #[test]
    fn args_describe_raw_rgb_input() {
        let args = ffmpeg_args("out.mp4", 640, 320, 12.5);
        let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
        assert_eq!(args[pos("-s") + 1], "640x320");
        assert_eq!(args[pos("-r") + 1], "12.5");
        assert_eq!(args[pos("-pix_fmt") + 1], "rgb24");
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn muxer_new_does_not_panic() {
        // Succeeds or fails depending on ffmpeg availability; neither panics.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_output.mp4");
        if let Ok(mut muxer) = Mp4Muxer::new(&path, 64, 64, 10.0) {
            assert!(muxer.write_frame(&FrameBuffer::new(32, 32, 3)).is_err());
            let _ = muxer.finish();
        }
    }
}
