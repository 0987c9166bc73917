// Décodage vidéo via ffmpeg en sous-processus.
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
//   - `probe_video`      : interroge ffprobe (dimensions, fps, nombre de frames)
//   - `spawn_ffmpeg_pipe`: lance ffmpeg → flux raw RGB24 sur stdout
//   - `VideoSource`      : thread de décodage + canal borné + échantillonnage
//
// Une fin anormale de ffmpeg (code de sortie, frame tronquée, erreur de
// lecture) arrive au consommateur comme dernier message du canal.

use anyhow::{anyhow, bail, Context, Result};
use flume::{Receiver, Sender};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use va_core::error::CoreError;
use va_core::frame::FrameBuffer;
use va_core::traits::Source;

/// Capacité du canal décodeur → pipeline. Bloque le décodeur au-delà.
const CHANNEL_CAPACITY: usize = 8;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0).
    pub fps: f64,
    /// Nombre de frames annoncé par le conteneur, si disponible.
    pub frame_count: Option<u64>,
}

/// Parse the `key=value` lines printed by ffprobe.
///
/// A quarter-turn display rotation (`rotation=` side data or the legacy
/// `TAG:rotate=` tag) swaps width and height: ffmpeg auto-rotates on decode,
/// so the reported size is the displayed one.
///
/// # Errors
/// Returns an error when no usable width/height is present.
///
/// # Example
/// ```
/// use va_source::video::parse_probe_output;
/// let info = parse_probe_output("width=640\nheight=360\nr_frame_rate=30000/1001\nnb_frames=300\n").unwrap();
/// assert_eq!((info.width, info.height), (640, 360));
/// assert!((info.fps - 29.97).abs() < 0.01);
/// assert_eq!(info.frame_count, Some(300));
/// ```
pub fn parse_probe_output(text: &str) -> Result<VideoInfo> {
    let mut width: u32 = 0;
    let mut height: u32 = 0;
    let mut fps: f64 = 0.0;
    let mut frame_count = None;
    let mut quarter_turn = false;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            if den > 0.0 {
                fps = num / den;
            }
        } else if let Some(val) = line.strip_prefix("nb_frames=") {
            // "N/A" pour certains conteneurs
            frame_count = val.trim().parse().ok();
        } else if let Some(val) = line
            .strip_prefix("rotation=")
            .or_else(|| line.strip_prefix("TAG:rotate="))
        {
            if let Ok(deg) = val.trim().parse::<f64>() {
                quarter_turn = matches!((deg.round() as i64).rem_euclid(360), 90 | 270);
            }
        }
    }

    if quarter_turn {
        log::debug!("rotation d'un quart de tour : {width}x{height} → {height}x{width}");
        std::mem::swap(&mut width, &mut height);
    }

    if width == 0 || height == 0 {
        bail!("aucun flux vidéo décodable (width={width}, height={height})");
    }
    if !fps.is_finite() || fps <= 0.0 {
        log::warn!("fps inconnu, 30 supposé");
        fps = 30.0;
    }

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Retourne une erreur si le fichier n'existe pas, si `ffprobe` est introuvable
/// ou si le fichier ne contient aucun flux vidéo décodable.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames:stream_tags=rotate:stream_side_data=rotation",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("ffprobe sur {}", path.display()))?;

    log::info!(
        "probe_video: {}x{} @ {:.3}fps, {} frames ({})",
        info.width,
        info.height,
        info.fps,
        info.frame_count
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
        path.display()
    );

    Ok(info)
}

/// Arguments ffmpeg du décodeur : RGB24 brut sur stdout à `width × height`.
///
/// Le filtre `scale` force la taille de sortie, pour que chaque frame fasse
/// exactement `width × height × 3` bytes quelle que soit la rotation appliquée.
///
/// # Example
/// ```
/// use va_source::video::decoder_args;
/// let args = decoder_args("clip.mp4", 1080, 1920);
/// let vf = args.iter().position(|a| a == "-vf").unwrap();
/// assert_eq!(args[vf + 1], "scale=1080:1920:flags=bilinear");
/// ```
#[must_use]
pub fn decoder_args(path_str: &str, width: u32, height: u32) -> Vec<String> {
    let scale = format!("scale={width}:{height}:flags=bilinear");
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-i",
        path_str,
        "-vf",
        scale.as_str(),
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-an",
        "pipe:1",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Lance un processus `ffmpeg` qui écrit des frames RGB24 brutes sur stdout.
///
/// Chaque frame = `width × height × 3` bytes, row-major, sans padding.
/// stderr est capturé pour les messages d'erreur.
///
/// # Errors
/// Retourne une erreur si le chemin n'est pas UTF-8 ou si ffmpeg ne démarre pas.
pub fn spawn_ffmpeg_pipe(path: &Path, width: u32, height: u32) -> Result<Child> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let child = Command::new("ffmpeg")
        .args(decoder_args(path_str, width, height))
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("Impossible de lancer ffmpeg. Vérifiez que ffmpeg est installé et dans le PATH.")?;

    log::debug!("ffmpeg spawné pour {} ({width}x{height})", path.display());
    Ok(child)
}

/// Lit jusqu'à `buf.len()` bytes depuis `reader`.
///
/// Retourne le nombre de bytes lus : `buf.len()` pour une frame complète,
/// moins si EOF arrive avant (0 = EOF propre entre deux frames).
///
/// # Errors
/// Erreur I/O fatale.
///
/// # Example
/// ```
/// use va_source::video::read_exact_or_eof;
/// let mut src: &[u8] = &[1, 2, 3];
/// let mut buf = [0u8; 2];
/// assert_eq!(read_exact_or_eof(&mut src, &mut buf).unwrap(), 2);
/// assert_eq!(read_exact_or_eof(&mut src, &mut buf).unwrap(), 1);
/// assert_eq!(read_exact_or_eof(&mut src, &mut buf).unwrap(), 0);
/// ```
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break, // EOF
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}

/// Sélection des frames à conserver pour approcher un fps cible.
///
/// `skip = max(1, floor(source_fps / target_fps))`; la frame `n` (depuis 0)
/// est conservée si `n % skip == 0`.
///
/// # Example
/// ```
/// use va_source::video::FrameSampler;
/// let mut s = FrameSampler::new(30.0, 10.0);
/// assert_eq!(s.skip(), 3);
/// let kept: Vec<bool> = (0..6).map(|_| s.keep()).collect();
/// assert_eq!(kept, [true, false, false, true, false, false]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FrameSampler {
    skip: u64,
    index: u64,
}

impl FrameSampler {
    #[must_use]
    pub fn new(source_fps: f64, target_fps: f64) -> Self {
        let ratio = source_fps / target_fps;
        let skip = if ratio.is_finite() && ratio >= 1.0 {
            ratio.floor() as u64
        } else {
            1
        };
        Self { skip, index: 0 }
    }

    #[must_use]
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Advance by one decoded frame; true if it should be converted.
    pub fn keep(&mut self) -> bool {
        let keep = self.index.is_multiple_of(self.skip);
        self.index += 1;
        keep
    }

    /// Number of frames kept out of `total` decoded frames (`total / skip`).
    #[must_use]
    pub fn estimated_output(&self, total: u64) -> u64 {
        total / self.skip
    }
}

/// Source vidéo : ffmpeg décode sur un thread dédié, les frames retenues
/// arrivent par un canal borné.
///
/// Lâcher la source ferme le canal ; le thread tue ffmpeg à son prochain envoi.
pub struct VideoSource {
    rx: Receiver<Result<FrameBuffer>>,
    info: VideoInfo,
    estimated: Option<u64>,
    error: Option<anyhow::Error>,
    _handle: thread::JoinHandle<()>,
}

impl VideoSource {
    /// Probe `path` and start decoding, keeping frames for `target_fps`.
    ///
    /// # Errors
    /// Missing file, ffprobe/ffmpeg failure or thread spawn failure.
    ///
    /// # Example
    /// ```no_run
    /// use va_source::video::VideoSource;
    /// use va_core::traits::Source;
    /// let mut src = VideoSource::open("clip.mp4".into(), 10.0).unwrap();
    /// while let Some(frame) = src.next_frame() {
    ///     println!("{}x{}", frame.width, frame.height);
    /// }
    /// if let Some(e) = src.take_error() {
    ///     eprintln!("{e:#}");
    /// }
    /// ```
    pub fn open(path: PathBuf, target_fps: f64) -> Result<Self> {
        let info = probe_video(&path)?;
        let sampler = FrameSampler::new(info.fps, target_fps);
        log::info!(
            "Échantillonnage: 1 frame sur {} ({:.2} → {target_fps} fps)",
            sampler.skip(),
            info.fps
        );

        let child = spawn_ffmpeg_pipe(&path, info.width, info.height)?;
        Self::from_child(child, info, sampler)
    }

    /// Read frames of `info`'s size from an already spawned decoder.
    fn from_child(child: Child, info: VideoInfo, sampler: FrameSampler) -> Result<Self> {
        let estimated = info.frame_count.map(|n| sampler.estimated_output(n));
        let (tx, rx) = flume::bounded(CHANNEL_CAPACITY);

        let handle = thread::Builder::new()
            .name("va-video".to_string())
            .spawn(move || decode_loop(child, &tx, info, sampler))
            .context("Impossible de spawner le thread vidéo")?;

        Ok(Self {
            rx,
            info,
            estimated,
            error: None,
            _handle: handle,
        })
    }
}

impl Source for VideoSource {
    fn next_frame(&mut self) -> Option<FrameBuffer> {
        match self.rx.recv() {
            Ok(Ok(frame)) => Some(frame),
            Ok(Err(e)) => {
                self.error = Some(e);
                None
            }
            Err(_) => None,
        }
    }

    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn estimated_frames(&self) -> Option<u64> {
        self.estimated
    }

    fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }
}

/// Boucle du thread de décodage : lit, échantillonne, envoie.
fn decode_loop(
    mut child: Child,
    tx: &Sender<Result<FrameBuffer>>,
    info: VideoInfo,
    mut sampler: FrameSampler,
) {
    // stderr vidé à part : ffmpeg ne doit jamais bloquer dessus.
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = pipe.read_to_string(&mut text);
            text
        })
    });

    let Some(mut stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        let _ = tx.send(Err(anyhow!("stdout ffmpeg indisponible")));
        return;
    };

    let frame_bytes = info.width as usize * info.height as usize * 3;
    let mut buf = vec![0u8; frame_bytes];
    let mut decoded: u64 = 0;
    let mut sent: u64 = 0;

    let failure = loop {
        match read_exact_or_eof(&mut stdout, &mut buf) {
            Ok(0) => break None,
            Ok(n) if n < frame_bytes => {
                break Some(anyhow!(
                    "frame {} tronquée : {n} bytes sur {frame_bytes}",
                    decoded + 1
                ));
            }
            Ok(_) => {
                decoded += 1;
                if !sampler.keep() {
                    continue;
                }
                let frame = FrameBuffer {
                    data: buf.clone(),
                    width: info.width,
                    height: info.height,
                    channels: 3,
                };
                if tx.send(Ok(frame)).is_err() {
                    log::debug!("Thread vidéo: récepteur fermé, arrêt.");
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
                sent += 1;
            }
            Err(e) => {
                let _ = child.kill();
                break Some(e.context("lecture du pipe ffmpeg"));
            }
        }
    };
    drop(stdout);

    let mut problems: Vec<String> = failure.iter().map(|e| format!("{e:#}")).collect();
    match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => problems.push(format!("ffmpeg a échoué ({status})")),
        Err(e) => problems.push(format!("attente de ffmpeg : {e}")),
    }

    if problems.is_empty() {
        log::info!("Thread vidéo: EOF après {decoded} frames ({sent} retenues).");
        return;
    }

    let stderr_text = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
    let mut message = format!("Décodage interrompu après {decoded} frames : {}", problems.join(" ; "));
    let detail = stderr_text.trim();
    if !detail.is_empty() {
        message.push_str("\n");
        message.push_str(detail);
    }
    log::warn!("Thread vidéo: {message}");
    let _ = tx.send(Err(anyhow!(message)));
}
