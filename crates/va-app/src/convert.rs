use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use va_ascii::pipeline::{process_batch, FramePipeline};
use va_core::frame::FrameBuffer;
use va_core::traits::Source;
use va_export::text::preview_block;
use va_export::GridSink;

/// Intervalle (en frames) entre deux messages de progression.
const PROGRESS_EVERY: u64 = 10;

/// Bilan d'une conversion.
#[derive(Clone, Copy, Debug)]
pub struct ConvertStats {
    pub frames: u64,
    pub elapsed: Duration,
}

/// Taille des lots envoyés à rayon : deux frames par worker.
fn chunk_size() -> usize {
    (rayon::current_num_threads() * 2).max(1)
}

/// Convert the first frame of `source` and frame it for display.
///
/// # Errors
/// Returns an error if the source yields no frame or the frame is rejected.
pub fn preview(source: &mut dyn Source, pipeline: &mut FramePipeline) -> Result<String> {
    let Some(frame) = source.next_frame() else {
        let err = source
            .take_error()
            .unwrap_or_else(|| anyhow::anyhow!("fin de flux"));
        return Err(err.context("La source n'a produit aucune frame"));
    };
    let grid = pipeline.process(&frame).context("Conversion de la première frame")?;
    Ok(preview_block(&grid))
}

/// Pull every frame from `source`, convert them in parallel by chunks and
/// write the grids to `sink` in source order.
///
/// Stops at the first frame the pipeline rejects.
///
/// # Errors
/// Pipeline errors (with the frame number), sink errors, and a source that
/// ended on an error instead of a clean end of stream.
pub fn run_conversion(
    source: &mut dyn Source,
    pipeline: &FramePipeline,
    sink: &mut dyn GridSink,
) -> Result<ConvertStats> {
    let start = Instant::now();
    let estimated = source.estimated_frames();
    match estimated {
        Some(n) => log::info!("Frames à traiter : {n}"),
        None => log::info!("Frames à traiter : inconnu"),
    }

    let chunk = chunk_size();
    let mut batch: Vec<FrameBuffer> = Vec::with_capacity(chunk);
    let mut written: u64 = 0;

    loop {
        batch.clear();
        while batch.len() < chunk {
            match source.next_frame() {
                Some(frame) => batch.push(frame),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        let exhausted = batch.len() < chunk;

        for result in process_batch(pipeline, &batch) {
            let grid = result.with_context(|| format!("Frame {}", written + 1))?;
            sink.write_grid(&grid)?;
            written += 1;
            if written.is_multiple_of(PROGRESS_EVERY) {
                log_progress(written, estimated);
            }
        }

        if exhausted {
            break;
        }
    }

    if let Some(err) = source.take_error() {
        return Err(err.context(format!("Source interrompue après {written} frames")));
    }

    let stats = ConvertStats {
        frames: written,
        elapsed: start.elapsed(),
    };
    log::info!(
        "{} frames converties en {:.2}s",
        stats.frames,
        stats.elapsed.as_secs_f64()
    );
    Ok(stats)
}

fn log_progress(done: u64, estimated: Option<u64>) {
    match estimated {
        Some(total) if total > 0 => {
            log::info!("Progression : {:.1}%", done as f64 / total as f64 * 100.0);
        }
        _ => log::info!("Progression : {done} frames"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_core::config::ParameterSet;
    use va_core::frame::AsciiGrid;

    struct Frames {
        frames: std::vec::IntoIter<FrameBuffer>,
        count: u64,
        failure: Option<&'static str>,
    }

    impl Frames {
        fn new(frames: Vec<FrameBuffer>) -> Self {
            let count = frames.len() as u64;
            Self {
                frames: frames.into_iter(),
                count,
                failure: None,
            }
        }

        /// Ends with `message` as a decode error after the frames.
        fn failing(frames: Vec<FrameBuffer>, message: &'static str) -> Self {
            Self {
                failure: Some(message),
                ..Self::new(frames)
            }
        }
    }

    impl Source for Frames {
        fn next_frame(&mut self) -> Option<FrameBuffer> {
            self.frames.next()
        }
        fn native_size(&self) -> (u32, u32) {
            (0, 0)
        }
        fn estimated_frames(&self) -> Option<u64> {
            Some(self.count)
        }
        fn take_error(&mut self) -> Option<anyhow::Error> {
            self.failure.take().map(|m| anyhow::anyhow!(m))
        }
    }

    #[derive(Default)]
    struct Collect(Vec<AsciiGrid>);

    impl GridSink for Collect {
        fn write_grid(&mut self, grid: &AsciiGrid) -> Result<()> {
            self.0.push(grid.clone());
            Ok(())
        }
        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn pipeline() -> FramePipeline {
        FramePipeline::new(ParameterSet {
            width: 8,
            height: 0,
            ..ParameterSet::default()
        })
        .unwrap()
    }

    #[test]
    fn frames_come_out_in_source_order() {
        let n = chunk_size() * 3 + 1;
        let frames: Vec<FrameBuffer> = (0..n)
            .map(|i| FrameBuffer::filled(16, 8, 3, (i * 37 % 256) as u8))
            .collect();
        let mut expected_pipeline = pipeline();
        let expected: Vec<AsciiGrid> = frames
            .iter()
            .map(|f| expected_pipeline.process(f).unwrap())
            .collect();

        let mut sink = Collect::default();
        let stats = run_conversion(&mut Frames::new(frames), &pipeline(), &mut sink).unwrap();
        assert_eq!(stats.frames, n as u64);
        assert_eq!(sink.0, expected);
    }

    #[test]
    fn empty_source_writes_nothing() {
        let mut sink = Collect::default();
        let stats = run_conversion(&mut Frames::new(Vec::new()), &pipeline(), &mut sink).unwrap();
        assert_eq!(stats.frames, 0);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn bad_frame_stops_the_run() {
        let frames = vec![
            FrameBuffer::filled(16, 8, 3, 10),
            FrameBuffer::new(16, 8, 2),
            FrameBuffer::filled(16, 8, 3, 10),
        ];
        let mut sink = Collect::default();
        let err = run_conversion(&mut Frames::new(frames), &pipeline(), &mut sink).unwrap_err();
        assert!(format!("{err:#}").contains("Frame 2"));
        assert_eq!(sink.0.len(), 1);
    }

    #[test]
    fn source_failure_fails_the_run() {
        let frames = vec![FrameBuffer::filled(16, 8, 3, 10); 3];
        let mut src = Frames::failing(frames, "ffmpeg a échoué (exit status: 3)");
        let mut sink = Collect::default();
        let err = run_conversion(&mut src, &pipeline(), &mut sink).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("après 3 frames"), "{msg}");
        assert!(msg.contains("exit status: 3"), "{msg}");
        assert_eq!(sink.0.len(), 3);
    }

    #[test]
    fn preview_reports_source_failure() {
        let mut src = Frames::failing(Vec::new(), "moov atom not found");
        let err = preview(&mut src, &mut pipeline()).unwrap_err();
        assert!(format!("{err:#}").contains("moov atom not found"));
    }

    #[test]
    fn preview_frames_first_grid() {
        let mut src = Frames::new(vec![FrameBuffer::filled(16, 8, 3, 0)]);
        let block = preview(&mut src, &mut pipeline()).unwrap();
        let lines: Vec<&str> = block.lines().collect();
        // rule, 2 rows of 8 cols (8 / 2 * 0.5 = 2), rule
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "        ");
    }

    #[test]
    fn preview_of_empty_source_fails() {
        let mut src = Frames::new(Vec::new());
        assert!(preview(&mut src, &mut pipeline()).is_err());
    }
}
