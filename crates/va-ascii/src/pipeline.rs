use rayon::prelude::*;
use va_core::config::{ColorMode, ParameterSet};
use va_core::error::CoreError;
use va_core::frame::{AsciiGrid, FrameBuffer};

use crate::depth::{depth_map, fuse};
use crate::filter::SpatialFilter;
use crate::quantize::GlyphQuantizer;
use crate::resize::{grid_dimensions, Resizer};
use crate::tone::ToneLut;

/// Pipeline frame → grille : tonalité → filtres → redimensionnement
/// (+ profondeur) → quantification.
///
/// Les paramètres sont figés à la construction. Chaque instance garde son
/// propre resizer ; pour traiter en parallèle, cloner une instance par worker.
///
/// # Example
/// ```
/// use va_ascii::pipeline::FramePipeline;
/// use va_core::config::ParameterSet;
/// use va_core::frame::FrameBuffer;
///
/// let params = ParameterSet { height: 0, ..ParameterSet::default() };
/// let mut pipeline = FramePipeline::new(params).unwrap();
/// let grid = pipeline.process(&FrameBuffer::filled(100, 50, 3, 255)).unwrap();
/// assert_eq!((grid.width, grid.height), (80, 20));
/// assert!(grid.cells.iter().all(|&c| c == '$'));
/// ```
pub struct FramePipeline {
    params: ParameterSet,
    tone: ToneLut,
    filter: SpatialFilter,
    quantizer: GlyphQuantizer,
    resizer: Resizer,
}

impl FramePipeline {
    /// Validate `params` and precompute the lookup tables.
    ///
    /// # Errors
    /// [`CoreError::InvalidParameter`] for values `ParameterSet::validate` rejects.
    pub fn new(mut params: ParameterSet) -> Result<Self, CoreError> {
        params.clamp_all();
        params.validate()?;

        if params.color_mode != ColorMode::Grayscale {
            log::warn!(
                "Mode couleur {:?} non supporté par le rendu texte, rendu en niveaux de gris",
                params.color_mode
            );
        }

        let tone = ToneLut::new(params.brightness, params.contrast, params.gamma);
        let filter = SpatialFilter::from_params(&params);
        let quantizer = GlyphQuantizer::for_ramp(params.char_set)?;
        log::debug!(
            "Pipeline: rampe {} ({} glyphes), flou k={}, contours={}, inversion={}, profondeur={}",
            params.char_set,
            params.char_set.chars().len(),
            filter.blur_kernel,
            filter.edges,
            filter.invert,
            params.depth_effect
        );

        Ok(Self {
            params,
            tone,
            filter,
            quantizer,
            resizer: Resizer::new(),
        })
    }

    /// Parameters this pipeline was built with (after clamping).
    #[must_use]
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Grid size this pipeline produces for a `src_w × src_h` source.
    ///
    /// # Errors
    /// See [`grid_dimensions`].
    pub fn grid_size(&self, src_w: u32, src_h: u32) -> Result<(u16, u16), CoreError> {
        grid_dimensions(src_w, src_h, self.params.width, self.params.height)
    }

    /// Convert one frame into a character grid.
    ///
    /// # Errors
    /// Fails fast on a malformed frame ([`CoreError::InvalidDimensions`],
    /// [`CoreError::InvalidInput`]) or a resampler failure.
    pub fn process(&mut self, frame: &FrameBuffer) -> Result<AsciiGrid, CoreError> {
        frame.validate()?;

        let mut work = frame.clone();
        self.tone.apply(&mut work);
        let filtered = self.filter.apply(work);

        let (cols, rows) = self.grid_size(filtered.width, filtered.height)?;
        let (cols, rows) = (u32::from(cols), u32::from(rows));

        let mut intensity = self.resizer.resize(&filtered, cols, rows)?.to_gray();

        if self.params.depth_effect {
            let depth = depth_map(&filtered);
            let depth = self.resizer.resize(&depth, cols, rows)?;
            fuse(&mut intensity.data, &depth.data);
        }

        self.quantizer.quantize(&intensity)
    }
}

impl Clone for FramePipeline {
    /// The clone gets its own resizer scratch buffers.
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            tone: self.tone,
            filter: self.filter,
            quantizer: self.quantizer.clone(),
            resizer: Resizer::new(),
        }
    }
}

/// One-shot conversion of a single frame.
///
/// # Errors
/// Parameter validation errors, then the errors of [`FramePipeline::process`].
pub fn frame_to_ascii(frame: &FrameBuffer, params: &ParameterSet) -> Result<AsciiGrid, CoreError> {
    FramePipeline::new(params.clone())?.process(frame)
}

/// Convert a batch of frames in parallel, one clone of `pipeline` per rayon
/// worker.
///
/// Results are in input order; each frame succeeds or fails independently.
///
/// # Example
/// ```
/// use va_ascii::pipeline::{process_batch, FramePipeline};
/// use va_core::config::ParameterSet;
/// use va_core::frame::FrameBuffer;
///
/// let pipeline = FramePipeline::new(ParameterSet::default()).unwrap();
/// let frames = vec![FrameBuffer::filled(40, 20, 3, 0); 4];
/// let grids = process_batch(&pipeline, &frames);
/// assert_eq!(grids.len(), 4);
/// assert!(grids.iter().all(|g| g.is_ok()));
/// ```
#[must_use]
pub fn process_batch(
    pipeline: &FramePipeline,
    frames: &[FrameBuffer],
) -> Vec<Result<AsciiGrid, CoreError>> {
    frames
        .par_iter()
        .map_init(|| pipeline.clone(), |p, frame| p.process(frame))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_core::charset::GlyphRamp;

    fn unbounded() -> ParameterSet {
        ParameterSet {
            height: 0,
            ..ParameterSet::default()
        }
    }

    fn textured(w: u32, h: u32) -> FrameBuffer {
        let mut fb = FrameBuffer::new(w, h, 3);
        for y in 0..h {
            for x in 0..w {
                let i = ((y * w + x) * 3) as usize;
                let v = ((x * 13 + y * 7) % 256) as u8;
                fb.data[i..i + 3].copy_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        fb
    }

    #[test]
    fn mid_gray_frame_uses_ramp_index_34() {
        let grid = frame_to_ascii(&FrameBuffer::filled(100, 50, 3, 128), &unbounded()).unwrap();
        assert_eq!((grid.width, grid.height), (80, 20));
        let expected = GlyphRamp::Standard.chars()[34];
        assert!(grid.cells.iter().all(|&c| c == expected));
        assert_eq!(grid.lines().len(), 20);
        assert!(grid.lines().iter().all(|l| l.chars().count() == 80));
    }

    #[test]
    fn full_brightness_gives_densest_glyph() {
        let params = ParameterSet {
            brightness: 1.0,
            ..unbounded()
        };
        let grid = frame_to_ascii(&textured(64, 48), &params).unwrap();
        assert!(grid.cells.iter().all(|&c| c == '$'));
    }

    #[test]
    fn narrow_grid_on_wide_source() {
        let params = ParameterSet {
            width: 10,
            ..unbounded()
        };
        let grid = frame_to_ascii(&FrameBuffer::filled(200, 100, 3, 0), &params).unwrap();
        assert_eq!((grid.width, grid.height), (10, 3));
        assert!(grid.cells.iter().all(|&c| c == ' '));
    }

    #[test]
    fn rows_never_exceed_height() {
        for height in [1u16, 5, 24] {
            let params = ParameterSet {
                height,
                ..ParameterSet::default()
            };
            let grid = frame_to_ascii(&textured(64, 256), &params).unwrap();
            assert!(grid.height <= height);
            assert!(grid.height >= 1);
        }
    }

    #[test]
    fn grayscale_and_rgb_agree_on_gray_input() {
        let rgb = FrameBuffer::filled(30, 30, 3, 90);
        let mono = FrameBuffer::filled(30, 30, 1, 90);
        let params = unbounded();
        assert_eq!(
            frame_to_ascii(&rgb, &params).unwrap(),
            frame_to_ascii(&mono, &params).unwrap()
        );
    }

    #[test]
    fn double_invert_matches_plain_render() {
        // Inverting twice through the pipeline: invert the source by hand,
        // then let the pipeline invert it back.
        let fb = textured(40, 40);
        let mut inverted = fb.clone();
        crate::filter::invert_in_place(&mut inverted);
        let plain = frame_to_ascii(&fb, &unbounded()).unwrap();
        let params = ParameterSet {
            invert: true,
            ..unbounded()
        };
        assert_eq!(frame_to_ascii(&inverted, &params).unwrap(), plain);
    }

    #[test]
    fn depth_disabled_is_plain_path() {
        let fb = textured(50, 30);
        let mut pipeline = FramePipeline::new(unbounded()).unwrap();
        let grid = pipeline.process(&fb).unwrap();

        let (cols, rows) = pipeline.grid_size(50, 30).unwrap();
        let plane = Resizer::new()
            .resize(&fb, u32::from(cols), u32::from(rows))
            .unwrap()
            .to_gray();
        let manual = GlyphQuantizer::for_ramp(GlyphRamp::Standard)
            .unwrap()
            .quantize(&plane)
            .unwrap();
        assert_eq!(grid, manual);
    }

    #[test]
    fn depth_on_flat_frame_darkens_by_weight() {
        // Depth of a flat frame is 0: fused = round(200 * 0.7) = 140.
        let params = ParameterSet {
            depth_effect: true,
            ..unbounded()
        };
        let grid = frame_to_ascii(&FrameBuffer::filled(40, 20, 1, 200), &params).unwrap();
        let q = GlyphQuantizer::for_ramp(GlyphRamp::Standard).unwrap();
        assert!(grid.cells.iter().all(|&c| c == q.map(140)));
    }

    #[test]
    fn every_option_enabled_keeps_grid_shape() {
        let params = ParameterSet {
            contrast: 1.4,
            brightness: 0.1,
            gamma: 1.8,
            blur: 0.7,
            invert: true,
            edge_detection: true,
            depth_effect: true,
            char_set: GlyphRamp::Blocks,
            ..unbounded()
        };
        let grid = frame_to_ascii(&textured(120, 60), &params).unwrap();
        assert_eq!((grid.width, grid.height), (80, 20));
        let ramp = GlyphRamp::Blocks.chars();
        assert!(grid.cells.iter().all(|c| ramp.contains(c)));
    }

    #[test]
    fn malformed_frames_fail_fast() {
        let mut pipeline = FramePipeline::new(ParameterSet::default()).unwrap();
        let empty = FrameBuffer {
            data: Vec::new(),
            width: 0,
            height: 10,
            channels: 3,
        };
        assert!(matches!(
            pipeline.process(&empty),
            Err(CoreError::InvalidDimensions { .. })
        ));
        let short = FrameBuffer {
            data: vec![0; 5],
            width: 2,
            height: 2,
            channels: 3,
        };
        assert!(matches!(pipeline.process(&short), Err(CoreError::InvalidInput(_))));
        let rgba = FrameBuffer::new(2, 2, 4);
        assert!(pipeline.process(&rgba).is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected_at_construction() {
        for params in [
            ParameterSet { gamma: 0.0, ..ParameterSet::default() },
            ParameterSet { contrast: 0.0, ..ParameterSet::default() },
            ParameterSet { width: 0, ..ParameterSet::default() },
            ParameterSet { brightness: f32::NAN, ..ParameterSet::default() },
        ] {
            assert!(matches!(
                FramePipeline::new(params),
                Err(CoreError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn out_of_range_blur_is_clamped() {
        let params = ParameterSet {
            blur: 3.0,
            ..ParameterSet::default()
        };
        let pipeline = FramePipeline::new(params).unwrap();
        assert!((pipeline.params().blur - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn batch_preserves_order() {
        let frames: Vec<FrameBuffer> = (0..12u8)
            .map(|i| FrameBuffer::filled(32, 16, 3, i * 20))
            .collect();
        let mut sequential = FramePipeline::new(unbounded()).unwrap();
        let batch = process_batch(&sequential, &frames);
        for (frame, got) in frames.iter().zip(batch) {
            assert_eq!(got.unwrap(), sequential.process(frame).unwrap());
        }
    }

    #[test]
    fn batch_reports_bad_frames_individually() {
        let frames = vec![
            FrameBuffer::filled(8, 8, 3, 10),
            FrameBuffer::new(8, 8, 2),
            FrameBuffer::filled(8, 8, 3, 10),
        ];
        let pipeline = FramePipeline::new(ParameterSet::default()).unwrap();
        let batch = process_batch(&pipeline, &frames);
        assert!(batch[0].is_ok());
        assert!(batch[1].is_err());
        assert!(batch[2].is_ok());
    }

    #[test]
    fn colour_modes_render_as_grayscale() {
        let fb = textured(40, 20);
        let gray = frame_to_ascii(&fb, &unbounded()).unwrap();
        let params = ParameterSet {
            color_mode: ColorMode::Ansi,
            ..unbounded()
        };
        assert_eq!(frame_to_ascii(&fb, &params).unwrap(), gray);
    }
}
