//! Filtres spatiaux optionnels : flou → contours → inversion.

use va_core::config::ParameterSet;
use va_core::frame::FrameBuffer;

use crate::blur::{gaussian_blur, kernel_size_for_strength};
use crate::edge::edge_frame;

/// Réglages du filtre spatial, extraits une fois du `ParameterSet`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpatialFilter {
    /// Taille du noyau gaussien, 1 = pas de flou.
    pub blur_kernel: usize,
    pub edges: bool,
    pub invert: bool,
}

impl SpatialFilter {
    #[must_use]
    pub fn from_params(params: &ParameterSet) -> Self {
        let blur_kernel = if params.blur > 0.0 {
            kernel_size_for_strength(params.blur)
        } else {
            1
        };
        Self {
            blur_kernel,
            edges: params.edge_detection,
            invert: params.invert,
        }
    }

    /// True when no stage would alter the frame.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.blur_kernel <= 1 && !self.edges && !self.invert
    }

    /// Apply blur, then edge extraction, then inversion.
    ///
    /// Dimensions and channel count are preserved.
    ///
    /// # Example
    /// ```
    /// use va_core::frame::FrameBuffer;
    /// use va_ascii::filter::SpatialFilter;
    /// let f = SpatialFilter { blur_kernel: 1, edges: false, invert: true };
    /// let out = f.apply(FrameBuffer::filled(2, 2, 1, 10));
    /// assert!(out.data.iter().all(|&v| v == 245));
    /// ```
    #[must_use]
    pub fn apply(&self, mut frame: FrameBuffer) -> FrameBuffer {
        if self.is_noop() {
            return frame;
        }
        if self.blur_kernel > 1 {
            frame = gaussian_blur(&frame, self.blur_kernel);
        }
        if self.edges {
            frame = edge_frame(&frame);
        }
        if self.invert {
            invert_in_place(&mut frame);
        }
        frame
    }
}

/// `s → 255 - s` sur tous les échantillons.
#[inline]
pub fn invert_in_place(frame: &mut FrameBuffer) {
    for v in &mut frame.data {
        *v = 255 - *v;
    }
}
