//! Indice de profondeur heuristique : différence entre l'intensité et un flou
//! large, étirée sur [0, 255].
//!
//! Ce n'est pas une vraie mesure de profondeur. Les zones texturées ressortent,
//! les aplats disparaissent.

use va_core::frame::FrameBuffer;

use crate::blur::{gaussian_blur, DEPTH_KERNEL_SIZE};

/// Poids de l'intensité dans la fusion.
pub const INTENSITY_WEIGHT: f32 = 0.7;
/// Poids de la profondeur dans la fusion.
pub const DEPTH_WEIGHT: f32 = 0.3;

/// Single-channel depth cue for `frame`, same dimensions.
///
/// A map with no variation stretches to all zeros.
///
/// # Example
/// ```
/// use va_core::frame::FrameBuffer;
/// use va_ascii::depth::depth_map;
/// let d = depth_map(&FrameBuffer::filled(20, 20, 3, 90));
/// assert_eq!(d.channels, 1);
/// assert!(d.data.iter().all(|&v| v == 0));
/// ```
#[must_use]
pub fn depth_map(frame: &FrameBuffer) -> FrameBuffer {
    let gray = frame.to_gray();
    let blurred = gaussian_blur(&gray, DEPTH_KERNEL_SIZE);

    let mut data: Vec<u8> = gray
        .data
        .iter()
        .zip(&blurred.data)
        .map(|(&a, &b)| a.abs_diff(b))
        .collect();
    normalize_min_max(&mut data);

    FrameBuffer {
        data,
        width: gray.width,
        height: gray.height,
        channels: 1,
    }
}

/// Étire linéairement les valeurs sur [0, 255]. Plage nulle → tout à 0.
pub fn normalize_min_max(data: &mut [u8]) {
    let Some(&min) = data.iter().min() else {
        return;
    };
    let max = data.iter().copied().max().unwrap_or(min);
    if max == min {
        data.fill(0);
        return;
    }
    let range = f32::from(max - min);
    for v in data.iter_mut() {
        *v = (f32::from(*v - min) * 255.0 / range).round() as u8;
    }
}

/// Fuse intensity and depth planes: `round(i * 0.7 + d * 0.3)`.
///
/// Both slices must have the same length; `intensity` is updated in place.
///
/// # Example
/// ```
/// use va_ascii::depth::fuse;
/// let mut i = vec![100, 255, 0];
/// fuse(&mut i, &[200, 255, 0]);
/// assert_eq!(i, vec![130, 255, 0]);
/// ```
pub fn fuse(intensity: &mut [u8], depth: &[u8]) {
    debug_assert_eq!(intensity.len(), depth.len());
    for (i, &d) in intensity.iter_mut().zip(depth) {
        let v = f32::from(*i) * INTENSITY_WEIGHT + f32::from(d) * DEPTH_WEIGHT;
        *i = v.round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_map_normalizes_to_zero() {
        let mut d = vec![42u8; 10];
        normalize_min_max(&mut d);
        assert!(d.iter().all(|&v| v == 0));
    }

    #[test]
    fn normalization_spans_full_range() {
        let mut d = vec![10u8, 20, 30];
        normalize_min_max(&mut d);
        assert_eq!(d, vec![0, 128, 255]);
    }

    #[test]
    fn empty_slice_is_fine() {
        let mut d: Vec<u8> = Vec::new();
        normalize_min_max(&mut d);
        assert!(d.is_empty());
    }

    #[test]
    fn texture_stands_out_against_flat_area() {
        // Left half checkerboard, right half flat.
        let (w, h) = (32u32, 16u32);
        let mut fb = FrameBuffer::new(w, h, 1);
        for y in 0..h {
            for x in 0..w {
                let v = if x < w / 2 {
                    if (x + y) % 2 == 0 { 0 } else { 255 }
                } else {
                    128
                };
                fb.data[(y * w + x) as usize] = v;
            }
        }
        let d = depth_map(&fb);
        assert_eq!(d.data.iter().copied().max(), Some(255));
        // Far right column, away from the texture.
        let right = d.data[(8 * w + w - 1) as usize];
        let left = d.data[(8 * w + 2) as usize];
        assert!(left > right, "left {left} right {right}");
    }

    #[test]
    fn fusion_weights() {
        let mut i = vec![0u8, 10];
        fuse(&mut i, &[255, 10]);
        // 76.5 → 77
        assert_eq!(i, vec![77, 10]);
    }
}
