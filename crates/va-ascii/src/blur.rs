//! Flou gaussien séparable, conventions OpenCV (`sigma = 0` dérivé de la taille).

use va_core::frame::FrameBuffer;

/// Taille de noyau du grand flou utilisé par l'indice de profondeur.
pub const DEPTH_KERNEL_SIZE: usize = 15;

/// Noyaux binomiaux fixes utilisés pour les petites tailles quand sigma n'est
/// pas fourni.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[
        0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
    ],
];

/// Kernel size for a blur strength in [0, 1]: `max(1, round(strength * 5))`,
/// bumped to the next odd value.
///
/// # Example
/// ```
/// use va_ascii::blur::kernel_size_for_strength;
/// assert_eq!(kernel_size_for_strength(0.5), 3);
/// assert_eq!(kernel_size_for_strength(1.0), 5);
/// assert_eq!(kernel_size_for_strength(0.6), 3);
/// ```
#[must_use]
pub fn kernel_size_for_strength(strength: f32) -> usize {
    let k = ((strength * 5.0).round() as usize).max(1);
    if k.is_multiple_of(2) { k + 1 } else { k }
}

/// 1D Gaussian taps for an odd kernel size, normalized to sum 1.
#[must_use]
pub fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    debug_assert!(ksize % 2 == 1, "kernel size must be odd");
    if ksize <= 7 {
        return SMALL_KERNELS[ksize / 2].to_vec();
    }

    let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let scale = -0.5 / (sigma * sigma);
    let half = (ksize / 2) as f64;
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - half;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|w| (w / sum) as f32).collect()
}

/// Reflect-101 border: `gfedcb|abcdefgh|gfedcba`.
#[inline(always)]
pub(crate) fn reflect101(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

/// Apply a `ksize × ksize` separable Gaussian blur to every channel.
///
/// `ksize == 1` returns an unchanged copy.
///
/// # Example
/// ```
/// use va_core::frame::FrameBuffer;
/// use va_ascii::blur::gaussian_blur;
/// let fb = FrameBuffer::filled(8, 8, 3, 90);
/// assert_eq!(gaussian_blur(&fb, 5).data, fb.data);
/// ```
#[must_use]
pub fn gaussian_blur(frame: &FrameBuffer, ksize: usize) -> FrameBuffer {
    if ksize <= 1 {
        return frame.clone();
    }
    let taps = gaussian_kernel(ksize);
    let radius = (ksize / 2) as isize;
    let w = frame.width as usize;
    let h = frame.height as usize;
    let c = usize::from(frame.channels);

    // Passe horizontale → f32, passe verticale → u8.
    let mut tmp = vec![0f32; frame.data.len()];
    for y in 0..h {
        let row = &frame.data[y * w * c..(y + 1) * w * c];
        let out = &mut tmp[y * w * c..(y + 1) * w * c];
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0f32;
                for (k, &t) in taps.iter().enumerate() {
                    let sx = reflect101(x as isize + k as isize - radius, w);
                    acc += t * f32::from(row[sx * c + ch]);
                }
                out[x * c + ch] = acc;
            }
        }
    }

    let mut data = vec![0u8; frame.data.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0f32;
                for (k, &t) in taps.iter().enumerate() {
                    let sy = reflect101(y as isize + k as isize - radius, h);
                    acc += t * tmp[(sy * w + x) * c + ch];
                }
                data[(y * w + x) * c + ch] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    FrameBuffer {
        data,
        width: frame.width,
        height: frame.height,
        channels: frame.channels,
    }
}
