//! Détecteur de contours Canny : Sobel 3×3, suppression des non-maxima,
//! seuillage par hystérésis.
//!
//! Le gradient utilise la norme L1 (`|gx| + |gy|`) et des bords reflect-101.
//! Les pixels conservés valent 255, les autres 0.

use va_core::frame::FrameBuffer;

use crate::blur::reflect101;

/// Seuil bas de l'hystérésis.
pub const CANNY_LOW: i32 = 50;
/// Seuil haut de l'hystérésis.
pub const CANNY_HIGH: i32 = 150;

/// tan(22.5°) et tan(67.5°) en virgule fixe 15 bits.
const TAN22_Q15: i64 = 13_573;
const TAN67_Q15: i64 = 79_109;

/// Compute Sobel gradients at (x, y) with reflect-101 borders.
#[inline(always)]
fn sobel(gray: &[u8], w: usize, h: usize, x: usize, y: usize) -> (i32, i32) {
    let at = |dx: isize, dy: isize| -> i32 {
        let sx = reflect101(x as isize + dx, w);
        let sy = reflect101(y as isize + dy, h);
        i32::from(gray[sy * w + sx])
    };

    let tl = at(-1, -1);
    let tc = at(0, -1);
    let tr = at(1, -1);
    let ml = at(-1, 0);
    let mr = at(1, 0);
    let bl = at(-1, 1);
    let bc = at(0, 1);
    let br = at(1, 1);

    let gx = -tl + tr - 2 * ml + 2 * mr - bl + br;
    let gy = -tl - 2 * tc - tr + bl + 2 * bc + br;
    (gx, gy)
}

/// Run Canny on a single-channel plane of `w × h` samples.
///
/// Returns a `w × h` plane where edge pixels are 255 and the rest 0.
///
/// # Example
/// ```
/// use va_ascii::edge::{canny, CANNY_HIGH, CANNY_LOW};
/// let flat = vec![128u8; 16];
/// assert!(canny(&flat, 4, 4, CANNY_LOW, CANNY_HIGH).iter().all(|&v| v == 0));
/// ```
#[must_use]
pub fn canny(gray: &[u8], w: usize, h: usize, low: i32, high: i32) -> Vec<u8> {
    let len = w * h;
    debug_assert_eq!(gray.len(), len);
    if len == 0 {
        return Vec::new();
    }

    let mut gx = vec![0i32; len];
    let mut gy = vec![0i32; len];
    let mut mag = vec![0i32; len];
    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = sobel(gray, w, h, x, y);
            let i = y * w + x;
            gx[i] = dx;
            gy[i] = dy;
            mag[i] = dx.abs() + dy.abs();
        }
    }

    // Hors image = magnitude nulle.
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    // 0 = pas un contour, WEAK = candidat, STRONG = contour retenu.
    let mut state = vec![0u8; len];

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }

            let ax = i64::from(gx[i].abs());
            let ay = i64::from(gy[i].abs()) << 15;
            let (xi, yi) = (x as isize, y as isize);

            let is_max = if ay < ax * TAN22_Q15 {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ay > ax * TAN67_Q15 {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s: isize = if (gx[i] ^ gy[i]) < 0 { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };

            if !is_max {
                continue;
            }
            state[i] = if m > high { STRONG } else { WEAK };
        }
    }

    hysteresis(&mut state, w, h);
    state
        .into_iter()
        .map(|s| if s == STRONG { 255 } else { 0 })
        .collect()
}

const WEAK: u8 = 1;
const STRONG: u8 = 2;

/// Promote every weak candidate 8-connected to a strong pixel.
fn hysteresis(state: &mut [u8], w: usize, h: usize) {
    let mut stack: Vec<usize> = state
        .iter()
        .enumerate()
        .filter_map(|(i, &s)| (s == STRONG).then_some(i))
        .collect();

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if state[j] == WEAK {
                    state[j] = STRONG;
                    stack.push(j);
                }
            }
        }
    }
}

/// Remplace la frame par sa carte de contours, au même nombre de canaux.
#[must_use]
pub fn edge_frame(frame: &FrameBuffer) -> FrameBuffer {
    let gray = frame.to_gray();
    let edges = canny(
        &gray.data,
        gray.width as usize,
        gray.height as usize,
        CANNY_LOW,
        CANNY_HIGH,
    );
    FrameBuffer {
        data: edges,
        width: frame.width,
        height: frame.height,
        channels: 1,
    }
    .expand_to(frame.channels)
}
