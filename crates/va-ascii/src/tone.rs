use va_core::frame::FrameBuffer;

/// Table de correspondance tonale : luminosité → contraste → gamma.
///
/// La transformation est ponctuelle, donc précalculée une fois pour les 256
/// valeurs d'entrée. Chaque étape n'est appliquée que si son paramètre n'est pas
/// neutre, dans un ordre fixe.
///
/// # Example
/// ```
/// use va_ascii::tone::ToneLut;
/// let lut = ToneLut::new(0.0, 1.0, 1.0);
/// assert!(lut.is_identity());
/// assert_eq!(lut.map(200), 200);
/// ```
#[derive(Clone, Copy)]
pub struct ToneLut {
    lut: [u8; 256],
    identity: bool,
}

impl ToneLut {
    /// Build the table. `gamma` must be > 0 (see `ParameterSet::validate`).
    #[must_use]
    pub fn new(brightness: f32, contrast: f32, gamma: f32) -> Self {
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = adjust(i as u8, brightness, contrast, gamma);
        }
        let identity = lut.iter().enumerate().all(|(i, &v)| usize::from(v) == i);
        Self { lut, identity }
    }

    /// True when every sample maps to itself.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    #[inline(always)]
    #[must_use]
    pub fn map(&self, sample: u8) -> u8 {
        self.lut[sample as usize]
    }

    /// Apply the table to every sample of every channel, in place.
    pub fn apply(&self, frame: &mut FrameBuffer) {
        if self.identity {
            return;
        }
        for v in &mut frame.data {
            *v = self.lut[*v as usize];
        }
    }
}

/// Ajustement tonal d'un échantillon en espace normalisé [0, 1].
#[inline(always)]
fn adjust(sample: u8, brightness: f32, contrast: f32, gamma: f32) -> u8 {
    let mut v = f32::from(sample) / 255.0;

    if brightness != 0.0 {
        v = (v + brightness).clamp(0.0, 1.0);
    }
    if (contrast - 1.0).abs() > f32::EPSILON {
        v = ((v - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
    }
    if (gamma - 1.0).abs() > f32::EPSILON {
        v = v.powf(1.0 / gamma);
    }

    // gamma non validé (≤ 0) peut produire NaN : ramené à 0.
    let scaled = (v * 255.0).round();
    if scaled.is_nan() {
        0
    } else {
        scaled.clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_parameters_are_identity() {
        let lut = ToneLut::new(0.0, 1.0, 1.0);
        assert!(lut.is_identity());
        for i in 0..=255u8 {
            assert_eq!(lut.map(i), i);
        }
    }

    #[test]
    fn full_brightness_saturates() {
        let lut = ToneLut::new(1.0, 1.0, 1.0);
        for i in 0..=255u8 {
            assert_eq!(lut.map(i), 255);
        }
    }

    #[test]
    fn negative_brightness_clamps_to_black() {
        let lut = ToneLut::new(-1.0, 1.0, 1.0);
        assert_eq!(lut.map(255), 0);
    }

    #[test]
    fn contrast_pivots_around_midpoint() {
        // 1.5 * i - 63.75 in sample space
        let lut = ToneLut::new(0.0, 1.5, 1.0);
        assert_eq!(lut.map(40), 0);
        assert_eq!(lut.map(100), 86);
        assert_eq!(lut.map(200), 236);
        assert_eq!(lut.map(255), 255);
    }

    #[test]
    fn gamma_brightens_midtones() {
        let lut = ToneLut::new(0.0, 1.0, 2.0);
        // sqrt(0.25) = 0.5
        assert_eq!(lut.map(64), 128);
        assert_eq!(lut.map(0), 0);
        assert_eq!(lut.map(255), 255);
    }

    #[test]
    fn brightness_runs_before_contrast() {
        // brightness then contrast: (0.5 + 0.25 - 0.5) * 2 + 0.5 = 1.0
        let lut = ToneLut::new(0.25, 2.0, 1.0);
        assert_eq!(lut.map(128), 255);
        // contrast first would give 0.5 + 0.25 = 0.75 → 191
    }

    #[test]
    fn extreme_values_stay_monotonic() {
        for &(b, c, g) in &[
            (5.0, 1.0, 1.0),
            (-5.0, 1.0, 1.0),
            (0.0, 100.0, 1.0),
            (0.3, 0.01, 0.05),
            (0.0, 1.0, 50.0),
            (-0.2, 3.0, 0.4),
        ] {
            let lut = ToneLut::new(b, c, g);
            for i in 1..=255u8 {
                assert!(lut.map(i) >= lut.map(i - 1), "b={b} c={c} g={g} i={i}");
            }
        }
    }

    #[test]
    fn negative_contrast_reverses_order() {
        let lut = ToneLut::new(0.0, -1.0, 1.0);
        assert_eq!(lut.map(0), 255);
        assert_eq!(lut.map(255), 0);
    }

    #[test]
    fn apply_touches_every_channel() {
        let mut fb = FrameBuffer::filled(2, 2, 3, 100);
        ToneLut::new(1.0, 1.0, 1.0).apply(&mut fb);
        assert!(fb.data.iter().all(|&v| v == 255));
    }
}
