use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::GlyphRamp;
use crate::error::CoreError;

/// Jeu de paramètres d'une conversion : amélioration d'image + quantification.
///
/// Construit une fois par conversion (défauts → fichier → CLI), validé via
/// [`ParameterSet::validate`], puis partagé en lecture seule par toutes les frames.
/// Sérialisable en JSON ou TOML avec les noms de champs littéraux.
///
/// # Example
/// ```
/// use va_core::config::ParameterSet;
/// let params = ParameterSet::default();
/// assert_eq!(params.width, 80);
/// assert!(params.validate().is_ok());
/// ```
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParameterSet {
    // === Grille ===
    /// Largeur cible en caractères (> 0).
    pub width: u16,
    /// Hauteur maximale en caractères. 0 = dérivée du ratio d'aspect.
    pub height: u16,
    /// FPS cible de l'échantillonnage vidéo.
    pub fps: f64,
    /// Rampe de glyphes.
    pub char_set: GlyphRamp,
    /// Mode couleur. Seul `Grayscale` a un rendu défini.
    pub color_mode: ColorMode,

    // === Tonalité ===
    /// Contraste multiplicatif autour de 0.5. 1.0 = neutre.
    pub contrast: f32,
    /// Décalage additif en espace normalisé. 0.0 = neutre.
    pub brightness: f32,
    /// Gamma, appliqué comme exposant 1/gamma. 1.0 = neutre.
    pub gamma: f32,

    // === Filtres ===
    /// Inverser les échantillons (dernière étape des filtres).
    pub invert: bool,
    /// Remplacer l'image par ses contours (Canny 50/150).
    pub edge_detection: bool,
    /// Fusionner un indice de profondeur (différence de flou).
    pub depth_effect: bool,
    /// Force du flou [0.0, 1.0]. 0 = désactivé.
    pub blur: f32,

    // === Collaborateurs ===
    /// Qualité de traitement, conservée telle quelle pour les collaborateurs.
    pub quality: Quality,
}

/// Color mode selector.
///
/// Only [`ColorMode::Grayscale`] has a defined rendering; the other modes are
/// accepted and persisted but render as grayscale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Luminance only.
    #[default]
    Grayscale,
    /// Truecolor (not rendered by the core).
    Color,
    /// ANSI 256 (not rendered by the core).
    Ansi,
}

/// Processing quality preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Quality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| CoreError::Config(format!("qualité inconnue '{s}'")))
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            fps: 10.0,
            char_set: GlyphRamp::Standard,
            color_mode: ColorMode::Grayscale,
            contrast: 1.0,
            brightness: 0.0,
            gamma: 1.0,
            invert: false,
            edge_detection: false,
            depth_effect: false,
            blur: 0.0,
            quality: Quality::Medium,
        }
    }
}

impl ParameterSet {
    /// Clamp range-limited fields. Called after loading and before validation.
    pub fn clamp_all(&mut self) {
        if self.blur.is_finite() {
            self.blur = self.blur.clamp(0.0, 1.0);
        }
    }

    /// Reject values the pipeline cannot use.
    ///
    /// Contrast 0 and gamma ≤ 0 are rejected rather than normalized: a zero
    /// gamma has no `1/gamma` exponent and a zero contrast collapses every frame.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidParameter`] naming the first offending field.
    ///
    /// # Example
    /// ```
    /// use va_core::config::ParameterSet;
    /// let params = ParameterSet { gamma: 0.0, ..ParameterSet::default() };
    /// assert!(params.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |name: &'static str, value: f64, reason: &'static str| -> Result<(), CoreError> {
            Err(CoreError::InvalidParameter {
                name,
                value,
                reason,
            })
        };

        if self.width == 0 {
            return invalid("width", 0.0, "doit être > 0");
        }
        for (name, value) in [
            ("contrast", self.contrast),
            ("brightness", self.brightness),
            ("gamma", self.gamma),
            ("blur", self.blur),
        ] {
            if !value.is_finite() {
                return invalid(name, f64::from(value), "valeur non finie");
            }
        }
        if self.contrast == 0.0 {
            return invalid("contrast", 0.0, "doit être non nul");
        }
        if self.gamma <= 0.0 {
            return invalid("gamma", f64::from(self.gamma), "doit être > 0");
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return invalid("fps", self.fps, "doit être > 0");
        }
        Ok(())
    }

    /// Parse a JSON parameter mapping merged over the defaults.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] on malformed JSON or an unknown selector.
    pub fn from_json_str(content: &str) -> Result<Self, CoreError> {
        let overrides: ParameterOverrides =
            serde_json::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(overrides.merged_over(ParameterSet::default()))
    }

    /// Parse a TOML parameter mapping merged over the defaults.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] on malformed TOML or an unknown selector.
    ///
    /// # Example
    /// ```
    /// use va_core::config::ParameterSet;
    /// use va_core::charset::GlyphRamp;
    /// let p = ParameterSet::from_toml_str("char_set = \"blocks\"\nwidth = 120").unwrap();
    /// assert_eq!(p.char_set, GlyphRamp::Blocks);
    /// assert_eq!(p.width, 120);
    /// assert_eq!(p.height, 24);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        let overrides: ParameterOverrides =
            toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(overrides.merged_over(ParameterSet::default()))
    }

    /// Serialize as pretty JSON (2-space indent).
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Serialize as TOML.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, CoreError> {
        toml::to_string(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}

/// Surcharge partielle : chaque champ présent remplace la valeur courante.
///
/// Sert à la fois de format intermédiaire de désérialisation (clés absentes =
/// valeurs par défaut) et de couche de surcharges CLI.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ParameterOverrides {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub fps: Option<f64>,
    pub char_set: Option<GlyphRamp>,
    pub color_mode: Option<ColorMode>,
    pub contrast: Option<f32>,
    pub brightness: Option<f32>,
    pub gamma: Option<f32>,
    pub invert: Option<bool>,
    pub edge_detection: Option<bool>,
    pub depth_effect: Option<bool>,
    pub blur: Option<f32>,
    pub quality: Option<Quality>,
}

impl ParameterOverrides {
    /// Apply every present field onto `params`.
    pub fn apply_to(&self, params: &mut ParameterSet) {
        if let Some(v) = self.width {
            params.width = v;
        }
        if let Some(v) = self.height {
            params.height = v;
        }
        if let Some(v) = self.fps {
            params.fps = v;
        }
        if let Some(v) = self.char_set {
            params.char_set = v;
        }
        if let Some(v) = self.color_mode {
            params.color_mode = v;
        }
        if let Some(v) = self.contrast {
            params.contrast = v;
        }
        if let Some(v) = self.brightness {
            params.brightness = v;
        }
        if let Some(v) = self.gamma {
            params.gamma = v;
        }
        if let Some(v) = self.invert {
            params.invert = v;
        }
        if let Some(v) = self.edge_detection {
            params.edge_detection = v;
        }
        if let Some(v) = self.depth_effect {
            params.depth_effect = v;
        }
        if let Some(v) = self.blur {
            params.blur = v;
        }
        if let Some(v) = self.quality {
            params.quality = v;
        }
    }

    fn merged_over(&self, mut base: ParameterSet) -> ParameterSet {
        self.apply_to(&mut base);
        base
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Charge un fichier de paramètres (JSON si `.json`, TOML sinon), fusionné avec
/// les valeurs par défaut puis borné via [`ParameterSet::clamp_all`].
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use va_core::config::load_params;
/// use std::path::Path;
/// let params = load_params(Path::new("settings.json")).unwrap();
/// ```
pub fn load_params(path: &Path) -> Result<ParameterSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let mut params = if is_json(path) {
        ParameterSet::from_json_str(&content)
    } else {
        ParameterSet::from_toml_str(&content)
    }
    .with_context(|| format!("Erreur de parsing dans {}", path.display()))?;

    params.clamp_all();
    log::info!("Configuration chargée depuis {}", path.display());
    Ok(params)
}

/// Écrit le jeu de paramètres (JSON si `.json`, TOML sinon).
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn save_params(params: &ParameterSet, path: &Path) -> Result<()> {
    let content = if is_json(path) {
        params.to_json_string()?
    } else {
        params.to_toml_string()?
    };
    std::fs::write(path, content)
        .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
    log::info!("Configuration sauvegardée dans {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_parse() {
        assert_eq!("high".parse::<Quality>().unwrap(), Quality::High);
        assert!(matches!("ultra".parse::<Quality>(), Err(CoreError::Config(_))));
    }

    #[test]
    fn json_uses_literal_keys_and_lowercase_enums() {
        let json = ParameterSet::default().to_json_string().unwrap();
        for key in [
            "width",
            "height",
            "fps",
            "char_set",
            "color_mode",
            "contrast",
            "brightness",
            "gamma",
            "invert",
            "edge_detection",
            "depth_effect",
            "blur",
            "quality",
        ] {
            assert!(json.contains(&format!("\"{key}\"")), "missing {key}");
        }
        assert!(json.contains("\"standard\""));
        assert!(json.contains("\"grayscale\""));
        assert!(json.contains("\"medium\""));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let p = ParameterSet::from_json_str(r#"{"invert": true, "gamma": 2.2}"#).unwrap();
        assert!(p.invert);
        assert!((p.gamma - 2.2).abs() < f32::EPSILON);
        assert_eq!(p.width, 80);
        assert_eq!(p.char_set, GlyphRamp::Standard);
    }

    #[test]
    fn unknown_selector_is_a_config_error() {
        let err = ParameterSet::from_json_str(r#"{"char_set": "unicorn"}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        let err = ParameterSet::from_json_str(r#"{"color_mode": "sepia"}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let p = ParameterSet::from_json_str(r#"{"width": 40, "legacy": 3}"#).unwrap();
        assert_eq!(p.width, 40);
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let base = ParameterSet::default();
        let cases = [
            ParameterSet { width: 0, ..base.clone() },
            ParameterSet { contrast: 0.0, ..base.clone() },
            ParameterSet { gamma: 0.0, ..base.clone() },
            ParameterSet { gamma: -1.0, ..base.clone() },
            ParameterSet { brightness: f32::NAN, ..base.clone() },
            ParameterSet { contrast: f32::INFINITY, ..base.clone() },
            ParameterSet { fps: 0.0, ..base.clone() },
        ];
        for p in cases {
            assert!(
                matches!(p.validate(), Err(CoreError::InvalidParameter { .. })),
                "{p:?}"
            );
        }
    }

    #[test]
    fn negative_contrast_is_allowed() {
        let p = ParameterSet {
            contrast: -1.0,
            ..ParameterSet::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn clamp_bounds_blur() {
        let mut p = ParameterSet {
            blur: 3.0,
            ..ParameterSet::default()
        };
        p.clamp_all();
        assert!((p.blur - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn json_file_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let params = ParameterSet {
            width: 132,
            height: 0,
            fps: 23.976,
            char_set: GlyphRamp::Detailed,
            color_mode: ColorMode::Ansi,
            contrast: 1.35,
            brightness: -0.1,
            gamma: 0.8,
            invert: true,
            edge_detection: true,
            depth_effect: true,
            blur: 0.4,
            quality: Quality::High,
        };
        save_params(&params, &path).unwrap();
        assert_eq!(load_params(&path).unwrap(), params);
    }

    #[test]
    fn toml_file_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let params = ParameterSet {
            fps: 12.5,
            quality: Quality::Low,
            ..ParameterSet::default()
        };
        save_params(&params, &path).unwrap();
        assert_eq!(load_params(&path).unwrap(), params);
    }
}
