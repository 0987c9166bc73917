use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use va_core::charset::GlyphRamp;
use va_core::config::{load_params, ParameterOverrides, ParameterSet, Quality};
use va_export::OutputFormat;

/// vidascii : convertit une vidéo en art ASCII (texte, GIF ou MP4).
#[derive(Parser, Debug)]
#[command(name = "vidascii", version, about, long_about = None)]
pub struct Cli {
    /// Vidéo source (ou image PNG, JPEG, BMP, GIF).
    pub input: PathBuf,

    /// Fichier de sortie. Requis sauf avec --preview.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Format de sortie : txt, gif, mp4.
    #[arg(short, long, default_value = "txt")]
    pub format: OutputFormat,

    /// Largeur en caractères.
    #[arg(short, long)]
    pub width: Option<u16>,

    /// Hauteur maximale en caractères (0 = ratio d'aspect seul).
    #[arg(short = 'H', long)]
    pub height: Option<u16>,

    /// FPS cible.
    #[arg(long)]
    pub fps: Option<f64>,

    /// Jeu de caractères : simple, standard, detailed, gradient, blocks.
    #[arg(long)]
    pub char_set: Option<GlyphRamp>,

    /// Qualité : low, medium, high.
    #[arg(long)]
    pub quality: Option<Quality>,

    /// Contraste (1.0 = neutre).
    #[arg(long, allow_negative_numbers = true)]
    pub contrast: Option<f32>,

    /// Luminosité (-1.0 à 1.0).
    #[arg(long, allow_negative_numbers = true)]
    pub brightness: Option<f32>,

    /// Gamma (1.0 = neutre).
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Force du flou (0.0 à 1.0).
    #[arg(long)]
    pub blur: Option<f32>,

    /// Inverser les couleurs.
    #[arg(long, default_value_t = false)]
    pub invert: bool,

    /// Activer la détection de contours.
    #[arg(long, default_value_t = false)]
    pub edge_detection: bool,

    /// Activer l'effet de profondeur.
    #[arg(long, default_value_t = false)]
    pub depth_effect: bool,

    /// Sauvegarder la configuration finale (JSON si .json, TOML sinon).
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Charger une configuration (JSON si .json, TOML sinon).
    #[arg(long)]
    pub load_config: Option<PathBuf>,

    /// Police monospace (TTF/OTF) pour les GIF. Par défaut : police système.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Afficher la première frame et quitter.
    #[arg(long, default_value_t = false)]
    pub preview: bool,

    /// Niveau de log : off, error, warn, info, debug, trace.
    #[arg(long, default_value = "info", value_parser = clap::value_parser!(log::LevelFilter))]
    pub log_level: log::LevelFilter,
}

impl Cli {
    /// Check argument combinations clap cannot express.
    ///
    /// # Errors
    /// Returns an error if no output is given outside preview mode.
    pub fn validate(&self) -> Result<()> {
        if !self.preview && self.output.is_none() {
            anyhow::bail!("--output est requis (sauf avec --preview).");
        }
        Ok(())
    }

    /// Explicitly given flags as overrides. Boolean flags only override when set.
    #[must_use]
    pub fn overrides(&self) -> ParameterOverrides {
        ParameterOverrides {
            width: self.width,
            height: self.height,
            fps: self.fps,
            char_set: self.char_set,
            color_mode: None,
            contrast: self.contrast,
            brightness: self.brightness,
            gamma: self.gamma,
            invert: self.invert.then_some(true),
            edge_detection: self.edge_detection.then_some(true),
            depth_effect: self.depth_effect.then_some(true),
            blur: self.blur,
            quality: self.quality,
        }
    }

    /// Build the parameter set: defaults → `--load-config` → CLI flags.
    ///
    /// # Errors
    /// Config file errors, or parameters the pipeline would reject.
    pub fn resolve_params(&self) -> Result<ParameterSet> {
        let mut params = match self.load_config.as_deref() {
            Some(path) => load_params(path)?,
            None => ParameterSet::default(),
        };
        self.overrides().apply_to(&mut params);
        params.clamp_all();
        params.validate().context("Paramètres invalides")?;
        Ok(params)
    }
}
