use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Numeric parameter that cannot be used (non-finite, zero gamma, ...).
    #[error("Paramètre invalide : {name} = {value} ({reason})")]
    InvalidParameter {
        /// Field name as it appears in the persisted parameter set.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Short human-readable reason.
        reason: &'static str,
    },

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Unsupported file or data format.
    #[error("Format non supporté : {format}")]
    UnsupportedFormat {
        /// The format string that is unsupported.
        format: String,
    },

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// Frame buffer whose layout does not match its declared shape.
    #[error("Frame invalide : {0}")]
    InvalidInput(String),

    /// Resampling backend failure.
    #[error("Échec du redimensionnement : {0}")]
    Resize(String),
}
