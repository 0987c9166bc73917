use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 10 caractères, compact, bon contraste.
pub const CHARSET_SIMPLE: &str = " .:-=+*#%@";

/// 70 caractères (Paul Bourke extended), du plus clair au plus dense.
pub const CHARSET_STANDARD: &str =
    " .'`^\",:;Il!i><~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// Mêmes caractères que [`CHARSET_STANDARD`] ; `detailed` reste un sélecteur distinct.
pub const CHARSET_DETAILED: &str = CHARSET_STANDARD;

/// Blocs Unicode (pseudo-pixels).
pub const CHARSET_GRADIENT: &str = " ░▒▓█";

/// Blocs verticaux de hauteur croissante.
pub const CHARSET_BLOCKS: &str = " ▁▂▃▄▅▆▇█";

/// Built-in glyph ramp selector.
///
/// # Example
/// ```
/// use va_core::charset::GlyphRamp;
/// let ramp: GlyphRamp = "gradient".parse().unwrap();
/// assert_eq!(ramp.chars().len(), 5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GlyphRamp {
    /// 10 niveaux.
    Simple,
    /// 70 niveaux.
    #[default]
    Standard,
    /// Alias historique de `Standard`.
    Detailed,
    /// 5 niveaux, blocs ombrés.
    Gradient,
    /// 9 niveaux, blocs verticaux.
    Blocks,
}

impl GlyphRamp {
    /// All selectors, in CLI order.
    pub const ALL: [GlyphRamp; 5] = [
        GlyphRamp::Simple,
        GlyphRamp::Standard,
        GlyphRamp::Detailed,
        GlyphRamp::Gradient,
        GlyphRamp::Blocks,
    ];

    /// Raw ramp string, ordered sparse → dense.
    #[must_use]
    pub fn as_ramp_str(self) -> &'static str {
        match self {
            GlyphRamp::Simple => CHARSET_SIMPLE,
            GlyphRamp::Standard => CHARSET_STANDARD,
            GlyphRamp::Detailed => CHARSET_DETAILED,
            GlyphRamp::Gradient => CHARSET_GRADIENT,
            GlyphRamp::Blocks => CHARSET_BLOCKS,
        }
    }

    /// Ramp characters, ordered sparse → dense.
    #[must_use]
    pub fn chars(self) -> Vec<char> {
        self.as_ramp_str().chars().collect()
    }

    /// Selector name as persisted in parameter files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GlyphRamp::Simple => "simple",
            GlyphRamp::Standard => "standard",
            GlyphRamp::Detailed => "detailed",
            GlyphRamp::Gradient => "gradient",
            GlyphRamp::Blocks => "blocks",
        }
    }
}

impl fmt::Display for GlyphRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GlyphRamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GlyphRamp::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| CoreError::Config(format!("jeu de caractères inconnu '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ramp_lengths() {
        assert_eq!(GlyphRamp::Simple.chars().len(), 10);
        assert_eq!(GlyphRamp::Standard.chars().len(), 70);
        assert_eq!(GlyphRamp::Gradient.chars().len(), 5);
        assert_eq!(GlyphRamp::Blocks.chars().len(), 9);
    }

    #[test]
    fn detailed_matches_standard() {
        assert_eq!(GlyphRamp::Detailed.chars(), GlyphRamp::Standard.chars());
    }

    #[test]
    fn ramps_start_with_space() {
        for ramp in GlyphRamp::ALL {
            assert_eq!(ramp.chars()[0], ' ', "{ramp}");
        }
    }

    #[test]
    fn standard_contains_backslash() {
        assert!(CHARSET_STANDARD.contains("|\\/t"));
    }

    #[test]
    fn parse_round_trips_names() {
        for ramp in GlyphRamp::ALL {
            assert_eq!(ramp.name().parse::<GlyphRamp>().unwrap(), ramp);
        }
        assert!(matches!(
            "fancy".parse::<GlyphRamp>(),
            Err(CoreError::Config(_))
        ));
    }
}
