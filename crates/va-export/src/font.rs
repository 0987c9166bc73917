//! Police monospace et atlas de glyphes pour le rendu texte des GIF.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use va_core::charset::GlyphRamp;

/// Emplacements usuels d'une police monospace, essayés dans l'ordre.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
    "/usr/local/share/fonts/DejaVuSansMono.ttf",
    "/Library/Fonts/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
];

/// Load a TrueType/OpenType font from disk.
///
/// # Errors
/// Unreadable file or invalid font data.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Impossible de lire la police {}", path.display()))?;
    FontVec::try_from_vec(bytes).with_context(|| format!("Police invalide : {}", path.display()))
}

/// Police explicite si fournie, sinon la première police système utilisable.
///
/// `Ok(None)` quand aucune police n'est trouvée : l'appelant retombe sur le
/// rendu en blocs.
///
/// # Errors
/// Only when `explicit` is given and cannot be loaded.
pub fn find_font(explicit: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = explicit {
        let font = load_font(path)?;
        log::info!("Police : {}", path.display());
        return Ok(Some(font));
    }
    for candidate in SYSTEM_FONT_PATHS.iter().map(Path::new) {
        if !candidate.is_file() {
            continue;
        }
        match load_font(candidate) {
            Ok(font) => {
                log::info!("Police système : {}", candidate.display());
                return Ok(Some(font));
            }
            Err(e) => log::warn!("{e:#}"),
        }
    }
    log::warn!("Aucune police monospace trouvée (--font), rendu en blocs");
    Ok(None)
}

/// Glyphes pré-rendus (couverture 0..=255) à la taille exacte d'une cellule.
///
/// Contient l'ASCII imprimable et les caractères de toutes les rampes
/// intégrées ; un caractère absent de la police n'est pas mis en cache.
#[derive(Clone, Debug)]
pub struct GlyphAtlas {
    cell_width: u32,
    cell_height: u32,
    glyphs: HashMap<char, Vec<u8>>,
}

impl GlyphAtlas {
    #[must_use]
    pub fn new<F: Font>(font: &F, cell_width: u32, cell_height: u32) -> Self {
        let cell_width = cell_width.max(1);
        let cell_height = cell_height.max(1);

        // Hauteur de ligne = hauteur de cellule, réduite si l'avance de 'M'
        // déborde en largeur.
        let mut scale = PxScale::from(cell_height as f32);
        let advance = font.as_scaled(scale).h_advance(font.glyph_id('M'));
        if advance > cell_width as f32 {
            scale = PxScale::from(cell_height as f32 * cell_width as f32 / advance);
        }

        let mut atlas = Self {
            cell_width,
            cell_height,
            glyphs: HashMap::new(),
        };
        let ramp_chars = GlyphRamp::ALL.into_iter().flat_map(GlyphRamp::chars);
        for ch in (' '..='~').chain(ramp_chars) {
            if !atlas.glyphs.contains_key(&ch) {
                atlas.cache(font, scale, ch);
            }
        }
        log::debug!(
            "Atlas : {} glyphes {}x{}",
            atlas.glyphs.len(),
            atlas.cell_width,
            atlas.cell_height
        );
        atlas
    }

    fn cache<F: Font>(&mut self, font: &F, scale: PxScale, ch: char) {
        let id = font.glyph_id(ch);
        if id.0 == 0 {
            return;
        }
        let scaled = font.as_scaled(scale);
        let x0 = ((self.cell_width as f32 - scaled.h_advance(id)) * 0.5).max(0.0);
        let glyph = id.with_scale_and_position(scale, point(x0, scaled.ascent()));

        let (w, h) = (self.cell_width as i32, self.cell_height as i32);
        let mut coverage = vec![0u8; (self.cell_width * self.cell_height) as usize];
        if let Some(outline) = font.outline_glyph(glyph) {
            let bounds = outline.px_bounds();
            outline.draw(|x, y, v| {
                let px = x as i32 + bounds.min.x as i32;
                let py = y as i32 + bounds.min.y as i32;
                if (0..w).contains(&px) && (0..h).contains(&py) {
                    let idx = (py * w + px) as usize;
                    coverage[idx] = coverage[idx].max((v * 255.0).round().clamp(0.0, 255.0) as u8);
                }
            });
        }
        self.glyphs.insert(ch, coverage);
    }

    /// Coverage of `ch`, `cell_width × cell_height` row-major, if the font has it.
    #[must_use]
    pub fn get(&self, ch: char) -> Option<&[u8]> {
        self.glyphs.get(&ch).map(Vec::as_slice)
    }

    #[must_use]
    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }
}
