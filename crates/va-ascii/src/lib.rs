//! Moteur de conversion frame → texte de vidascii.
//!
//! Tonalité, filtres spatiaux, indice de profondeur, redimensionnement et
//! quantification en glyphes. Aucune entrée/sortie ici.

pub mod blur;
pub mod depth;
pub mod edge;
pub mod filter;
pub mod pipeline;
pub mod quantize;
pub mod resize;
pub mod tone;

pub use pipeline::{frame_to_ascii, process_batch, FramePipeline};
