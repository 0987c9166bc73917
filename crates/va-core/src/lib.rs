//! Parameter set, frame types, glyph ramps and errors shared by vidascii.
//!
//! This crate contains all shared types and configuration logic used across
//! the vidascii workspace. It performs no image processing.

pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use charset::GlyphRamp;
pub use config::{ColorMode, ParameterSet, Quality};
pub use error::CoreError;
pub use frame::{AsciiGrid, FrameBuffer};
