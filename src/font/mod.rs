//! Embedded TrueType font handling
//!
//! Browsers embed every slide's text as its own subset of each font. This
//! module parses those subsets and merges subsets of the same logical font
//! so the assembled document ships a single program per font.

pub mod consolidate;
pub mod glyf;
pub mod program;
pub mod sfnt;

use thiserror::Error;

pub use consolidate::{font_key, Consolidation, FontConsolidator, FontEntry};
pub use glyf::{Glyph, GlyphKind, GlyphTable};
pub use program::FontProgram;

/// Errors raised while reading an embedded font program
#[derive(Error, Debug)]
pub enum FontError {
    #[error("font face rejected: {0}")]
    Face(#[from] ttf_parser::FaceParsingError),

    #[error("truncated {0} data")]
    Truncated(&'static str),

    #[error("table {0} extends past the end of the font")]
    TableOutOfBounds(String),

    #[error("missing {0} table")]
    MissingTable(&'static str),

    #[error("unsupported font: {0}")]
    Unsupported(String),

    #[error("invalid font: {0}")]
    Invalid(String),
}
