use thiserror::Error;

use crate::ttf_tables::offset::Tag;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between reading a font file and producing a pixel mask.
///
/// None of these are recoverable for the glyph that caused them, but none of them
/// poison the [Font](crate::Font) either: callers are free to continue with other glyphs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read font file")]
    Io(#[from] std::io::Error),

    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    /// A declared size or offset points past the end of the available data
    #[error("unexpected end of data at offset {offset:#x}")]
    TruncatedFile { offset: usize },

    #[error("font does not contain a {0:?} table")]
    MissingTable(Tag),

    #[error("{what} index {index} is out of range (limit is {limit})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("malformed glyph {glyph_id}: {reason}")]
    MalformedGlyph { glyph_id: u16, reason: &'static str },

    /// Components positioned by point matching instead of an offset
    #[error("composite glyph {glyph_id} uses point matching, which is not supported")]
    UnsupportedComposite { glyph_id: u16 },

    #[error("variation selector {0:#x} is not supported")]
    UnsupportedVariationSelector(u32),

    #[error("instruction {mnemonic} at offset {offset} is not implemented")]
    UnimplementedOpcode {
        mnemonic: &'static str,
        offset: usize,
    },

    #[error("hinting failed: {reason}")]
    HintingFailure { reason: String },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    #[error("grid size must be between 1 and units per em, got {0}")]
    InvalidGridSize(u32),
}

impl Error {
    pub(crate) fn hinting<S: Into<String>>(reason: S) -> Self {
        Self::HintingFailure {
            reason: reason.into(),
        }
    }
}
