//! [MaxP](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6maxp.html) table implementation.

use crate::{
    stream::{read_u16_at, read_u32_at},
    Error, Result,
};

/// Fonts with CFF outlines only store the glyph count
const VERSION_0_5: u32 = 0x00005000;
const VERSION_1_0: u32 = 0x00010000;

#[derive(Clone, Copy, Debug, Default)]
pub struct MaxPTable {
    /// Number of glyphs defined in the font
    pub num_glyphs: u16,

    /// Points in zone 0
    pub max_twilight_points: u16,

    /// Maximum number of storage units used by the interpreter
    pub max_storage: u16,

    /// Maximum number of function definitions
    pub max_function_defs: u16,

    pub max_stack_elements: u16,
}

impl MaxPTable {
    pub fn new(data: &[u8]) -> Result<Self> {
        let version = read_u32_at(data, 0)?;
        let num_glyphs = read_u16_at(data, 4)?;

        match version {
            VERSION_0_5 => Ok(Self {
                num_glyphs,
                ..Default::default()
            }),
            VERSION_1_0 => Ok(Self {
                num_glyphs,
                max_twilight_points: read_u16_at(data, 16)?,
                max_storage: read_u16_at(data, 18)?,
                max_function_defs: read_u16_at(data, 20)?,
                max_stack_elements: read_u16_at(data, 24)?,
            }),
            _ => Err(Error::MalformedHeader("unsupported maxp table version")),
        }
    }
}
