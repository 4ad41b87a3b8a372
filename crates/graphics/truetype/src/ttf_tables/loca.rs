//! [Loca](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6loca.html) table implementation.

use std::ops::Range;

use crate::{
    stream::{read_u16_at, read_u32_at},
    Error, Result,
};

use super::{cmap::GlyphID, head::LocaTableFormat};

pub struct LocaTable<'a> {
    data: &'a [u8],
    format: LocaTableFormat,
    num_glyphs: u16,
}

impl<'a> LocaTable<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], format: LocaTableFormat, num_glyphs: u16) -> Self {
        Self {
            data,
            format,
            num_glyphs,
        }
    }

    /// The byte range of a glyph within the `glyf` table.
    ///
    /// An empty range means the glyph has no outline.
    pub fn get_glyph_range(&self, glyph_id: GlyphID) -> Result<Range<usize>> {
        if self.num_glyphs <= glyph_id.numeric() {
            return Err(Error::IndexOutOfRange {
                what: "glyph",
                index: glyph_id.numeric() as usize,
                limit: self.num_glyphs as usize,
            });
        }

        let index = glyph_id.numeric() as usize;
        let (start, end) = match self.format {
            LocaTableFormat::Short => {
                // The offset / 2 is stored
                let start = read_u16_at(self.data, index * 2)? as usize * 2;
                let end = read_u16_at(self.data, (index + 1) * 2)? as usize * 2;
                (start, end)
            },
            LocaTableFormat::Long => {
                let start = read_u32_at(self.data, index * 4)? as usize;
                let end = read_u32_at(self.data, (index + 1) * 4)? as usize;
                (start, end)
            },
        };

        if end < start {
            return Err(Error::MalformedGlyph {
                glyph_id: glyph_id.numeric(),
                reason: "loca offsets are not ascending",
            });
        }

        Ok(start..end)
    }
}
