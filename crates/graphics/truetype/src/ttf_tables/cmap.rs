//! [CMAP](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cmap.html) table implementation

use std::fmt;

use crate::{
    stream::{read_i16_at, read_u16_at, read_u32_at, slice_at},
    Error, Result,
};

/// Zero-cost wrapper around a `u16` for extra type safety.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphID(u16);

impl GlyphID {
    /// The id of the replacement glyph
    pub const REPLACEMENT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn numeric(self) -> u16 {
        self.0
    }
}

impl From<GlyphID> for u16 {
    fn from(value: GlyphID) -> Self {
        value.0
    }
}

impl fmt::Display for GlyphID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformID {
    Unicode(UnicodePlatformSpecificID),
    Mac,
    Reserved,
    Microsoft(WindowsPlatformSpecificID),
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnicodePlatformSpecificID {
    Version1_0,
    Version1_1,
    Iso10646_1993SemanticDeprecated,
    Unicode2_0OrLaterBmpOnly,
    Unicode2_0OrLater,
    UnicodeVariationSequences,
    LastResort,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowsPlatformSpecificID {
    Symbol,
    UnicodeBmpOnly,
    ShiftJis,
    Prc,
    BigFive,
    Johab,
    UnicodeUcs4,
    Unknown,
}

impl From<(u16, u16)> for PlatformID {
    fn from(value: (u16, u16)) -> Self {
        match value.0 {
            0 => Self::Unicode(value.1.into()),
            1 => Self::Mac,
            2 => Self::Reserved,
            3 => Self::Microsoft(value.1.into()),
            _ => Self::Unknown,
        }
    }
}

impl From<u16> for UnicodePlatformSpecificID {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Version1_0,
            1 => Self::Version1_1,
            2 => Self::Iso10646_1993SemanticDeprecated,
            3 => Self::Unicode2_0OrLaterBmpOnly,
            4 => Self::Unicode2_0OrLater,
            5 => Self::UnicodeVariationSequences,
            6 => Self::LastResort,
            _ => Self::Unknown,
        }
    }
}

impl From<u16> for WindowsPlatformSpecificID {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Symbol,
            1 => Self::UnicodeBmpOnly,
            2 => Self::ShiftJis,
            3 => Self::Prc,
            4 => Self::BigFive,
            5 => Self::Johab,
            10 => Self::UnicodeUcs4,
            _ => Self::Unknown,
        }
    }
}

/// The character to glyph mapping of a font.
///
/// Subtables are located once, lookups never allocate.
#[derive(Clone, Copy)]
pub struct CMAPTable<'a> {
    format4: Option<Format4<'a>>,
    format12: Option<Format12<'a>>,

    /// Unicode variation sequences. Located, but lookups are not supported.
    format14: Option<&'a [u8]>,
}

/// How much we trust a subtable for a given format.
///
/// Windows records win over the unicode platform ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Preference {
    Fallback,
    Preferred,
}

impl<'a> CMAPTable<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let version = read_u16_at(data, 0)?;
        if version != 0 {
            return Err(Error::MalformedHeader("unsupported cmap table version"));
        }

        let num_subtables = read_u16_at(data, 2)? as usize;
        if num_subtables == 0 {
            return Err(Error::MalformedHeader("cmap table has no subtables"));
        }

        let mut format4: Option<(Preference, Format4<'a>)> = None;
        let mut format12: Option<(Preference, Format12<'a>)> = None;
        let mut format14 = None;

        // Using a linear search here, fonts only contain a handful of subtables
        for index in 0..num_subtables {
            let record = CMAPSubTable::new(data, 4 + index * 8)?;
            let preference = match record.platform_id() {
                PlatformID::Microsoft(
                    WindowsPlatformSpecificID::UnicodeBmpOnly
                    | WindowsPlatformSpecificID::UnicodeUcs4,
                ) => Some(Preference::Preferred),
                PlatformID::Unicode(
                    UnicodePlatformSpecificID::Unicode2_0OrLaterBmpOnly
                    | UnicodePlatformSpecificID::Unicode2_0OrLater,
                ) => Some(Preference::Fallback),
                _ => None,
            };

            let subtable = data
                .get(record.offset()..)
                .ok_or(Error::TruncatedFile {
                    offset: record.offset(),
                })
                .and_then(|subtable_data| Ok((read_u16_at(subtable_data, 0)?, subtable_data)));

            let Some(preference) = preference else {
                // Records for other platforms only matter if they hold variation sequences,
                // a broken one must not make the whole font unusable
                match subtable {
                    Ok((14, subtable_data)) => format14 = Some(subtable_data),
                    Ok((format, _)) => log::debug!(
                        "Ignoring cmap subtable with format {format} for {:?}",
                        record.platform_id()
                    ),
                    Err(error) => log::debug!(
                        "Ignoring unreadable cmap subtable for {:?}: {error}",
                        record.platform_id()
                    ),
                }
                continue;
            };

            let (format, subtable_data) = subtable?;
            match format {
                4 => {
                    if format4.map_or(true, |(current, _)| current < preference) {
                        format4 = Some((preference, Format4::new(subtable_data)?));
                    }
                },
                12 => {
                    if format12.map_or(true, |(current, _)| current < preference) {
                        format12 = Some((preference, Format12::new(subtable_data)?));
                    }
                },
                14 => format14 = Some(subtable_data),
                _ => {
                    log::debug!(
                        "Ignoring cmap subtable with format {format} for {:?}",
                        record.platform_id()
                    );
                },
            }
        }

        let table = Self {
            format4: format4.map(|(_, subtable)| subtable),
            format12: format12.map(|(_, subtable)| subtable),
            format14,
        };
        log::debug!("Selected cmap subtables: {table:?}");

        Ok(table)
    }

    /// Map a codepoint to a glyph.
    ///
    /// Returns `Ok(None)` if the font has no glyph for the codepoint. Only the
    /// default variation (`0`) can be looked up.
    pub fn find_glyph_id(&self, codepoint: u32, variation_selector: u32) -> Result<Option<GlyphID>> {
        if variation_selector != 0 {
            return Err(Error::UnsupportedVariationSelector(variation_selector));
        }

        let glyph_id = if let Some(format12) = &self.format12 {
            format12.get_glyph_id(codepoint)?
        } else if let Some(format4) = &self.format4 {
            u16::try_from(codepoint)
                .ok()
                .map(|codepoint| format4.get_glyph_id(codepoint))
                .transpose()?
                .flatten()
        } else {
            None
        };

        // Glyph 0 is .notdef, which is what unmapped characters map to
        Ok(glyph_id.filter(|&id| id != GlyphID::REPLACEMENT))
    }

    #[inline]
    #[must_use]
    pub fn format4(&self) -> Option<&Format4<'a>> {
        self.format4.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn format12(&self) -> Option<&Format12<'a>> {
        self.format12.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn has_variation_sequences(&self) -> bool {
        self.format14.is_some()
    }
}

impl<'a> fmt::Debug for CMAPTable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CMAP Table")
            .field("format4", &self.format4.is_some())
            .field("format12", &self.format12.is_some())
            .field("format14", &self.format14.is_some())
            .finish()
    }
}

pub struct CMAPSubTable<'a>(&'a [u8]);

impl<'a> CMAPSubTable<'a> {
    pub fn new(data: &'a [u8], offset: usize) -> Result<Self> {
        slice_at(data, offset, 8).map(Self)
    }

    pub fn platform_id(&self) -> PlatformID {
        let platform_id = u16::from_be_bytes([self.0[0], self.0[1]]);
        let platform_specific_id = u16::from_be_bytes([self.0[2], self.0[3]]);
        (platform_id, platform_specific_id).into()
    }

    /// Offset of the subtable, relative to the start of the cmap table
    pub fn offset(&self) -> usize {
        u32::from_be_bytes([self.0[4], self.0[5], self.0[6], self.0[7]]) as usize
    }
}

impl<'a> fmt::Debug for CMAPSubTable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CMAP Subtable")
            .field("platform_id", &self.platform_id())
            .field("offset", &self.offset())
            .finish()
    }
}

/// Segment mapping to delta values, covering the basic multilingual plane
#[derive(Clone, Copy, Debug)]
pub struct Format4<'a> {
    data: &'a [u8],
    segment_count: usize,
}

#[derive(Clone, Copy, Debug)]
struct Format4Segment {
    start_code: u16,
    end_code: u16,
    id_delta: i16,
    id_range_offset: u16,
}

impl<'a> Format4<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        // Byte layout looks like this:
        // Header        : 14 bytes
        // End Code      : [u16; segcount]
        //                 < 2 byte padding>
        // Start Code    : [u16; segcount]
        // ID Delta      : [u16; segcount]
        // ID Range Offs : [u16; segcount]
        // Glyph IDS     : remaining space
        if read_u16_at(data, 0)? != 4 {
            return Err(Error::MalformedHeader("not a format 4 cmap subtable"));
        }

        let segment_count = read_u16_at(data, 6)? as usize / 2;

        // Make sure all four segment arrays are present
        let data = slice_at(data, 0, 16 + 8 * segment_count)?;

        Ok(Self {
            data,
            segment_count,
        })
    }

    fn segment(&self, index: usize) -> Result<Format4Segment> {
        let segment_count_x2 = self.segment_count * 2;
        Ok(Format4Segment {
            end_code: read_u16_at(self.data, 14 + 2 * index)?,
            start_code: read_u16_at(self.data, 16 + segment_count_x2 + 2 * index)?,
            id_delta: read_i16_at(self.data, 16 + 2 * segment_count_x2 + 2 * index)?,
            id_range_offset: read_u16_at(self.data, 16 + 3 * segment_count_x2 + 2 * index)?,
        })
    }

    pub fn get_glyph_id(&self, codepoint: u16) -> Result<Option<GlyphID>> {
        for index in 0..self.segment_count {
            let segment = self.segment(index)?;
            if codepoint < segment.start_code || segment.end_code < codepoint {
                continue;
            }

            if segment.id_range_offset != 0 {
                log::warn!(
                    "Cannot map {codepoint:#06x}: idRangeOffset addressing in cmap format 4 is not supported"
                );
                return Ok(None);
            }

            let numeric_id = codepoint.wrapping_add_signed(segment.id_delta);
            return Ok(Some(GlyphID(numeric_id)));
        }

        Ok(None)
    }

    /// Call `f` for every codepoint covered by a segment
    pub fn codepoints<F: FnMut(u16)>(&self, mut f: F) -> Result<()> {
        for index in 0..self.segment_count {
            let segment = self.segment(index)?;

            // Indicates the final segment
            if segment.start_code == 0xFFFF && segment.end_code == 0xFFFF {
                break;
            }

            for codepoint in segment.start_code..=segment.end_code {
                f(codepoint)
            }
        }
        Ok(())
    }
}

/// Segmented coverage of the full unicode range
#[derive(Clone, Copy, Debug)]
pub struct Format12<'a> {
    groups: &'a [u8],
}

/// A run of consecutive codepoints mapping to consecutive glyphs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

const FORMAT12_GROUP_SIZE: usize = 12;

impl<'a> Format12<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if read_u16_at(data, 0)? != 12 {
            return Err(Error::MalformedHeader("not a format 12 cmap subtable"));
        }

        let num_groups = read_u32_at(data, 12)? as usize;
        let groups = slice_at(data, 16, num_groups * FORMAT12_GROUP_SIZE)?;
        Ok(Self { groups })
    }

    pub fn groups(&self) -> impl Iterator<Item = SequentialMapGroup> + 'a {
        self.groups
            .chunks_exact(FORMAT12_GROUP_SIZE)
            .map(|group| SequentialMapGroup {
                start_char_code: u32::from_be_bytes([group[0], group[1], group[2], group[3]]),
                end_char_code: u32::from_be_bytes([group[4], group[5], group[6], group[7]]),
                start_glyph_id: u32::from_be_bytes([group[8], group[9], group[10], group[11]]),
            })
    }

    pub fn get_glyph_id(&self, codepoint: u32) -> Result<Option<GlyphID>> {
        let Some(group) = self
            .groups()
            .find(|group| group.start_char_code <= codepoint && codepoint <= group.end_char_code)
        else {
            return Ok(None);
        };

        let glyph_id = group
            .start_glyph_id
            .checked_add(codepoint - group.start_char_code)
            .and_then(|glyph_id| u16::try_from(glyph_id).ok())
            .ok_or(Error::MalformedHeader("cmap format 12 maps to a glyph id above 65535"))?;
        Ok(Some(GlyphID(glyph_id)))
    }
}
