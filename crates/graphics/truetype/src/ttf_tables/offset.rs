//! The [table directory](https://learn.microsoft.com/en-us/typography/opentype/spec/otff#table-directory)
//! at the start of every sfnt font, and the
//! [collection header](https://learn.microsoft.com/en-us/typography/opentype/spec/otff#ttc-header)
//! in front of it for `.ttc` files.

use std::{fmt, ops::Range};

use crate::{
    stream::{read_u32_at, Stream},
    Error, Result,
};

/// A four byte table identifier, stored big-endian
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(u32);

impl Tag {
    pub const CMAP: Self = Self::new(b"cmap");
    pub const CVT: Self = Self::new(b"cvt ");
    pub const FPGM: Self = Self::new(b"fpgm");
    pub const GLYF: Self = Self::new(b"glyf");
    pub const HEAD: Self = Self::new(b"head");
    pub const LOCA: Self = Self::new(b"loca");
    pub const MAXP: Self = Self::new(b"maxp");
    pub const PREP: Self = Self::new(b"prep");

    #[inline]
    #[must_use]
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*bytes))
    }

    #[inline]
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.to_bytes() {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

/// Version tag of plain TrueType outlines
const SFNT_VERSION_TRUETYPE: u32 = 0x00010000;

/// Version tag used by Apple for TrueType outlines
const SFNT_VERSION_APPLE: u32 = u32::from_be_bytes(*b"true");

/// Version tag of fonts with CFF outlines. The directory layout is identical.
const SFNT_VERSION_CFF: u32 = u32::from_be_bytes(*b"OTTO");

/// Version tag of a font collection
const COLLECTION_TAG: u32 = u32::from_be_bytes(*b"ttcf");

/// 12 byte header + 16 bytes per table
const DIRECTORY_HEADER_SIZE: usize = 12;
const TABLE_RECORD_SIZE: usize = 16;

/// Returns the number of fonts stored in `data`.
///
/// This is `1` for a plain sfnt and the declared font count for a collection.
pub fn num_fonts(data: &[u8]) -> Result<usize> {
    match read_u32_at(data, 0)? {
        COLLECTION_TAG => Ok(CollectionHeader::new(data)?.num_fonts()),
        SFNT_VERSION_TRUETYPE | SFNT_VERSION_APPLE | SFNT_VERSION_CFF => Ok(1),
        _ => Err(Error::MalformedHeader("unknown sfnt version")),
    }
}

struct CollectionHeader<'a> {
    offsets: &'a [u8],
}

impl<'a> CollectionHeader<'a> {
    fn new(data: &'a [u8]) -> Result<Self> {
        let mut stream = Stream::new_at(data, 4);
        let version = stream.read::<u32>()?;
        if version != 0x00010000 && version != 0x00020000 {
            return Err(Error::MalformedHeader("unsupported collection version"));
        }

        let num_fonts = stream.read::<u32>()? as usize;
        let offsets = stream.read_bytes(num_fonts * 4)?;
        Ok(Self { offsets })
    }

    fn num_fonts(&self) -> usize {
        self.offsets.len() / 4
    }

    fn font_offset(&self, index: usize) -> Result<usize> {
        if self.num_fonts() <= index {
            return Err(Error::IndexOutOfRange {
                what: "font",
                index,
                limit: self.num_fonts(),
            });
        }

        Ok(read_u32_at(self.offsets, index * 4)? as usize)
    }
}

/// Index from table tag to the byte range of the table inside the font file
#[derive(Clone, Debug)]
pub struct OffsetTable {
    scaler_type: u32,
    tables: Vec<TableEntry>,
}

impl OffsetTable {
    /// Parse the table directory of the font at `font_index`.
    ///
    /// `font_index` must be `0` unless `data` is a font collection.
    pub fn new(data: &[u8], font_index: usize) -> Result<Self> {
        let header_offset = match read_u32_at(data, 0)? {
            COLLECTION_TAG => CollectionHeader::new(data)?.font_offset(font_index)?,
            SFNT_VERSION_TRUETYPE | SFNT_VERSION_APPLE | SFNT_VERSION_CFF => {
                if font_index != 0 {
                    return Err(Error::IndexOutOfRange {
                        what: "font",
                        index: font_index,
                        limit: 1,
                    });
                }
                0
            },
            _ => return Err(Error::MalformedHeader("unknown sfnt version")),
        };

        let mut stream = Stream::new_at(data, header_offset);
        let scaler_type = stream.read::<u32>()?;
        if !matches!(
            scaler_type,
            SFNT_VERSION_TRUETYPE | SFNT_VERSION_APPLE | SFNT_VERSION_CFF
        ) {
            return Err(Error::MalformedHeader("unknown sfnt version"));
        }

        let num_tables = stream.read::<u16>()? as usize;

        // searchRange, entrySelector and rangeShift only exist to speed up a binary
        // search, which we don't do
        stream.skip_bytes(6)?;

        let directory_end = header_offset + DIRECTORY_HEADER_SIZE + num_tables * TABLE_RECORD_SIZE;
        if data.len() < directory_end {
            return Err(Error::TruncatedFile {
                offset: header_offset + DIRECTORY_HEADER_SIZE,
            });
        }

        let mut tables = Vec::with_capacity(num_tables);
        for _ in 0..num_tables {
            let entry = TableEntry {
                tag: Tag(stream.read()?),
                checksum: stream.read()?,
                offset: stream.read()?,
                length: stream.read()?,
            };

            if data.len() < entry.offset() + entry.length() {
                return Err(Error::TruncatedFile {
                    offset: entry.offset(),
                });
            }
            tables.push(entry);
        }

        log::debug!(
            "Parsed table directory at {header_offset:#x} with {num_tables} tables: {:?}",
            tables.iter().map(TableEntry::tag).collect::<Vec<_>>()
        );

        Ok(Self {
            scaler_type,
            tables,
        })
    }

    #[inline]
    #[must_use]
    pub fn scaler_type(&self) -> u32 {
        self.scaler_type
    }

    /// Whether the outlines are stored as CFF data instead of `glyf`
    #[inline]
    #[must_use]
    pub fn has_cff_outlines(&self) -> bool {
        self.scaler_type == SFNT_VERSION_CFF
    }

    #[inline]
    #[must_use]
    pub fn get_table(&self, target_tag: Tag) -> Option<TableEntry> {
        // Binary search might be more performant here but is likely not worth
        // the complexity as tables are only parsed once and fonts only have a small number of
        // tables (< 10-20)
        self.tables()
            .iter()
            .find(|table| table.tag() == target_tag)
            .copied()
    }

    #[inline]
    #[must_use]
    pub fn tables(&self) -> &[TableEntry] {
        &self.tables
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TableEntry {
    tag: Tag,
    checksum: u32,
    offset: u32,
    length: u32,
}

impl TableEntry {
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    #[must_use]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// The bytes covered by this table.
    ///
    /// Guaranteed to be in bounds for the buffer the directory was parsed from.
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset()..self.offset() + self.length()
    }
}
